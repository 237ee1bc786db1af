use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::ApiUrls;
use crate::core::app_error::{AppError, StdResponse};

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StaffProfile {
    pub id: i32,
    /// `None` means company-wide staff with no branch assignment.
    pub branch_id: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Branch {
    pub id: i32,
    pub name: String,
    pub is_main: bool,
}

pub async fn get_user_profile(client: Client, id: i32) -> Result<UserProfile> {
    let url = ApiUrls::get_directory_service_url();
    let profile: StdResponse<UserProfile, String> = client
        .get(format!("{}/users/{}", url, id))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("DirectoryService".into()))?
        .json()
        .await
        .context("Failed to parse JSON")?;

    match profile.data {
        Some(profile) => Ok(profile),
        None => Err(anyhow::anyhow!("User profile not found")),
    }
}

/// Resolve a branch. `None` means the branch does not exist; the caller
/// decides how to report that.
pub async fn get_branch(client: Client, id: i32) -> Result<Option<Branch>> {
    let url = ApiUrls::get_directory_service_url();
    let response = client
        .get(format!("{}/branches/{}", url, id))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("DirectoryService".into()))?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let branch: StdResponse<Branch, String> =
        response.json().await.context("Failed to parse JSON")?;
    Ok(branch.data)
}

/// The whole staff roster with branch assignments.
pub async fn get_staff(client: Client) -> Result<Vec<StaffProfile>> {
    let url = ApiUrls::get_directory_service_url();
    let staff: StdResponse<Vec<StaffProfile>, String> = client
        .get(format!("{}/staff", url))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("DirectoryService".into()))?
        .json()
        .await
        .context("Failed to parse JSON")?;

    Ok(staff.data.unwrap_or_default())
}
