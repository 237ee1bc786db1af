use anyhow::Result;
use reqwest::Client;

use crate::api::ApiUrls;
use crate::core::app_error::AppError;

/// Remove every basket entry for a user. Clearing an already-empty basket is
/// a no-op: the basket service answers 404 for an absent basket and that
/// counts as success here.
pub async fn clear_basket(client: Client, user_id: i32) -> Result<()> {
    let url = ApiUrls::get_basket_service_url();
    let response = client
        .delete(format!("{}/users/{}/basket", url, user_id))
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("BasketService".into()))?;

    if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(());
    }

    Err(anyhow::anyhow!(
        "Basket service returned {} clearing basket for user {}",
        response.status(),
        user_id
    ))
}
