use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api::ApiUrls;
use crate::core::app_error::AppError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Product {
    pub id: i32,
    pub unit_price: f32,
    pub available: bool,
}

pub async fn get_products(client: Client, ids: Vec<i32>) -> Result<HashMap<i32, Product>> {
    let ids_query = ids
        .into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let url = ApiUrls::get_catalog_service_url();
    let products: Vec<Product> = client
        .get(format!("{}/products", url))
        .query(&[("ids", ids_query)])
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("CatalogService".into()))?
        .json()
        .await
        .context("Failed to parse JSON")?;

    let products: HashMap<i32, Product> = products.into_iter().map(|p| (p.id, p)).collect();

    Ok(products)
}
