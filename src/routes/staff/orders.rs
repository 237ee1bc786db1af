use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::catalog,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth,
    },
    ledger::{self, TransitionOutcome},
    models::{OrderEntity, OrderLineEntity, OrderStatus},
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/staff/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_open_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(advance_order))
            .route_layer(axum::middleware::from_fn(auth::staff_authorization)),
    )
}

#[derive(Deserialize, IntoParams)]
struct OpenOrdersQuery {
    /// Restrict the board to one branch.
    branch_id: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct OpenOrderRes {
    order: OrderEntity,
    order_lines: Vec<OrderLineEntity>,
}

/// Dashboard listing: every order still on the board, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Staff"],
    security(("bearerAuth" = [])),
    params(OpenOrdersQuery),
    responses(
        (status = 200, description = "List open orders", body = StdResponse<Vec<OpenOrderRes>, String>)
    )
)]
async fn get_open_orders(
    State(state): State<AppState>,
    Query(query): Query<OpenOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let open = ledger::list_open(conn, query.branch_id).await?;
    let order_ids: Vec<i32> = open.iter().map(|order| order.id).collect();
    let mut lines = ledger::lines_by_order(conn, &order_ids).await?;

    let board: Vec<OpenOrderRes> = open
        .into_iter()
        .map(|order| OpenOrderRes {
            order_lines: lines.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(board),
        message: Some("Get open orders successfully"),
    })
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct GetOrderRes {
    order: OrderEntity,
    order_lines: Vec<OrderLineEntity>,
    total_price: f32,
}

/// Fetch a specific open order with its lines and catalog-priced total.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Staff"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = ledger::find_open(conn, id).await?;
    let mut lines = ledger::lines_by_order(conn, &[order.id]).await?;
    let order_lines = lines.remove(&order.id).unwrap_or_default();

    let product_ids = order_lines.iter().map(|line| line.product_id).collect();
    let products = catalog::get_products(state.http_client.clone(), product_ids).await?;
    let total_price: f32 = order_lines
        .iter()
        .map(|line| {
            let unit_price = products
                .get(&line.product_id)
                .map(|p| p.unit_price)
                .unwrap_or(0.0);
            line.quantity as f32 * unit_price
        })
        .sum();

    Ok(StdResponse {
        data: Some(GetOrderRes {
            order,
            order_lines,
            total_price,
        }),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AdvanceOrderReq {
    target: OrderStatus,
}

/// Advance an order through its lifecycle. `received` closes the order and
/// removes it from the board for good.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Staff"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to advance")
    ),
    request_body = AdvanceOrderReq,
    responses(
        (status = 200, description = "Order advanced successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn advance_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<AdvanceOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    match ledger::transition(conn, id, body.target).await? {
        TransitionOutcome::Updated(order) => Ok(StdResponse {
            data: Some(order),
            message: Some("Order status updated successfully"),
        }),
        TransitionOutcome::Closed(order) => Ok(StdResponse {
            data: Some(order),
            message: Some("Order received and closed"),
        }),
    }
}
