use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{Extension, Json, extract::State, response::IntoResponse};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use serde::{Deserialize, Serialize};

use crate::{
    api::{
        baskets,
        catalog::{self, Product},
        directory::{self, StaffProfile, UserProfile},
    },
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth,
    },
    ledger::{self, NewEnvelope},
    models::{CreateOrderLineEntity, OrderEntity, OrderLineEntity, ReceiveType},
    schema::orders,
};

/// Defines routes with OpenAPI specs.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(submit_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .route_layer(axum::middleware::from_fn(auth::customers_authorization)),
    )
}

#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLine {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SubmitOrderReq {
    branch_id: i32,
    receive_type: ReceiveType,
    address: Option<String>,
    message: Option<String>,
    lines: Vec<SubmitLine>,
    /// Gateway payment-method handle; presence requests card settlement
    /// before the order is created.
    payment_method: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SubmitOrderRes {
    order: OrderEntity,
    order_lines: Vec<OrderLineEntity>,
    total_price: f32,
    user: UserProfile,
}

/// Cart shape: at least one line, positive product ids and quantities.
fn validate_lines(lines: &[SubmitLine]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("Order has no lines".into()));
    }
    if lines
        .iter()
        .any(|line| line.product_id <= 0 || line.quantity <= 0)
    {
        return Err(AppError::BadRequest(
            "Every line needs a positive product id and quantity".into(),
        ));
    }
    Ok(())
}

/// Everyone assigned to the order's branch, plus company-wide staff with no
/// branch assignment.
pub fn notification_targets(staff: &[StaffProfile], branch_id: i32) -> Vec<i32> {
    staff
        .iter()
        .filter(|member| member.branch_id.is_none_or(|assigned| assigned == branch_id))
        .map(|member| member.id)
        .collect()
}

fn total_price(lines: &[SubmitLine], products: &HashMap<i32, Product>) -> f32 {
    lines
        .iter()
        .map(|line| {
            let unit_price = products
                .get(&line.product_id)
                .map(|p| p.unit_price)
                .unwrap_or(0.0);
            line.quantity as f32 * unit_price
        })
        .sum()
}

/// Submit a cart as a new order for the authenticated customer.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = SubmitOrderReq,
    responses(
        (status = 200, description = "Created order successfully", body = StdResponse<SubmitOrderRes, String>)
    )
)]
async fn submit_order(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<SubmitOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    validate_lines(&body.lines)?;
    let address = ledger::normalize_address(body.receive_type, body.address)?;

    directory::get_branch(state.http_client.clone(), body.branch_id)
        .await
        .context("Failed to resolve branch")?
        .ok_or(AppError::NotFound)?;

    let product_ids = body.lines.iter().map(|line| line.product_id).collect();
    let products = catalog::get_products(state.http_client.clone(), product_ids).await?;
    for line in &body.lines {
        match products.get(&line.product_id) {
            Some(product) if product.available => {}
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Product {} is not available",
                    line.product_id
                )));
            }
        }
    }
    let total_price = total_price(&body.lines, &products);

    let user = directory::get_user_profile(state.http_client.clone(), user_id)
        .await
        .context("Failed to load user profile")?;

    // Card settlement happens before any write; an error outcome means no
    // order is created and the basket stays untouched.
    if let Some(payment_method) = &body.payment_method {
        let customer = match state.payment.resolve_customer(user_id).await {
            Some(customer) => customer,
            None => state.payment.provision_customer(user_id, &user).await?,
        };
        let outcome = state
            .payment
            .charge(&customer.id, payment_method, total_price)
            .await;
        if !outcome.is_ok() {
            return Err(AppError::PaymentFailed(
                outcome
                    .message
                    .unwrap_or_else(|| "Charge was declined".into()),
            ));
        }
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (order, order_lines) = ledger::create_envelope(
        conn,
        NewEnvelope {
            user_id,
            branch_id: body.branch_id,
            receive_type: body.receive_type,
            address,
            message: body.message.unwrap_or_default(),
            lines: body
                .lines
                .iter()
                .map(|line| CreateOrderLineEntity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        },
    )
    .await?;

    let response = SubmitOrderRes {
        order,
        order_lines,
        total_price,
        user,
    };

    // Fan-out reflects the persisted order; a directory hiccup only costs the
    // live update, never the order.
    match directory::get_staff(state.http_client.clone()).await {
        Ok(staff) => {
            let targets = notification_targets(&staff, response.order.branch_id);
            let delivered = state.hub.emit(&targets, "new-order", &response);
            tracing::info!(
                "Order #{} notified {} connected staff",
                response.order.id,
                delivered
            );
        }
        Err(err) => {
            tracing::warn!("Skipping new-order fan-out: {}", err);
        }
    }

    if let Err(err) = baskets::clear_basket(state.http_client.clone(), user_id).await {
        tracing::warn!("Failed to clear basket for user {}: {}", user_id, err);
    }

    Ok(StdResponse {
        data: Some(response),
        message: Some("Order submitted successfully"),
    })
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct GetOrderRes {
    order: OrderEntity,
    order_lines: Vec<OrderLineEntity>,
    total_price: f32,
}

/// Fetch all orders belonging to the authenticated customer.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<GetOrderRes>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_orders: Vec<OrderEntity> = orders::table
        .filter(orders::user_id.eq(user_id))
        .order_by(orders::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    let order_ids: Vec<i32> = my_orders.iter().map(|order| order.id).collect();
    let mut lines = ledger::lines_by_order(conn, &order_ids).await?;

    let product_ids: Vec<i32> = lines
        .values()
        .flatten()
        .map(|line| line.product_id)
        .collect();
    let products = catalog::get_products(state.http_client.clone(), product_ids).await?;

    let orders_with_lines: Vec<GetOrderRes> = my_orders
        .into_iter()
        .map(|order| {
            let order_lines = lines.remove(&order.id).unwrap_or_default();
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
            GetOrderRes {
                order,
                order_lines,
                total_price,
            }
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_lines),
        message: Some("Get my orders successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(id: i32, branch_id: Option<i32>) -> StaffProfile {
        StaffProfile { id, branch_id }
    }

    #[test]
    fn audience_is_branch_staff_plus_unassigned() {
        let roster = vec![staff(1, Some(1)), staff(2, Some(2)), staff(3, None)];
        assert_eq!(notification_targets(&roster, 1), vec![1, 3]);
        assert_eq!(notification_targets(&roster, 2), vec![2, 3]);
        assert_eq!(notification_targets(&roster, 9), vec![3]);
    }

    #[test]
    fn empty_carts_are_rejected() {
        assert!(matches!(
            validate_lines(&[]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn non_positive_lines_are_rejected() {
        let lines = vec![SubmitLine {
            product_id: 1,
            quantity: 0,
        }];
        assert!(validate_lines(&lines).is_err());

        let lines = vec![SubmitLine {
            product_id: -4,
            quantity: 2,
        }];
        assert!(validate_lines(&lines).is_err());
    }

    #[test]
    fn well_formed_carts_pass() {
        let lines = vec![
            SubmitLine {
                product_id: 1,
                quantity: 2,
            },
            SubmitLine {
                product_id: 7,
                quantity: 1,
            },
        ];
        assert!(validate_lines(&lines).is_ok());
    }

    #[test]
    fn totals_multiply_quantity_by_unit_price() {
        let lines = vec![
            SubmitLine {
                product_id: 1,
                quantity: 3,
            },
            SubmitLine {
                product_id: 2,
                quantity: 1,
            },
        ];
        let products: HashMap<i32, Product> = [
            (
                1,
                Product {
                    id: 1,
                    unit_price: 2.5,
                    available: true,
                },
            ),
            (
                2,
                Product {
                    id: 2,
                    unit_price: 10.0,
                    available: true,
                },
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(total_price(&lines, &products), 17.5);
    }
}
