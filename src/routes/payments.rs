use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::directory,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth,
    },
    payment::{CardDetails, GatewayCustomer, GatewayPaymentMethod, SetupIntent},
};

/// Card-wallet routes for the authenticated customer.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_setup_intent))
            .routes(utoipa_axum::routes!(register_card))
            .routes(utoipa_axum::routes!(get_cards))
            .routes(utoipa_axum::routes!(detach_card))
            .routes(utoipa_axum::routes!(delete_customer))
            .route_layer(axum::middleware::from_fn(auth::customers_authorization)),
    )
}

/// Gateway customers are provisioned lazily on the first payment-setup
/// request.
async fn resolve_or_provision(
    state: &AppState,
    user_id: i32,
) -> Result<GatewayCustomer, AppError> {
    match state.payment.resolve_customer(user_id).await {
        Some(customer) => Ok(customer),
        None => {
            let profile = directory::get_user_profile(state.http_client.clone(), user_id)
                .await
                .context("Failed to load user profile")?;
            state.payment.provision_customer(user_id, &profile).await
        }
    }
}

/// Obtain a one-time client secret for registering a card from the client.
#[utoipa::path(
    post,
    path = "/setup-intent",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Created setup intent successfully", body = StdResponse<SetupIntent, String>)
    )
)]
async fn create_setup_intent(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let customer = resolve_or_provision(&state, user_id).await?;
    let intent = state.payment.create_setup_intent(&customer.id).await?;

    Ok(StdResponse {
        data: Some(intent),
        message: Some("Created setup intent successfully"),
    })
}

/// Tokenize a card and attach it to the customer's wallet.
#[utoipa::path(
    post,
    path = "/cards",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = CardDetails,
    responses(
        (status = 200, description = "Card attached successfully", body = StdResponse<GatewayPaymentMethod, String>),
        (status = 409, description = "Card is already attached", body = StdResponse<String, String>)
    )
)]
async fn register_card(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<CardDetails>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;

    let customer = resolve_or_provision(&state, user_id).await?;
    let method = state.payment.register_card(&body).await?;
    state.payment.attach_card(&customer.id, &method).await?;

    Ok(StdResponse {
        data: Some(method),
        message: Some("Card attached successfully"),
    })
}

/// List the cards attached to the customer's wallet.
#[utoipa::path(
    get,
    path = "/cards",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List cards successfully", body = StdResponse<Vec<GatewayPaymentMethod>, String>)
    )
)]
async fn get_cards(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let cards = match state.payment.resolve_customer(user_id).await {
        Some(customer) => state.payment.list_cards(&customer.id).await?,
        None => Vec::new(),
    };

    Ok(StdResponse {
        data: Some(cards),
        message: Some("List cards successfully"),
    })
}

/// Detach a card from the customer's wallet.
#[utoipa::path(
    delete,
    path = "/cards/{id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "Payment method ID to detach")
    ),
    responses(
        (status = 200, description = "Card detached successfully", body = StdResponse<String, String>)
    )
)]
async fn detach_card(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.payment.detach_card(&id).await?;

    Ok(StdResponse {
        data: Some(id),
        message: Some("Card detached successfully"),
    })
}

/// Remove the customer's gateway record entirely.
#[utoipa::path(
    delete,
    path = "/customer",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Customer deleted successfully", body = StdResponse<String, String>)
    )
)]
async fn delete_customer(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state
        .payment
        .resolve_customer(user_id)
        .await
        .ok_or(AppError::NotFound)?;
    state.payment.delete_customer(&customer.id).await?;

    Ok(StdResponse {
        data: Some(customer.id),
        message: Some("Customer deleted successfully"),
    })
}
