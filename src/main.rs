use anyhow::Result;
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use shopfront_orderservice::core::{app_state::AppState, bootstrap, config, db, swagger};
use shopfront_orderservice::routes;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let state = AppState::init(&config).await?;

    let routes = routes::payments::routes_with_openapi()
        .merge(routes::customers::orders::routes_with_openapi())
        .merge(routes::staff::orders::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Shopfront OrderService API")
        .version("1.0.0")
        .build();
    if let Some(components) = openapi.components.as_mut() {
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
    let swagger_ui = swagger::create_swagger_ui(openapi);

    let app = Router::new()
        .merge(routes)
        .merge(routes::ws::routes())
        .merge(swagger_ui)
        .with_state(state);

    bootstrap::serve("OrderService", app, config.server.port).await
}
