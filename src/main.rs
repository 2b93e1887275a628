use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use folioo::notify::build_notifier;
use folioo::openapi::ApiDoc;
use folioo::rate_limit::RateLimiterFacade;
use folioo::repo::Repo;
use folioo::storage::build_media_store;
use folioo::{config, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; deployments set the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping Folioo server");
    let frontend = std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
    info!("Frontend URL: {frontend}");

    let repo = build_repo().await?;
    let media_store = build_media_store().await?;
    let notifier = build_notifier();
    let rate_limiter = RateLimiterFacade::from_env();
    let openapi = ApiDoc::openapi();

    let state = web::Data::new(AppState {
        repo,
        media_store,
        notifier,
        rate_limiter: Some(rate_limiter),
    });
    let security = SecurityHeaders::from_env();

    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            // local Vite dev server
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_origin(&frontend)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(state.clone())
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind)?;

    info!("Listening on http://{bind}");
    server.run().await?;
    Ok(())
}

#[cfg(not(feature = "postgres-store"))]
async fn build_repo() -> anyhow::Result<Arc<dyn Repo>> {
    info!("Using in-memory repository backend");
    Ok(Arc::new(folioo::repo::inmem::InMemRepo::new()))
}

#[cfg(feature = "postgres-store")]
async fn build_repo() -> anyhow::Result<Arc<dyn Repo>> {
    use anyhow::Context;
    use sqlx::postgres::PgPoolOptions;

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set for postgres-store")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .context("failed to connect to Postgres")?;
    sqlx::migrate!("./migrations").run(&pool).await.context("migrations failed")?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(folioo::repo::pg::PgRepo::new(pool)))
}

/// Required configuration must be present before anything else starts.
fn validate_env_vars() -> anyhow::Result<()> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set; copy .env.example to .env and configure it"))?;
    if secret.len() < 32 {
        anyhow::bail!("JWT_SECRET must be at least 32 characters long");
    }
    Ok(())
}
