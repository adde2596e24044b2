// storefront/src/main.rs

use std::sync::Arc;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront::config::{self, AppConfig};
use storefront::payments::StripeConnector;
use storefront::store::PgStore;
use storefront::{build_app_state, web};

fn init_tracing(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing(config::json_logs_requested());

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()));
    }
  };

  if app_config.run_migrations {
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
      tracing::error!(error = %e, "Failed to apply database migrations.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
    tracing::info!("Database migrations applied.");
  }

  let store = Arc::new(PgStore::new(db_pool));
  let app_state = build_app_state(
    app_config.clone(),
    store.clone(),
    store,
    Arc::new(StripeConnector::new(app_config.payments.clone())),
  );
  tracing::info!("Order lifecycle pipelines registered.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
