// storefront/src/lib.rs

//! Storefront order lifecycle: checkout session building and payment webhook
//! reconciliation over a Postgres catalog and order ledger.

pub mod config;
pub mod errors;
pub mod models;
pub mod payments;
pub mod pipelines;
pub mod pricing;
pub mod state;
pub mod store;
pub mod web;

use std::sync::Arc;

use orderflow::Registry;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::payments::GatewayConnector;
use crate::state::AppState;
use crate::store::{CatalogStore, OrderLedger};

/// Wires the stores and payment connector into an `AppState` with every
/// lifecycle pipeline registered.
pub fn build_app_state(
  config: Arc<AppConfig>,
  catalog: Arc<dyn CatalogStore>,
  ledger: Arc<dyn OrderLedger>,
  payments: Arc<dyn GatewayConnector>,
) -> AppState {
  let flows = Arc::new(Registry::<AppError>::new());
  pipelines::register_all_pipelines(&flows);
  AppState {
    config,
    catalog,
    ledger,
    payments,
    flows,
  }
}
