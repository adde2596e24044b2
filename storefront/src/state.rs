// storefront/src/state.rs

use std::sync::Arc;

use orderflow::Registry;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::payments::GatewayConnector;
use crate::store::{CatalogStore, OrderLedger};

/// Shared by every request. Holds no per-request data; processor clients are
/// obtained from `payments` on each use.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub catalog: Arc<dyn CatalogStore>,
  pub ledger: Arc<dyn OrderLedger>,
  pub payments: Arc<dyn GatewayConnector>,
  pub flows: Arc<Registry<AppError>>,
}
