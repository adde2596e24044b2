// storefront/src/models/requester.rs

use serde::Serialize;
use uuid::Uuid;

/// Who is checking out, as vouched for by the upstream auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requester {
  pub user_id: Option<Uuid>,
  pub email: Option<String>,
}

impl Requester {
  pub fn guest() -> Self {
    Self::default()
  }

  pub fn authenticated(user_id: Uuid, email: Option<String>) -> Self {
    Self {
      user_id: Some(user_id),
      email,
    }
  }

  pub fn is_authenticated(&self) -> bool {
    self.user_id.is_some()
  }

  /// Email to prefill on the hosted payment page. Guests get none.
  pub fn email_hint(&self) -> Option<&str> {
    if self.is_authenticated() {
      self.email.as_deref()
    } else {
      None
    }
  }
}
