// storefront/src/web/extractors.rs

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Requester;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
  req
    .headers()
    .get(name)
    .and_then(|h| h.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// Identity headers set by the auth layer in front of this service. No
/// `X-User-Id` means a guest; an unparsable one is rejected.
impl FromRequest for Requester {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let email = header_value(req, USER_EMAIL_HEADER).map(str::to_string);
    let requester = match header_value(req, USER_ID_HEADER) {
      None => Ok(Requester::guest()),
      Some(raw) => match Uuid::parse_str(raw) {
        Ok(user_id) => Ok(Requester::authenticated(user_id, email)),
        Err(_) => {
          warn!("Requester extractor: invalid {} header.", USER_ID_HEADER);
          Err(AppError::Auth(format!("Invalid {} header", USER_ID_HEADER)))
        }
      },
    };
    ready(requester)
  }
}
