// tests/checkout_tests.rs
mod common;

use std::sync::atomic::Ordering;

use serial_test::serial;
use uuid::Uuid;

use common::{TestApp, GUEST_EMAIL};
use storefront::errors::AppError;
use storefront::models::{CartItem, OrderStatus, Requester};
use storefront::pipelines::create_checkout_session;

#[tokio::test]
#[serial]
async fn valid_cart_creates_one_pending_order_with_server_prices() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);

  let redirect = create_checkout_session(&app.state, vec![CartItem::new(v1, 2)], Requester::guest())
    .await
    .expect("checkout should succeed");

  assert_eq!(app.store.order_count(), 1);
  let order = app.store.order(redirect.order_id);
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.total, 5600);
  assert_eq!(order.user_id, None);
  assert_eq!(order.email, GUEST_EMAIL);

  let items = app.store.items_of(redirect.order_id);
  assert_eq!(items.len(), 1);
  assert_eq!((items[0].variant_id, items[0].quantity, items[0].unit_price), (v1, 2, 2800));
  assert_eq!(items[0].product_name, "Serum");
  assert_eq!(items[0].variant_name, "50 ml");

  assert_eq!(redirect.url, "https://checkout.stripe.test/pay/cs_test_1");
  assert_eq!(order.checkout_session_ref.as_deref(), Some("cs_test_1"));
  // Stock only moves once payment is confirmed.
  assert_eq!(app.store.stock(v1), 10);
}

#[tokio::test]
#[serial]
async fn hosted_session_gets_trusted_lines_and_order_metadata() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);
  let mut tampered = CartItem::new(v1, 2);
  tampered.price = Some(1);
  tampered.product_name = Some("Free stuff".to_string());

  let redirect = create_checkout_session(&app.state, vec![tampered], Requester::guest()).await.unwrap();

  let request = app.gateway.last_request();
  assert_eq!(request.order_id, redirect.order_id);
  assert_eq!(request.currency, "eur");
  assert_eq!(request.line_items.len(), 1);
  assert_eq!(request.line_items[0].name, "Serum - 50 ml");
  assert_eq!(request.line_items[0].unit_amount, 2800);
  assert_eq!(request.line_items[0].quantity, 2);
  assert!(request.line_items[0].image_url.is_some());
  assert_eq!(request.success_url, "https://shop.example/checkout/success?session_id={CHECKOUT_SESSION_ID}");
  assert_eq!(request.cancel_url, "https://shop.example/cart");
  assert_eq!(request.shipping_countries, vec!["DE", "AT"]);
  assert_eq!(request.customer_email, None);
}

#[tokio::test]
#[serial]
async fn authenticated_requester_owns_order_and_gets_email_hint() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Soap", "Lavender", 450, 3);
  let user_id = Uuid::new_v4();
  let requester = Requester::authenticated(user_id, Some("ada@example.com".to_string()));

  let redirect = create_checkout_session(&app.state, vec![CartItem::new(v1, 1)], requester).await.unwrap();

  let order = app.store.order(redirect.order_id);
  assert_eq!(order.user_id, Some(user_id));
  assert_eq!(order.email, "ada@example.com");
  assert_eq!(app.gateway.last_request().customer_email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
#[serial]
async fn unresolvable_variant_writes_nothing() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);
  let retired = app.store.add_variant("Serum", "100 ml", 4800, 10);
  app.store.deactivate(retired);

  for items in [
    vec![CartItem::new(v1, 1), CartItem::new(Uuid::new_v4(), 1)],
    vec![CartItem::new(v1, 1), CartItem::new(retired, 1)],
  ] {
    let err = create_checkout_session(&app.state, items, Requester::guest()).await.unwrap_err();
    assert!(matches!(err, AppError::ProductUnavailable(_)), "got {:?}", err);
  }

  assert_eq!(app.store.order_count(), 0);
  assert_eq!(app.store.item_count(), 0);
  assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
#[serial]
async fn repeated_variant_lines_are_kept_and_summed() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Candle", "Small", 900, 10);

  let redirect = create_checkout_session(
    &app.state,
    vec![CartItem::new(v1, 1), CartItem::new(v1, 2)],
    Requester::guest(),
  )
  .await
  .unwrap();

  assert_eq!(app.store.order(redirect.order_id).total, 2700);
  assert_eq!(app.store.items_of(redirect.order_id).len(), 2);
}

#[tokio::test]
#[serial]
async fn empty_cart_or_bad_quantity_is_a_validation_error() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Candle", "Small", 900, 10);

  let err = create_checkout_session(&app.state, vec![], Requester::guest()).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let err = create_checkout_session(&app.state, vec![CartItem::new(v1, -1)], Requester::guest())
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
  assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
#[serial]
async fn missing_processor_key_fails_before_any_write() {
  let app = TestApp::with_credentials(false, Some(common::WEBHOOK_SECRET));
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);

  let err = create_checkout_session(&app.state, vec![CartItem::new(v1, 1)], Requester::guest())
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::Config(_)));
  assert_eq!(app.store.order_count(), 0);
  assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
#[serial]
async fn ledger_failure_aborts_before_contacting_processor() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);
  app.store.fail_order_inserts.store(true, Ordering::SeqCst);

  let err = create_checkout_session(&app.state, vec![CartItem::new(v1, 1)], Requester::guest())
    .await
    .unwrap_err();

  assert!(err.is_persistence());
  assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
#[serial]
async fn processor_failure_leaves_pending_order_behind() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);
  app.gateway.fail.store(true, Ordering::SeqCst);

  let err = create_checkout_session(&app.state, vec![CartItem::new(v1, 1)], Requester::guest())
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::Upstream(_)));
  assert_eq!(app.store.order_count(), 1);
  assert_eq!(app.gateway.calls(), 1);
}

#[tokio::test]
#[serial]
async fn failing_to_store_session_reference_still_redirects() {
  let app = TestApp::new();
  let v1 = app.store.add_variant("Serum", "50 ml", 2800, 10);
  app.store.fail_session_attach.store(true, Ordering::SeqCst);

  let redirect = create_checkout_session(&app.state, vec![CartItem::new(v1, 1)], Requester::guest())
    .await
    .expect("session reference failure is not fatal");

  assert!(redirect.url.starts_with("https://checkout.stripe.test/pay/"));
  assert_eq!(app.store.order(redirect.order_id).checkout_session_ref, None);
}
