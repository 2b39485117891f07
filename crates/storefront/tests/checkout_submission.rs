//! Integration tests for `CheckoutSubmitter` against a mocked backend.
//!
//! The properties under test: a failed submission leaves the cart exactly
//! as it was and returns the machine to `Idle`; a confirmed submission
//! clears the cart, consumes the coupon, and is terminal.

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_storefront::api::ApiClient;
use bazaar_storefront::cart::cache::MemoryStore;
use bazaar_storefront::cart::CartReconciler;
use bazaar_storefront::checkout::{
    CheckoutOutcome, CheckoutState, CheckoutSubmitter, PaymentMethod, ShippingAddress,
};
use bazaar_storefront::config::StoreConfig;
use bazaar_storefront::error::RecoveryAction;
use bazaar_storefront::pricing::{self, CouponBook};

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ayesha Khan".to_string(),
        email: "ayesha@example.com".to_string(),
        phone: "+923001234567".to_string(),
        street: "House 12, Street 4".to_string(),
        city: "Lahore".to_string(),
        state: "Punjab".to_string(),
        district: "Lahore Cantt".to_string(),
        postal_code: "54000".to_string(),
        country: "Pakistan".to_string(),
    }
}

/// Guest reconciler with one priced line in the cart, plus a submitter
/// sharing the same store policy.
async fn cart_with_one_line(
    server: &MockServer,
) -> (CheckoutSubmitter, CartReconciler<MemoryStore>) {
    let config = StoreConfig::for_base_url(server.uri());
    let api = ApiClient::new(&config).expect("failed to build ApiClient");
    let mut reconciler = CartReconciler::new_guest(api, MemoryStore::new());

    let product = serde_json::from_value(json!({
        "_id": "p-1",
        "name": "Kurta",
        "price": 1000,
        "images": ["front.jpg"]
    }))
    .expect("product parses");
    reconciler.add_item(&product, 2, Some("M".to_string()), None).await;

    (CheckoutSubmitter::new(&config), reconciler)
}

#[tokio::test]
async fn confirmed_order_clears_cart_and_consumes_coupon() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/orders/place"))
        .and(body_partial_json(json!({
            "couponCode": "PAK10",
            "paymentMethod": "cod"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Order placed",
            "order": { "orderId": "ord-991" }
        })))
        .mount(&server)
        .await;

    let (mut submitter, mut reconciler) = cart_with_one_line(&server).await;
    reconciler.apply_coupon("PAK10", &CouponBook::default());

    let config = StoreConfig::for_base_url(server.uri());
    let breakdown = pricing::price(
        &reconciler.cart().items,
        &config.shipping,
        config.tax_rate,
        reconciler.coupon(),
    );
    reconciler.handoff_to_checkout(&breakdown);

    let outcome = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            address(),
            pricing::default_shipping_method(breakdown.subtotal),
            PaymentMethod::Cod,
        )
        .await;

    match outcome {
        CheckoutOutcome::Confirmed(confirmation) => {
            assert_eq!(confirmation.order_id.as_str(), "ord-991");
            assert_eq!(confirmation.totals, breakdown);
            assert_eq!(confirmation.total_display(), "Rs. 2330.00");
        }
        CheckoutOutcome::Failed { message, .. } => panic!("order should confirm: {message}"),
    }

    assert!(reconciler.cart().is_empty());
    assert!(reconciler.coupon().is_none(), "coupon is spent by the order");
    assert!(
        reconciler.take_checkout_handoff().is_none(),
        "handoff is spent by the order"
    );
    assert!(matches!(submitter.state(), CheckoutState::Confirmed(_)));
}

#[tokio::test]
async fn confirmed_state_is_terminal_for_this_checkout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/place"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "order": { "orderId": "ord-1" }
        })))
        .mount(&server)
        .await;

    let (mut submitter, mut reconciler) = cart_with_one_line(&server).await;
    let breakdown = pricing::price(
        &reconciler.cart().items,
        &StoreConfig::for_base_url(server.uri()).shipping,
        Decimal::new(15, 2),
        None,
    );

    let first = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            address(),
            pricing::default_shipping_method(breakdown.subtotal),
            PaymentMethod::Cod,
        )
        .await;
    assert!(matches!(first, CheckoutOutcome::Confirmed(_)));

    let second = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            address(),
            pricing::default_shipping_method(breakdown.subtotal),
            PaymentMethod::Cod,
        )
        .await;
    match second {
        CheckoutOutcome::Failed { message, .. } => {
            assert!(message.contains("already been placed"));
        }
        CheckoutOutcome::Confirmed(_) => panic!("a spent checkout must not confirm again"),
    }
}

#[tokio::test]
async fn server_failure_leaves_cart_untouched_and_returns_to_idle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/place"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "Payment gateway down"})),
        )
        .mount(&server)
        .await;

    let (mut submitter, mut reconciler) = cart_with_one_line(&server).await;
    let breakdown = pricing::price(
        &reconciler.cart().items,
        &StoreConfig::for_base_url(server.uri()).shipping,
        Decimal::new(15, 2),
        None,
    );

    let items_before = reconciler.cart().clone();
    let count_before = reconciler.item_count();
    let subtotal_before = reconciler.subtotal();

    let outcome = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            address(),
            pricing::default_shipping_method(breakdown.subtotal),
            PaymentMethod::Jazzcash,
        )
        .await;

    match outcome {
        CheckoutOutcome::Failed { message, recovery } => {
            assert!(message.contains("Payment gateway down"));
            assert_eq!(recovery, RecoveryAction::Retry);
        }
        CheckoutOutcome::Confirmed(_) => panic!("a 500 must not confirm"),
    }
    assert_eq!(reconciler.cart(), &items_before);
    assert_eq!(reconciler.item_count(), count_before);
    assert_eq!(reconciler.subtotal(), subtotal_before);
    assert_eq!(submitter.state(), &CheckoutState::Idle, "retry stays possible");
}

#[tokio::test]
async fn soft_rejection_in_a_2xx_body_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/place"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Coupon expired"
        })))
        .mount(&server)
        .await;

    let (mut submitter, mut reconciler) = cart_with_one_line(&server).await;
    let breakdown = pricing::price(
        &reconciler.cart().items,
        &StoreConfig::for_base_url(server.uri()).shipping,
        Decimal::new(15, 2),
        None,
    );
    let before = reconciler.cart().clone();

    let outcome = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            address(),
            pricing::default_shipping_method(breakdown.subtotal),
            PaymentMethod::Cod,
        )
        .await;

    match outcome {
        CheckoutOutcome::Failed { message, .. } => assert!(message.contains("Coupon expired")),
        CheckoutOutcome::Confirmed(_) => panic!("success:false must not confirm"),
    }
    assert_eq!(reconciler.cart(), &before);
    assert_eq!(submitter.state(), &CheckoutState::Idle);
}

#[tokio::test]
async fn invalid_address_fails_before_any_request_is_made() {
    // No mocks mounted: a request would 404 and still prove a round-trip
    // happened, so assert on the failure message instead.
    let server = MockServer::start().await;
    let (mut submitter, mut reconciler) = cart_with_one_line(&server).await;
    let breakdown = pricing::price(
        &reconciler.cart().items,
        &StoreConfig::for_base_url(server.uri()).shipping,
        Decimal::new(15, 2),
        None,
    );

    let mut bad = address();
    bad.phone = "+92123".to_string();

    let outcome = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            bad,
            pricing::default_shipping_method(breakdown.subtotal),
            PaymentMethod::Cod,
        )
        .await;

    match outcome {
        CheckoutOutcome::Failed { message, .. } => {
            assert!(message.contains("valid phone number"));
        }
        CheckoutOutcome::Confirmed(_) => panic!("invalid phone must not confirm"),
    }
    assert_eq!(
        server.received_requests().await.map_or(0, |r| r.len()),
        0,
        "validation failures must not reach the network"
    );
    assert!(!reconciler.cart().is_empty());
}

#[tokio::test]
async fn empty_cart_cannot_be_submitted() {
    let server = MockServer::start().await;
    let config = StoreConfig::for_base_url(server.uri());
    let api = ApiClient::new(&config).expect("failed to build ApiClient");
    let mut reconciler = CartReconciler::new_guest(api, MemoryStore::new());
    let mut submitter = CheckoutSubmitter::new(&config);

    let breakdown = pricing::price(&[], &config.shipping, config.tax_rate, None);
    let outcome = submitter
        .submit(
            &mut reconciler,
            &breakdown,
            address(),
            pricing::default_shipping_method(Decimal::ZERO),
            PaymentMethod::Cod,
        )
        .await;

    match outcome {
        CheckoutOutcome::Failed { message, .. } => assert!(message.contains("empty")),
        CheckoutOutcome::Confirmed(_) => panic!("empty cart must not confirm"),
    }
}
