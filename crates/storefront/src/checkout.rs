//! Checkout: order assembly, address validation, and submission.
//!
//! The submitter is a small state machine:
//! `Idle -> Submitting -> { Confirmed | back to Idle on failure }`.
//! Failure leaves the cart untouched so the user can retry; `Confirmed` is
//! terminal for that cart instance - a fresh checkout needs a non-empty
//! cart again. Success clears the reconciler (local and remote) and
//! consumes the held coupon.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{instrument, warn};

use bazaar_core::{CurrencyCode, OrderId, Price, PricingBreakdown, ProductId, UserId};

use crate::cart::CartReconciler;
use crate::cart::cache::KeyValueStore;
use crate::config::StoreConfig;
use crate::error::RecoveryAction;
use crate::pricing::ShippingMethod;

/// Shipping destination collected at checkout.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    /// Full phone number including the country prefix (e.g. +923001234567).
    pub phone: String,
    pub street: String,
    pub city: String,
    /// Province.
    pub state: String,
    /// District/Tehsil.
    pub district: String,
    pub postal_code: String,
    pub country: String,
}

/// Payment options offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cod,
    CreditCard,
    Jazzcash,
    Easypaisa,
    Paypal,
}

impl PaymentMethod {
    /// Display name shown in the payment selector.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cod => "Cash on Delivery",
            Self::CreditCard => "Credit/Debit Card",
            Self::Jazzcash => "JazzCash",
            Self::Easypaisa => "EasyPaisa",
            Self::Paypal => "PayPal",
        }
    }
}

/// One resolved line of the order payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    /// The backend expects empty strings, not nulls, for unset variants.
    pub size: String,
    pub color: String,
    pub image: String,
}

/// The assembled order submission payload for `POST /api/orders/place`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// What the server confirmed, echoed with the totals it was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    /// Server-assigned order identifier.
    pub order_id: OrderId,
    /// The priced totals the order was placed with.
    pub totals: PricingBreakdown,
    /// Currency the order was placed in.
    pub currency: CurrencyCode,
}

impl OrderConfirmation {
    /// The grand total formatted for the confirmation page.
    #[must_use]
    pub fn total_display(&self) -> String {
        Price::new(self.totals.total, self.currency).display()
    }
}

/// Where a checkout attempt stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    /// Ready to submit.
    #[default]
    Idle,
    /// A submission round-trip is outstanding.
    Submitting,
    /// Terminal: the order was placed and the cart instance is spent.
    Confirmed(OrderConfirmation),
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Order placed; the cart has been cleared.
    Confirmed(OrderConfirmation),
    /// Submission did not go through; the cart is untouched.
    Failed {
        message: String,
        recovery: RecoveryAction,
    },
}

/// Assembles and submits orders from reconciled cart state.
pub struct CheckoutSubmitter {
    phone_prefix: String,
    phone_digits: usize,
    currency: CurrencyCode,
    state: CheckoutState,
}

impl CheckoutSubmitter {
    /// Build a submitter with the store's validation policy.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            phone_prefix: config.phone_prefix.clone(),
            phone_digits: config.phone_digits,
            currency: config.currency,
            state: CheckoutState::Idle,
        }
    }

    /// Current state of the checkout machine.
    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Validate the shipping address against the store policy.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message naming the first field that fails.
    pub fn validate_address(&self, address: &ShippingAddress) -> Result<(), String> {
        let required = [
            (address.full_name.trim(), "full name"),
            (address.email.trim(), "email"),
            (address.phone.trim(), "phone"),
            (address.street.trim(), "street"),
            (address.city.trim(), "city"),
            (address.state.trim(), "province"),
            (address.district.trim(), "district"),
        ];
        for (value, label) in required {
            if value.is_empty() {
                return Err(format!("Please fill in {label}"));
            }
        }

        if !is_plausible_email(address.email.trim()) {
            return Err("Please enter a valid email address".to_string());
        }

        let phone: String = address.phone.chars().filter(|c| !c.is_whitespace()).collect();
        let national = phone.strip_prefix(&self.phone_prefix).ok_or_else(|| {
            format!(
                "Please enter a valid phone number ({} followed by {} digits)",
                self.phone_prefix, self.phone_digits
            )
        })?;
        if national.len() != self.phone_digits || !national.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "Please enter a valid phone number ({} followed by {} digits)",
                self.phone_prefix, self.phone_digits
            ));
        }

        Ok(())
    }

    /// Assemble the order payload from reconciled cart state and priced
    /// totals.
    #[must_use]
    pub fn assemble_order<S: KeyValueStore>(
        &self,
        reconciler: &CartReconciler<S>,
        breakdown: &PricingBreakdown,
        address: ShippingAddress,
        shipping_method: ShippingMethod,
        payment_method: PaymentMethod,
    ) -> OrderRequest {
        OrderRequest {
            user_id: reconciler.session().user().map(|user| user.id.clone()),
            address,
            payment_method,
            shipping_method,
            coupon_code: reconciler.coupon().map(|coupon| coupon.code.clone()),
            items: reconciler
                .cart()
                .items
                .iter()
                .map(|item| OrderLine {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    price: item.unit_price,
                    quantity: item.quantity,
                    size: item.size.clone().unwrap_or_default(),
                    color: item.color.clone().unwrap_or_default(),
                    image: item.image.clone().unwrap_or_default(),
                })
                .collect(),
            subtotal: breakdown.subtotal,
            shipping: breakdown.shipping_cost,
            tax: breakdown.tax_amount,
            discount: breakdown.discount_amount,
            total: breakdown.total,
            currency: self.currency.code().to_string(),
        }
    }

    /// Validate, assemble, and submit the order.
    ///
    /// On failure (validation, network, or server rejection) the cart is
    /// left byte-for-byte untouched and the machine returns to `Idle`. On
    /// success the reconciler is cleared, the coupon consumed, and the
    /// machine moves to the terminal `Confirmed` state.
    #[instrument(skip_all)]
    pub async fn submit<S: KeyValueStore>(
        &mut self,
        reconciler: &mut CartReconciler<S>,
        breakdown: &PricingBreakdown,
        address: ShippingAddress,
        shipping_method: ShippingMethod,
        payment_method: PaymentMethod,
    ) -> CheckoutOutcome {
        if matches!(self.state, CheckoutState::Confirmed(_)) {
            return CheckoutOutcome::Failed {
                message: "This order has already been placed".to_string(),
                recovery: RecoveryAction::Retry,
            };
        }

        if let Err(message) = self.validate_address(&address) {
            return CheckoutOutcome::Failed {
                message,
                recovery: RecoveryAction::Retry,
            };
        }

        if reconciler.cart().is_empty() {
            return CheckoutOutcome::Failed {
                message: "Your cart is empty".to_string(),
                recovery: RecoveryAction::Retry,
            };
        }

        let order = self.assemble_order(
            reconciler,
            breakdown,
            address,
            shipping_method,
            payment_method,
        );

        self.state = CheckoutState::Submitting;
        let placed = match reconciler.api().place_order(&order).await {
            Ok(placed) => placed,
            Err(e) => {
                warn!("Order submission failed: {e}");
                self.state = CheckoutState::Idle;
                let recovery = if e.is_auth() {
                    RecoveryAction::Reauthenticate
                } else {
                    RecoveryAction::Retry
                };
                return CheckoutOutcome::Failed {
                    message: format!("Failed to place order: {e}"),
                    recovery,
                };
            }
        };

        // The order exists server-side now; the cart must empty even if the
        // remote clear cannot be reached.
        let cleared = reconciler.clear().await;
        if !cleared.success {
            warn!("Cart clear after order failed: {}", cleared.message);
            reconciler.adopt_cleared();
            reconciler.invalidate_coupon();
        }

        let confirmation = OrderConfirmation {
            order_id: placed.order_id,
            totals: *breakdown,
            currency: self.currency,
        };
        self.state = CheckoutState::Confirmed(confirmation.clone());
        CheckoutOutcome::Confirmed(confirmation)
    }
}

fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitter() -> CheckoutSubmitter {
        CheckoutSubmitter::new(&StoreConfig::for_base_url("http://localhost:0"))
    }

    fn valid_address() -> ShippingAddress {
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

    #[test]
    fn valid_address_passes() {
        assert_eq!(submitter().validate_address(&valid_address()), Ok(()));
    }

    #[test]
    fn missing_required_field_is_named() {
        let mut address = valid_address();
        address.district = "  ".to_string();
        let err = submitter()
            .validate_address(&address)
            .expect_err("blank district must fail");
        assert!(err.contains("district"));
    }

    #[test]
    fn phone_must_match_prefix_and_digit_count() {
        let submitter = submitter();

        for bad in ["+92300123456", "+9230012345678", "+913001234567", "+92300123456a"] {
            let mut address = valid_address();
            address.phone = bad.to_string();
            assert!(
                submitter.validate_address(&address).is_err(),
                "{bad} should be rejected"
            );
        }

        // Whitespace in the number is tolerated.
        let mut address = valid_address();
        address.phone = "+92 300 1234567".to_string();
        assert_eq!(submitter.validate_address(&address), Ok(()));
    }

    #[test]
    fn email_shape_is_checked() {
        let submitter = submitter();
        for bad in ["not-an-email", "a@b", "a b@c.com", "@x.com"] {
            let mut address = valid_address();
            address.email = bad.to_string();
            assert!(
                submitter.validate_address(&address).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn order_payload_serializes_in_backend_shape() {
        let order = OrderRequest {
            user_id: Some(UserId::new("u-1")),
            address: valid_address(),
            payment_method: PaymentMethod::Cod,
            shipping_method: crate::pricing::default_shipping_method(Decimal::new(2000, 0)),
            coupon_code: Some("PAK10".to_string()),
            items: vec![OrderLine {
                product_id: ProductId::new("p-1"),
                name: "Kurta".to_string(),
                price: Decimal::new(1000, 0),
                quantity: 2,
                size: "M".to_string(),
                color: String::new(),
                image: String::new(),
            }],
            subtotal: Decimal::new(2000, 0),
            shipping: Decimal::new(200, 0),
            tax: Decimal::new(330, 0),
            discount: Decimal::new(200, 0),
            total: Decimal::new(2330, 0),
            currency: "PKR".to_string(),
        };

        let value = serde_json::to_value(&order).expect("serializes");
        assert_eq!(value["paymentMethod"], "cod");
        assert_eq!(value["couponCode"], "PAK10");
        assert_eq!(value["items"][0]["productId"], "p-1");
        assert_eq!(value["address"]["fullName"], "Ayesha Khan");
        assert_eq!(value["currency"], "PKR");
    }

    #[test]
    fn payment_method_display_names() {
        assert_eq!(PaymentMethod::Cod.display_name(), "Cash on Delivery");
        assert_eq!(PaymentMethod::Easypaisa.display_name(), "EasyPaisa");
    }
}
