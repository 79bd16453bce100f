//! Maya Checkout API client.
//!
//! Creates hosted checkout sessions for orders paid through Maya. Accounts
//! whose Checkout API is not enabled yet answer `K004`; for those a static
//! payment link with the order details in the query string is used instead,
//! when one is configured.

use std::fmt::Write as _;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::config::MayaConfig;
use crate::models::Order;

/// Checkout API path under the configured base.
const CHECKOUT_PATH: &str = "/checkout/v1/checkouts";

/// Error code Maya returns when the merchant's Checkout API is not provisioned.
const ENDPOINT_UNAVAILABLE_CODE: &str = "K004";

/// Payment link descriptions are cut to this many characters.
const MAX_LINK_DESCRIPTION: usize = 500;

/// Errors that can occur when talking to Maya.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Maya keys are missing, or the client could not be built from them.
    #[error("Maya is not configured: {0}")]
    NotConfigured(String),
}

impl PaymentError {
    /// Whether the Checkout API is unavailable for this merchant account.
    #[must_use]
    pub fn is_endpoint_unavailable(&self) -> bool {
        match self {
            Self::Api { code, message, .. } => {
                code.as_deref() == Some(ENDPOINT_UNAVAILABLE_CODE)
                    || message.contains(ENDPOINT_UNAVAILABLE_CODE)
                    || message.contains("Invalid endpoint")
            }
            _ => false,
        }
    }
}

/// Where to send the shopper to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    /// Maya's checkout id; `None` for payment link sessions.
    pub checkout_id: Option<String>,
    pub redirect_url: String,
    /// True when the payment link fallback was used.
    pub fallback: bool,
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest {
    total_amount: Amount,
    buyer: Buyer,
    items: Vec<Item>,
    redirect_url: RedirectUrls,
    request_reference_number: String,
    metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Amount {
    #[serde(with = "rust_decimal::serde::float")]
    value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<AmountDetails>,
}

#[derive(Debug, Serialize)]
struct AmountDetails {
    #[serde(with = "rust_decimal::serde::float")]
    subtotal: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Buyer {
    first_name: String,
    last_name: String,
    contact: Contact,
    shipping_address: ShippingAddress,
}

#[derive(Debug, Serialize)]
struct Contact {
    phone: String,
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShippingAddress {
    line1: String,
    city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    zip_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    name: String,
    quantity: u32,
    code: String,
    description: String,
    amount: Amount,
    total_amount: Amount,
}

#[derive(Debug, Serialize)]
struct RedirectUrls {
    success: String,
    failure: String,
    cancel: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    checkout_id: String,
    redirect_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

// =============================================================================
// MayaClient
// =============================================================================

/// Maya Checkout API client.
#[derive(Clone)]
pub struct MayaClient {
    client: reqwest::Client,
    checkout_url: String,
    payment_link: Option<String>,
    /// Storefront base URL for the redirect pages.
    site_url: String,
}

impl MayaClient {
    /// Create a client authenticated with the secret key.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` if the key cannot be used in a
    /// header, or `PaymentError::Http` if the HTTP client fails to build.
    pub fn new(config: &MayaConfig, site_url: &str) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        // Basic auth with the secret key as user and an empty password
        let credentials = STANDARD.encode(format!("{}:", config.secret_key()));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {credentials}"))
                .map_err(|e| PaymentError::NotConfigured(format!("invalid secret key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            checkout_url: format!("{}{CHECKOUT_PATH}", config.api_base.trim_end_matches('/')),
            payment_link: config.payment_link.clone(),
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    /// Start payment for an order.
    ///
    /// Falls back to the payment link when the Checkout API reports it is
    /// unavailable and a link is configured.
    ///
    /// # Errors
    ///
    /// Returns the Checkout API error if there is no fallback for it.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn start_payment(&self, order: &Order) -> Result<CheckoutSession, PaymentError> {
        match self.create_checkout(order).await {
            Ok(session) => Ok(session),
            Err(err) if err.is_endpoint_unavailable() => {
                let Some(link) = self.payment_link_for(order) else {
                    return Err(err);
                };
                warn!(error = %err, "Maya Checkout API unavailable, using payment link");
                Ok(CheckoutSession {
                    checkout_id: None,
                    redirect_url: link,
                    fallback: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Create a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Maya rejects it.
    pub async fn create_checkout(&self, order: &Order) -> Result<CheckoutSession, PaymentError> {
        let payload = self.checkout_request(order);

        let response = self
            .client
            .post(&self.checkout_url)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = body
                .error
                .or(body.message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            tracing::error!(
                status = %status,
                code = ?body.code,
                message = %message,
                "Maya API returned non-success status"
            );
            return Err(PaymentError::Api {
                status: status.as_u16(),
                code: body.code,
                message,
            });
        }

        let created: CheckoutResponse = response.json().await?;
        Ok(CheckoutSession {
            checkout_id: Some(created.checkout_id),
            redirect_url: created.redirect_url,
            fallback: false,
        })
    }

    fn checkout_request(&self, order: &Order) -> CheckoutRequest {
        let (first_name, last_name) = split_name(&order.customer.name);
        let id = order.id;
        let site = &self.site_url;

        CheckoutRequest {
            total_amount: Amount {
                value: order.total,
                currency: Some("PHP"),
                details: None,
            },
            buyer: Buyer {
                first_name,
                last_name,
                contact: Contact {
                    phone: order.customer.phone.clone().unwrap_or_default(),
                    email: order.customer.email.clone(),
                },
                shipping_address: ShippingAddress {
                    line1: order.shipping_address.address.clone(),
                    city: order.shipping_address.city.clone(),
                    zip_code: order.shipping_address.postal_code.clone(),
                },
            },
            items: order
                .items
                .iter()
                .map(|item| Item {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    code: item.product_id.to_string(),
                    description: item.name.clone(),
                    amount: Amount {
                        value: item.unit_price,
                        currency: None,
                        details: Some(AmountDetails {
                            subtotal: item.line_total,
                        }),
                    },
                    total_amount: Amount {
                        value: item.line_total,
                        currency: None,
                        details: Some(AmountDetails {
                            subtotal: item.line_total,
                        }),
                    },
                })
                .collect(),
            redirect_url: RedirectUrls {
                success: format!("{site}/order-success?order_id={id}&payment_method=maya"),
                failure: format!("{site}/order-confirmation/{id}?status=failed"),
                cancel: format!("{site}/checkout?status=cancelled"),
            },
            request_reference_number: id.to_string(),
            metadata: serde_json::json!({
                "orderId": id,
                "customerEmail": order.customer.email,
            }),
        }
    }

    /// Payment link carrying the order amount and a readable description.
    fn payment_link_for(&self, order: &Order) -> Option<String> {
        let base = self.payment_link.as_deref()?;
        let mut url = match url::Url::parse(base) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "MAYA_PAYMENT_LINK is not a valid URL");
                return None;
            }
        };

        url.query_pairs_mut()
            .append_pair("amount", &format!("{:.2}", order.total))
            .append_pair("reference", &order.id.to_string())
            .append_pair("description", &link_description(order))
            .append_pair("customer_name", &order.customer.name)
            .append_pair("customer_email", &order.customer.email);

        Some(url.into())
    }
}

fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

fn link_description(order: &Order) -> String {
    let short_id: String = order.id.to_string().chars().take(8).collect();
    let items = order
        .items
        .iter()
        .map(|item| format!("{} (x{}) - ₱{:.2}", item.name, item.quantity, item.line_total))
        .collect::<Vec<_>>()
        .join(", ");

    let mut description = format!("Order {short_id} | Items: {items}");
    let _ = write!(description, " | Total: ₱{:.2}", order.total);
    description.chars().take(MAX_LINK_DESCRIPTION).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;
    use stride_core::pricing::OrderTotals;
    use stride_core::{OrderId, PaymentMethod, ProductId};
    use uuid::Uuid;

    use super::*;
    use crate::models::{Customer, NewOrder, OrderItem, ShippingAddress as Address};

    fn config(payment_link: Option<&str>) -> MayaConfig {
        MayaConfig {
            api_base: "https://pg-sandbox.paymaya.com/".to_string(),
            public_key: "pk-test".to_string(),
            secret_key: SecretString::from("sk-Z0OSzLvIcOI2UIvDhdTGVVfRSSeiGStnceqwUE7n0Ah"),
            payment_link: payment_link.map(str::to_string),
        }
    }

    fn order() -> Order {
        NewOrder {
            id: OrderId::generate(),
            reference: Uuid::new_v4(),
            customer: Customer {
                name: "Maria Clara de los Santos".to_string(),
                email: "maria@example.ph".to_string(),
                phone: Some("09171234567".to_string()),
            },
            shipping_address: Address {
                address: "45 Rizal Ave".to_string(),
                city: "Makati".to_string(),
                postal_code: None,
            },
            items: vec![OrderItem {
                product_id: ProductId::generate(),
                name: "Court Classic".to_string(),
                size: None,
                color: None,
                quantity: 2,
                unit_price: Decimal::from(360),
                line_total: Decimal::from(720),
            }],
            totals: OrderTotals {
                subtotal: Decimal::from(720),
                discount: Decimal::ZERO,
                shipping: Decimal::from(200),
                total: Decimal::from(920),
            },
            promo_code: None,
            payment_method: PaymentMethod::Maya,
        }
        .into_order(Utc::now())
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Maria Clara de los Santos"),
            ("Maria".to_string(), "Clara de los Santos".to_string())
        );
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_checkout_payload_shape() {
        let client = MayaClient::new(&config(None), "https://shop.example.ph/").unwrap();
        let order = order();
        let payload = serde_json::to_value(client.checkout_request(&order)).unwrap();

        assert_eq!(payload["totalAmount"]["value"], serde_json::json!(920.0));
        assert_eq!(payload["totalAmount"]["currency"], "PHP");
        assert_eq!(payload["buyer"]["firstName"], "Maria");
        assert_eq!(payload["items"][0]["totalAmount"]["value"], serde_json::json!(720.0));
        assert_eq!(payload["requestReferenceNumber"], order.id.to_string());
        assert_eq!(
            payload["redirectUrl"]["success"],
            format!(
                "https://shop.example.ph/order-success?order_id={}&payment_method=maya",
                order.id
            )
        );
        assert_eq!(
            payload["redirectUrl"]["cancel"],
            "https://shop.example.ph/checkout?status=cancelled"
        );
        assert_eq!(client.checkout_url, "https://pg-sandbox.paymaya.com/checkout/v1/checkouts");
    }

    #[test]
    fn test_payment_link_carries_order_details() {
        let client =
            MayaClient::new(&config(Some("https://paymaya.me/stride")), "https://shop.example.ph")
                .unwrap();
        let order = order();
        let link = url::Url::parse(&client.payment_link_for(&order).unwrap()).unwrap();
        let pairs: std::collections::HashMap<_, _> = link.query_pairs().into_owned().collect();

        assert_eq!(pairs["amount"], "920.00");
        assert_eq!(pairs["reference"], order.id.to_string());
        assert_eq!(pairs["customer_email"], "maria@example.ph");
        assert!(pairs["description"].contains("Court Classic (x2) - ₱720.00"));
        assert!(pairs["description"].ends_with("Total: ₱920.00"));
    }

    #[test]
    fn test_link_description_is_truncated() {
        let mut order = order();
        let item = order.items[0].clone();
        order.items = vec![item; 40];
        assert_eq!(link_description(&order).chars().count(), MAX_LINK_DESCRIPTION);
    }

    #[test]
    fn test_endpoint_unavailable_detection() {
        let by_code = PaymentError::Api {
            status: 401,
            code: Some("K004".to_string()),
            message: "Unauthorized".to_string(),
        };
        let by_message = PaymentError::Api {
            status: 404,
            code: None,
            message: "Invalid endpoint".to_string(),
        };
        let other = PaymentError::Api {
            status: 400,
            code: Some("2553".to_string()),
            message: "Missing/invalid parameters".to_string(),
        };
        assert!(by_code.is_endpoint_unavailable());
        assert!(by_message.is_endpoint_unavailable());
        assert!(!other.is_endpoint_unavailable());
        assert!(!PaymentError::NotConfigured("keys".to_string()).is_endpoint_unavailable());
    }
}
