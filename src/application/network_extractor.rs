//! Network signal extraction
//!
//! Turns intercepted order API calls into normalized [`OrderSignal`]s. This
//! is the highest-confidence ingestion source: the payload is exactly what
//! the platform sent, no scraping involved. The extractor is stateless;
//! dedup of retried calls happens at the reconciler's ingest.
//!
//! Wire format (platform order API):
//! - POST with a JSON body creates an order. `type` is 1=limit, 2=market,
//!   4=stop; `limitPrice`/`stopPrice` carry the level; `positionSize` is
//!   signed (positive long, negative short) with the magnitude as the
//!   contract count; `symbolId` looks like "F.US.MNQ".
//! - PATCH to `/Order/edit/stopLimit/{id}?limitPrice=..` (or `?stopPrice=..`)
//!   is a price-only edit of the pending order.
//! - DELETE on an order endpoint, or any `/Order/cancel` URL, cancels.
//!
//! Generic field fallbacks cover non-platform order APIs.

use crate::application::signal::{OrderSignal, SignalAction, SignalSource};
use crate::domain::entities::order::{OrderType, Side};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// An order API call captured by the interception layer
#[derive(Debug, Clone)]
pub struct InterceptedCall {
    /// HTTP method, upper- or lowercase
    pub method: String,
    pub url: String,
    /// Parsed JSON request body, when one was present
    pub body: Option<Value>,
}

/// URL fragments that mark a call as order-related when the platform path
/// is absent
const ORDER_URL_PATTERNS: &[&str] = &[
    "/order",
    "/trade",
    "/submit",
    "/position",
    "/execution",
    "placeorder",
    "createorder",
    "modifyorder",
];

/// Whether a URL belongs to an order API
pub fn is_order_endpoint(url: &str) -> bool {
    let lower = url.to_lowercase();
    ORDER_URL_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Extract a normalized signal from an intercepted call.
///
/// Returns None for non-order endpoints and for order calls that carried
/// nothing usable.
pub fn extract(call: &InterceptedCall) -> Option<OrderSignal> {
    if !is_order_endpoint(&call.url) {
        return None;
    }

    match call.method.to_uppercase().as_str() {
        "POST" => extract_create(call),
        "PATCH" => extract_modify(&call.url),
        "DELETE" => Some(OrderSignal {
            order_id: order_id_from_path(&call.url),
            ..OrderSignal::new(SignalAction::Cancel, SignalSource::Network)
        }),
        _ => {
            if call.url.to_lowercase().contains("/order/cancel") {
                Some(OrderSignal {
                    order_id: order_id_from_path(&call.url),
                    ..OrderSignal::new(SignalAction::Cancel, SignalSource::Network)
                })
            } else {
                None
            }
        }
    }
}

fn extract_create(call: &InterceptedCall) -> Option<OrderSignal> {
    let body = call.body.as_ref()?;
    let mut signal = OrderSignal::new(SignalAction::Create, SignalSource::Network);

    if let Some(symbol_id) = body.get("symbolId").and_then(Value::as_str) {
        signal.symbol = Some(strip_symbol_prefix(symbol_id).to_string());
    }

    // type: 1 = limit, 2 = market, 4 = stop
    signal.order_type = match body.get("type").and_then(Value::as_i64) {
        Some(1) => Some(OrderType::Limit),
        Some(2) => Some(OrderType::Market),
        Some(4) => Some(OrderType::Stop),
        _ => None,
    };

    if let Some(price) = body.get("limitPrice").and_then(Value::as_f64) {
        signal.price = Some(price);
        signal.order_type.get_or_insert(OrderType::Limit);
    } else if let Some(price) = body.get("stopPrice").and_then(Value::as_f64) {
        signal.price = Some(price);
        signal.order_type.get_or_insert(OrderType::Stop);
    }

    // positionSize is signed: the sign is the side, the magnitude the
    // contract count
    if let Some(position_size) = body.get("positionSize").and_then(Value::as_i64) {
        if position_size != 0 {
            signal.quantity = Some(position_size.unsigned_abs() as u32);
            signal.side = Some(if position_size > 0 { Side::Long } else { Side::Short });
        }
    }

    if let Some(account_id) = body.get("accountId").and_then(Value::as_i64) {
        signal.account_id = Some(account_id);
    }
    if let Some(order_id) = field_as_string(body, "orderId") {
        signal.order_id = Some(order_id);
    }

    apply_generic_fallbacks(body, &mut signal);

    // a create with neither a symbol nor a price identifies nothing
    if signal.symbol.is_none() && signal.price.is_none() {
        debug!("order POST carried no usable fields: {}", call.url);
        return None;
    }
    Some(signal)
}

/// PATCH `/Order/edit/stopLimit/{id}?limitPrice=..` or `?stopPrice=..`
fn extract_modify(raw_url: &str) -> Option<OrderSignal> {
    let url = Url::parse(raw_url).ok()?;
    if !url.path().contains("/Order/edit/") {
        return None;
    }

    let price = url
        .query_pairs()
        .find(|(key, _)| key == "limitPrice" || key == "stopPrice")
        .and_then(|(_, value)| value.parse::<f64>().ok())?;

    Some(OrderSignal {
        price: Some(price),
        order_id: order_id_from_path(raw_url),
        ..OrderSignal::new(SignalAction::Modify, SignalSource::Network)
    })
}

/// Strip the platform prefix: "F.US.MNQ" -> "MNQ". Unknown shapes pass
/// through unchanged.
fn strip_symbol_prefix(symbol_id: &str) -> &str {
    match symbol_id.rsplit_once('.') {
        Some((prefix, root)) if prefix.starts_with("F.") && !root.is_empty() => root,
        _ => symbol_id,
    }
}

/// Trailing numeric path segment, e.g. ".../stopLimit/2074304743?x=y" -> id
fn order_id_from_path(raw_url: &str) -> Option<String> {
    let path = raw_url.split('?').next().unwrap_or(raw_url);
    let last = path.trim_end_matches('/').rsplit('/').next()?;
    if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) {
        Some(last.to_string())
    } else {
        None
    }
}

/// Field-name fallbacks for order APIs that do not use the platform names
fn apply_generic_fallbacks(body: &Value, signal: &mut OrderSignal) {
    if signal.symbol.is_none() {
        for field in ["symbol", "instrument", "contract", "contractId"] {
            if let Some(value) = field_as_string(body, field) {
                signal.symbol = Some(value);
                break;
            }
        }
    }
    if signal.price.is_none() {
        for field in ["price", "limit", "entryPrice"] {
            if let Some(value) = body.get(field).and_then(Value::as_f64) {
                signal.price = Some(value);
                break;
            }
        }
    }
    if signal.quantity.is_none() {
        for field in ["quantity", "size", "contracts", "qty", "amount"] {
            if let Some(value) = body.get(field).and_then(Value::as_u64) {
                signal.quantity = Some(value as u32);
                break;
            }
        }
    }
    if signal.side.is_none() {
        for field in ["side", "action", "orderSide", "direction"] {
            if let Some(value) = body.get(field).and_then(Value::as_str) {
                signal.side = Some(Side::detect(value));
                break;
            }
        }
    }
}

fn field_as_string(body: &Value, field: &str) -> Option<String> {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(url: &str, body: Value) -> InterceptedCall {
        InterceptedCall {
            method: "POST".to_string(),
            url: url.to_string(),
            body: Some(body),
        }
    }

    #[test]
    fn test_platform_create_limit_long() {
        let call = post(
            "https://userapi.example.com/Order",
            json!({
                "symbolId": "F.US.MNQ",
                "type": 1,
                "limitPrice": 21450.0,
                "positionSize": 10,
                "accountId": 31337
            }),
        );
        let signal = extract(&call).expect("order POST should extract");
        assert_eq!(signal.action, SignalAction::Create);
        assert_eq!(signal.source, SignalSource::Network);
        assert_eq!(signal.symbol.as_deref(), Some("MNQ"));
        assert_eq!(signal.order_type, Some(OrderType::Limit));
        assert_eq!(signal.price, Some(21450.0));
        assert_eq!(signal.quantity, Some(10));
        assert_eq!(signal.side, Some(Side::Long));
        assert_eq!(signal.account_id, Some(31337));
    }

    #[test]
    fn test_negative_position_size_is_short() {
        let call = post(
            "https://userapi.example.com/Order",
            json!({"symbolId": "F.US.ES", "type": 4, "stopPrice": 5850.25, "positionSize": -3}),
        );
        let signal = extract(&call).unwrap();
        assert_eq!(signal.side, Some(Side::Short));
        assert_eq!(signal.quantity, Some(3));
        assert_eq!(signal.order_type, Some(OrderType::Stop));
        assert_eq!(signal.price, Some(5850.25));
    }

    #[test]
    fn test_market_order_type() {
        let call = post(
            "https://userapi.example.com/Order",
            json!({"symbolId": "F.US.MNQ", "type": 2, "positionSize": 1}),
        );
        let signal = extract(&call).unwrap();
        assert_eq!(signal.order_type, Some(OrderType::Market));
        assert_eq!(signal.price, None);
    }

    #[test]
    fn test_patch_limit_price_is_modify() {
        let call = InterceptedCall {
            method: "PATCH".to_string(),
            url: "https://userapi.example.com/Order/edit/stopLimit/2074304743?limitPrice=25697.5"
                .to_string(),
            body: None,
        };
        let signal = extract(&call).unwrap();
        assert_eq!(signal.action, SignalAction::Modify);
        assert_eq!(signal.price, Some(25697.5));
        assert_eq!(signal.order_id.as_deref(), Some("2074304743"));
    }

    #[test]
    fn test_patch_stop_price_is_modify() {
        let call = InterceptedCall {
            method: "PATCH".to_string(),
            url: "https://userapi.example.com/Order/edit/stopLimit/555?stopPrice=5900".to_string(),
            body: None,
        };
        let signal = extract(&call).unwrap();
        assert_eq!(signal.action, SignalAction::Modify);
        assert_eq!(signal.price, Some(5900.0));
        assert_eq!(signal.order_id.as_deref(), Some("555"));
    }

    #[test]
    fn test_delete_is_cancel() {
        let call = InterceptedCall {
            method: "DELETE".to_string(),
            url: "https://userapi.example.com/Order/2074304743".to_string(),
            body: None,
        };
        let signal = extract(&call).unwrap();
        assert_eq!(signal.action, SignalAction::Cancel);
        assert_eq!(signal.order_id.as_deref(), Some("2074304743"));
    }

    #[test]
    fn test_non_order_url_is_ignored() {
        let call = post("https://userapi.example.com/Quotes/latest", json!({"price": 1.0}));
        assert!(extract(&call).is_none());
        assert!(!is_order_endpoint("https://userapi.example.com/Quotes/latest"));
    }

    #[test]
    fn test_generic_field_fallbacks() {
        let call = post(
            "https://broker.example.com/api/placeorder",
            json!({
                "symbol": "NQZ25",
                "price": 20100.25,
                "qty": 2,
                "direction": "sell"
            }),
        );
        let signal = extract(&call).unwrap();
        assert_eq!(signal.symbol.as_deref(), Some("NQZ25"));
        assert_eq!(signal.price, Some(20100.25));
        assert_eq!(signal.quantity, Some(2));
        assert_eq!(signal.side, Some(Side::Short));
    }

    #[test]
    fn test_create_without_symbol_or_price_is_dropped() {
        let call = post("https://userapi.example.com/Order", json!({"note": "hello"}));
        assert!(extract(&call).is_none());
    }

    #[test]
    fn test_symbol_prefix_stripping() {
        assert_eq!(strip_symbol_prefix("F.US.MNQ"), "MNQ");
        assert_eq!(strip_symbol_prefix("F.US.M2K"), "M2K");
        assert_eq!(strip_symbol_prefix("MNQZ25"), "MNQZ25");
    }
}
