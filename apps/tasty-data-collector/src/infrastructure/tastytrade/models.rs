//! tastytrade REST API Types
//!
//! Request and response bodies. Field names on the wire are kebab-case.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Envelopes
// ============================================================================

/// Success envelope wrapping every response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Payload.
    pub data: T,
}

/// Paging wrapper used by list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Items<T> {
    /// Result page.
    pub items: Vec<T>,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    /// Error body.
    pub error: ApiErrorBody,
}

/// Top-level error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,

    /// Human-readable description.
    pub message: String,

    /// Nested per-field errors.
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// Nested error detail, shaped either `{code, message}` or
/// `{domain, reason}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub message: Option<String>,

    /// Field or domain the error relates to.
    #[serde(default)]
    pub domain: Option<String>,

    /// Reason the domain was rejected.
    #[serde(default)]
    pub reason: Option<String>,
}

// ============================================================================
// Sessions
// ============================================================================

/// Login request body for `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginRequest<'a> {
    /// Username or email.
    pub login: &'a str,

    /// Ask for a remember-token in the response.
    pub remember_me: bool,

    /// Account password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,

    /// Single-use token from a previous remembered login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_token: Option<&'a str>,
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionData {
    /// Token presented in the `Authorization` header of later calls.
    pub session_token: String,

    /// Single-use token for the next password-less login.
    #[serde(default)]
    pub remember_token: Option<String>,

    /// Basic user record.
    pub user: User,
}

/// Basic user record returned by session endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct User {
    /// Account email address.
    pub email: String,

    /// Account username.
    #[serde(default)]
    pub username: Option<String>,

    /// Opaque external identifier.
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Customer record from `GET /customers/me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Customer {
    /// Customer identifier.
    pub id: String,

    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,

    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Quote streamer access from `GET /quote-streamer-tokens`.
///
/// `token` and `dxlink_url` are the inputs to the DXLink client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StreamerTokens {
    /// Bearer token for the streaming gateways.
    pub token: String,

    /// DXLink websocket URL.
    pub dxlink_url: String,

    /// Legacy cometd websocket URL.
    pub websocket_url: String,
}

// ============================================================================
// Instruments
// ============================================================================

/// Futures contract metadata subset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Future {
    /// Contract symbol, e.g. `/CLK4`.
    pub symbol: String,

    /// Product code, e.g. `CL`.
    #[serde(default)]
    pub product_code: Option<String>,

    /// dxfeed streamer symbol, e.g. `/CLK24:XNYM`.
    #[serde(default)]
    pub streamer_symbol: Option<String>,

    /// Listing exchange.
    #[serde(default)]
    pub exchange: Option<String>,

    /// Contract expiration date.
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,

    /// Exact expiry instant.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Minimum price increment.
    #[serde(default)]
    pub tick_size: Option<Decimal>,

    /// Contract notional multiplier.
    #[serde(default)]
    pub notional_multiplier: Option<Decimal>,

    /// Whether the contract currently trades.
    #[serde(default)]
    pub active: bool,
}

/// Cryptocurrency metadata subset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cryptocurrency {
    /// Pair symbol, e.g. `BTC/USD`.
    pub symbol: String,

    /// dxfeed streamer symbol, e.g. `BTC/USD:CXTALP`.
    #[serde(default)]
    pub streamer_symbol: Option<String>,

    /// Instrument type tag.
    #[serde(default)]
    pub instrument_type: Option<String>,

    /// Minimum price increment.
    #[serde(default)]
    pub tick_size: Option<Decimal>,

    /// Whether the instrument currently trades.
    #[serde(default)]
    pub active: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_login_request_with_password() {
        let body = LoginRequest {
            login: "trader1",
            remember_me: true,
            password: Some("pw"),
            remember_token: None,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"login": "trader1", "remember-me": true, "password": "pw"})
        );
    }

    #[test]
    fn test_serialize_login_request_with_remember_token() {
        let body = LoginRequest {
            login: "trader1",
            remember_me: true,
            password: None,
            remember_token: Some("rt"),
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"login": "trader1", "remember-me": true, "remember-token": "rt"})
        );
    }

    #[test]
    fn test_deserialize_session_envelope() {
        let json = r#"{
            "data": {
                "session-token": "st-abc",
                "remember-token": "rt-def",
                "user": {"email": "trader@example.com", "username": "trader1", "external-id": "U999"}
            },
            "context": "/sessions"
        }"#;
        let envelope: Envelope<SessionData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.session_token, "st-abc");
        assert_eq!(envelope.data.remember_token.as_deref(), Some("rt-def"));
        assert_eq!(envelope.data.user.username.as_deref(), Some("trader1"));
    }

    #[test]
    fn test_deserialize_streamer_tokens() {
        let json = r#"{
            "data": {
                "token": "bearer-xyz",
                "dxlink-url": "wss://tasty-openapi-ws.dxfeed.com/realtime",
                "websocket-url": "https://tasty-live-ws.dxfeed.com/realtime"
            }
        }"#;
        let envelope: Envelope<StreamerTokens> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.token, "bearer-xyz");
        assert!(envelope.data.dxlink_url.starts_with("wss://"));
    }

    #[test]
    fn test_deserialize_future_with_string_decimals() {
        let json = r#"{
            "symbol": "/CLK4",
            "product-code": "CL",
            "streamer-symbol": "/CLK24:XNYM",
            "exchange": "CME",
            "expiration-date": "2024-04-22",
            "tick-size": "0.01",
            "notional-multiplier": "1000.0",
            "active": true
        }"#;
        let future: Future = serde_json::from_str(json).unwrap();
        assert_eq!(future.product_code.as_deref(), Some("CL"));
        assert_eq!(future.streamer_symbol.as_deref(), Some("/CLK24:XNYM"));
        assert_eq!(future.tick_size, Some(Decimal::new(1, 2)));
        assert_eq!(
            future.expiration_date,
            NaiveDate::from_ymd_opt(2024, 4, 22)
        );
        assert!(future.active);
    }

    #[test]
    fn test_deserialize_items_wrapper() {
        let json = r#"{
            "data": {"items": [
                {"symbol": "BTC/USD", "streamer-symbol": "BTC/USD:CXTALP", "active": true}
            ]}
        }"#;
        let envelope: Envelope<Items<Cryptocurrency>> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.items.len(), 1);
        assert_eq!(
            envelope.data.items[0].streamer_symbol.as_deref(),
            Some("BTC/USD:CXTALP")
        );
    }

    #[test]
    fn test_deserialize_error_envelope_detail_shapes() {
        let json = r#"{
            "error": {
                "code": "invalid_credentials",
                "message": "Invalid login or password",
                "errors": [
                    {"code": "not_permitted", "message": "locked out"},
                    {"domain": "login", "reason": "is required"}
                ]
            }
        }"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("invalid_credentials"));
        assert_eq!(envelope.error.errors.len(), 2);
        assert_eq!(envelope.error.errors[0].code.as_deref(), Some("not_permitted"));
        assert_eq!(envelope.error.errors[1].domain.as_deref(), Some("login"));
    }
}
