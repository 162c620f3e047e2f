//! tastytrade REST Session
//!
//! Login, session upkeep, and the quote-streamer-token fetch that yields
//! the DXLink websocket URL and bearer token. Calls are plain sequential
//! async; there is no retry layer.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::models::{Customer, Envelope, ErrorEnvelope, LoginRequest, SessionData, StreamerTokens, User};
use crate::infrastructure::config::Credentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Error Type
// ============================================================================

/// Errors from the tastytrade REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error envelope.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code from the API.
        code: String,
        /// Error message, with nested details appended line by line.
        message: String,
    },

    /// Non-2xx response without a decodable error envelope.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },

    /// Response body could not be decoded.
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Credentials carry neither a password nor a remember-token.
    #[error("credentials provide neither password nor remember-token")]
    NoSecret,

    /// Session token cannot be used as an `Authorization` header value.
    #[error("session token is not a valid header value")]
    InvalidSessionToken,
}

// ============================================================================
// REST Session
// ============================================================================

/// Authenticated REST session.
///
/// Construction logs in; the session token is installed as the default
/// `Authorization` header for every subsequent call.
pub struct RestSession {
    client: Client,
    base_url: String,
    remember_token: Option<String>,
    user: User,
}

impl RestSession {
    /// Log in with `POST /sessions`.
    ///
    /// # Errors
    ///
    /// Returns an error when the credentials carry no secret, the request
    /// fails, or the server rejects the login.
    pub async fn login(
        base_url: impl Into<String>,
        credentials: &Credentials,
    ) -> Result<Self, ApiError> {
        Self::login_with_otp(base_url, credentials, None).await
    }

    /// Log in, presenting a one-time passcode for accounts with two-factor
    /// authentication enabled.
    ///
    /// # Errors
    ///
    /// See [`Self::login`].
    pub async fn login_with_otp(
        base_url: impl Into<String>,
        credentials: &Credentials,
        otp: Option<&str>,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let body = LoginRequest {
            login: credentials.login(),
            remember_me: true,
            password: credentials.password(),
            remember_token: credentials.remember_token(),
        };
        if body.password.is_none() && body.remember_token.is_none() {
            return Err(ApiError::NoSecret);
        }

        tracing::info!(login = %credentials.login(), "logging in to tastytrade");
        let login_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let mut request = login_client.post(format!("{base_url}/sessions")).json(&body);
        if let Some(otp) = otp {
            request = request.header("X-Tastyworks-OTP", otp);
        }
        let data: SessionData = decode_data(request.send().await?).await?;

        let mut auth_value = HeaderValue::from_str(&data.session_token)
            .map_err(|_| ApiError::InvalidSessionToken)?;
        auth_value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        tracing::info!(email = %data.user.email, "tastytrade session established");
        Ok(Self {
            client,
            base_url,
            remember_token: data.remember_token,
            user: data.user,
        })
    }

    /// Check the session with `POST /sessions/validate`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the request itself fails; a rejected
    /// session yields `Ok(false)`.
    pub async fn validate(&self) -> Result<bool, ApiError> {
        let response = self
            .client
            .post(self.url("/sessions/validate"))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// End the session with `DELETE /sessions`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the request itself fails.
    pub async fn destroy(self) -> Result<bool, ApiError> {
        let response = self.client.delete(self.url("/sessions")).send().await?;
        let destroyed = response.status().is_success();
        tracing::info!(destroyed, "tastytrade session destroyed");
        Ok(destroyed)
    }

    /// Fetch the customer record with `GET /customers/me`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    pub async fn customer(&self) -> Result<Customer, ApiError> {
        self.get_data("/customers/me", &[]).await
    }

    /// Fetch streaming access with `GET /quote-streamer-tokens`.
    ///
    /// The returned token and DXLink URL are the inputs to the streaming
    /// client.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    pub async fn quote_streamer_tokens(&self) -> Result<StreamerTokens, ApiError> {
        self.get_data("/quote-streamer-tokens", &[]).await
    }

    /// Basic record of the logged-in user.
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Single-use token for the next password-less login, when issued.
    #[must_use]
    pub fn remember_token(&self) -> Option<&str> {
        self.remember_token.as_deref()
    }

    /// GET `path` and unwrap the `data` envelope.
    pub(super) async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        decode_data(request.send().await?).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl std::fmt::Debug for RestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestSession")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Response Decoding
// ============================================================================

/// Unwrap the `{data}` envelope of a successful response, or map the error
/// envelope of a failed one.
async fn decode_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        return Ok(envelope.data);
    }
    Err(error_from(status, &body))
}

/// Map a non-2xx response body to a typed error.
fn error_from(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let mut message = envelope.error.message;
            for detail in envelope.error.errors {
                if let Some(code) = detail.code {
                    message.push_str(&format!("\n{code}: {}", detail.message.unwrap_or_default()));
                } else if let Some(domain) = detail.domain {
                    message.push_str(&format!("\n{domain}: {}", detail.reason.unwrap_or_default()));
                }
            }
            ApiError::Api {
                code: envelope
                    .error
                    .code
                    .unwrap_or_else(|| status.as_u16().to_string()),
                message,
            }
        }
        Err(_) => ApiError::Status {
            status,
            body: body.to_string(),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
