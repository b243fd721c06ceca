use serde_json::Value;
use crate::error::{RtmResult, RtmError};

/// Default base URL of the session-negotiation HTTP API.
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api/";

const SESSION_OPEN_ENDPOINT: &str = "rtm.start";

// ============================================================================
// Session negotiation
// ============================================================================

/// Opens a messaging session for an API token and returns the WebSocket URL
/// to connect to.
///
/// The bridge performs this step once, before the initial connect. It is a
/// seam: [`HttpSessionNegotiator`] is the production implementation, tests
/// and embedders can substitute their own.
pub trait SessionNegotiator {
    fn open_session(&self, token: &str) -> RtmResult<String>;
}

/// Session negotiator backed by a blocking HTTP call.
///
/// Issues `GET {base_url}rtm.start?token=...` and expects a JSON object
/// response with an `ok` acknowledgment flag and a `url` field carrying the
/// WebSocket endpoint. A response with `ok == false` reports the server's
/// `error` field.
pub struct HttpSessionNegotiator {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSessionNegotiator {
    pub fn new() -> HttpSessionNegotiator {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Points the negotiator at a different API host, e.g. for testing
    /// against a local stand-in.
    pub fn with_base_url(base_url: &str) -> HttpSessionNegotiator {
        HttpSessionNegotiator {
            base_url: base_url.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpSessionNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionNegotiator for HttpSessionNegotiator {
    fn open_session(&self, token: &str) -> RtmResult<String> {
        let endpoint = format!("{}{}", self.base_url, SESSION_OPEN_ENDPOINT);

        let body: Value = self
            .client
            .get(&endpoint)
            .query(&[("token", token)])
            .send()
            .map_err(|e| RtmError::Session(format!("request failed: {}", e)))?
            .json()
            .map_err(|e| RtmError::Session(format!("response was not JSON: {}", e)))?;

        if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(RtmError::Session(format!("server rejected session open: {}", reason)));
        }

        match body.get("url").and_then(Value::as_str) {
            Some(url) => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    tracing::debug!("Session opened, connection URL received");
                }
                Ok(url.to_string())
            }
            None => Err(RtmError::Session("response carried no connection URL".to_string())),
        }
    }
}
