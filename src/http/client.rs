// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2024-2026 BIST Trading Platform Contributors. All rights reserved.
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Signed request/response client (spec §4.3, C3).
//!
//! Every call carries the full signed header set from C1, is classified
//! per spec §4.3's result table, and retries `Transient` failures
//! internally for idempotent calls only. `nautilus-network::http::HttpClient`
//! isn't vendored in this tree, so this wraps `reqwest` directly rather
//! than a borrowed transport abstraction.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    common::credential::Credentials,
    error::{Error, Result},
    net::backoff::{ExponentialBackoff, jitter_symmetric},
};

/// Whether a call may be safely retried automatically on `Transient` failure
/// (spec §4.3 "Retries preserve idempotency").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A read-only query (`GET`-shaped in spirit, even though AlgoLab's
    /// transport is POST-only).
    Read,
    /// A mutating call; only retried automatically when explicitly flagged
    /// idempotent (e.g. cancel keyed by a stable `clientOrderId`).
    Mutation { idempotent: bool },
}

impl RequestKind {
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        matches!(self, Self::Read | Self::Mutation { idempotent: true })
    }
}

/// AlgoLab's generic response envelope: a business-success flag alongside
/// the payload, independent of the HTTP status code (spec §4.3 "HTTP 2xx
/// with business-failure flag").
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    content: Option<T>,
}

/// Configuration the request client needs, independent of the rest of
/// [`crate::config::AlgoLabConfig`] so it can be constructed standalone in
/// tests.
#[derive(Debug, Clone)]
pub struct RequestClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay_initial: Duration,
}

/// Performs signed HTTP calls against the AlgoLab REST API.
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    config: RequestClientConfig,
    credentials: Credentials,
}

impl RequestClient {
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(config: RequestClientConfig, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Fatal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self { http, config, credentials })
    }

    /// Performs a signed POST call to `path`, retrying `Transient` failures
    /// internally when `kind` allows it.
    ///
    /// # Errors
    ///
    /// Returns the classified [`Error`] for the final attempt.
    pub async fn call<B, R>(&self, path: &str, token: Option<&str>, body: &B, kind: RequestKind) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut backoff = ExponentialBackoff::new(
            self.config.retry_delay_initial,
            self.config.retry_delay_initial * 2u32.pow(self.config.max_retries.max(1)),
            2.0,
            0,
            false,
        )
        .map_err(Error::Fatal)?;

        let mut attempt = 0u32;
        loop {
            match self.attempt::<B, R>(path, token, body).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retryable = matches!(error, Error::Transient { .. }) && kind.is_idempotent() && attempt < self.config.max_retries;
                    if !retryable {
                        return Err(error);
                    }
                    attempt += 1;
                    let delay = jitter_symmetric(backoff.next_duration(), 0.20);
                    tracing::debug!(%path, attempt, ?delay, "retrying transient failure");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt<B, R>(&self, path: &str, token: Option<&str>, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let checker = self.credentials.checker(path);
        let mut request = self
            .http
            .post(format!("{}{path}", self.config.base_url))
            .header("APIKEY", self.credentials.api_key().as_str())
            .header("Checker", checker)
            .json(body);

        if let Some(token) = token {
            request = request.header("Authorization", token);
        }

        let response = request.send().await.map_err(Error::from)?;
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Error::RateLimited { retry_after });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::from_http_status(status.as_u16(), Some(text)));
        }

        let text = response.text().await.map_err(Error::from)?;
        let envelope: Envelope<R> = serde_json::from_str(&text)?;

        if !envelope.success {
            let message = envelope.message.unwrap_or_else(|| "request rejected".to_string());
            if is_session_expired_message(&message) {
                return Err(Error::Unauthenticated);
            }
            return Err(Error::BusinessError { code: status.as_u16().to_string(), message });
        }

        envelope
            .content
            .ok_or_else(|| Error::Fatal("business-success response carried no content".to_string()))
    }
}

fn is_session_expired_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("unauthorized") || lower.contains("session") || lower.contains("expired")
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn read_is_always_idempotent() {
        assert!(RequestKind::Read.is_idempotent());
    }

    #[rstest]
    fn flagged_mutation_is_idempotent() {
        assert!(RequestKind::Mutation { idempotent: true }.is_idempotent());
        assert!(!RequestKind::Mutation { idempotent: false }.is_idempotent());
    }

    #[rstest]
    fn detects_session_expired_messages() {
        assert!(is_session_expired_message("Unauthorized access"));
        assert!(is_session_expired_message("session has expired"));
        assert!(!is_session_expired_message("insufficient funds"));
    }

    #[rstest]
    fn envelope_parses_success_with_content() {
        #[derive(Deserialize)]
        struct Payload {
            token: String,
        }
        let raw = r#"{"success":true,"message":"","content":{"token":"abc"}}"#;
        let parsed: Envelope<Payload> = serde_json::from_str(raw).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.content.unwrap().token, "abc");
    }
}
