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

//! Unified error taxonomy for the AlgoLab adapter (spec §7).
//!
//! Distinguishes auto-recoverable errors (`Unauthenticated`, `Transient`)
//! from errors that are surfaced verbatim to the caller, mirroring the
//! three-tier retryable/non-retryable/fatal split used throughout this
//! adapter family, specialised to the taxonomy spec.md §7 names explicitly.

use std::time::Duration;

use thiserror::Error;

/// The result type returned by fallible adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all AlgoLab adapter operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials or SMS code rejected, or the session cannot be refreshed.
    /// Surfaces to the caller; the auth coordinator transitions to `Unauth`.
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// A valid-looking session was rejected by the server. Handled locally:
    /// the caller (C3) triggers a single refresh-and-retry before this ever
    /// reaches an application caller as [`Error::AuthError`].
    #[error("session rejected by server as unauthenticated")]
    Unauthenticated,

    /// HTTP 429 or a server-signalled throttle. The adapter does not loop;
    /// the caller may retry after `retry_after`.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Network failure, timeout, or HTTP 5xx. Retried internally up to a
    /// bounded number of attempts for idempotent calls (spec §4.3).
    #[error("transient error: {message}")]
    Transient { message: String },

    /// The server accepted the call but refused the action.
    #[error("business error {code}: {message}")]
    BusinessError { code: String, message: String },

    /// The server violated the documented contract (e.g. an order-status
    /// regression, or a malformed frame). Logged at ERROR, never retried.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Configuration or programmer error. The caller's integration policy
    /// decides whether the process should exit.
    #[error("fatal error: {0}")]
    Fatal(String),

    /// A data query has no answer to give (e.g. a market data snapshot
    /// requested for a symbol with no buffered tick and no live
    /// subscription). Distinct from `BusinessError`: the server was never
    /// asked, there is simply nothing to return.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
}

impl Error {
    /// `true` for the two kinds that the adapter may retry automatically
    /// (spec §7 "Recovery policy").
    #[must_use]
    pub const fn is_auto_recoverable(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Transient { .. })
    }

    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Classifies an HTTP status code per spec §4.3's result classification
    /// table, given an optional server message. Business-success/failure
    /// payloads on a 2xx response are classified separately by the request
    /// client, which has the parsed body available; this only ever sees
    /// non-2xx statuses.
    #[must_use]
    pub fn from_http_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthenticated,
            429 => Self::RateLimited { retry_after: None },
            s if (500..600).contains(&s) => Self::Transient {
                message: message.unwrap_or_else(|| format!("server error {s}")),
            },
            s => Self::Fatal(message.unwrap_or_else(|| format!("request rejected with status {s}"))),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Fatal(format!("JSON error: {error}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::Transient { message: error.to_string() }
        } else {
            Self::Fatal(format!("HTTP transport error: {error}"))
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transient { message: format!("websocket error: {error}") }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn classifies_401_403_as_unauthenticated() {
        assert!(matches!(Error::from_http_status(401, None), Error::Unauthenticated));
        assert!(matches!(Error::from_http_status(403, None), Error::Unauthenticated));
    }

    #[rstest]
    fn classifies_429_as_rate_limited() {
        assert!(matches!(Error::from_http_status(429, None), Error::RateLimited { .. }));
    }

    #[rstest]
    fn classifies_5xx_as_transient() {
        assert!(matches!(Error::from_http_status(503, None), Error::Transient { .. }));
        assert!(matches!(Error::from_http_status(500, None), Error::Transient { .. }));
    }

    #[rstest]
    fn classifies_other_4xx_as_fatal() {
        assert!(matches!(Error::from_http_status(400, None), Error::Fatal(_)));
    }

    #[rstest]
    fn auto_recoverable_kinds() {
        assert!(Error::Unauthenticated.is_auto_recoverable());
        assert!(Error::Transient { message: "x".into() }.is_auto_recoverable());
        assert!(!Error::Fatal("x".into()).is_auto_recoverable());
        assert!(!Error::ProtocolViolation("x".into()).is_auto_recoverable());
    }
}
