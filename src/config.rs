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

//! Configuration structures for the AlgoLab adapter (spec §4.3–§4.7 defaults).

use std::time::Duration;

use crate::common::consts::ALGOLAB_HTTP_HOST;

/// Configuration for the broker adapter facade (C8) and its collaborators.
///
/// Every field carries the default named in the spec so that
/// `AlgoLabConfig::default()` alone is enough to run against production.
#[derive(Clone, Debug)]
pub struct AlgoLabConfig {
    /// REST API key, used to derive the `APIKEY`/`Checker` headers.
    pub api_key: String,
    /// Broker username used for `LoginUser`.
    pub username: String,
    /// Broker password used for `LoginUser`.
    pub password: String,
    /// Hostname used in the `Checker` digest (spec §3).
    pub hostname: String,
    /// REST base URL override (defaults derived from `hostname`).
    pub http_base_url: Option<String>,
    /// WebSocket URL override (defaults to `wss://<hostname>/ws`).
    pub ws_url: Option<String>,

    /// Per-call timeout for request/response calls (spec §4.3 default 30s).
    pub request_timeout: Duration,
    /// Maximum retry attempts for `Transient` errors (spec §4.3, N=3).
    pub max_retries: u32,
    /// Initial retry backoff for `Transient` errors (spec §4.3, 100ms base).
    pub retry_delay_initial: Duration,

    /// Session TTL applied when no `expiresAt` is given by the server
    /// (spec §4.2 default 24h).
    pub session_ttl: Duration,
    /// Path to the session store document; `None` uses the default
    /// `~/.bist-trading/session.json` (spec §4.2).
    pub session_path: Option<std::path::PathBuf>,

    /// Stream heartbeat interval (spec §4.5 default 15 min).
    pub heartbeat_interval: Duration,
    /// Initial reconnect delay (spec §4.5 default 1s).
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnect delay (spec §4.5 default 60s).
    pub reconnect_delay_max: Duration,
    /// Reconnect backoff multiplier (spec §4.5 default 2.0).
    pub reconnect_backoff_factor: f64,
    /// Reconnect jitter as a fraction of the base delay (spec §4.5 ±20%).
    pub reconnect_jitter_fraction: f64,
    /// Optional cap on reconnect attempts; `None` retries indefinitely.
    pub max_reconnect_attempts: Option<u32>,

    /// Per-consumer dispatch queue capacity (spec §4.6 default 1024).
    pub consumer_queue_capacity: usize,
    /// Idle eviction TTL for message-buffer entries (spec §4.7 default 60s).
    pub buffer_idle_evict_ttl: Duration,
}

impl AlgoLabConfig {
    /// Creates a configuration from required credentials, filling in every
    /// other field from the spec's stated defaults.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            username: username.into(),
            password: password.into(),
            hostname: hostname.into(),
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            api_key: String::new(),
            username: String::new(),
            password: String::new(),
            hostname: ALGOLAB_HTTP_HOST.to_string(),
            http_base_url: None,
            ws_url: None,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay_initial: Duration::from_millis(100),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            session_path: None,
            heartbeat_interval: Duration::from_secs(15 * 60),
            reconnect_delay_initial: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(60),
            reconnect_backoff_factor: 2.0,
            reconnect_jitter_fraction: 0.20,
            max_reconnect_attempts: None,
            consumer_queue_capacity: 1024,
            buffer_idle_evict_ttl: Duration::from_secs(60),
        }
    }

    /// Returns the REST base URL, honoring any override.
    #[must_use]
    pub fn http_base_url(&self) -> String {
        self.http_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.hostname))
    }

    /// Returns the streaming WebSocket URL, honoring any override.
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.ws_url
            .clone()
            .unwrap_or_else(|| format!("wss://{}/ws", self.hostname))
    }

    /// Loads credentials from environment variables (`ALGOLAB_API_KEY`,
    /// `ALGOLAB_USERNAME`, `ALGOLAB_PASSWORD`, `ALGOLAB_HOSTNAME`),
    /// optionally reading a local `.env` file first via `dotenvy`.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is missing.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("ALGOLAB_API_KEY")
            .map_err(|_| anyhow::anyhow!("ALGOLAB_API_KEY not set"))?;
        let username = std::env::var("ALGOLAB_USERNAME")
            .map_err(|_| anyhow::anyhow!("ALGOLAB_USERNAME not set"))?;
        let password = std::env::var("ALGOLAB_PASSWORD")
            .map_err(|_| anyhow::anyhow!("ALGOLAB_PASSWORD not set"))?;
        let hostname = std::env::var("ALGOLAB_HOSTNAME")
            .unwrap_or_else(|_| ALGOLAB_HTTP_HOST.to_string());

        Ok(Self::new(api_key, username, password, hostname))
    }
}

impl std::fmt::Debug for AlgoLabConfigRedacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgoLabConfig")
            .field("api_key", &"<redacted>")
            .field("username", &self.0.username)
            .field("password", &"<redacted>")
            .field("hostname", &self.0.hostname)
            .field("request_timeout", &self.0.request_timeout)
            .field("max_retries", &self.0.max_retries)
            .finish()
    }
}

/// Wrapper that renders a redacted `Debug` view of [`AlgoLabConfig`];
/// `AlgoLabConfig` itself intentionally does not derive `Debug` since its
/// fields carry credential material (invariant I4).
pub struct AlgoLabConfigRedacted<'a>(pub &'a AlgoLabConfig);

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
