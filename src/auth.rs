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

//! Auth coordinator (spec §4.4, C4).
//!
//! Drives the two-step login (password → SMS challenge → hash) and
//! refresh, and owns the only path that ever mutates [`Session`]. Every
//! transition to `AUTHENTICATED` is written through the session store;
//! every exit from `AUTHENTICATED` clears it. Concurrent `refresh()` calls
//! are coalesced with a double-checked lock rather than a broadcast
//! channel: the second caller re-reads the session after acquiring the
//! lock and, finding it already refreshed, returns that result without a
//! second network call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::{
    common::{
        credential::Credentials,
        models::{ChallengeToken, Session, SessionMetadata},
    },
    error::{Error, Result},
    http::client::{RequestClient, RequestKind},
    session::SessionStore,
};

/// Coarse-grained state, exposed for observability (spec §4.4 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStateKind {
    Unauth,
    Challenged,
    Authenticated,
}

enum AuthState {
    Unauth,
    Challenged(ChallengeToken),
    Authenticated(Session),
}

#[derive(Serialize)]
struct LoginUserRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginUserResponse {
    token: String,
}

#[derive(Serialize)]
struct LoginUserControlRequest<'a> {
    token: &'a str,
    #[serde(rename = "smsCode")]
    sms_code: &'a str,
}

#[derive(Deserialize)]
struct LoginUserControlResponse {
    hash: String,
}

#[derive(Deserialize)]
struct SessionRefreshResponse {
    hash: String,
    #[serde(rename = "expiresAt", default)]
    expires_at: Option<DateTime<Utc>>,
}

/// Drives AlgoLab's login/refresh/logout lifecycle and owns `Session` mutation.
pub struct AuthCoordinator {
    state: RwLock<AuthState>,
    refresh_lock: Mutex<()>,
    session_store: SessionStore,
    request_client: RequestClient,
    credentials: Credentials,
    session_ttl: chrono::Duration,
}

impl AuthCoordinator {
    /// Constructs a coordinator, restoring `AUTHENTICATED` from the session
    /// store if a still-valid session is found (spec §4.4 "Initial").
    pub async fn new(
        session_store: SessionStore,
        request_client: RequestClient,
        credentials: Credentials,
        session_ttl: std::time::Duration,
    ) -> Self {
        let initial = match session_store.load().await {
            Some(session) => AuthState::Authenticated(session),
            None => AuthState::Unauth,
        };
        Self {
            state: RwLock::new(initial),
            refresh_lock: Mutex::new(()),
            session_store,
            request_client,
            credentials,
            session_ttl: chrono::Duration::from_std(session_ttl).unwrap_or(chrono::Duration::hours(24)),
        }
    }

    #[must_use]
    pub async fn state_kind(&self) -> AuthStateKind {
        match &*self.state.read().await {
            AuthState::Unauth => AuthStateKind::Unauth,
            AuthState::Challenged(_) => AuthStateKind::Challenged,
            AuthState::Authenticated(_) => AuthStateKind::Authenticated,
        }
    }

    /// Returns the current session, if authenticated.
    #[must_use]
    pub async fn current_session(&self) -> Option<Session> {
        match &*self.state.read().await {
            AuthState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Step 1: submits credentials, transitioning `UNAUTH → CHALLENGED`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthError`] if the broker rejects the credentials.
    pub async fn begin_login(&self) -> Result<ChallengeToken> {
        let request = LoginUserRequest {
            username: self.credentials.username().as_str(),
            password: &self.credentials.password(),
        };

        let response = self
            .request_client
            .call::<_, LoginUserResponse>("/api/LoginUser", None, &request, RequestKind::Mutation { idempotent: false })
            .await
            .map_err(|error| to_auth_error(error, "login"))?;

        let challenge = ChallengeToken { token: response.token, issued_at: Utc::now() };
        *self.state.write().await = AuthState::Challenged(challenge.clone());
        Ok(challenge)
    }

    /// Step 2: verifies the SMS code, transitioning `CHALLENGED → AUTHENTICATED`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthError`] if the code is rejected, or if called
    /// outside `CHALLENGED`.
    pub async fn complete_login(&self, challenge: &ChallengeToken, sms_code: &str) -> Result<Session> {
        let request = LoginUserControlRequest { token: &challenge.token, sms_code };

        let response = self
            .request_client
            .call::<_, LoginUserControlResponse>(
                "/api/LoginUserControl",
                None,
                &request,
                RequestKind::Mutation { idempotent: false },
            )
            .await;

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                *self.state.write().await = AuthState::Unauth;
                return Err(to_auth_error(error, "sms verification"));
            }
        };

        let now = Utc::now();
        let session = Session {
            token: challenge.token.clone(),
            hash: response.hash,
            issued_at: now,
            expires_at: now + self.session_ttl,
            last_refresh_at: None,
            stream_connected: false,
            stream_last_connected_at: None,
            metadata: SessionMetadata {
                username: self.credentials.username().to_string(),
                hostname: self.credentials.hostname().to_string(),
            },
        };

        self.persist_authenticated(session.clone()).await?;
        Ok(session)
    }

    /// Refreshes the current session, coalescing concurrent callers onto a
    /// single in-flight network call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthError`] if not currently authenticated or if the
    /// broker rejects the refresh (transitions to `UNAUTH`).
    pub async fn refresh(&self) -> Result<Session> {
        let before = match self.current_session().await {
            Some(session) => session,
            None => return Err(Error::AuthError("refresh requested while unauthenticated".to_string())),
        };

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have completed a refresh while we waited for the lock.
        if let Some(after) = self.current_session().await {
            if after.last_refresh_at > before.last_refresh_at {
                return Ok(after);
            }
        }

        let result = self
            .request_client
            .call::<_, SessionRefreshResponse>(
                "/api/SessionRefresh",
                Some(&before.hash),
                &serde_json::json!({}),
                RequestKind::Mutation { idempotent: false },
            )
            .await;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                *self.state.write().await = AuthState::Unauth;
                let _ = self.session_store.clear().await;
                return Err(to_auth_error(error, "session refresh"));
            }
        };

        let now = Utc::now();
        let refreshed = Session {
            hash: response.hash,
            last_refresh_at: Some(now),
            expires_at: response.expires_at.unwrap_or(now + self.session_ttl),
            ..before
        };

        self.persist_authenticated(refreshed.clone()).await?;
        Ok(refreshed)
    }

    /// Logs out, clearing the session everywhere (spec §4.4 "exit from
    /// AUTHENTICATED").
    pub async fn logout(&self) -> Result<()> {
        *self.state.write().await = AuthState::Unauth;
        self.session_store
            .clear()
            .await
            .map_err(|error| Error::Fatal(format!("failed to clear session store: {error}")))
    }

    async fn persist_authenticated(&self, session: Session) -> Result<()> {
        self.session_store
            .save(&session)
            .await
            .map_err(|error| Error::Fatal(format!("failed to persist session: {error}")))?;
        *self.state.write().await = AuthState::Authenticated(session);
        Ok(())
    }
}

fn to_auth_error(error: Error, step: &str) -> Error {
    match error {
        Error::AuthError(_) => error,
        other => Error::AuthError(format!("{step} failed: {other}")),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;
    use crate::{common::credential::Credentials, http::client::RequestClientConfig};

    fn test_coordinator(base_url: String, dir: &tempfile::TempDir) -> AuthCoordinator {
        let request_client = RequestClient::new(
            RequestClientConfig {
                base_url,
                request_timeout: Duration::from_secs(5),
                max_retries: 0,
                retry_delay_initial: Duration::from_millis(1),
            },
            Credentials::new("AK", "u1", "p1", "h"),
        )
        .unwrap();

        AuthCoordinator {
            state: RwLock::new(AuthState::Unauth),
            refresh_lock: Mutex::new(()),
            session_store: SessionStore::new(dir.path().join("session.json")),
            request_client,
            credentials: Credentials::new("AK", "u1", "p1", "h"),
            session_ttl: chrono::Duration::hours(24),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn starts_unauthenticated_with_no_stored_session() {
        let dir = tempdir().unwrap();
        let coordinator = test_coordinator("http://127.0.0.1:1".to_string(), &dir);
        assert_eq!(coordinator.state_kind().await, AuthStateKind::Unauth);
        assert!(coordinator.current_session().await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn refresh_without_session_is_an_auth_error() {
        let dir = tempdir().unwrap();
        let coordinator = test_coordinator("http://127.0.0.1:1".to_string(), &dir);
        let result = coordinator.refresh().await;
        assert!(matches!(result, Err(Error::AuthError(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn logout_clears_session_store() {
        let dir = tempdir().unwrap();
        let coordinator = test_coordinator("http://127.0.0.1:1".to_string(), &dir);
        let session = Session {
            token: "t".to_string(),
            hash: "h".to_string(),
            issued_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            last_refresh_at: None,
            stream_connected: false,
            stream_last_connected_at: None,
            metadata: SessionMetadata::default(),
        };
        coordinator.persist_authenticated(session).await.unwrap();
        assert_eq!(coordinator.state_kind().await, AuthStateKind::Authenticated);

        coordinator.logout().await.unwrap();
        assert_eq!(coordinator.state_kind().await, AuthStateKind::Unauth);
        assert!(coordinator.session_store.load().await.is_none());
    }
}
