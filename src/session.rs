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

//! Durable session persistence (spec §4.2, C2).
//!
//! Stores a single JSON document under a per-user path, written
//! atomically via write-temp-then-rename so a crash mid-write can never
//! leave a corrupt document in place. Concurrent `save` calls are
//! serialized by a process-wide mutex (spec §5).

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::common::models::{Session, SessionMetadata};

const SCHEMA_VERSION: u32 = 1;
const DEFAULT_RELATIVE_PATH: &str = ".bist-trading/session.json";

/// On-disk representation (spec §6 "Persisted session document").
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    schema: u32,
    token: String,
    hash: String,
    #[serde(rename = "issuedAt")]
    issued_at: chrono::DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    expires_at: chrono::DateTime<Utc>,
    #[serde(rename = "lastRefreshAt")]
    last_refresh_at: Option<chrono::DateTime<Utc>>,
    metadata: SessionMetadata,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            token: session.token.clone(),
            hash: session.hash.clone(),
            issued_at: session.issued_at,
            expires_at: session.expires_at,
            last_refresh_at: session.last_refresh_at,
            metadata: session.metadata.clone(),
        }
    }
}

impl PersistedSession {
    fn into_session(self) -> Session {
        Session {
            token: self.token,
            hash: self.hash,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            last_refresh_at: self.last_refresh_at,
            stream_connected: false,
            stream_last_connected_at: None,
            metadata: self.metadata,
        }
    }
}

/// Durable session store backed by a single JSON file.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, write_lock: Mutex::new(()) }
    }

    /// Creates a store backed by the default `~/.bist-trading/session.json`
    /// path, falling back to a relative path if `HOME` is unset.
    #[must_use]
    pub fn default_location() -> Self {
        let path = dirs_home()
            .map(|home| home.join(DEFAULT_RELATIVE_PATH))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RELATIVE_PATH));
        Self::new(path)
    }

    /// Loads the persisted session, returning `None` when the file is
    /// missing, malformed, schema-mismatched, or already expired (spec
    /// §4.2, property P5). An expired session found on disk is removed.
    pub async fn load(&self) -> Option<Session> {
        let path = self.path.clone();
        let bytes = tokio::fs::read(&path).await.ok()?;

        let persisted: PersistedSession = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(%error, "session document failed to parse");
                return None;
            }
        };

        if persisted.schema != SCHEMA_VERSION {
            tracing::debug!(
                found = persisted.schema,
                expected = SCHEMA_VERSION,
                "session schema version mismatch"
            );
            return None;
        }

        let session = persisted.into_session();
        if !session.is_valid_at(Utc::now()) {
            tracing::debug!("discarding expired session found on disk");
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }

        tracing::debug!(expires_at = %session.expires_at, "session loaded from disk");
        Some(session)
    }

    /// Atomically persists `session` (write-temp-then-rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// temp file cannot be written/renamed.
    pub async fn save(&self, session: &Session) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let persisted = PersistedSession::from(session);
        let body = serde_json::to_vec_pretty(&persisted)
            .map_err(|error| std::io::Error::other(error.to_string()))?;

        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(expires_at = %session.expires_at, "session persisted");
        Ok(())
    }

    /// Removes any persisted session (spec §4.4, on exit from AUTHENTICATED).
    pub async fn clear(&self) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    fn sample_session(expires_in: ChronoDuration) -> Session {
        let now = Utc::now();
        Session {
            token: "tok".to_string(),
            hash: "hash".to_string(),
            issued_at: now,
            expires_at: now + expires_in,
            last_refresh_at: None,
            stream_connected: false,
            stream_last_connected_at: None,
            metadata: SessionMetadata { username: "u1".to_string(), hostname: "h".to_string() },
        }
    }

    #[rstest]
    #[tokio::test]
    async fn round_trip_save_then_load() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = sample_session(ChronoDuration::hours(1));

        store.save(&session).await.unwrap();
        let loaded = store.load().await.expect("session should load");

        assert_eq!(loaded.token, session.token);
        assert_eq!(loaded.hash, session.hash);
    }

    #[rstest]
    #[tokio::test]
    async fn load_returns_none_for_expired_session() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = sample_session(ChronoDuration::hours(-1));

        store.save(&session).await.unwrap();
        assert!(store.load().await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn load_returns_none_for_missing_file() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("missing.json"));
        assert!(store.load().await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn load_returns_none_for_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = SessionStore::new(path);
        assert!(store.load().await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn clear_removes_file() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample_session(ChronoDuration::hours(1))).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
        // Clearing an already-absent file is not an error.
        store.clear().await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn no_temp_file_left_behind_after_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(path.clone());
        store.save(&sample_session(ChronoDuration::hours(1))).await.unwrap();

        assert!(!tmp_path_for(&path).exists());
    }
}
