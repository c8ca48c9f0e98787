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

//! AlgoLab API credential storage and request-signing helpers (spec §4.1, C1).

use std::fmt::Debug;

use aws_lc_rs::digest;
use ustr::Ustr;
use zeroize::ZeroizeOnDrop;

/// Static per-process credentials (spec §3 "Credentials").
///
/// Immutable once constructed; the password is zeroized on drop and never
/// appears in `Debug` output (invariant I4).
#[derive(Clone, ZeroizeOnDrop)]
pub struct Credentials {
    #[zeroize(skip)]
    api_key: Ustr,
    #[zeroize(skip)]
    username: Ustr,
    password: Box<[u8]>,
    #[zeroize(skip)]
    hostname: Ustr,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hostname", &self.hostname)
            .finish()
    }
}

impl Credentials {
    /// Creates a new [`Credentials`] instance.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Ustr::from(api_key.into().as_str()),
            username: Ustr::from(username.into().as_str()),
            password: password.into().into_bytes().into_boxed_slice(),
            hostname: Ustr::from(hostname.into().as_str()),
        }
    }

    #[must_use]
    pub fn api_key(&self) -> &Ustr {
        &self.api_key
    }

    #[must_use]
    pub fn username(&self) -> &Ustr {
        &self.username
    }

    #[must_use]
    pub fn hostname(&self) -> &Ustr {
        &self.hostname
    }

    /// Returns the password as a UTF-8 string for the two login calls only;
    /// never logged, never stored beyond the login request body.
    #[must_use]
    pub fn password(&self) -> String {
        String::from_utf8_lossy(&self.password).into_owned()
    }

    /// Computes the `Checker` header for a request against `path` (spec §3,
    /// §4.1, property P1): `lowerhex(SHA-256(apiKey ∥ hostname ∥ path))`.
    #[must_use]
    pub fn checker(&self, path: &str) -> String {
        compute_checker(self.api_key.as_str(), self.hostname.as_str(), path)
    }
}

/// Pure function form of the Checker algorithm, usable without a constructed
/// [`Credentials`] (e.g. in property tests).
#[must_use]
pub fn compute_checker(api_key: &str, hostname: &str, path: &str) -> String {
    let mut message = String::with_capacity(api_key.len() + hostname.len() + path.len());
    message.push_str(api_key);
    message.push_str(hostname);
    message.push_str(path);

    let digest = digest::digest(&digest::SHA256, message.as_bytes());
    hex::encode(digest.as_ref())
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn checker_matches_reference_vector() {
        // Scenario 1 in spec §8: apiKey="AK", hostname="h", path="/api/LoginUser".
        let expected = {
            let digest = digest::digest(&digest::SHA256, b"AKh/api/LoginUser");
            hex::encode(digest.as_ref())
        };

        let checker = compute_checker("AK", "h", "/api/LoginUser");
        assert_eq!(checker, expected);
    }

    #[rstest]
    fn checker_is_lowercase_hex() {
        let checker = compute_checker("AK", "h", "/api/LoginUser");
        assert!(checker.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(checker.len(), 64);
    }

    #[rstest]
    fn checker_depends_on_exact_path() {
        let a = compute_checker("AK", "h", "/api/LoginUser");
        let b = compute_checker("AK", "h", "/api/LoginUserControl");
        assert_ne!(a, b, "Checker must be path-specific (invariant in spec §3)");
    }

    #[rstest]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("AK", "u1", "super-secret", "h");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[rstest]
    fn credentials_checker_matches_free_function() {
        let creds = Credentials::new("AK", "u1", "p1", "h");
        assert_eq!(creds.checker("/api/LoginUser"), compute_checker("AK", "h", "/api/LoginUser"));
    }
}
