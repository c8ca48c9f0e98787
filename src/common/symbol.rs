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

//! Helpers for working with AlgoLab-specific symbol strings (spec GLOSSARY
//! "Symbol": uppercase ASCII identifier, e.g. `AKBNK`, `THYAO`).

use std::borrow::Cow;

use ustr::Ustr;

use crate::common::consts::ALL_SYMBOLS;

/// Normalises a raw symbol string to the canonical uppercase-ASCII form used
/// on the wire. AlgoLab symbols carry no locale-dependent casing (spec §9).
#[must_use]
pub fn normalize(value: &str) -> Ustr {
    let needs_upper = value.bytes().any(|b| b.is_ascii_lowercase());
    let normalised: Cow<'_, str> = if needs_upper {
        Cow::Owned(value.to_ascii_uppercase())
    } else {
        Cow::Borrowed(value)
    };
    Ustr::from(normalised.as_ref())
}

/// Returns `true` when `symbol` is the absorptive `ALL` wildcard (spec §3
/// "Subscription record").
#[must_use]
pub fn is_all(symbol: &str) -> bool {
    symbol.eq_ignore_ascii_case(ALL_SYMBOLS)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn normalize_upper_cases() {
        assert_eq!(normalize("akbnk").as_str(), "AKBNK");
        assert_eq!(normalize("THYAO").as_str(), "THYAO");
    }

    #[rstest]
    fn is_all_is_case_insensitive() {
        assert!(is_all("ALL"));
        assert!(is_all("all"));
        assert!(!is_all("AKBNK"));
    }
}
