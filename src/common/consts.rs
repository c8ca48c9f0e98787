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

//! Core constants shared across the AlgoLab adapter components.

use std::sync::LazyLock;

use ustr::Ustr;

pub const BROKER: &str = "ALGOLAB";
pub static BROKER_VENUE: LazyLock<Ustr> = LazyLock::new(|| Ustr::from(BROKER));

/// Default REST host, overridden by [`crate::config::AlgoLabConfig::hostname`].
pub const ALGOLAB_HTTP_HOST: &str = "www.algolab.com.tr";

/// Default streaming endpoint path.
pub const ALGOLAB_WS_PATH: &str = "/ws";

pub const PING_MESSAGE: &str = r#"{"Type":"PING"}"#;
pub const PONG_TYPE: &str = "PONG";

/// Symbol used to request the full channel feed; absorptive per spec §3.
pub const ALL_SYMBOLS: &str = "ALL";

/// Server closes idle stream connections that receive no subscription
/// within this window of connecting.
pub const FIRST_SUBSCRIPTION_DEADLINE_SECS: u64 = 2;

/// Window after a PING within which a PONG must arrive; receipt resets the
/// deadline, a miss tears the connection down for the reconnect loop to
/// recycle it.
pub const PONG_TIMEOUT_SECS: u64 = 30;
