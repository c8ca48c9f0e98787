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

//! Enumerations shared across the AlgoLab adapter's HTTP and WebSocket payloads.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Logical stream class on the broker socket (spec §3, GLOSSARY).
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumString)]
pub enum Channel {
    /// Last-price tick updates.
    #[strum(serialize = "T")]
    Tick,
    /// Order-book depth snapshots/updates.
    #[strum(serialize = "D")]
    Depth,
    /// Order status and trade confirmations.
    #[strum(serialize = "O")]
    OrderStatus,
}

impl Channel {
    /// Returns the single-letter wire code used in subscription frames.
    #[must_use]
    pub const fn wire_code(self) -> &'static str {
        match self {
            Self::Tick => "T",
            Self::Depth => "D",
            Self::OrderStatus => "O",
        }
    }

    /// Parses the vendor's single-letter `Type` discriminator.
    #[must_use]
    pub fn from_wire_code(code: &str) -> Option<Self> {
        match code {
            "T" => Some(Self::Tick),
            "D" => Some(Self::Depth),
            "O" => Some(Self::OrderStatus),
            _ => None,
        }
    }
}

/// Order side.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order type accepted by `SendOrder`/`ModifyOrder`.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
    Stop,
    StopLimit,
}

/// Time-in-force qualifier.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Day,
    Fok,
    Ioc,
}

/// Order lifecycle status (spec §4.8). Ordering matches the monotone
/// progression the facade enforces; `as u8` gives a rank used by the
/// regression guard in [`crate::adapter`].
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Rank used to detect regressions; terminal/fill states only ever move
    /// forward except `PartiallyFilled`, which may repeat with a larger
    /// `filled_qty` (handled separately, not by rank alone).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Submitted => 1,
            Self::PartiallyFilled => 2,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired => 3,
        }
    }

    /// Terminal statuses never transition further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired)
    }
}

/// Order cancellation target — equity vs VIOP (futures/options) use distinct
/// endpoints per spec §6 (`DeleteOrder` vs `DeleteOrderViop`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CancelKind {
    Equity,
    Viop,
}

/// Broker environment selection; AlgoLab does not expose a public testnet,
/// but the distinction is kept for local/mock testing the way the teacher's
/// adapters distinguish Mainnet/Testnet/Demo.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Production,
    Mock,
}
