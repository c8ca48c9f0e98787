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

//! Core data transfer objects shared across the AlgoLab adapter (spec §3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use super::enums::{OrderSide, OrderStatus, OrderType, TimeInForce};

/// Durable session state (spec §3 "Session"). Exclusively owned by the auth
/// coordinator (C4); read by the request client (C3) and stream client (C5).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub stream_connected: bool,
    pub stream_last_connected_at: Option<DateTime<Utc>>,
    pub metadata: SessionMetadata,
}

impl Session {
    /// Whether the session is still valid at `now` (used by invariant I1 at
    /// load time and before each signed call).
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Non-sensitive bookkeeping persisted alongside the session (spec §6
/// persisted session document).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionMetadata {
    pub username: String,
    pub hostname: String,
}

/// A request awaiting the SMS verification step (spec §4.4 `CHALLENGED`).
#[derive(Clone, Debug)]
pub struct ChallengeToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

/// Order submission parameters (spec §3 "Order"). The caller owns
/// `client_order_id`; the adapter returns a `broker_order_id` on acceptance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: Ustr,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub flags: Vec<String>,
}

/// Result of an accepted order submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderAck {
    pub client_order_id: String,
    pub broker_order_id: String,
    pub status: OrderStatus,
}

/// A reported order state update, delivered via the `ORDER_STATUS` channel
/// or returned synchronously from `sendOrder`/`cancelOrder`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderReport {
    pub client_order_id: String,
    pub broker_order_id: String,
    pub symbol: Ustr,
    pub status: OrderStatus,
    pub filled_qty: Decimal,
    pub remaining_qty: Decimal,
    pub price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
    pub sequence: Option<u64>,
}

impl OrderReport {
    /// Invariant I5: `filledQty + remainingQty = quantity` for the reported total.
    #[must_use]
    pub fn total_qty(&self) -> Decimal {
        self.filled_qty + self.remaining_qty
    }
}

/// A single open position (spec §4.8 `getPositions`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Ustr,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
    pub market_value: Decimal,
}

/// Last-trade market data snapshot (spec §4.8 `getMarketDataSnapshot`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketDataSnapshot {
    pub symbol: Ustr,
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A single price level in an order book side.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub qty: Decimal,
}
