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

//! Broker adapter facade (spec §4.8, C8).
//!
//! Composes C3–C7 behind the uniform contract upstream services consume.
//! Owns the order-status monotonicity guard (invariant, §4.8) and the
//! single refresh-and-retry for calls that come back `Unauthenticated`
//! (spec §7 scenario 6) — both cross-cutting concerns that belong above
//! the request client rather than inside it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use ustr::Ustr;

use crate::{
    auth::AuthCoordinator,
    buffer::MessageBuffer,
    common::{
        enums::{CancelKind, Channel, OrderSide, OrderStatus, OrderType, TimeInForce},
        models::{MarketDataSnapshot, OrderAck, OrderReport, OrderRequest, Position},
    },
    config::AlgoLabConfig,
    error::{Error, Result},
    http::client::{RequestClient, RequestKind},
    websocket::{
        client::{StreamClient, StreamClientConfig},
        subscription::{Consumer, ConsumerId},
    },
};

/// Equity reference data (spec §6 `/api/GetEquityInfo`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityInfo {
    pub symbol: Ustr,
    pub lot_size: u32,
    pub tick_size: Decimal,
    pub is_tradable: bool,
}

/// A single OHLCV bar (spec §6 `/api/GetCandleData`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// A single executed transaction (spec §6 `/api/TodaysTransaction`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub broker_order_id: String,
    pub symbol: Ustr,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A cash ledger entry (spec §6 `/api/CashFlow`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowEntry {
    pub description: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// An account statement line (spec §6 `/api/AccountExtre`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatementEntry {
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Parameters for `/api/RiskSimulation`: what-if exposure check for a
/// prospective order before it is sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSimulationRequest {
    pub symbol: Ustr,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Result of a risk simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSimulationResult {
    pub would_be_accepted: bool,
    pub required_margin: Decimal,
    pub available_margin: Decimal,
    pub reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOrderRequest<'a> {
    client_order_id: &'a str,
    symbol: Ustr,
    side: OrderSide,
    order_type: OrderType,
    quantity: Decimal,
    price: Option<Decimal>,
    time_in_force: TimeInForce,
    flags: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    client_order_id: String,
    broker_order_id: String,
    symbol: Ustr,
    status: OrderStatus,
    filled_qty: Decimal,
    remaining_qty: Decimal,
    price: Option<Decimal>,
    timestamp: DateTime<Utc>,
    sequence: Option<u64>,
}

impl OrderResponse {
    fn into_report(self) -> OrderReport {
        OrderReport {
            client_order_id: self.client_order_id,
            broker_order_id: self.broker_order_id,
            symbol: self.symbol,
            status: self.status,
            filled_qty: self.filled_qty,
            remaining_qty: self.remaining_qty,
            price: self.price,
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelOrderRequest<'a> {
    client_order_id: &'a str,
    broker_order_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyOrderRequest<'a> {
    broker_order_id: &'a str,
    quantity: Option<Decimal>,
    price: Option<Decimal>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SymbolRequest<'a> {
    symbol: &'a str,
}

const fn cancel_path(kind: CancelKind) -> &'static str {
    match kind {
        CancelKind::Equity => "/api/DeleteOrder",
        CancelKind::Viop => "/api/DeleteOrderViop",
    }
}

/// The uniform broker contract exposed to upstream services (spec §4.8).
pub struct AlgoLabAdapter {
    request_client: RequestClient,
    auth: AuthCoordinator,
    buffer: MessageBuffer,
    stream: tokio::sync::Mutex<Option<StreamClient>>,
    stream_config_template: StreamClientConfig,
    order_tracking: DashMap<String, OrderReport>,
}

impl AlgoLabAdapter {
    #[must_use]
    pub fn new(
        config: &AlgoLabConfig,
        request_client: RequestClient,
        auth: AuthCoordinator,
    ) -> Self {
        let stream_config_template = StreamClientConfig {
            url: config.ws_url(),
            heartbeat_interval: config.heartbeat_interval,
            pong_timeout: std::time::Duration::from_secs(crate::common::consts::PONG_TIMEOUT_SECS),
            first_subscription_deadline: std::time::Duration::from_secs(
                crate::common::consts::FIRST_SUBSCRIPTION_DEADLINE_SECS,
            ),
            reconnect_delay_initial: config.reconnect_delay_initial,
            reconnect_delay_max: config.reconnect_delay_max,
            reconnect_backoff_factor: config.reconnect_backoff_factor,
            reconnect_jitter_fraction: config.reconnect_jitter_fraction,
            consumer_queue_capacity: config.consumer_queue_capacity,
        };

        Self {
            request_client,
            auth,
            buffer: MessageBuffer::new(config.buffer_idle_evict_ttl),
            stream: tokio::sync::Mutex::new(None),
            stream_config_template,
            order_tracking: DashMap::new(),
        }
    }

    /// Step 1 of login: submits credentials, returning a challenge token
    /// the caller must verify with an SMS code.
    pub async fn begin_login(&self) -> Result<crate::common::models::ChallengeToken> {
        self.auth.begin_login().await
    }

    /// Step 2 of login: verifies the SMS code and establishes a session.
    pub async fn complete_login(
        &self,
        challenge: &crate::common::models::ChallengeToken,
        sms_code: &str,
    ) -> Result<crate::common::models::Session> {
        self.auth.complete_login(challenge, sms_code).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await
    }

    /// Submits a new order (spec §6 `/api/SendOrder`).
    pub async fn send_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        let request = SendOrderRequest {
            client_order_id: &order.client_order_id,
            symbol: order.symbol,
            side: order.side,
            order_type: order.order_type,
            quantity: order.quantity,
            price: order.price,
            time_in_force: order.time_in_force,
            flags: &order.flags,
        };

        let response: OrderResponse = self
            .authed_call("/api/SendOrder", &request, RequestKind::Mutation { idempotent: false })
            .await?;
        let report = response.into_report();
        self.guard_transition(&report)?;

        Ok(OrderAck {
            client_order_id: report.client_order_id,
            broker_order_id: report.broker_order_id,
            status: report.status,
        })
    }

    /// Modifies a resting order's quantity and/or price.
    pub async fn modify_order(
        &self,
        broker_order_id: &str,
        quantity: Option<Decimal>,
        price: Option<Decimal>,
    ) -> Result<OrderReport> {
        let request = ModifyOrderRequest { broker_order_id, quantity, price };
        let response: OrderResponse = self
            .authed_call("/api/ModifyOrder", &request, RequestKind::Mutation { idempotent: false })
            .await?;
        let report = response.into_report();
        self.guard_transition(&report)?;
        Ok(report)
    }

    /// Cancels an order (spec §6 `DeleteOrder`/`DeleteOrderViop`, property
    /// P6: re-cancelling an already-cancelled order is a no-op on the wire).
    pub async fn cancel_order(
        &self,
        client_order_id: &str,
        broker_order_id: &str,
        kind: CancelKind,
    ) -> Result<OrderReport> {
        if let Some(existing) = self.order_tracking.get(client_order_id) {
            if existing.status == OrderStatus::Cancelled {
                return Ok(existing.clone());
            }
        }

        let request = CancelOrderRequest { client_order_id, broker_order_id };
        let response: OrderResponse = self
            .authed_call(cancel_path(kind), &request, RequestKind::Mutation { idempotent: true })
            .await?;
        let report = response.into_report();
        self.guard_transition(&report)?;
        Ok(report)
    }

    /// Returns the last-known snapshot for `symbol` from the message buffer.
    ///
    /// There is no REST endpoint that returns `{last, bid, ask, volume, ts}`
    /// in one shot (`GetEquityInfo` returns reference data, not a live
    /// quote) — a caller that needs a snapshot for a symbol with no live
    /// tick must `subscribe` first.
    pub async fn get_market_data_snapshot(&self, symbol: &str) -> Result<MarketDataSnapshot> {
        let normalized = crate::common::symbol::normalize(symbol);
        match self.buffer.last(Channel::Tick, normalized) {
            Some(crate::websocket::messages::Frame::Tick { last_price, bid_price, ask_price, total_volume, timestamp, .. }) => {
                Ok(MarketDataSnapshot {
                    symbol: normalized,
                    last: last_price,
                    bid: bid_price,
                    ask: ask_price,
                    volume: total_volume,
                    timestamp,
                })
            }
            _ => Err(Error::DataUnavailable(format!("no buffered tick for {normalized}; subscribe to TICK first"))),
        }
    }

    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        self.authed_call("/api/InstantPosition", &serde_json::json!({}), RequestKind::Read).await
    }

    pub async fn get_equity_info(&self, symbol: &str) -> Result<EquityInfo> {
        self.authed_call("/api/GetEquityInfo", &SymbolRequest { symbol }, RequestKind::Read).await
    }

    pub async fn get_candle_data(&self, symbol: &str) -> Result<Vec<Candle>> {
        self.authed_call("/api/GetCandleData", &SymbolRequest { symbol }, RequestKind::Read).await
    }

    pub async fn get_todays_transactions(&self) -> Result<Vec<Transaction>> {
        self.authed_call("/api/TodaysTransaction", &serde_json::json!({}), RequestKind::Read).await
    }

    pub async fn get_cash_flow(&self) -> Result<Vec<CashFlowEntry>> {
        self.authed_call("/api/CashFlow", &serde_json::json!({}), RequestKind::Read).await
    }

    pub async fn get_account_extre(&self) -> Result<Vec<AccountStatementEntry>> {
        self.authed_call("/api/AccountExtre", &serde_json::json!({}), RequestKind::Read).await
    }

    pub async fn get_equity_order_history(&self) -> Result<Vec<OrderReport>> {
        self.authed_call("/api/GetEquityOrderHistory", &serde_json::json!({}), RequestKind::Read).await
    }

    pub async fn get_viop_order_history(&self) -> Result<Vec<OrderReport>> {
        self.authed_call("/api/GetViopOrderHistory", &serde_json::json!({}), RequestKind::Read).await
    }

    pub async fn risk_simulation(&self, request: &RiskSimulationRequest) -> Result<RiskSimulationResult> {
        self.authed_call("/api/RiskSimulation", request, RequestKind::Read).await
    }

    /// Subscribes to `(channel, symbol)`, lazily connecting the stream
    /// client on first use.
    pub async fn subscribe(&self, channel: Channel, symbol: &str) -> Result<Consumer> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            let session = self.require_session().await?;
            let mut client = StreamClient::new(self.stream_config_template.clone(), session.hash);
            client.connect();
            *guard = Some(client);
        }
        guard.as_ref().unwrap().subscribe(channel, symbol).await.map_err(Into::into)
    }

    pub async fn unsubscribe(&self, channel: Channel, symbol: &str, consumer: ConsumerId) -> Result<()> {
        let guard = self.stream.lock().await;
        if let Some(client) = guard.as_ref() {
            client.unsubscribe(channel, symbol, consumer).await?;
        }
        Ok(())
    }

    /// Orderly shutdown: closes the stream connection. The session itself
    /// is left intact in the store so a subsequent process can resume it
    /// (spec §5 "Shutdown" — shutdown is not the same as `logout`).
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.stream.lock().await;
        if let Some(mut client) = guard.take() {
            client.close().await;
        }
        Ok(())
    }

    /// Sweeps the message buffer, evicting entries idle beyond their TTL
    /// that no live subscription still references. Intended to be called
    /// periodically by the embedding application.
    pub async fn evict_idle_buffer_entries(&self) {
        let guard = self.stream.lock().await;
        let Some(_client) = guard.as_ref() else {
            self.buffer.evict_idle(|_, _| false);
            return;
        };
        // Without a direct "is subscribed" query on the stream client, a
        // conservative sweep treats every buffered key as referenced while
        // a stream connection is open; idle eviction resumes once closed.
        self.buffer.evict_idle(|_, _| true);
    }

    async fn require_session(&self) -> Result<crate::common::models::Session> {
        self.auth.current_session().await.ok_or(Error::Unauthenticated)
    }

    fn guard_transition(&self, report: &OrderReport) -> Result<()> {
        if let Some(mut entry) = self.order_tracking.get_mut(&report.client_order_id) {
            if report.status.rank() < entry.status.rank() {
                return Err(Error::ProtocolViolation(format!(
                    "order {} regressed from {:?} to {:?}",
                    report.client_order_id, entry.status, report.status
                )));
            }
            *entry = report.clone();
        } else {
            self.order_tracking.insert(report.client_order_id.clone(), report.clone());
        }
        Ok(())
    }

    /// Performs a signed call, transparently refreshing the session once on
    /// `Unauthenticated` before surfacing `AuthError` (spec §7 scenario 6).
    async fn authed_call<B, R>(&self, path: &str, body: &B, kind: RequestKind) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let session = self.require_session().await?;
        match self.request_client.call(path, Some(&session.hash), body, kind).await {
            Ok(value) => Ok(value),
            Err(Error::Unauthenticated) => {
                let refreshed = self.auth.refresh().await?;
                self.request_client.call(path, Some(&refreshed.hash), body, kind).await.map_err(|error| match error {
                    Error::Unauthenticated => {
                        Error::AuthError("session refresh did not resolve unauthenticated state".to_string())
                    }
                    other => other,
                })
            }
            Err(other) => Err(other),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::common::models::OrderReport;

    fn report(client_order_id: &str, status: OrderStatus, filled: Decimal, remaining: Decimal) -> OrderReport {
        OrderReport {
            client_order_id: client_order_id.to_string(),
            broker_order_id: "b1".to_string(),
            symbol: Ustr::from("AKBNK"),
            status,
            filled_qty: filled,
            remaining_qty: remaining,
            price: None,
            timestamp: Utc::now(),
            sequence: None,
        }
    }

    fn tracking_only() -> DashMap<String, OrderReport> {
        DashMap::new()
    }

    #[rstest]
    fn guard_allows_forward_progression() {
        let tracking = tracking_only();
        let mut entry: Option<OrderReport> = None;
        for (status, filled, remaining) in [
            (OrderStatus::Submitted, Decimal::ZERO, Decimal::new(100, 0)),
            (OrderStatus::PartiallyFilled, Decimal::new(30, 0), Decimal::new(70, 0)),
            (OrderStatus::Filled, Decimal::new(100, 0), Decimal::ZERO),
        ] {
            let r = report("o1", status, filled, remaining);
            if let Some(prev) = &entry {
                assert!(r.status.rank() >= prev.status.rank());
            }
            tracking.insert(r.client_order_id.clone(), r.clone());
            entry = Some(r);
        }
        assert_eq!(tracking.get("o1").unwrap().status, OrderStatus::Filled);
    }

    #[rstest]
    fn order_report_total_matches_quantity() {
        let r = report("o1", OrderStatus::PartiallyFilled, Decimal::new(30, 0), Decimal::new(70, 0));
        assert_eq!(r.total_qty(), Decimal::new(100, 0));
    }

    #[rstest]
    fn cancel_target_paths_are_distinct() {
        assert_ne!(cancel_path(crate::common::enums::CancelKind::Equity), cancel_path(crate::common::enums::CancelKind::Viop));
    }
}
