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

//! Wire message types for the AlgoLab streaming protocol (spec §6).
//!
//! Two wire dialects are parsed into the single [`Frame`] variant (spec
//! §4.5): the vendor's `{"Type": T|D|O, "Content": {...}}` envelope and a
//! generic typed control envelope (`PING`/`PONG`/`AUTH_OK`/`AUTH_FAIL`/`ERROR`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ustr::Ustr;

use crate::common::{
    enums::{Channel, OrderSide},
    models::PriceLevel,
};

/// The subscription frame sent by the client (spec §6 "Stream subscription
/// frame"). The server replaces the client's entire subscription set for
/// `Type` on every frame — the multiplexer always sends the full desired set.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionFrame {
    pub token: String,
    #[serde(rename = "Type")]
    pub frame_type: String,
    #[serde(rename = "Symbols")]
    pub symbols: Vec<String>,
}

impl SubscriptionFrame {
    #[must_use]
    pub fn new(token: impl Into<String>, channel: Channel, symbols: Vec<String>) -> Self {
        Self {
            token: token.into(),
            frame_type: channel.wire_code().to_string(),
            symbols,
        }
    }
}

/// Raw vendor data envelope (spec §6 "Stream data frame").
#[derive(Debug, Clone, Deserialize)]
pub struct RawDataEnvelope {
    #[serde(rename = "Type")]
    pub frame_type: String,
    #[serde(rename = "Content")]
    pub content: Value,
}

/// Raw tick payload fields, as nested under `Content` for `Type: "T"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTickContent {
    pub symbol: String,
    #[serde(rename = "lastPrice")]
    pub last_price: Decimal,
    #[serde(rename = "bidPrice")]
    pub bid_price: Decimal,
    #[serde(rename = "askPrice")]
    pub ask_price: Decimal,
    #[serde(rename = "totalVolume")]
    pub total_volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Raw depth payload fields, as nested under `Content` for `Type: "D"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDepthContent {
    pub symbol: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub timestamp: DateTime<Utc>,
}

/// Raw order-status/trade payload fields, as nested under `Content` for
/// `Type: "O"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOrderContent {
    pub symbol: String,
    #[serde(rename = "tradeId")]
    pub trade_id: Option<String>,
    pub price: Decimal,
    pub qty: Decimal,
    pub side: OrderSide,
    pub timestamp: DateTime<Utc>,
    pub sequence: Option<u64>,
}

/// The unified, decoded application frame (spec §3 "Frame"). Every frame
/// delivered to a consumer corresponds to exactly one of these variants.
#[derive(Debug, Clone)]
pub enum Frame {
    Tick {
        symbol: Ustr,
        last_price: Decimal,
        bid_price: Decimal,
        ask_price: Decimal,
        total_volume: Decimal,
        timestamp: DateTime<Utc>,
    },
    Depth {
        symbol: Ustr,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        timestamp: DateTime<Utc>,
    },
    OrderStatus {
        symbol: Ustr,
        trade_id: Option<String>,
        price: Decimal,
        qty: Decimal,
        side: OrderSide,
        timestamp: DateTime<Utc>,
        sequence: Option<u64>,
    },
    Ping,
    Pong,
    AuthOk,
    AuthFail { message: String },
    Error { message: String },
}

impl Frame {
    /// Returns the `(channel, symbol)` this frame should be dispatched under,
    /// or `None` for control frames (spec §4.6 "Dispatch").
    #[must_use]
    pub fn routing_key(&self) -> Option<(Channel, Ustr)> {
        match self {
            Self::Tick { symbol, .. } => Some((Channel::Tick, *symbol)),
            Self::Depth { symbol, .. } => Some((Channel::Depth, *symbol)),
            Self::OrderStatus { symbol, .. } => Some((Channel::OrderStatus, *symbol)),
            Self::Ping | Self::Pong | Self::AuthOk | Self::AuthFail { .. } | Self::Error { .. } => None,
        }
    }
}

/// Parses a raw text frame received over the wire into a [`Frame`].
///
/// Tries the vendor data envelope first (`Type` in `{"T","D","O"}` with a
/// `Content` object), then falls back to the generic typed control envelope
/// (`PING`/`PONG`/`AUTH_OK`/`AUTH_FAIL`/`ERROR`).
///
/// # Errors
///
/// Returns an error if the text is not valid JSON or matches neither dialect.
pub fn parse_frame(text: &str) -> Result<Frame, crate::websocket::error::WsError> {
    let value: Value = serde_json::from_str(text)?;

    let frame_type = value
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| crate::websocket::error::WsError::Client("missing Type field".to_string()))?;

    match frame_type {
        "T" => {
            let envelope: RawDataEnvelope = serde_json::from_value(value)?;
            let content: RawTickContent = serde_json::from_value(envelope.content)?;
            Ok(Frame::Tick {
                symbol: crate::common::symbol::normalize(&content.symbol),
                last_price: content.last_price,
                bid_price: content.bid_price,
                ask_price: content.ask_price,
                total_volume: content.total_volume,
                timestamp: content.timestamp,
            })
        }
        "D" => {
            let envelope: RawDataEnvelope = serde_json::from_value(value)?;
            let content: RawDepthContent = serde_json::from_value(envelope.content)?;
            Ok(Frame::Depth {
                symbol: crate::common::symbol::normalize(&content.symbol),
                bids: content.bids,
                asks: content.asks,
                timestamp: content.timestamp,
            })
        }
        "O" => {
            let envelope: RawDataEnvelope = serde_json::from_value(value)?;
            let content: RawOrderContent = serde_json::from_value(envelope.content)?;
            Ok(Frame::OrderStatus {
                symbol: crate::common::symbol::normalize(&content.symbol),
                trade_id: content.trade_id,
                price: content.price,
                qty: content.qty,
                side: content.side,
                timestamp: content.timestamp,
                sequence: content.sequence,
            })
        }
        "PING" => Ok(Frame::Ping),
        "PONG" => Ok(Frame::Pong),
        "AUTH_OK" => Ok(Frame::AuthOk),
        "AUTH_FAIL" => {
            let message = value
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("authentication failed")
                .to_string();
            Ok(Frame::AuthFail { message })
        }
        "ERROR" => {
            let message = value
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Ok(Frame::Error { message })
        }
        other => Err(crate::websocket::error::WsError::Client(format!(
            "unrecognised frame Type: {other}"
        ))),
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
    fn parses_tick_frame() {
        let text = r#"{"Type":"T","Content":{"symbol":"AKBNK","lastPrice":"10.5","bidPrice":"10.4","askPrice":"10.6","totalVolume":"1000","timestamp":"2026-01-01T00:00:00Z"}}"#;
        let frame = parse_frame(text).unwrap();
        match frame {
            Frame::Tick { symbol, last_price, .. } => {
                assert_eq!(symbol.as_str(), "AKBNK");
                assert_eq!(last_price, Decimal::new(105, 1));
            }
            other => panic!("expected Tick, got {other:?}"),
        }
    }

    #[rstest]
    fn parses_depth_frame() {
        let text = r#"{"Type":"D","Content":{"symbol":"thyao","bids":[{"price":"1.0","qty":"10"}],"asks":[{"price":"1.1","qty":"5"}],"timestamp":"2026-01-01T00:00:00Z"}}"#;
        let frame = parse_frame(text).unwrap();
        match frame {
            Frame::Depth { symbol, bids, asks, .. } => {
                assert_eq!(symbol.as_str(), "THYAO");
                assert_eq!(bids.len(), 1);
                assert_eq!(asks.len(), 1);
            }
            other => panic!("expected Depth, got {other:?}"),
        }
    }

    #[rstest]
    fn parses_control_frames() {
        assert!(matches!(parse_frame(r#"{"Type":"PING"}"#).unwrap(), Frame::Ping));
        assert!(matches!(parse_frame(r#"{"Type":"PONG"}"#).unwrap(), Frame::Pong));
        assert!(matches!(parse_frame(r#"{"Type":"AUTH_OK"}"#).unwrap(), Frame::AuthOk));
        assert!(matches!(
            parse_frame(r#"{"Type":"AUTH_FAIL","Message":"bad hash"}"#).unwrap(),
            Frame::AuthFail { .. }
        ));
    }

    #[rstest]
    fn rejects_unknown_type() {
        assert!(parse_frame(r#"{"Type":"X"}"#).is_err());
    }

    #[rstest]
    fn routing_key_matches_channel_and_symbol() {
        let frame = Frame::Tick {
            symbol: Ustr::from("AKBNK"),
            last_price: Decimal::ONE,
            bid_price: Decimal::ONE,
            ask_price: Decimal::ONE,
            total_volume: Decimal::ONE,
            timestamp: Utc::now(),
        };
        let (channel, symbol) = frame.routing_key().unwrap();
        assert_eq!(channel, Channel::Tick);
        assert_eq!(symbol.as_str(), "AKBNK");
    }

    #[rstest]
    fn subscription_frame_serializes_per_spec() {
        let frame = SubscriptionFrame::new("hash", Channel::Tick, vec!["AKBNK".to_string()]);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["Type"], "T");
        assert_eq!(json["Symbols"][0], "AKBNK");
        assert_eq!(json["token"], "hash");
    }
}
