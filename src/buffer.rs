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

//! Message buffer (spec §4.7, C7).
//!
//! Keeps the last N frames per `(channel, symbol)` so that non-subscribing
//! pull consumers (HTTP controllers, health probes) can read the last
//! value without paying for a subscription. `N=1` for tick/depth (only the
//! latest value matters), `N=64` for order/trade events.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use ustr::Ustr;

use crate::{common::enums::Channel, websocket::messages::Frame};

const TICK_DEPTH_CAPACITY: usize = 1;
const ORDER_STATUS_CAPACITY: usize = 64;

fn capacity_for(channel: Channel) -> usize {
    match channel {
        Channel::Tick | Channel::Depth => TICK_DEPTH_CAPACITY,
        Channel::OrderStatus => ORDER_STATUS_CAPACITY,
    }
}

struct BufferEntry {
    ring: Vec<Frame>,
    capacity: usize,
    last_touched: Instant,
}

impl BufferEntry {
    fn new(capacity: usize) -> Self {
        Self { ring: Vec::with_capacity(capacity), capacity, last_touched: Instant::now() }
    }

    fn push(&mut self, frame: Frame) {
        if self.ring.len() >= self.capacity {
            self.ring.remove(0);
        }
        self.ring.push(frame);
        self.last_touched = Instant::now();
    }
}

/// In-memory ring buffer keyed by `(channel, symbol)`.
pub struct MessageBuffer {
    entries: DashMap<(Channel, Ustr), BufferEntry>,
    idle_evict_ttl: Duration,
}

impl MessageBuffer {
    #[must_use]
    pub fn new(idle_evict_ttl: Duration) -> Self {
        Self { entries: DashMap::new(), idle_evict_ttl }
    }

    /// Records an incoming frame under its routing key. Control frames
    /// (no routing key) are ignored.
    pub fn record(&self, frame: Frame) {
        let Some((channel, symbol)) = frame.routing_key() else { return };
        self.entries
            .entry((channel, symbol))
            .or_insert_with(|| BufferEntry::new(capacity_for(channel)))
            .push(frame);
    }

    /// Returns the most recent frame for `(channel, symbol)`, if any, and
    /// marks the entry as recently read (resets the idle-eviction clock).
    #[must_use]
    pub fn last(&self, channel: Channel, symbol: Ustr) -> Option<Frame> {
        let mut entry = self.entries.get_mut(&(channel, symbol))?;
        entry.last_touched = Instant::now();
        entry.ring.last().cloned()
    }

    /// Returns up to the full retained history for `(channel, symbol)`,
    /// oldest first, and marks the entry as recently read.
    #[must_use]
    pub fn history(&self, channel: Channel, symbol: Ustr) -> Vec<Frame> {
        let Some(mut entry) = self.entries.get_mut(&(channel, symbol)) else { return Vec::new() };
        entry.last_touched = Instant::now();
        entry.ring.clone()
    }

    /// Evicts entries that have gone untouched for `idleEvictTTL` and are no
    /// longer referenced by any live subscription, per `is_referenced`. The
    /// facade (C8) supplies `is_referenced` from the subscription multiplexer
    /// since the buffer itself has no notion of subscription state.
    pub fn evict_idle(&self, is_referenced: impl Fn(Channel, Ustr) -> bool) {
        let now = Instant::now();
        self.entries.retain(|(channel, symbol), entry| {
            let idle = now.duration_since(entry.last_touched) >= self.idle_evict_ttl;
            !(idle && !is_referenced(*channel, *symbol))
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;
    use rust_decimal::Decimal;

    use super::*;

    fn tick(symbol: &str, price: Decimal) -> Frame {
        Frame::Tick {
            symbol: Ustr::from(symbol),
            last_price: price,
            bid_price: price,
            ask_price: price,
            total_volume: Decimal::ONE,
            timestamp: Utc::now(),
        }
    }

    #[rstest]
    fn tick_buffer_keeps_only_last_value() {
        let buffer = MessageBuffer::new(Duration::from_secs(60));
        buffer.record(tick("AKBNK", Decimal::ONE));
        buffer.record(tick("AKBNK", Decimal::TWO));

        let history = buffer.history(Channel::Tick, Ustr::from("AKBNK"));
        assert_eq!(history.len(), 1);
        match &history[0] {
            Frame::Tick { last_price, .. } => assert_eq!(*last_price, Decimal::TWO),
            _ => panic!("expected tick"),
        }
    }

    #[rstest]
    fn order_status_buffer_keeps_last_64() {
        let buffer = MessageBuffer::new(Duration::from_secs(60));
        for i in 0..70 {
            buffer.record(Frame::OrderStatus {
                symbol: Ustr::from("AKBNK"),
                trade_id: Some(i.to_string()),
                price: Decimal::ONE,
                qty: Decimal::ONE,
                side: crate::common::enums::OrderSide::Buy,
                timestamp: Utc::now(),
                sequence: Some(i),
            });
        }
        let history = buffer.history(Channel::OrderStatus, Ustr::from("AKBNK"));
        assert_eq!(history.len(), 64);
    }

    #[rstest]
    fn last_returns_none_for_unknown_key() {
        let buffer = MessageBuffer::new(Duration::from_secs(60));
        assert!(buffer.last(Channel::Tick, Ustr::from("UNKNOWN")).is_none());
    }

    #[rstest]
    fn eviction_removes_idle_unreferenced_entries() {
        let buffer = MessageBuffer::new(Duration::from_millis(1));
        buffer.record(tick("AKBNK", Decimal::ONE));
        std::thread::sleep(Duration::from_millis(5));

        buffer.evict_idle(|_, _| false);
        assert_eq!(buffer.len(), 0);
    }

    #[rstest]
    fn eviction_keeps_referenced_entries() {
        let buffer = MessageBuffer::new(Duration::from_millis(1));
        buffer.record(tick("AKBNK", Decimal::ONE));
        std::thread::sleep(Duration::from_millis(5));

        buffer.evict_idle(|_, _| true);
        assert_eq!(buffer.len(), 1);
    }

    #[rstest]
    fn reading_resets_idle_clock() {
        let buffer = MessageBuffer::new(Duration::from_millis(20));
        buffer.record(tick("AKBNK", Decimal::ONE));
        std::thread::sleep(Duration::from_millis(10));
        assert!(buffer.last(Channel::Tick, Ustr::from("AKBNK")).is_some());
        std::thread::sleep(Duration::from_millis(10));

        buffer.evict_idle(|_, _| false);
        assert_eq!(buffer.len(), 1, "recent read should have reset the idle clock");
    }
}
