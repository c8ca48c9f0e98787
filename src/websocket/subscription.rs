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

//! Subscription multiplexer (spec §4.6, C6).
//!
//! Tracks the desired symbol set per channel across every consumer and
//! fans decoded frames out to the consumers registered for their
//! `(channel, symbol)` routing key. `ALL` is absorptive: once present in a
//! channel's set, adding specific symbols is bookkeeping only and never
//! changes what goes out on the wire.

use std::sync::Arc;

use ahash::AHashSet;
use dashmap::DashMap;
use ustr::Ustr;
use uuid::Uuid;

use crate::{
    common::{consts::ALL_SYMBOLS, enums::Channel},
    websocket::{
        messages::{Frame, SubscriptionFrame},
        queue::{BackpressurePolicy, ConsumerQueue, PushOutcome},
    },
};

/// Opaque handle returned from [`SubscriptionMultiplexer::subscribe`]. Hold
/// onto it and pass it to `unsubscribe` to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(Uuid);

/// A live subscription: `recv()` yields frames for the `(channel, symbol)`
/// this consumer registered for, until `close()` or the multiplexer drops it.
pub struct Consumer {
    id: ConsumerId,
    queue: Arc<ConsumerQueue>,
}

impl Consumer {
    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.queue.pop().await
    }
}

/// Outbound intent the multiplexer emits when the wire-visible subscription
/// set for a channel changes. The stream client (C5) sends this as a
/// [`SubscriptionFrame`] once it has a valid token.
#[derive(Debug, Clone)]
pub struct SubscriptionIntent {
    pub channel: Channel,
    pub wire_symbols: Vec<String>,
}

#[derive(Default)]
struct ChannelState {
    symbols: AHashSet<Ustr>,
}

impl ChannelState {
    fn wire_symbols(&self) -> Vec<String> {
        if self.symbols.contains(&Ustr::from(ALL_SYMBOLS)) {
            vec![ALL_SYMBOLS.to_string()]
        } else {
            self.symbols.iter().map(Ustr::to_string).collect()
        }
    }
}

/// Per-consumer dispatch queue capacity and backpressure policy (spec §4.6
/// "Backpressure"): time-valued channels drop the oldest frame under
/// pressure, order/trade events block the producer up to a timeout.
fn policy_for(channel: Channel, capacity: usize) -> (usize, BackpressurePolicy) {
    match channel {
        Channel::Tick | Channel::Depth => (capacity, BackpressurePolicy::DropOldest),
        Channel::OrderStatus => (
            capacity,
            BackpressurePolicy::Block { timeout: std::time::Duration::from_secs(5) },
        ),
    }
}

/// Tracks subscription state and fans out decoded frames to consumers.
pub struct SubscriptionMultiplexer {
    channels: DashMap<Channel, ChannelState>,
    handlers: DashMap<(Channel, Ustr), Vec<(ConsumerId, Arc<ConsumerQueue>)>>,
    queue_capacity: usize,
}

impl SubscriptionMultiplexer {
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            handlers: DashMap::new(),
            queue_capacity,
        }
    }

    /// Registers a new consumer for `(channel, symbol)`, returning the
    /// consumer handle and, when the channel's wire-visible set changed, the
    /// intent to (re-)send the merged subscription frame.
    pub fn subscribe(&self, channel: Channel, symbol: Ustr) -> (Consumer, Option<SubscriptionIntent>) {
        let id = ConsumerId(Uuid::new_v4());
        let (capacity, policy) = policy_for(channel, self.queue_capacity);
        let queue = Arc::new(ConsumerQueue::new(capacity, policy));

        self.handlers
            .entry((channel, symbol))
            .or_default()
            .push((id, queue.clone()));

        let intent = self.channels.entry(channel).or_default();
        let mut state = intent;
        let changed = state.symbols.insert(symbol);
        let wire_intent = if changed {
            Some(SubscriptionIntent { channel, wire_symbols: state.wire_symbols() })
        } else {
            None
        };
        drop(state);

        (Consumer { id, queue }, wire_intent)
    }

    /// Removes `consumer` from `(channel, symbol)`. Returns an updated
    /// subscription intent if no consumer remains for that symbol on the
    /// channel (the symbol is dropped from the wire-visible set), unless
    /// `ALL` is still present (absorptive — nothing changes on the wire).
    pub fn unsubscribe(&self, channel: Channel, symbol: Ustr, consumer: ConsumerId) -> Option<SubscriptionIntent> {
        let mut remove_symbol = false;
        if let Some(mut entry) = self.handlers.get_mut(&(channel, symbol)) {
            entry.retain(|(id, _)| *id != consumer);
            remove_symbol = entry.is_empty();
        }
        if remove_symbol {
            self.handlers.remove(&(channel, symbol));
        }

        if !remove_symbol {
            return None;
        }

        let Some(mut state) = self.channels.get_mut(&channel) else { return None };
        state.symbols.remove(&symbol);
        Some(SubscriptionIntent { channel, wire_symbols: state.wire_symbols() })
    }

    /// Dispatches a decoded frame to every consumer registered for its
    /// routing key, plus every consumer registered for `ALL` on that channel
    /// (spec §4.6 "Dispatch": `ALL` consumers receive every symbol).
    pub async fn dispatch(&self, frame: Frame) {
        let Some((channel, symbol)) = frame.routing_key() else { return };

        let mut targets: Vec<Arc<ConsumerQueue>> = Vec::new();
        if let Some(entry) = self.handlers.get(&(channel, symbol)) {
            targets.extend(entry.iter().map(|(_, queue)| queue.clone()));
        }
        if symbol.as_str() != ALL_SYMBOLS {
            if let Some(entry) = self.handlers.get(&(channel, Ustr::from(ALL_SYMBOLS))) {
                targets.extend(entry.iter().map(|(_, queue)| queue.clone()));
            }
        }

        for queue in targets {
            let outcome = queue.push(frame.clone()).await;
            if matches!(outcome, PushOutcome::TimedOut) {
                tracing::warn!(?channel, symbol = %symbol, "consumer exceeded block timeout, disconnecting");
                queue.close();
            }
        }
    }

    /// Returns a [`SubscriptionFrame`] per non-empty channel, for
    /// re-establishing the full desired subscription set after a reconnect
    /// (spec §4.5 "resubscribe before delivering any application frame").
    #[must_use]
    pub fn resubscribe_frames(&self, token: &str) -> Vec<SubscriptionFrame> {
        self.channels
            .iter()
            .filter(|entry| !entry.value().symbols.is_empty())
            .map(|entry| SubscriptionFrame::new(token, *entry.key(), entry.value().wire_symbols()))
            .collect()
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

    fn tick(symbol: &str) -> Frame {
        Frame::Tick {
            symbol: Ustr::from(symbol),
            last_price: Decimal::ONE,
            bid_price: Decimal::ONE,
            ask_price: Decimal::ONE,
            total_volume: Decimal::ONE,
            timestamp: Utc::now(),
        }
    }

    #[rstest]
    fn first_subscribe_issues_intent() {
        let mux = SubscriptionMultiplexer::new(16);
        let (_consumer, intent) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        let intent = intent.expect("first subscriber should emit an intent");
        assert_eq!(intent.wire_symbols, vec!["AKBNK".to_string()]);
    }

    #[rstest]
    fn second_subscribe_same_symbol_is_noop_on_wire() {
        let mux = SubscriptionMultiplexer::new(16);
        let (_c1, _) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        let (_c2, intent) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        assert!(intent.is_none());
    }

    #[rstest]
    fn all_is_absorptive() {
        let mux = SubscriptionMultiplexer::new(16);
        let (_all, _) = mux.subscribe(Channel::Tick, Ustr::from(ALL_SYMBOLS));
        let (_specific, intent) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        assert!(intent.is_none(), "adding a specific symbol under ALL must not touch the wire");

        let frames = mux.resubscribe_frames("tok");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].symbols, vec![ALL_SYMBOLS.to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn dispatch_delivers_to_matching_consumer() {
        let mux = SubscriptionMultiplexer::new(16);
        let (mut consumer, _) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));

        mux.dispatch(tick("AKBNK")).await;

        let frame = consumer.recv().await.unwrap();
        match frame {
            Frame::Tick { symbol, .. } => assert_eq!(symbol.as_str(), "AKBNK"),
            _ => panic!("expected tick"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn all_consumer_receives_every_symbol() {
        let mux = SubscriptionMultiplexer::new(16);
        let (mut consumer, _) = mux.subscribe(Channel::Tick, Ustr::from(ALL_SYMBOLS));

        mux.dispatch(tick("AKBNK")).await;
        mux.dispatch(tick("THYAO")).await;

        assert!(consumer.recv().await.is_some());
        assert!(consumer.recv().await.is_some());
    }

    #[rstest]
    fn unsubscribe_last_consumer_drops_symbol_from_wire() {
        let mux = SubscriptionMultiplexer::new(16);
        let (consumer, _) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        let intent = mux.unsubscribe(Channel::Tick, Ustr::from("AKBNK"), consumer.id());
        let intent = intent.expect("dropping last consumer should update the wire set");
        assert!(intent.wire_symbols.is_empty());
    }

    #[rstest]
    fn unsubscribe_one_of_many_consumers_keeps_symbol_on_wire() {
        let mux = SubscriptionMultiplexer::new(16);
        let (c1, _) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        let (_c2, _) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        let intent = mux.unsubscribe(Channel::Tick, Ustr::from("AKBNK"), c1.id());
        assert!(intent.is_none());
    }

    #[rstest]
    fn resubscribe_frames_cover_all_nonempty_channels() {
        let mux = SubscriptionMultiplexer::new(16);
        mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
        mux.subscribe(Channel::Depth, Ustr::from("THYAO"));

        let frames = mux.resubscribe_frames("tok");
        assert_eq!(frames.len(), 2);
    }
}
