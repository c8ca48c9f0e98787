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

//! End-to-end coverage for the subscribe/reconnect and `ALL`-absorption
//! scenarios described for the subscription multiplexer: two independent
//! consumers build up wire state across two channels, then a simulated
//! reconnect must resubscribe the full merged set for every channel that
//! still has a live consumer.

use algolab_broker::{
    common::enums::Channel,
    websocket::{Frame, SubscriptionMultiplexer},
};
use chrono::Utc;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use ustr::Ustr;

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

#[tokio::test]
async fn subscribe_then_reconnect_resends_merged_set() {
    let mux = SubscriptionMultiplexer::new(32);

    let (_c1, intent1) = mux.subscribe(Channel::Tick, Ustr::from("AKBNK"));
    let intent1 = intent1.expect("first subscriber always changes the wire set");
    assert_eq!(intent1.wire_symbols, vec!["AKBNK".to_string()]);

    let (_c2, intent2) = mux.subscribe(Channel::Tick, Ustr::from("THYAO"));
    let intent2 = intent2.expect("second symbol on the same channel changes the wire set");
    let mut symbols = intent2.wire_symbols.clone();
    symbols.sort();
    assert_eq!(symbols, vec!["AKBNK".to_string(), "THYAO".to_string()]);

    // Simulate a disconnect/reconnect: the client asks the multiplexer for
    // the frames needed to re-establish every non-empty channel.
    let frames = mux.resubscribe_frames("session-hash");
    assert_eq!(frames.len(), 1, "only TICK has live consumers");
    let mut resent = frames[0].symbols.clone();
    resent.sort();
    assert_eq!(resent, vec!["AKBNK".to_string(), "THYAO".to_string()]);
    assert_eq!(frames[0].frame_type, Channel::Tick.wire_code());
}

#[tokio::test]
async fn all_absorption_delivers_to_every_registered_consumer() {
    let mux = SubscriptionMultiplexer::new(32);

    let (mut all_consumer, _) = mux.subscribe(Channel::Tick, Ustr::from("ALL"));
    let (_specific, intent) = mux.subscribe(Channel::Tick, Ustr::from("GARAN"));
    assert!(intent.is_none(), "ALL already covers every symbol; adding GARAN must not touch the wire");

    let (mut specific_consumer, _) = mux.subscribe(Channel::Tick, Ustr::from("GARAN"));

    mux.dispatch(tick("GARAN")).await;

    let via_all = all_consumer.recv().await.expect("ALL consumer should receive GARAN ticks");
    let via_specific = specific_consumer.recv().await.expect("GARAN consumer should receive its own ticks");
    match (via_all, via_specific) {
        (Frame::Tick { symbol: a, .. }, Frame::Tick { symbol: b, .. }) => {
            assert_eq!(a.as_str(), "GARAN");
            assert_eq!(b.as_str(), "GARAN");
        }
        _ => panic!("expected tick frames"),
    }
}
