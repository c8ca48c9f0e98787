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

//! Bounded per-consumer dispatch queues (spec §4.6 "Backpressure", §5).
//!
//! Two policies are supported: `DropOldest` for time-valued market data
//! (tick/depth) and `Block` with a timeout for order/trade events, where
//! every delivery matters. `Block` disconnects the consumer if the timeout
//! elapses with the queue still full.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::Notify;

use crate::websocket::messages::Frame;

/// Backpressure policy applied when a consumer's queue is full.
#[derive(Debug, Clone, Copy)]
pub enum BackpressurePolicy {
    /// Drop the oldest buffered frame to make room for the new one.
    DropOldest,
    /// Wait up to `timeout` for room; disconnect the consumer on timeout.
    Block { timeout: Duration },
}

/// A bounded, single-consumer dispatch queue.
#[derive(Debug)]
pub struct ConsumerQueue {
    capacity: usize,
    policy: BackpressurePolicy,
    buffer: Mutex<VecDeque<Frame>>,
    not_empty: Notify,
    not_full: Notify,
    closed: AtomicBool,
}

/// Outcome of pushing a frame onto a consumer's queue.
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// Oldest frame was dropped to make room (`DropOldest` policy only).
    DroppedOldest,
    /// The consumer exceeded its block timeout and should be disconnected.
    TimedOut,
}

impl ConsumerQueue {
    #[must_use]
    pub fn new(capacity: usize, policy: BackpressurePolicy) -> Self {
        Self {
            capacity: capacity.max(1),
            policy,
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(256))),
            not_empty: Notify::new(),
            not_full: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Pushes `frame` onto the queue, applying the configured backpressure
    /// policy. This is the "consumer queue enqueue" suspension point named
    /// in spec §5 for the `Block` policy.
    pub async fn push(&self, frame: Frame) -> PushOutcome {
        match self.policy {
            BackpressurePolicy::DropOldest => {
                let mut outcome = PushOutcome::Delivered;
                {
                    let mut guard = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
                    if guard.len() >= self.capacity {
                        guard.pop_front();
                        outcome = PushOutcome::DroppedOldest;
                    }
                    guard.push_back(frame);
                }
                self.not_empty.notify_one();
                outcome
            }
            BackpressurePolicy::Block { timeout } => {
                loop {
                    {
                        let mut guard = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
                        if guard.len() < self.capacity {
                            guard.push_back(frame);
                            drop(guard);
                            self.not_empty.notify_one();
                            return PushOutcome::Delivered;
                        }
                    }
                    let notified = self.not_full.notified();
                    if tokio::time::timeout(timeout, notified).await.is_err() {
                        return PushOutcome::TimedOut;
                    }
                }
            }
        }
    }

    /// Pops the next frame, waiting until one is available or the queue is
    /// closed. Returns `None` once closed and drained.
    pub async fn pop(&self) -> Option<Frame> {
        loop {
            {
                let mut guard = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
                if let Some(frame) = guard.pop_front() {
                    drop(guard);
                    self.not_full.notify_one();
                    return Some(frame);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.not_empty.notified().await;
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_waiters();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(|p| p.into_inner()).len()
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
    use ustr::Ustr;

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
    #[tokio::test]
    async fn drop_oldest_evicts_when_full() {
        let queue = ConsumerQueue::new(2, BackpressurePolicy::DropOldest);

        assert_eq!(queue.push(tick("A")).await, PushOutcome::Delivered);
        assert_eq!(queue.push(tick("B")).await, PushOutcome::Delivered);
        assert_eq!(queue.push(tick("C")).await, PushOutcome::DroppedOldest);

        assert_eq!(queue.len(), 2);
        let first = queue.pop().await.unwrap();
        match first {
            Frame::Tick { symbol, .. } => assert_eq!(symbol.as_str(), "B"),
            _ => panic!("expected tick"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn block_policy_times_out_when_full() {
        let queue = ConsumerQueue::new(1, BackpressurePolicy::Block { timeout: Duration::from_millis(20) });

        assert_eq!(queue.push(tick("A")).await, PushOutcome::Delivered);
        assert_eq!(queue.push(tick("B")).await, PushOutcome::TimedOut);
    }

    #[rstest]
    #[tokio::test]
    async fn block_policy_delivers_once_room_frees_up() {
        let queue = std::sync::Arc::new(ConsumerQueue::new(1, BackpressurePolicy::Block { timeout: Duration::from_secs(1) }));
        queue.push(tick("A")).await;

        let queue_clone = queue.clone();
        let pusher = tokio::spawn(async move { queue_clone.push(tick("B")).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        let popped = queue.pop().await.unwrap();
        match popped {
            Frame::Tick { symbol, .. } => assert_eq!(symbol.as_str(), "A"),
            _ => panic!("expected tick"),
        }

        assert_eq!(pusher.await.unwrap(), PushOutcome::Delivered);
    }

    #[rstest]
    #[tokio::test]
    async fn fifo_order_preserved() {
        let queue = ConsumerQueue::new(10, BackpressurePolicy::DropOldest);
        for sym in ["A", "B", "C"] {
            queue.push(tick(sym)).await;
        }
        for expected in ["A", "B", "C"] {
            let frame = queue.pop().await.unwrap();
            match frame {
                Frame::Tick { symbol, .. } => assert_eq!(symbol.as_str(), expected),
                _ => panic!("expected tick"),
            }
        }
    }

    #[rstest]
    #[tokio::test]
    async fn close_wakes_pending_pop() {
        let queue = std::sync::Arc::new(ConsumerQueue::new(4, BackpressurePolicy::DropOldest));
        let queue_clone = queue.clone();
        let popper = tokio::spawn(async move { queue_clone.pop().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();

        assert!(popper.await.unwrap().is_none());
    }
}
