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

//! Streaming client (spec §4.5, C5).
//!
//! Owns a single WebSocket connection, reconnecting with exponential
//! backoff and jitter on any transport failure, resubscribing the full
//! desired symbol set (held by [`SubscriptionMultiplexer`]) before any
//! application frame can reach a consumer. A background heartbeat keeps
//! the connection alive; nautilus-style `WebSocketClient` wrappers aren't
//! vendored in this tree, so the connect/read/write/reconnect loop is
//! folded directly into this client rather than split behind a generic
//! transport abstraction.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    common::{consts::PING_MESSAGE, enums::Channel},
    net::backoff::{ExponentialBackoff, jitter_symmetric},
    websocket::{
        error::{WsError, WsResult},
        messages::{Frame, SubscriptionFrame, parse_frame},
        subscription::{Consumer, SubscriptionMultiplexer},
    },
};

/// Connection lifecycle state (spec GLOSSARY "Stream client").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsState {
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
    Closed,
}

/// Tunables for the reconnect policy and heartbeat cadence.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    pub url: String,
    pub heartbeat_interval: Duration,
    /// Idle deadline armed each time a PING is sent and reset on receipt of
    /// the matching PONG (spec §4.5 "receipt of PONG resets an idle
    /// deadline"); a connection that never answers a PING is recycled
    /// rather than held open against a server that silently dropped it.
    pub pong_timeout: Duration,
    pub first_subscription_deadline: Duration,
    pub reconnect_delay_initial: Duration,
    pub reconnect_delay_max: Duration,
    pub reconnect_backoff_factor: f64,
    /// Symmetric jitter fraction applied to each reconnect delay (spec §4.5: ±20%).
    pub reconnect_jitter_fraction: f64,
    pub consumer_queue_capacity: usize,
}

enum Outbound {
    Text(String),
}

/// Streaming client for AlgoLab's WebSocket feed.
pub struct StreamClient {
    config: StreamClientConfig,
    token: Arc<RwLock<String>>,
    state: Arc<RwLock<WsState>>,
    multiplexer: Arc<SubscriptionMultiplexer>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Outbound>>,
    shutdown: Arc<AtomicBool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl StreamClient {
    #[must_use]
    pub fn new(config: StreamClientConfig, token: String) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            multiplexer: Arc::new(SubscriptionMultiplexer::new(config.consumer_queue_capacity)),
            config,
            token: Arc::new(RwLock::new(token)),
            state: Arc::new(RwLock::new(WsState::Disconnected)),
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            shutdown: Arc::new(AtomicBool::new(false)),
            task_handle: None,
        }
    }

    #[must_use]
    pub async fn state(&self) -> WsState {
        *self.state.read().await
    }

    /// Updates the token used in outgoing subscription frames, e.g. after a
    /// session refresh (spec §4.4: the stream client re-reads the current
    /// token on its next subscription send, it does not itself reconnect).
    pub async fn set_token(&self, token: String) {
        *self.token.write().await = token;
    }

    /// Starts the connect/reconnect background task.
    ///
    /// # Panics
    ///
    /// Panics if called twice on the same client without an intervening
    /// [`Self::close`].
    pub fn connect(&mut self) {
        let outbound_rx = self.outbound_rx.take().expect("connect() called twice");

        self.shutdown.store(false, Ordering::Relaxed);
        let handle = tokio::spawn(run_loop(
            self.config.clone(),
            self.token.clone(),
            self.state.clone(),
            self.multiplexer.clone(),
            outbound_rx,
            self.shutdown.clone(),
        ));
        self.task_handle = Some(handle);
    }

    /// Stops the background task and marks the client closed.
    pub async fn close(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        *self.state.write().await = WsState::Closed;
    }

    /// Subscribes to `channel`/`symbol`, sending a merged subscription frame
    /// if the wire-visible set for the channel changed.
    pub async fn subscribe(&self, channel: Channel, symbol: &str) -> WsResult<Consumer> {
        let normalized = crate::common::symbol::normalize(symbol);
        let (consumer, intent) = self.multiplexer.subscribe(channel, normalized);
        if let Some(intent) = intent {
            self.send_subscription(intent.channel, intent.wire_symbols).await?;
        }
        Ok(consumer)
    }

    pub async fn unsubscribe(&self, channel: Channel, symbol: &str, consumer: crate::websocket::subscription::ConsumerId) -> WsResult<()> {
        let normalized = crate::common::symbol::normalize(symbol);
        if let Some(intent) = self.multiplexer.unsubscribe(channel, normalized, consumer) {
            self.send_subscription(intent.channel, intent.wire_symbols).await?;
        }
        Ok(())
    }

    async fn send_subscription(&self, channel: Channel, symbols: Vec<String>) -> WsResult<()> {
        let token = self.token.read().await.clone();
        let frame = SubscriptionFrame::new(token, channel, symbols);
        let text = serde_json::to_string(&frame)?;
        self.outbound_tx
            .send(Outbound::Text(text))
            .map_err(|_| WsError::NotConnected)
    }
}

async fn run_loop(
    config: StreamClientConfig,
    token: Arc<RwLock<String>>,
    state: Arc<RwLock<WsState>>,
    multiplexer: Arc<SubscriptionMultiplexer>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    shutdown: Arc<AtomicBool>,
) {
    let mut backoff = ExponentialBackoff::new(
        config.reconnect_delay_initial,
        config.reconnect_delay_max,
        config.reconnect_backoff_factor,
        0,
        true,
    )
    .expect("reconnect backoff factor must be within [1.0, 100.0]");
    let jitter_fraction = config.reconnect_jitter_fraction;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        *state.write().await = WsState::Connecting;
        let connected = tokio_tungstenite::connect_async(&config.url).await;

        let Ok((ws_stream, _response)) = connected else {
            let error = connected.unwrap_err();
            tracing::warn!(%error, "stream connect failed, backing off");
            let delay = jitter_symmetric(backoff.next_duration(), jitter_fraction);
            tokio::time::sleep(delay).await;
            continue;
        };

        backoff.reset();
        *state.write().await = WsState::Connected;
        tracing::debug!(url = %config.url, "stream connected");

        let (mut sink, mut stream) = ws_stream.split();

        let current_token = token.read().await.clone();
        let mut resubscribe_failed = false;
        for frame in multiplexer.resubscribe_frames(&current_token) {
            let Ok(text) = serde_json::to_string(&frame) else { continue };
            if sink.send(Message::Text(text.into())).await.is_err() {
                resubscribe_failed = true;
                break;
            }
        }
        if resubscribe_failed {
            *state.write().await = WsState::Disconnected;
            let delay = jitter_symmetric(backoff.next_duration(), jitter_fraction);
            tokio::time::sleep(delay).await;
            continue;
        }

        let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let first_subscription_deadline = tokio::time::sleep(config.first_subscription_deadline);
        tokio::pin!(first_subscription_deadline);
        let mut deadline_armed = true;

        // Armed on every PING we send, reset on every PONG we receive; fires
        // only when a PING has gone unanswered for `pong_timeout`.
        let pong_deadline = tokio::time::sleep(config.pong_timeout);
        tokio::pin!(pong_deadline);
        let mut pong_deadline_armed = false;

        'conn: loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match parse_frame(&text) {
                                Ok(Frame::Ping) => {
                                    if sink.send(Message::Text(PING_MESSAGE.to_string().into())).await.is_err() {
                                        break 'conn;
                                    }
                                }
                                Ok(Frame::Pong) => {
                                    pong_deadline.as_mut().reset(tokio::time::Instant::now() + config.pong_timeout);
                                }
                                Ok(Frame::AuthOk) => {
                                    *state.write().await = WsState::Authenticated;
                                }
                                Ok(Frame::AuthFail { message }) => {
                                    tracing::warn!(%message, "stream auth rejected");
                                    break 'conn;
                                }
                                Ok(Frame::Error { message }) => {
                                    tracing::warn!(%message, "stream error frame");
                                }
                                Ok(frame) => {
                                    deadline_armed = false;
                                    multiplexer.dispatch(frame).await;
                                }
                                Err(error) => {
                                    tracing::debug!(%error, "failed to parse stream frame");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break 'conn,
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            tracing::warn!(%error, "stream transport error");
                            break 'conn;
                        }
                    }
                }
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(Outbound::Text(text)) => {
                            deadline_armed = false;
                            if sink.send(Message::Text(text.into())).await.is_err() {
                                break 'conn;
                            }
                        }
                        None => break 'conn,
                    }
                }
                _ = heartbeat.tick() => {
                    if sink.send(Message::Text(PING_MESSAGE.to_string().into())).await.is_err() {
                        break 'conn;
                    }
                    pong_deadline.as_mut().reset(tokio::time::Instant::now() + config.pong_timeout);
                    pong_deadline_armed = true;
                }
                () = &mut first_subscription_deadline, if deadline_armed => {
                    tracing::debug!("no subscription sent within deadline, recycling connection");
                    break 'conn;
                }
                () = &mut pong_deadline, if pong_deadline_armed => {
                    tracing::warn!("no PONG received within idle deadline, recycling connection");
                    break 'conn;
                }
            }

            if shutdown.load(Ordering::Relaxed) {
                break 'conn;
            }
        }

        *state.write().await = WsState::Disconnected;
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let delay = jitter_symmetric(backoff.next_duration(), jitter_fraction);
        tokio::time::sleep(delay).await;
    }

    *state.write().await = WsState::Closed;
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
