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

//! Connects to the AlgoLab streaming feed and prints decoded frames for the
//! requested symbols. Useful for manually validating the WebSocket client.

use algolab_broker::{
    common::enums::Channel,
    session::SessionStore,
    websocket::{Frame, StreamClient, StreamClientConfig},
};
use clap::Parser;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(about = "Stream AlgoLab tick data for the given symbols")]
struct Args {
    /// Symbols to subscribe to (space separated); defaults to ALL.
    #[arg(long, default_value = "ALL")]
    symbols: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let hostname = std::env::var("ALGOLAB_HOSTNAME").unwrap_or_else(|_| "www.algolab.com.tr".to_string());

    let session = SessionStore::default_location()
        .load()
        .await
        .ok_or_else(|| anyhow::anyhow!("no stored session found; run algolab-http to log in first"))?;

    let config = StreamClientConfig {
        url: format!("wss://{hostname}/ws"),
        heartbeat_interval: std::time::Duration::from_secs(15 * 60),
        pong_timeout: std::time::Duration::from_secs(30),
        first_subscription_deadline: std::time::Duration::from_secs(2),
        reconnect_delay_initial: std::time::Duration::from_secs(1),
        reconnect_delay_max: std::time::Duration::from_secs(60),
        reconnect_backoff_factor: 2.0,
        reconnect_jitter_fraction: 0.20,
        consumer_queue_capacity: 1024,
    };

    let mut client = StreamClient::new(config, session.hash);
    client.connect();

    let mut consumers = Vec::new();
    for symbol in &args.symbols {
        let mut consumer = client.subscribe(Channel::Tick, symbol).await?;
        let symbol = symbol.clone();
        consumers.push(tokio::spawn(async move {
            while let Some(frame) = consumer.recv().await {
                print_frame(&symbol, &frame);
            }
        }));
    }

    tracing::info!("streaming; press Ctrl+C to exit");
    signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C, closing connection");
    client.close().await;
    for handle in consumers {
        handle.abort();
    }

    Ok(())
}

fn print_frame(symbol: &str, frame: &Frame) {
    match frame {
        Frame::Tick { last_price, bid_price, ask_price, timestamp, .. } => {
            tracing::info!(%symbol, %last_price, %bid_price, %ask_price, %timestamp, "tick");
        }
        Frame::Depth { bids, asks, .. } => {
            tracing::info!(%symbol, bids = bids.len(), asks = asks.len(), "depth");
        }
        other => tracing::debug!(%symbol, ?other, "frame"),
    }
}
