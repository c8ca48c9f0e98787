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

//! Exercises the AlgoLab REST surface against a live account.
//!
//! Run with:
//! ```bash
//! ALGOLAB_API_KEY=... ALGOLAB_USERNAME=... ALGOLAB_PASSWORD=... \
//!   cargo run --features cli --bin algolab-http -- --symbol AKBNK
//! ```

use algolab_broker::{
    AlgoLabAdapter, AlgoLabConfig,
    common::credential::Credentials,
    http::client::{RequestClient, RequestClientConfig},
    session::SessionStore,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Query AlgoLab REST endpoints using stored or env credentials")]
struct Args {
    /// Symbol to query equity info and market data for.
    #[arg(long, default_value = "AKBNK")]
    symbol: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let config = AlgoLabConfig::from_env()?;
    let adapter = build_adapter(&config).await?;

    match adapter.get_positions().await {
        Ok(positions) => {
            println!("[OK] {} open positions", positions.len());
            for position in positions.iter().take(5) {
                println!("   - {} qty={} avg_cost={}", position.symbol, position.quantity, position.avg_cost);
            }
        }
        Err(error) => println!("[INFO] positions unavailable (login first?): {error}"),
    }

    println!("\nquerying equity info for {}", args.symbol);
    match adapter.get_equity_info(&args.symbol).await {
        Ok(info) => println!("[OK] {info:?}"),
        Err(error) => println!("[ERROR] {error}"),
    }

    Ok(())
}

async fn build_adapter(config: &AlgoLabConfig) -> anyhow::Result<AlgoLabAdapter> {
    let credentials =
        Credentials::new(config.api_key.as_str(), config.username.as_str(), config.password.as_str(), config.hostname.as_str());
    let request_client = RequestClient::new(
        RequestClientConfig {
            base_url: config.http_base_url(),
            request_timeout: config.request_timeout,
            max_retries: config.max_retries,
            retry_delay_initial: config.retry_delay_initial,
        },
        credentials.clone(),
    )?;

    let session_store = config
        .session_path
        .clone()
        .map(SessionStore::new)
        .unwrap_or_else(SessionStore::default_location);

    let auth =
        algolab_broker::auth::AuthCoordinator::new(session_store, request_client.clone(), credentials, config.session_ttl)
            .await;
    Ok(AlgoLabAdapter::new(config, request_client, auth))
}
