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

//! Broker integration runtime adapting the AlgoLab REST/WebSocket API for
//! Turkish (BIST) equities into a stable internal broker contract.
//!
//! The crate is organized around eight collaborating components:
//!
//! - [`common::credential`]: request signing (`APIKEY`/`Checker` headers).
//! - [`session`]: durable session persistence.
//! - [`http::client`]: signed REST calls with classification and retry.
//! - [`auth`]: the login/refresh/logout state machine.
//! - [`websocket::client`]: the reconnecting streaming connection.
//! - [`websocket::subscription`]: per-consumer fan-out over the stream.
//! - [`buffer`]: last-value/ring buffering for non-subscribing readers.
//! - [`adapter`]: the facade composing all of the above.
//!
//! # Feature flags
//!
//! - `cli`: builds the `algolab-http` and `algolab-ws` example binaries.

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
// Credentials and AlgoLabConfig deliberately omit Debug to keep secret
// material out of log output; missing_debug_implementations stays a warn.
#![warn(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod adapter;
pub mod auth;
pub mod buffer;
pub mod common;
pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod session;
pub mod websocket;

pub use adapter::AlgoLabAdapter;
pub use config::AlgoLabConfig;
pub use error::{Error, Result};
