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

//! Streaming client (C5), subscription multiplexer (C6), and their wire
//! types.

pub mod client;
pub mod error;
pub mod messages;
pub mod queue;
pub mod subscription;

pub use client::{StreamClient, StreamClientConfig, WsState};
pub use error::{WsError, WsResult};
pub use messages::Frame;
pub use subscription::{Consumer, ConsumerId, SubscriptionMultiplexer};
