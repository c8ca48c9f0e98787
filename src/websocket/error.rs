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

//! Error types for the AlgoLab WebSocket stream client (C5).

use thiserror::Error;

pub type WsResult<T> = Result<T, WsError>;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("websocket not connected")]
    NotConnected,

    #[error("websocket send error: {0}")]
    Send(String),

    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("client error: {0}")]
    Client(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for WsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<WsError> for crate::error::Error {
    fn from(error: WsError) -> Self {
        crate::error::Error::Transient { message: error.to_string() }
    }
}
