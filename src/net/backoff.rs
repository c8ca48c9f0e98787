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

//! Exponential backoff with jitter, used by the stream client's reconnect
//! policy (spec §4.5) and by the request client's `Transient` retry policy
//! (spec §4.3). The observable contract (monotonic growth to a cap, bounded
//! jitter, `reset()` restores the initial state, optional zero-delay first
//! attempt) matches the property-tested contract this adapter family holds
//! its network backoff helper to.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff generator with proportional jitter.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter_ms: u64,
    immediate_first: bool,
    current: Duration,
    first_call: bool,
}

impl ExponentialBackoff {
    /// Creates a new backoff generator.
    ///
    /// # Errors
    ///
    /// Returns an error if `factor` is outside `[1.0, 100.0]`.
    pub fn new(
        initial: Duration,
        max: Duration,
        factor: f64,
        jitter_ms: u64,
        immediate_first: bool,
    ) -> Result<Self, String> {
        if !(1.0..=100.0).contains(&factor) {
            return Err(format!("backoff factor {factor} out of range [1.0, 100.0]"));
        }
        Ok(Self {
            initial,
            max,
            factor,
            jitter_ms,
            immediate_first,
            current: initial,
            first_call: true,
        })
    }

    /// The current base delay (before jitter), for inspection in tests.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    /// Returns the next delay to wait, advancing internal state. When
    /// `immediate_first` is set, the very first call returns `Duration::ZERO`
    /// without consuming a growth step.
    pub fn next_duration(&mut self) -> Duration {
        if self.immediate_first && self.first_call {
            self.first_call = false;
            return Duration::ZERO;
        }
        self.first_call = false;

        let base = self.current;
        self.current = self.grow(self.current);

        if self.jitter_ms == 0 {
            return base;
        }
        let jitter = rand::rng().random_range(0..=self.jitter_ms);
        base + Duration::from_millis(jitter)
    }

    fn grow(&self, current: Duration) -> Duration {
        let grown_ms = (current.as_millis() as f64 * self.factor) as u64;
        let grown = Duration::from_millis(grown_ms.max(current.as_millis() as u64));
        grown.min(self.max).max(self.initial)
    }

    /// Restores the generator to its freshly-constructed state (spec §4.5:
    /// a successful connection resets the reconnect backoff).
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.first_call = true;
    }
}

/// Applies symmetric jitter of `fraction` (e.g. 0.20 for ±20%) to `base`.
#[must_use]
pub fn jitter_symmetric(base: Duration, fraction: f64) -> Duration {
    if fraction <= 0.0 {
        return base;
    }
    let base_ms = base.as_millis() as f64;
    let spread = base_ms * fraction;
    let delta = rand::rng().random_range(-spread..=spread);
    let result_ms = (base_ms + delta).max(0.0);
    Duration::from_millis(result_ms as u64)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
