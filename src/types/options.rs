//! Session options and configuration
//!
//! Pacing, warm-up, and wait-bound knobs for a conversation session, with a
//! builder for easy configuration.

use std::time::Duration;

/// Default base pacing delay between messages in a turn
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound of the uniform jitter added to pacing delays when
/// randomization is enabled
pub const DEFAULT_JITTER_CAP: Duration = Duration::from_secs(5);

/// Default warm-up wait after subscribing, letting backend backlog drain
/// into the listener buffers before the turn loop trusts them
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(3);

/// Default bound on every turn-engine wait.
///
/// A wait that exceeds it surfaces [`crate::SimError::TurnTimeout`] instead
/// of hanging the session.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for one conversation session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Number of turns to run
    pub num_turns: u32,
    /// Base pacing delay applied after every outbound send and turn
    pub delay: Duration,
    /// Whether to add uniform jitter on top of the base delay
    pub randomize: bool,
    /// Jitter upper bound
    pub jitter_cap: Duration,
    /// Warm-up wait between subscribing and the first turn
    pub warmup: Duration,
    /// Bound on each wait for an expected message
    pub turn_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            num_turns: 1,
            delay: DEFAULT_DELAY,
            randomize: false,
            jitter_cap: DEFAULT_JITTER_CAP,
            warmup: DEFAULT_WARMUP,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }
}

impl SessionOptions {
    /// Create a new builder for `SessionOptions`
    #[must_use]
    pub fn builder() -> SessionOptionsBuilder {
        SessionOptionsBuilder::default()
    }
}

/// Builder for [`SessionOptions`]
#[derive(Debug, Default)]
pub struct SessionOptionsBuilder {
    options: SessionOptions,
}

impl SessionOptionsBuilder {
    /// Set the number of turns
    #[must_use]
    pub fn num_turns(mut self, num_turns: u32) -> Self {
        self.options.num_turns = num_turns;
        self
    }

    /// Set the base pacing delay
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay = delay;
        self
    }

    /// Enable or disable pacing jitter
    #[must_use]
    pub fn randomize(mut self, randomize: bool) -> Self {
        self.options.randomize = randomize;
        self
    }

    /// Set the jitter upper bound
    #[must_use]
    pub fn jitter_cap(mut self, jitter_cap: Duration) -> Self {
        self.options.jitter_cap = jitter_cap;
        self
    }

    /// Set the warm-up wait
    #[must_use]
    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.options.warmup = warmup;
        self
    }

    /// Set the per-wait turn timeout
    #[must_use]
    pub fn turn_timeout(mut self, turn_timeout: Duration) -> Self {
        self.options.turn_timeout = turn_timeout;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> SessionOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let options = SessionOptions::default();
        assert_eq!(options.num_turns, 1);
        assert!(!options.randomize);
        // the default policy is a bounded wait, never hang-forever
        assert!(options.turn_timeout > Duration::ZERO);
    }

    #[test]
    fn builder_overrides() {
        let options = SessionOptions::builder()
            .num_turns(3)
            .delay(Duration::from_millis(10))
            .randomize(true)
            .turn_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(options.num_turns, 3);
        assert_eq!(options.delay, Duration::from_millis(10));
        assert!(options.randomize);
        assert_eq!(options.turn_timeout, Duration::from_secs(5));
    }
}
