//! The collect/deposit exchange protocol between a cache and the player.
//!
//! Both operations move exactly one token, by identity, and adjust the
//! player's score by one in the same direction. A failed precondition is a
//! normal outcome of UI interaction, not an error: the operation returns
//! [`ExchangeOutcome::Skipped`] and leaves both sides untouched.
//!
//! | Operation | Precondition | Effect |
//! |-----------|--------------|--------|
//! | collect | cache value > 0 | cache -1 token, player +1 token, score +1 |
//! | deposit | score > 0 and player holds a token | player -1 token, cache +1 token, score -1 |

use geocoin_world::Cache;

use crate::player::PlayerLedger;

/// Why an exchange did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Collect from a cache with no tokens.
    CacheEmpty,
    /// Deposit with a score of zero.
    NoScore,
    /// Deposit while holding no tokens.
    NoTokens,
    /// Collect would overflow the score counter.
    ScoreOverflow,
}

/// Result of a collect or deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// One token moved and the score changed by one.
    Applied,
    /// A precondition failed; nothing changed.
    Skipped(SkipReason),
}

impl ExchangeOutcome {
    /// Whether the exchange changed any state.
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Move the cache's most recently added token to the player.
pub fn collect(cache: &mut Cache, player: &mut PlayerLedger) -> ExchangeOutcome {
    if player.score() == u32::MAX {
        return ExchangeOutcome::Skipped(SkipReason::ScoreOverflow);
    }
    let Some(token) = cache.take_token() else {
        return ExchangeOutcome::Skipped(SkipReason::CacheEmpty);
    };
    if let Err(err) = player.receive(token.clone()) {
        // Unreachable after the guard above; put the token back regardless.
        tracing::warn!(cell = %cache.address(), error = %err, "Collect rolled back");
        cache.put_token(token);
        return ExchangeOutcome::Skipped(SkipReason::ScoreOverflow);
    }
    tracing::debug!(
        cell = %cache.address(),
        token = %token,
        value = cache.value(),
        score = player.score(),
        "Collected token"
    );
    ExchangeOutcome::Applied
}

/// Move the player's most recently acquired token into the cache.
pub fn deposit(cache: &mut Cache, player: &mut PlayerLedger) -> ExchangeOutcome {
    if player.score() == 0 {
        return ExchangeOutcome::Skipped(SkipReason::NoScore);
    }
    if player.tokens().is_empty() {
        return ExchangeOutcome::Skipped(SkipReason::NoTokens);
    }
    let Some(token) = player.surrender() else {
        return ExchangeOutcome::Skipped(SkipReason::NoTokens);
    };
    tracing::debug!(
        cell = %cache.address(),
        token = %token,
        score = player.score(),
        "Deposited token"
    );
    cache.put_token(token);
    ExchangeOutcome::Applied
}
