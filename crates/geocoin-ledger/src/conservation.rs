//! Token conservation audit.
//!
//! Tokens are minted only when a cache is generated fresh; the exchange
//! protocol only moves them. Across any sequence of collects and deposits,
//! the player's score plus the values of every cache touched is therefore
//! constant, and no token identity may appear in two places at once.
//!
//! ```text
//! player.score + sum(cache.value) == constant
//! ```

use std::collections::BTreeSet;

use geocoin_world::Cache;

use crate::player::PlayerLedger;

/// Token counts held by the player and by a set of caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Holdings {
    /// The player's score.
    pub player_score: u64,
    /// Sum of the caches' values.
    pub cache_total: u64,
}

impl Holdings {
    /// Combined count, saturating at `u64::MAX`.
    pub const fn total(&self) -> u64 {
        self.player_score.saturating_add(self.cache_total)
    }
}

/// A conservation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConservationAnomaly {
    /// Holdings before the audited interval.
    pub before: Holdings,
    /// Holdings after the audited interval.
    pub after: Holdings,
    /// Token identities found in more than one holder.
    pub duplicates: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for ConservationAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// The result of a conservation audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Totals match and every token has one holder.
    Balanced,
    /// Tokens were created, destroyed, or duplicated.
    Anomaly(ConservationAnomaly),
}

/// Count the tokens held by `player` and `caches`.
pub fn tally<'a, I>(player: &PlayerLedger, caches: I) -> Holdings
where
    I: IntoIterator<Item = &'a Cache>,
{
    let cache_total = caches
        .into_iter()
        .fold(0u64, |acc, cache| acc.saturating_add(u64::from(cache.value())));
    Holdings {
        player_score: u64::from(player.score()),
        cache_total,
    }
}

/// Compare holdings across an interval and check token uniqueness now.
pub fn verify_conservation<'a, I>(
    before: Holdings,
    player: &PlayerLedger,
    caches: I,
) -> ConservationResult
where
    I: IntoIterator<Item = &'a Cache> + Clone,
{
    let after = tally(player, caches.clone());

    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    let held = caches
        .into_iter()
        .flat_map(|cache| cache.tokens().iter())
        .chain(player.tokens().iter());
    for token in held {
        if !seen.insert(token) {
            duplicates.push(token.to_string());
        }
    }

    if before.total() == after.total() && duplicates.is_empty() {
        return ConservationResult::Balanced;
    }

    let message = format!(
        "TOKEN_ANOMALY: {} tokens before, {} after, {} duplicated",
        before.total(),
        after.total(),
        duplicates.len()
    );
    tracing::error!(%message, "Conservation check failed");
    ConservationResult::Anomaly(ConservationAnomaly {
        before,
        after,
        duplicates,
        message,
    })
}
