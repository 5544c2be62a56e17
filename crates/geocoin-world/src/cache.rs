//! The cache entity: tokens physically present in one cell.
//!
//! A [`Cache`] exists in memory only while its cell is in the player's
//! active neighborhood. It is created either fresh, minting tokens from the
//! deterministic draws, or by restoring a memento. Its `value` is the length
//! of its token list, so the two can never drift apart.
//!
//! Tokens leave and enter at the back of the list (most recently added
//! first), which keeps collect/deposit ordering deterministic.

use std::sync::Arc;

use geocoin_types::{CacheView, CellAddress, Memento, Token};

use crate::error::WorldError;
use crate::luck::{LuckSource, SpawnRules};
use crate::memento;
use crate::registry::Cell;

/// Live, mutable state of a cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cache {
    cell: Arc<Cell>,
    tokens: Vec<Token>,
}

impl Cache {
    /// Mint a fresh cache holding `value` tokens serialized `0..value`.
    pub fn mint(cell: Arc<Cell>, value: u32) -> Self {
        let tokens = (0..value)
            .map(|serial| Token {
                origin: cell.tag().to_owned(),
                serial,
            })
            .collect();
        Self { cell, tokens }
    }

    /// Deterministically generate the cache for `cell`, if one spawns there.
    ///
    /// Returns `None` when the spawn draw misses.
    pub fn generate<L: LuckSource + ?Sized>(
        cell: Arc<Cell>,
        rules: &SpawnRules,
        luck: &L,
    ) -> Option<Self> {
        let address = cell.address();
        if !rules.should_spawn(luck, address) {
            return None;
        }
        let value = rules.initial_value(luck, address);
        tracing::trace!(cell = %address, value, "Generated fresh cache");
        Some(Self::mint(cell, value))
    }

    /// Rebuild a cache for `cell` from a stored memento.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Deserialization`] if the memento is malformed.
    pub fn from_memento(cell: Arc<Cell>, memento: &Memento) -> Result<Self, WorldError> {
        let tokens = memento::decode(memento)?;
        Ok(Self { cell, tokens })
    }

    /// Overwrite this cache's contents with the state in `memento`.
    ///
    /// On error the cache is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Deserialization`] if the memento is malformed.
    pub fn restore(&mut self, memento: &Memento) -> Result<(), WorldError> {
        self.tokens = memento::decode(memento)?;
        Ok(())
    }

    /// Snapshot the mutable state.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if encoding fails.
    pub fn to_memento(&self) -> Result<Memento, WorldError> {
        memento::encode(&self.tokens)
    }

    /// The canonical cell this cache lives in.
    pub const fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    /// Shorthand for the cell's address.
    pub fn address(&self) -> CellAddress {
        self.cell.address()
    }

    /// Number of tokens inside.
    pub fn value(&self) -> u32 {
        // A cache never holds more than u32::MAX tokens: they are minted
        // from a u32 and only move one at a time.
        u32::try_from(self.tokens.len()).unwrap_or(u32::MAX)
    }

    /// Whether the cache holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens inside, oldest first.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Remove and return the most recently added token.
    pub fn take_token(&mut self) -> Option<Token> {
        self.tokens.pop()
    }

    /// Put a token into the cache.
    pub fn put_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Read-only snapshot for rendering.
    pub fn view(&self) -> CacheView {
        CacheView {
            cell: self.cell.address(),
            bounds: self.cell.bounds(),
            value: self.value(),
            tokens: self.tokens.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::luck::{FixedLuck, HashLuck, INITIAL_VALUE_TAG, SPAWN_TAG};
    use crate::registry::CellRegistry;

    fn scenario() -> (CellRegistry, FixedLuck) {
        let cell = CellAddress::new(10, 20);
        let luck = FixedLuck::new(0.99)
            .with(cell, SPAWN_TAG, 0.01)
            .with(cell, INITIAL_VALUE_TAG, 0.37);
        (CellRegistry::new(Grid::default()), luck)
    }

    #[test]
    fn fresh_cache_mints_dense_serials() {
        let (mut registry, luck) = scenario();
        let cache =
            Cache::generate(registry.get_or_create(10, 20), &SpawnRules::default(), &luck)
                .unwrap();
        assert_eq!(cache.value(), 37);
        assert_eq!(cache.tokens().len(), 37);
        for (serial, token) in (0u32..).zip(cache.tokens()) {
            assert_eq!(token.origin, "10:20");
            assert_eq!(token.serial, serial);
        }
    }

    #[test]
    fn minted_tokens_carry_the_interned_cell_tag() {
        let mut registry = CellRegistry::new(Grid::default());
        let cell = registry.get_or_create(-369_894, 1_220_628);
        let cache = Cache::mint(cell.clone(), 3);
        assert!(cache.tokens().iter().all(|t| t.origin == cell.tag()));
        assert_eq!(
            cache.tokens().first().and_then(Token::origin_cell),
            Some(cell.address())
        );
    }

    #[test]
    fn missed_spawn_draw_yields_no_cache() {
        let (mut registry, luck) = scenario();
        let cell = registry.get_or_create(10, 21);
        assert!(Cache::generate(cell, &SpawnRules::default(), &luck).is_none());
    }

    #[test]
    fn generation_is_reproducible() {
        let rules = SpawnRules::default();
        let mut first = CellRegistry::new(Grid::default());
        let mut second = CellRegistry::new(Grid::default());
        for i in 0..30 {
            for j in 0..30 {
                let a = Cache::generate(first.get_or_create(i, j), &rules, &HashLuck);
                let b = Cache::generate(second.get_or_create(i, j), &rules, &HashLuck);
                assert_eq!(a.map(|c| c.tokens().to_vec()), b.map(|c| c.tokens().to_vec()));
            }
        }
    }

    #[test]
    fn take_and_put_use_the_back_of_the_list() {
        let (mut registry, _) = scenario();
        let mut cache = Cache::mint(registry.get_or_create(1, 1), 3);
        let taken = cache.take_token().unwrap();
        assert_eq!(taken.serial, 2);
        assert_eq!(cache.value(), 2);
        cache.put_token(taken.clone());
        assert_eq!(cache.tokens().last(), Some(&taken));
        assert_eq!(cache.value(), 3);
    }

    #[test]
    fn empty_cache_has_nothing_to_take() {
        let (mut registry, _) = scenario();
        let mut cache = Cache::mint(registry.get_or_create(1, 1), 0);
        assert!(cache.take_token().is_none());
        assert_eq!(cache.value(), 0);
    }

    #[test]
    fn memento_roundtrip_after_collecting_three() {
        let (mut registry, luck) = scenario();
        let cell = registry.get_or_create(10, 20);
        let mut cache = Cache::generate(Arc::clone(&cell), &SpawnRules::default(), &luck).unwrap();
        for _ in 0..3 {
            let _ = cache.take_token();
        }
        let memento = cache.to_memento().unwrap();
        let restored = Cache::from_memento(cell, &memento).unwrap();
        assert_eq!(restored.value(), 34);
        assert_eq!(restored.tokens(), cache.tokens());
        assert_eq!(restored.tokens().last().map(|t| t.serial), Some(33));
    }

    #[test]
    fn failed_restore_leaves_cache_untouched() {
        let (mut registry, _) = scenario();
        let mut cache = Cache::mint(registry.get_or_create(2, 2), 4);
        let before = cache.clone();
        let bad = Memento::new(r#"{"version":1,"value":9,"tokens":[]}"#.to_owned());
        assert!(cache.restore(&bad).is_err());
        assert_eq!(cache, before);
    }

    #[test]
    fn view_reflects_state() {
        let (mut registry, _) = scenario();
        let cell = registry.get_or_create(5, 6);
        let cache = Cache::mint(Arc::clone(&cell), 2);
        let view = cache.view();
        assert_eq!(view.cell, CellAddress::new(5, 6));
        assert_eq!(view.bounds, cell.bounds());
        assert_eq!(view.value, 2);
        assert_eq!(view.tokens.len(), 2);
    }
}
