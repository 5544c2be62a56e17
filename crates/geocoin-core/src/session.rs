//! The game session context.
//!
//! [`GameSession`] owns everything one player's game needs: the grid, the
//! luck source, the flyweight registry, the sparse state store, the active
//! neighborhood of caches, the player ledger, and the durable store. All
//! mutations run to completion on the caller's thread, one event at a time.
//!
//! # Movement
//!
//! ```text
//! move_to(point)
//!   |-- flush every active cache into the sparse store
//!   |-- relocate the player and append to the trail
//!   |-- rebuild the neighborhood (restore from memento, else generate)
//!   |-- persist dirty mementos + player record in one batch
//!   +-- notify observers
//! ```
//!
//! # Storage failure
//!
//! The first failed write or read switches the session to an in-memory
//! store for its remaining lifetime. This is logged once; play continues
//! and only durability is lost.

use std::collections::BTreeMap;

use geocoin_db::{
    DbError, FileStore, KeyValueStore, MemoryStore, PLAYER_STATE_KEY, SparseStateStore, cache_key,
};
use geocoin_ledger::{
    ConservationResult, ExchangeOutcome, Holdings, PlayerLedger, collect, deposit, tally,
    verify_conservation,
};
use geocoin_types::{
    CacheView, CellAddress, CellBounds, Direction, GeoPoint, PlayerView, TrailPoint,
};
use geocoin_world::{Cache, CellRegistry, Grid, HashLuck, LuckSource, SpawnRules};

use crate::command::{Command, CommandOutcome, MoveOutcome};
use crate::config::GameConfig;
use crate::error::SessionError;
use crate::observer::{SessionEvent, SessionObserver};

/// One running game.
pub struct GameSession {
    config: GameConfig,
    grid: Grid,
    rules: SpawnRules,
    luck: Box<dyn LuckSource>,
    registry: CellRegistry,
    sparse: SparseStateStore,
    active: BTreeMap<CellAddress, Cache>,
    player: PlayerLedger,
    store: Box<dyn KeyValueStore>,
    tracking: bool,
    degraded: bool,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("player_cell", &self.player.cell())
            .field("score", &self.player.score())
            .field("active_caches", &self.active.len())
            .field("stored_cells", &self.sparse.len())
            .field("tracking", &self.tracking)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Open a session over `store`.
    ///
    /// Loads the player record (falling back to a new player if it is
    /// missing or corrupt), loads every stored memento, and materializes the
    /// neighborhood around the player. Sensor tracking starts off.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if `config` is invalid. Storage
    /// problems never fail the open; they degrade the session instead.
    pub fn open(
        config: GameConfig,
        store: Box<dyn KeyValueStore>,
        luck: Box<dyn LuckSource>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let grid = config.grid()?;
        let rules = config.spawn_rules()?;
        let player = PlayerLedger::new(&grid, config.player.start)?;

        let mut session = Self {
            config,
            grid,
            rules,
            luck,
            registry: CellRegistry::new(grid),
            sparse: SparseStateStore::new(),
            active: BTreeMap::new(),
            player,
            store,
            tracking: false,
            degraded: false,
            observers: Vec::new(),
        };

        match SparseStateStore::load_all(session.store.as_mut()) {
            Ok(sparse) => session.sparse = sparse,
            Err(e) => session.degrade(&e),
        }
        session.load_player();
        session.respawn_neighborhood();

        tracing::info!(
            cell = %session.player.cell(),
            score = session.player.score(),
            stored_cells = session.sparse.len(),
            active_caches = session.active.len(),
            "Game session opened"
        );
        Ok(session)
    }

    /// Open a session with the storage and luck source `config` implies.
    ///
    /// Uses a [`FileStore`] at `storage.path` when set, else a
    /// [`MemoryStore`], and the SHA-256 [`HashLuck`] source. A store file
    /// that cannot be opened degrades the session to memory.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if `config` is invalid.
    pub fn open_with_config_storage(config: GameConfig) -> Result<Self, SessionError> {
        let (store, degraded) = match config.storage.path.as_deref() {
            None => (Box::new(MemoryStore::new()) as Box<dyn KeyValueStore>, false),
            Some(path) => match FileStore::open_recovering(path) {
                Ok(file) => (Box::new(file) as Box<dyn KeyValueStore>, false),
                Err(e) => {
                    let e = DbError::StorageUnavailable {
                        reason: format!("{}: {e}", path.display()),
                    };
                    tracing::warn!(error = %e, "Durable storage unavailable, state will not persist this session");
                    (Box::new(MemoryStore::new()) as Box<dyn KeyValueStore>, true)
                }
            },
        };
        let mut session = Self::open(config, store, Box::new(HashLuck::new()))?;
        session.degraded |= degraded;
        Ok(session)
    }

    /// Register an observer for change notifications.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    // ----- sensor and movement -----

    /// Handle a sensor fix.
    ///
    /// Tracking starts off in every session, so fixes are ignored and
    /// [`MoveOutcome::Ignored`] is returned until the caller enables it with
    /// [`set_tracking`](Self::set_tracking). Step movement is not affected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::World`] if the fix cannot be mapped to a cell.
    pub fn on_position_update(&mut self, lat: f64, lng: f64) -> Result<MoveOutcome, SessionError> {
        if !self.tracking {
            tracing::trace!(lat, lng, "Ignoring sensor fix while tracking is off");
            return Ok(MoveOutcome::Ignored);
        }
        self.move_to(GeoPoint::new(lat, lng))
    }

    /// Turn sensor tracking on or off.
    pub fn set_tracking(&mut self, enabled: bool) {
        if self.tracking == enabled {
            return;
        }
        self.tracking = enabled;
        tracing::debug!(enabled, "Sensor tracking toggled");
        let view = self.player_view();
        self.emit(&SessionEvent::PlayerChanged(view));
    }

    /// Move one tile in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::World`] at the edge of the addressable grid.
    pub fn step(&mut self, direction: Direction) -> Result<MoveOutcome, SessionError> {
        let target = self.grid.step(self.player.position(), direction);
        self.move_to(target)
    }

    /// Move the player to `position`.
    ///
    /// Every move flushes the active caches, rebuilds the neighborhood, and
    /// persists the player, whether or not a cell boundary was crossed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::World`] if `position` cannot be mapped; the
    /// player and the neighborhood are then unchanged.
    pub fn move_to(&mut self, position: GeoPoint) -> Result<MoveOutcome, SessionError> {
        // Reject before flushing so a bad fix has no side effects.
        self.grid.point_to_cell(position)?;

        self.flush_active()?;
        let crossed = self.player.relocate(&self.grid, position)?;
        self.player.record_movement_history();
        self.respawn_neighborhood();
        self.persist()?;

        let cell = self.player.cell();
        tracing::debug!(%cell, %position, crossed, "Player moved");

        let view = self.player_view();
        self.emit(&SessionEvent::PlayerChanged(view));
        Ok(MoveOutcome::Moved { cell, crossed })
    }

    // ----- exchange -----

    /// Take one token from the cache at `cell`.
    ///
    /// An empty cache is a silent no-op reported as
    /// [`ExchangeOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CacheNotActive`] if no cache is materialized
    /// at `cell`.
    pub fn collect(&mut self, cell: CellAddress) -> Result<ExchangeOutcome, SessionError> {
        let cache = self
            .active
            .get_mut(&cell)
            .ok_or(SessionError::CacheNotActive(cell))?;
        let outcome = collect(cache, &mut self.player);
        self.after_exchange(cell, outcome)?;
        Ok(outcome)
    }

    /// Give one token to the cache at `cell`.
    ///
    /// Depositing with zero score or an empty inventory is a silent no-op
    /// reported as [`ExchangeOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CacheNotActive`] if no cache is materialized
    /// at `cell`.
    pub fn deposit(&mut self, cell: CellAddress) -> Result<ExchangeOutcome, SessionError> {
        let cache = self
            .active
            .get_mut(&cell)
            .ok_or(SessionError::CacheNotActive(cell))?;
        let outcome = deposit(cache, &mut self.player);
        self.after_exchange(cell, outcome)?;
        Ok(outcome)
    }

    fn after_exchange(
        &mut self,
        cell: CellAddress,
        outcome: ExchangeOutcome,
    ) -> Result<(), SessionError> {
        if !outcome.is_applied() {
            return Ok(());
        }
        let Some(cache) = self.active.get(&cell) else {
            return Ok(());
        };
        let memento = cache.to_memento()?;
        let cache_view = cache.view();
        self.sparse.put(cell, memento);
        self.persist()?;

        self.emit(&SessionEvent::CacheChanged(cache_view));
        let view = self.player_view();
        self.emit(&SessionEvent::PlayerChanged(view));
        Ok(())
    }

    /// Run one [`Command`].
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome, SessionError> {
        match command {
            Command::Collect { cell } => self.collect(cell).map(CommandOutcome::Exchange),
            Command::Deposit { cell } => self.deposit(cell).map(CommandOutcome::Exchange),
            Command::MoveTo { position } => self.move_to(position).map(CommandOutcome::Move),
            Command::Step { direction } => self.step(direction).map(CommandOutcome::Move),
            Command::Reset => self.reset().map(|()| CommandOutcome::Reset),
        }
    }

    // ----- lifecycle -----

    /// Clear all durable storage and start over at the configured position.
    ///
    /// The tracking flag is kept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Ledger`] if the start position cannot be
    /// mapped, which a validated configuration rules out.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let player = PlayerLedger::new(&self.grid, self.config.player.start)?;
        if let Err(e) = self.store.clear() {
            self.degrade(&e);
            if let Err(e) = self.store.clear() {
                tracing::error!(error = %e, "In-memory store failed to clear");
            }
        }
        self.sparse.clear();
        self.active.clear();
        self.player = player;
        self.emit(&SessionEvent::Reset);
        self.respawn_neighborhood();

        tracing::info!(cell = %self.player.cell(), "Game session reset");
        let view = self.player_view();
        self.emit(&SessionEvent::PlayerChanged(view));
        Ok(())
    }

    /// Flush all state and hand back the store.
    ///
    /// Tracking is turned off before the final write.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if a memento or the player record cannot be
    /// encoded.
    pub fn close(mut self) -> Result<Box<dyn KeyValueStore>, SessionError> {
        self.tracking = false;
        self.flush_active()?;
        self.persist()?;
        tracing::info!(
            stored_cells = self.sparse.len(),
            score = self.player.score(),
            "Game session closed"
        );
        Ok(self.store)
    }

    // ----- views -----

    /// Snapshot of the player.
    pub fn player_view(&self) -> PlayerView {
        self.player.view(self.tracking)
    }

    /// Snapshot of the active cache at `cell`, if any.
    pub fn cache_view(&self, cell: CellAddress) -> Option<CacheView> {
        self.active.get(&cell).map(Cache::view)
    }

    /// Snapshots of every active cache, in address order.
    pub fn active_caches(&self) -> Vec<CacheView> {
        self.active.values().map(Cache::view).collect()
    }

    /// Real-world rectangle of `cell`.
    pub fn cell_bounds(&self, cell: CellAddress) -> CellBounds {
        self.grid.cell_bounds(cell)
    }

    /// The recorded movement trail, oldest first.
    pub fn trail(&self) -> &[TrailPoint] {
        self.player.trail()
    }

    /// Token counts held by the player and the active caches.
    pub fn holdings(&self) -> Holdings {
        tally(&self.player, self.active.values())
    }

    /// Check that no token was created, destroyed, or duplicated since
    /// `before` was taken with [`holdings`](Self::holdings).
    ///
    /// Only meaningful while the neighborhood is unchanged.
    pub fn audit(&self, before: Holdings) -> ConservationResult {
        verify_conservation(before, &self.player, self.active.values())
    }

    /// Whether sensor fixes currently move the player.
    pub const fn tracking(&self) -> bool {
        self.tracking
    }

    /// Whether the session has fallen back to in-memory storage.
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The grid in use.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The player ledger.
    pub const fn player(&self) -> &PlayerLedger {
        &self.player
    }

    /// The sparse state store.
    pub const fn sparse_store(&self) -> &SparseStateStore {
        &self.sparse
    }

    // ----- internals -----

    fn load_player(&mut self) {
        let raw = match self.store.load(PLAYER_STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                self.degrade(&e);
                return;
            }
        };
        match PlayerLedger::from_record(&self.grid, &raw) {
            Ok(player) => self.player = player,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding corrupt player state, starting fresh");
                if let Err(e) = self.store.remove(PLAYER_STATE_KEY) {
                    self.degrade(&e);
                }
            }
        }
    }

    /// Snapshot every active cache into the sparse store.
    fn flush_active(&mut self) -> Result<(), SessionError> {
        for (cell, cache) in &self.active {
            self.sparse.put(*cell, cache.to_memento()?);
        }
        Ok(())
    }

    /// Replace the active set with the neighborhood around the player.
    fn respawn_neighborhood(&mut self) {
        let center = self.player.cell();
        let radius = self.config.grid.neighborhood_radius;
        let mut active = BTreeMap::new();

        for address in self.grid.neighborhood(center, radius) {
            if let Some(cache) = self.materialize(address) {
                active.insert(address, cache);
            }
        }
        self.active = active;

        tracing::debug!(%center, radius, caches = self.active.len(), "Neighborhood respawned");
        let caches = self.active_caches();
        self.emit(&SessionEvent::NeighborhoodRespawned { center, caches });
    }

    /// Restore the cache at `address` from its memento, or generate it.
    fn materialize(&mut self, address: CellAddress) -> Option<Cache> {
        let cell = self.registry.intern(address);
        if let Some(memento) = self.sparse.get(address) {
            match Cache::from_memento(cell.clone(), memento) {
                Ok(cache) => return Some(cache),
                Err(e) => {
                    tracing::warn!(cell = %address, error = %e, "Discarding corrupt memento, regenerating");
                    if let Err(e) = self.sparse.discard(address, self.store.as_mut()) {
                        self.degrade(&e);
                    }
                }
            }
        }
        Cache::generate(cell, &self.rules, self.luck.as_ref())
    }

    /// Write pending mementos and the player record as one batch.
    fn persist(&mut self) -> Result<(), SessionError> {
        let mut entries = self.sparse.pending_entries();
        entries.push((PLAYER_STATE_KEY.to_owned(), self.player.to_record()?));
        if let Err(e) = self.store.save_batch(&entries) {
            self.degrade(&e);
            if let Err(e) = self.store.save_batch(&entries) {
                tracing::error!(error = %e, "In-memory store rejected a write");
            }
        }
        self.sparse.mark_clean();
        Ok(())
    }

    /// Switch to an in-memory store for the rest of the session.
    fn degrade(&mut self, error: &DbError) {
        if self.degraded {
            return;
        }
        self.degraded = true;
        tracing::warn!(error = %error, "Durable storage unavailable, continuing in memory for this session");

        let mut memory = MemoryStore::new();
        let entries: Vec<(String, String)> = self
            .sparse
            .iter()
            .map(|(cell, memento)| (cache_key(*cell), memento.as_str().to_owned()))
            .collect();
        if let Err(e) = memory.save_batch(&entries) {
            tracing::error!(error = %e, "In-memory store rejected a write");
        }
        self.store = Box::new(memory);
    }

    fn emit(&mut self, event: &SessionEvent) {
        for observer in &mut self.observers {
            observer.notify(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geocoin_ledger::SkipReason;
    use geocoin_world::{FixedLuck, INITIAL_VALUE_TAG, SPAWN_TAG};

    use super::*;
    use crate::observer::RecordingObserver;

    const HOME: CellAddress = CellAddress::new(10, 20);

    fn config() -> GameConfig {
        let mut config = GameConfig::default();
        config.grid.neighborhood_radius = 2;
        config.player.start = Grid::default().cell_center(HOME);
        config
    }

    /// Only `HOME` spawns, with value 37.
    fn luck() -> FixedLuck {
        FixedLuck::new(0.99)
            .with(HOME, SPAWN_TAG, 0.0)
            .with(HOME, INITIAL_VALUE_TAG, 0.37)
    }

    fn session() -> GameSession {
        GameSession::open(config(), Box::new(MemoryStore::new()), Box::new(luck())).unwrap()
    }

    #[test]
    fn open_materializes_the_neighborhood() {
        let session = session();
        let caches = session.active_caches();
        assert_eq!(caches.len(), 1);
        assert_eq!(session.cache_view(HOME).unwrap().value, 37);
        assert!(!session.tracking());
        assert!(!session.is_degraded());
    }

    #[test]
    fn collect_and_deposit_update_both_sides() {
        let mut session = session();
        assert_eq!(session.collect(HOME).unwrap(), ExchangeOutcome::Applied);
        assert_eq!(session.collect(HOME).unwrap(), ExchangeOutcome::Applied);
        assert_eq!(session.player_view().score, 2);
        assert_eq!(session.cache_view(HOME).unwrap().value, 35);

        assert_eq!(session.deposit(HOME).unwrap(), ExchangeOutcome::Applied);
        assert_eq!(session.player_view().score, 1);
        assert_eq!(session.cache_view(HOME).unwrap().value, 36);
        assert_eq!(session.holdings().total(), 37);
    }

    #[test]
    fn exchange_persists_immediately() {
        let mut session = session();
        session.collect(HOME).unwrap();
        assert!(session.sparse_store().contains(HOME));
        assert!(!session.sparse_store().has_pending());
    }

    #[test]
    fn deposit_with_nothing_is_skipped() {
        let mut session = session();
        assert_eq!(
            session.deposit(HOME).unwrap(),
            ExchangeOutcome::Skipped(SkipReason::NoScore)
        );
        assert_eq!(session.cache_view(HOME).unwrap().value, 37);
    }

    #[test]
    fn exchange_at_inactive_cell_is_an_error() {
        let mut session = session();
        let err = session.collect(CellAddress::new(11, 20)).unwrap_err();
        assert!(matches!(err, SessionError::CacheNotActive(_)));
    }

    #[test]
    fn sensor_fixes_need_tracking() {
        let mut session = session();
        let target = session.grid().cell_center(CellAddress::new(11, 20));
        assert_eq!(
            session.on_position_update(target.lat, target.lng).unwrap(),
            MoveOutcome::Ignored
        );
        assert_eq!(session.player_view().cell, HOME);

        session.set_tracking(true);
        assert_eq!(
            session.on_position_update(target.lat, target.lng).unwrap(),
            MoveOutcome::Moved {
                cell: CellAddress::new(11, 20),
                crossed: true
            }
        );
    }

    #[test]
    fn bad_fix_changes_nothing() {
        let mut session = session();
        session.set_tracking(true);
        assert!(session.on_position_update(f64::NAN, 0.0).is_err());
        assert_eq!(session.player_view().cell, HOME);
        assert!(session.trail().is_empty());
    }

    #[test]
    fn steps_move_one_cell_and_record_trail() {
        let mut session = session();
        session.step(Direction::North).unwrap();
        session.step(Direction::East).unwrap();
        assert_eq!(session.player_view().cell, CellAddress::new(11, 21));
        assert_eq!(session.trail().len(), 2);
    }

    #[test]
    fn execute_dispatches_commands() {
        let mut session = session();
        assert_eq!(
            session.execute(Command::Collect { cell: HOME }).unwrap(),
            CommandOutcome::Exchange(ExchangeOutcome::Applied)
        );
        assert!(matches!(
            session
                .execute(Command::Step {
                    direction: Direction::South
                })
                .unwrap(),
            CommandOutcome::Move(MoveOutcome::Moved { crossed: true, .. })
        ));
        assert_eq!(session.execute(Command::Reset).unwrap(), CommandOutcome::Reset);
        assert_eq!(session.player_view().score, 0);
    }

    #[test]
    fn observers_see_mutations() {
        let mut session = session();
        let recorder = RecordingObserver::new();
        session.subscribe(Box::new(recorder.clone()));

        session.collect(HOME).unwrap();
        let events = recorder.events();
        assert!(matches!(
            events.first(),
            Some(SessionEvent::CacheChanged(view)) if view.value == 36
        ));
        assert!(matches!(
            events.get(1),
            Some(SessionEvent::PlayerChanged(view)) if view.score == 1
        ));

        recorder.clear();
        session.step(Direction::West).unwrap();
        assert!(
            recorder
                .events()
                .iter()
                .any(|e| matches!(e, SessionEvent::NeighborhoodRespawned { .. }))
        );
    }

    #[test]
    fn skipped_exchange_notifies_nobody() {
        let mut session = session();
        let recorder = RecordingObserver::new();
        session.subscribe(Box::new(recorder.clone()));
        session.deposit(HOME).unwrap();
        assert!(recorder.events().is_empty());
    }
}
