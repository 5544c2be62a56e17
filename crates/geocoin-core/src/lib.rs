//! Game session, configuration, and command dispatch for the Geocoin cache
//! game.
//!
//! A player walks a real-world grid of small square cells. Some cells hold
//! a cache of tokens; the player collects tokens from caches and deposits
//! them into others. This crate ties the lower layers into one explicit
//! session context with an init and teardown lifecycle.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration into strongly-typed structs.
//! - [`session`] -- [`GameSession`]: movement, exchange, reset, views.
//! - [`command`] -- [`Command`] dispatch and outcomes.
//! - [`observer`] -- [`SessionObserver`] change notifications.
//! - [`error`] -- [`SessionError`].
//!
//! # Usage
//!
//! ```
//! use geocoin_core::{GameConfig, GameSession, MoveOutcome};
//! use geocoin_types::Direction;
//!
//! let mut session = GameSession::open_with_config_storage(GameConfig::default()).ok();
//! if let Some(session) = session.as_mut() {
//!     assert!(session.step(Direction::North).is_ok());
//!     assert_eq!(session.trail().len(), 1);
//!
//!     // Sensor fixes are ignored until tracking is switched on.
//!     let fix = session.player_view().position;
//!     assert_eq!(
//!         session.on_position_update(fix.lat, fix.lng).ok(),
//!         Some(MoveOutcome::Ignored)
//!     );
//!     session.set_tracking(true);
//!     assert!(session.on_position_update(fix.lat, fix.lng).is_ok());
//! }
//! ```
//!
//! [`SessionObserver`]: observer::SessionObserver

pub mod command;
pub mod config;
pub mod error;
pub mod observer;
pub mod session;

// Re-export primary types at crate root.
pub use command::{Command, CommandOutcome, MoveOutcome};
pub use config::{ConfigError, GameConfig};
pub use error::SessionError;
pub use observer::{RecordingObserver, SessionEvent, SessionObserver};
pub use session::GameSession;
