//! IdleQuest Core - Idle RPG Progression Engine
//!
//! A deterministic, data-driven engine for idle games: one action runs at a
//! time, costs are paid up front, rewards roll on completion, an exhausted
//! character is sent to rest and resumes afterwards, and time spent away is
//! replayed in closed form when a save is loaded.
//!
//! # Architecture
//!
//! - **Components**: plain data (`Resource`, `Action`, `ActionRuntime`)
//! - **Systems**: logic over borrowed state (`ResourceLedger`, `ActionEngine`,
//!   `RestPolicy`, `OfflineCatchup`)
//! - **Engine**: `IdleEngine` owns the state and composes the systems per command
//!
//! # Example
//!
//! ```rust,no_run
//! use idlequest_core::prelude::*;
//!
//! let mut engine = IdleEngine::new(GameConfig::starter(), 0);
//! engine.start("beg").ok();
//!
//! // Run the game
//! loop {
//!     engine.tick(0.1);
//!     for event in engine.drain_events() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod events;
pub mod persistence;
pub mod state;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{EngineConfig, GameConfig, OfflineConfig};
    pub use crate::engine::{Advanced, IdleEngine};
    pub use crate::events::{CompletionEvent, GameEvent, RewardSummary};
    pub use crate::persistence::{FileStore, MemoryStore, SaveFormat, SaveSlot};
    pub use crate::state::{EngineState, LogKind, Snapshot};
    pub use crate::systems::{CatchupReport, SkillSink, StartError, TickOutcome, XpTally};
}
