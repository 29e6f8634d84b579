//! Systems - logic that operates on the engine state

mod actions;
mod catalog;
mod ledger;
mod offline;
mod rest;
mod skills;

pub use actions::*;
pub use catalog::*;
pub use ledger::*;
pub use offline::*;
pub use rest::*;
pub use skills::*;
