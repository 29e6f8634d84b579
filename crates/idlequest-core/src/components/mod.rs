//! Component definitions for the progression simulation.
//!
//! Components are plain data. They have no behavior beyond small
//! accessors - mutation lives in the systems.

mod action;
mod resource;

pub use action::*;
pub use resource::*;
pub(crate) use resource::sanitize;
