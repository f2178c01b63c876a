mod logging;
mod ledger;
mod memory;
mod vector;
pub mod handle;

pub use ledger::BlockRecord;
pub use memory::{AllocError, Tracker, TrackerBuilder};
pub use vector::{Item, Vector};

#[cfg(test)]
pub mod budget;
