//! Farming loop module.
//!
//! Holds the per-account session cache, the decision chain that picks the
//! next action after each click batch, and the loop that runs it.

mod policy;
mod runner;
mod session;

pub use policy::{Decision, Telemetry, batch_size, click_batch, decide};
pub use runner::{ClickLoop, FarmError, Step};
pub use session::AccountSession;
