//! Scheduled maintenance for order records.
//!
//! Orders that have been `Delivered` for longer than a grace period (three
//! days by default) are moved to `Shipped` in one atomic batch, with the
//! store stamping `updatedAt`. The job is [`sweeper::Sweeper::run`], a
//! function of the current time and an [`store::OrderStore`]; the
//! [`scheduler::Scheduler`] calls it on a fixed interval.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod order;
pub mod scheduler;
pub mod store;
pub mod sweeper;
pub mod ui;

pub use error::{Result, SweeperError};
