/// Manager module - broken down into manageable components
mod core;
mod emitters;
mod handlers;
mod registry;
mod stats;

pub use core::Manager;
pub use stats::DispatchStats;
