//! Bot pipeline: strategy contract, baseline heuristic, optional remote
//! strategy, and the manager that drives bot turns.

pub mod baseline;
pub mod manager;
pub mod remote;
pub mod strategy;

pub use baseline::Baseline;
pub use manager::BotManager;
pub use remote::RemoteStrategy;
pub use strategy::{BotContext, BotError, BotStrategy};
