//! Room layer: per-game worker tasks, their command protocol, and the
//! process-wide registry.

pub mod command;
pub mod registry;
pub mod worker;

#[cfg(test)]
mod tests_room;

pub use command::{ActionOrigin, ReservedSeat, RoomCommand};
pub use registry::RoomRegistry;
pub use worker::{spawn_room, RoomHandle, RoomTimings};
