//! Domain layer: the commands driving a container actor.

pub mod command;

pub use command::Command;
