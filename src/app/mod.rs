pub mod commands;

pub use commands::{run, CommandContext};
