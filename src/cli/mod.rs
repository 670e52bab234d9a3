pub mod commands;

pub use commands::{Cli, Commands, DEFAULT_PROVIDER, SweepTask};
