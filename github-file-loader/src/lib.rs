pub mod cli;
pub mod load_config;
pub mod processors;

pub use cli::{run, Cli, Commands};
