//! User interface module

pub mod cli;
#[cfg(test)]
mod tests;

pub use cli::{Args, Cli, Command, ControlAction};
