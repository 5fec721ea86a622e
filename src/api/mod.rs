//! Process boundary: argument parsing and the single error funnel.

pub mod cli;

pub use cli::{install_panic_hook, run, NO_INPUT};
