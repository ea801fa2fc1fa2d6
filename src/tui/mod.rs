//! TUI debugger for the byte8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and flag view
//! - Hex memory view with the PC highlighted
//! - Step/run/breakpoint controls
//! - History of values written to OUT

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
