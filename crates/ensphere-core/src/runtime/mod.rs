//! Toolchain detection and external command execution
//!
//! This module provides:
//! - PHP / Composer detection
//! - The command runner used by every shell-out step

pub mod check;
pub mod command;

pub use check::{check_composer, check_php, check_toolchain, ComposerCommand, RuntimeInfo};
pub use command::{CommandRunner, RecordedCommand, RecordingRunner, ShellRunner};
