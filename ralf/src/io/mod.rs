//! Filesystem and process side of the runner.

pub mod config;
pub mod fs;
pub mod init;
pub mod journal;
pub mod lifecycle;
pub mod process;
pub mod prompt;
pub mod run_pointer;
pub mod task_spec;
pub mod tool;
