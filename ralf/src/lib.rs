//! Bounded agent loop runner.
//!
//! `ralf` reruns an autonomous coding agent against a task spec (`prd.json`)
//! until the agent prints the completion marker or the iteration budget runs
//! out. The crate is split the same way throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (completion detection, archive
//!   decision, budget parsing, shared types). No I/O.
//! - **[`io`]**: Side-effecting operations (run-directory files, config, agent
//!   processes). Seams are traits so tests can substitute in-memory doubles.
//!
//! [`run`] wires the two together for `ralf run`; [`looping`] owns the iteration
//! state machine; [`ui`] renders the events it emits.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod ui;
