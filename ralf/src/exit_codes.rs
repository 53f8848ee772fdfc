//! Stable exit codes for `ralf` commands.

/// The agent reported completion, or a non-loop command succeeded.
pub const OK: i32 = 0;
/// The iteration budget ran out without the completion marker.
pub const INCOMPLETE: i32 = 1;
/// Configuration, task spec or lifecycle failure.
pub const FATAL: i32 = 1;
