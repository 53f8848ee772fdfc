//! Completion marker detection over captured agent output.

/// Literal marker an agent prints once every story in the task spec passes.
pub const COMPLETION_MARKER: &str = "<promise>COMPLETE</promise>";

/// Return true if `output` contains [`COMPLETION_MARKER`] byte-for-byte.
///
/// No normalization is applied: case, whitespace and delimiters must match.
pub fn contains_completion(output: &str) -> bool {
    output.contains(COMPLETION_MARKER)
}
