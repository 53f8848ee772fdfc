//! Iteration budget parsing.

/// Iterations attempted when neither the CLI nor `ralf.toml` sets a budget.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Parse a budget argument. Non-numeric and non-positive values yield `None`.
pub fn parse_iteration_budget(raw: &str) -> Option<u32> {
    raw.parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

/// Apply positional budget arguments over `fallback`; the last valid one wins.
pub fn resolve_iteration_budget<S: AsRef<str>>(args: &[S], fallback: u32) -> u32 {
    args.iter()
        .filter_map(|arg| parse_iteration_budget(arg.as_ref()))
        .last()
        .unwrap_or(fallback)
}
