//! Terminal presentation of run events.
//!
//! Nothing here affects the run itself: the loop emits [`RunEvent`]s and the
//! [`Reporter`] turns them into status lines on stdout.
//!
//! [`RunEvent`]: crate::core::types::RunEvent

pub mod indicator;
pub mod reporter;

pub use indicator::ActivityIndicator;
pub use reporter::Reporter;
