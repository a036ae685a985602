//! Interpretation of raw completion replies.
//!
//! The completion service returns unstructured text. The only structure the
//! agent relies on is the presence of the completion marker and, for
//! estimates, at least one decimal digit.

use std::sync::LazyLock;

use regex::Regex;

/// Literal phrase the planner returns once the goal is achieved.
pub const COMPLETION_MARKER: &str = "GOAL COMPLETE";

/// Range of day estimates the estimator prompt asks for.
pub const MIN_ESTIMATE_DAYS: u32 = 1;
pub const MAX_ESTIMATE_DAYS: u32 = 10;

static NON_DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\D+").expect("non-digit pattern is valid"));

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", regex::escape(COMPLETION_MARKER)))
        .expect("completion marker pattern is valid")
});

/// Parse a day estimate by stripping every non-digit character.
///
/// Returns `None` when no digits remain or the number overflows. A reply
/// outside the requested range is taken as given.
pub fn parse_day_estimate(reply: &str) -> Option<u32> {
    let digits = NON_DIGIT_RE.replace_all(reply, "");
    digits.parse().ok()
}

/// Case-insensitive substring match for [`COMPLETION_MARKER`].
pub fn contains_completion_marker(reply: &str) -> bool {
    MARKER_RE.is_match(reply)
}
