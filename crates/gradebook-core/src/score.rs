//! Score entry and display helpers.
//!
//! Scores live on a 0-10 scale at full precision. `None` means "not graded
//! yet", which is different from a score of zero.

/// Lowest accepted score.
pub const MIN_SCORE: f64 = 0.0;
/// Highest accepted score.
pub const MAX_SCORE: f64 = 10.0;

/// Which raw input of a row an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreField {
    Component1,
    Component2,
    Recovery,
}

/// Outcome of interpreting one piece of user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreEntry {
    /// The field was cleared.
    Unset,
    /// A value, already clamped into range.
    Value(f64),
    /// Text that is not a number; the edit should be ignored.
    Unreadable,
}

impl ScoreEntry {
    /// Apply this entry on top of the current value.
    pub fn apply(self, current: Option<f64>) -> Option<f64> {
        match self {
            ScoreEntry::Unset => None,
            ScoreEntry::Value(v) => Some(v),
            ScoreEntry::Unreadable => current,
        }
    }
}

/// Clamp a finite score into `[0, 10]`.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Interpret text typed into a score cell.
///
/// Blank input clears the field. Both `7.5` and `7,5` are accepted.
pub fn parse_score_input(text: &str) -> ScoreEntry {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ScoreEntry::Unset;
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => ScoreEntry::Value(clamp_score(v)),
        _ => ScoreEntry::Unreadable,
    }
}

/// Half-up rounding to one decimal, for rendering only.
pub fn round_display(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Render a raw input: one decimal, or `-` when unset.
pub fn format_input(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", round_display(v)),
        None => "-".to_string(),
    }
}

/// Render a derived value: one decimal, with nothing derived shown as `0.0`.
pub fn format_derived(value: Option<f64>) -> String {
    format!("{:.1}", round_display(value.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_unset_not_zero() {
        assert_eq!(parse_score_input(""), ScoreEntry::Unset);
        assert_eq!(parse_score_input("   "), ScoreEntry::Unset);
        assert_eq!(parse_score_input("0"), ScoreEntry::Value(0.0));
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(parse_score_input("11"), ScoreEntry::Value(10.0));
        assert_eq!(parse_score_input("-3"), ScoreEntry::Value(0.0));
        assert_eq!(parse_score_input("10"), ScoreEntry::Value(10.0));
    }

    #[test]
    fn comma_decimal_separator() {
        assert_eq!(parse_score_input("7,5"), ScoreEntry::Value(7.5));
        assert_eq!(parse_score_input(" 8.25 "), ScoreEntry::Value(8.25));
    }

    #[test]
    fn garbage_keeps_previous_value() {
        assert_eq!(parse_score_input("abc"), ScoreEntry::Unreadable);
        assert_eq!(parse_score_input("NaN"), ScoreEntry::Unreadable);
        assert_eq!(parse_score_input("inf"), ScoreEntry::Unreadable);
        assert_eq!(ScoreEntry::Unreadable.apply(Some(4.0)), Some(4.0));
        assert_eq!(ScoreEntry::Unset.apply(Some(4.0)), None);
        assert_eq!(ScoreEntry::Value(2.0).apply(None), Some(2.0));
    }

    #[test]
    fn display_rounding() {
        assert_eq!(round_display(6.85), 6.9);
        assert_eq!(round_display(6.84), 6.8);
        assert_eq!(round_display(7.0), 7.0);
        assert_eq!(format_input(None), "-");
        assert_eq!(format_input(Some(6.66)), "6.7");
        assert_eq!(format_derived(None), "0.0");
        assert_eq!(format_derived(Some(6.8)), "6.8");
    }
}
