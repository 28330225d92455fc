//! Percentage arithmetic shared by the progress ledger and the content views.

/// Reading progress strictly above this value marks a section as read.
pub const READ_THRESHOLD: u8 = 75;

/// Upper bound of every progress value.
pub const COMPLETE: u8 = 100;

/// Returns true if the given section progress counts as "read".
#[must_use]
pub fn crosses_read_threshold(progress: u8) -> bool {
    progress > READ_THRESHOLD
}

/// Clamps a raw progress value (scroll estimates can overshoot) into `0..=100`.
#[must_use]
pub fn clamp_percent(raw: i64) -> u8 {
    u8::try_from(raw.clamp(0, i64::from(COMPLETE))).unwrap_or(COMPLETE)
}

/// `round(part * 100 / total)`, rounding halves up.
///
/// Returns `0` when `total` is zero. `part` is capped at `total`.
#[must_use]
pub fn percent(part: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let part = u128::from(part.min(total));
    let total = u128::from(total);
    let rounded = (part * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(COMPLETE)
}

/// Read/total section counts for a chapter or for the whole book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionCounts {
    pub read: u64,
    pub total: u64,
}

impl SectionCounts {
    #[must_use]
    pub fn new(read: u64, total: u64) -> Self {
        Self { read, total }
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        percent(self.read, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        assert!(!crosses_read_threshold(75));
        assert!(crosses_read_threshold(76));
        assert!(crosses_read_threshold(100));
        assert!(!crosses_read_threshold(0));
    }

    #[test]
    fn clamp_handles_overshoot_and_negatives() {
        assert_eq!(clamp_percent(-20), 0);
        assert_eq!(clamp_percent(42), 42);
        assert_eq!(clamp_percent(140), 100);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(5, 0), 0);
        assert_eq!(SectionCounts::default().percent(), 0);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(3, 4), 75);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(7, 10), 70);
    }

    #[test]
    fn part_is_capped_at_total() {
        assert_eq!(percent(9, 4), 100);
    }

    #[test]
    fn counts_without_sections_are_zero() {
        assert_eq!(SectionCounts::new(0, 0).percent(), 0);
        assert_eq!(SectionCounts::new(4, 4).percent(), 100);
    }
}
