use crate::types::{TrackedSeries, TrackedState};

/// Records the fetched chapter and flags the series when it moved past the
/// baseline. Equal counts are not new.
pub fn evaluate(series: &mut TrackedSeries, latest: u32) {
    series.latest_chapter_num = Some(latest);
    series.has_new_chapter = latest > series.prev_chapter_num;
}

pub fn any_new(state: &TrackedState) -> bool {
    state.iter().any(|s| s.has_new_chapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_greater_is_new() {
        let mut s = TrackedSeries::new("123", "A", 10);
        evaluate(&mut s, 12);
        assert!(s.has_new_chapter);
        assert_eq!(s.latest_chapter_num, Some(12));
    }

    #[test]
    fn test_equal_is_not_new() {
        let mut s = TrackedSeries::new("123", "A", 10);
        evaluate(&mut s, 10);
        assert!(!s.has_new_chapter);
    }

    #[test]
    fn test_lower_is_not_new() {
        let mut s = TrackedSeries::new("123", "A", 10);
        evaluate(&mut s, 3);
        assert!(!s.has_new_chapter);
    }

    #[test]
    fn test_any_new() {
        let mut state: TrackedState = vec![
            TrackedSeries::new("1", "A", 1),
            TrackedSeries::new("2", "B", 1),
        ]
        .into_iter()
        .collect();
        assert!(!any_new(&state));
        evaluate(state.get_mut("2").unwrap(), 2);
        assert!(any_new(&state));
    }
}
