//! Date range selection over normalized records.

use dash_core::models::{ComparisonSpec, DateRange, Dated};

/// Keep the records dated within `range` (both bounds inclusive), in input
/// order. Records whose date does not parse are dropped: they cannot be
/// attributed to any period.
pub fn filter_by_range<T: Dated + Clone>(records: &[T], range: &DateRange) -> Vec<T> {
    records
        .iter()
        .filter(|r| r.date().is_some_and(|d| range.contains(d)))
        .cloned()
        .collect()
}

/// Split `records` into the primary period and, when `spec` has one, the
/// comparison period.
pub fn split_by_comparison<T: Dated + Clone>(
    records: &[T],
    spec: &ComparisonSpec,
) -> (Vec<T>, Option<Vec<T>>) {
    let current = filter_by_range(records, &spec.primary);
    let prior = spec
        .comparison
        .as_ref()
        .map(|range| filter_by_range(records, range));
    (current, prior)
}

/// Number of records that cannot be dated at all.
pub fn count_undated<T: Dated>(records: &[T]) -> usize {
    records.iter().filter(|r| r.date().is_none()).count()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dash_core::models::{FieldValue, NormalizedRecord};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(label: &str, date: &str) -> NormalizedRecord {
        NormalizedRecord::new()
            .with("label", FieldValue::Text(label.to_string()))
            .with("date", FieldValue::Text(date.to_string()))
    }

    fn labels(records: &[NormalizedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.text("label")).collect()
    }

    fn january() -> DateRange {
        DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 31)).unwrap()
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let records = vec![
            rec("before", "2023-12-31"),
            rec("start", "2024-01-01"),
            rec("end", "2024-01-31"),
            rec("after", "2024-02-01"),
        ];
        let kept = filter_by_range(&records, &january());
        assert_eq!(labels(&kept), vec!["start", "end"]);
    }

    #[test]
    fn test_unparsable_dates_are_excluded() {
        let records = vec![
            rec("na", "N/A"),
            rec("ok", "2024-01-15"),
            rec("empty", ""),
            rec("unknown", "Unknown"),
        ];
        let kept = filter_by_range(&records, &january());
        assert_eq!(labels(&kept), vec!["ok"]);
        assert_eq!(count_undated(&records), 3);
    }

    #[test]
    fn test_preserves_input_order() {
        let records = vec![
            rec("c", "2024-01-20"),
            rec("a", "2024-01-02"),
            rec("x", "2024-03-01"),
            rec("b", "2024-01-10"),
        ];
        let kept = filter_by_range(&records, &january());
        assert_eq!(labels(&kept), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_mixed_date_formats() {
        let records = vec![rec("us", "01/15/2024"), rec("ts", "2024-01-16T09:00:00Z")];
        assert_eq!(filter_by_range(&records, &january()).len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let kept: Vec<NormalizedRecord> = filter_by_range(&[], &january());
        assert!(kept.is_empty());
    }

    #[test]
    fn test_split_by_comparison() {
        let records = vec![
            rec("dec", "2023-12-15"),
            rec("jan", "2024-01-15"),
            rec("feb", "2024-02-15"),
        ];
        let spec = ComparisonSpec::against(
            january(),
            DateRange::new(ymd(2023, 12, 1), ymd(2023, 12, 31)).unwrap(),
        );
        let (current, prior) = split_by_comparison(&records, &spec);
        assert_eq!(labels(&current), vec!["jan"]);
        assert_eq!(labels(&prior.unwrap()), vec!["dec"]);

        let (_, none) = split_by_comparison(&records, &ComparisonSpec::single(january()));
        assert!(none.is_none());
    }
}
