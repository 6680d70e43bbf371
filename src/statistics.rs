//! Found / not-found statistics over comparison results.

use crate::inventory_schema::{
    ComparisonResult, ExcelStatus, MatchOutcome, OverallStatistics, PermittedStatus,
    StatusStatistics,
};

/// `part / total * 100` rounded to two decimals; 0 when `total` is 0.
fn rounded_percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

fn count_found<'a>(results: impl IntoIterator<Item = &'a ComparisonResult>) -> usize {
    results
        .into_iter()
        .filter(|r| r.outcome == MatchOutcome::Found)
        .count()
}

/// One entry per permitted status, in enumeration order, zero totals included.
pub fn aggregate_by_status(results: &[ComparisonResult]) -> Vec<StatusStatistics> {
    PermittedStatus::ALL
        .into_iter()
        .map(|status| {
            let matching: Vec<&ComparisonResult> = results
                .iter()
                .filter(|r| r.excel_status == ExcelStatus::Permitted(status))
                .collect();
            let total = matching.len();
            let found_count = count_found(matching);
            StatusStatistics {
                status,
                total,
                found_count,
                not_found_count: total - found_count,
                found_percentage: rounded_percentage(found_count, total),
            }
        })
        .collect()
}

/// Overall totals. `total_records` counts every result, missing ones
/// included, so it can exceed the sum of the per-status totals.
pub fn aggregate_overall(
    results: &[ComparisonResult],
    by_status: Vec<StatusStatistics>,
) -> OverallStatistics {
    let total_records = results.len();
    let total_found = count_found(results);

    OverallStatistics {
        total_records,
        total_found,
        total_not_found: total_records - total_found,
        found_percentage: rounded_percentage(total_found, total_records),
        by_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(serial: &str, status: ExcelStatus, outcome: MatchOutcome) -> ComparisonResult {
        ComparisonResult {
            serial: serial.to_string(),
            excel_status: status,
            outcome,
            note: String::new(),
        }
    }

    fn sample() -> Vec<ComparisonResult> {
        let reserved = ExcelStatus::Permitted(PermittedStatus::Reserved);
        let available = ExcelStatus::Permitted(PermittedStatus::Available);
        vec![
            result("A", reserved, MatchOutcome::Found),
            result("B", reserved, MatchOutcome::NotFound),
            result("C", reserved, MatchOutcome::Found),
            result("D", available, MatchOutcome::NotFound),
            result("E", ExcelStatus::Missing, MatchOutcome::Missing),
        ]
    }

    #[test]
    fn test_by_status_fixed_order_with_zero_totals() {
        let stats = aggregate_by_status(&sample());
        let statuses: Vec<PermittedStatus> = stats.iter().map(|s| s.status).collect();
        assert_eq!(statuses, PermittedStatus::ALL.to_vec());

        let awaiting = &stats[1];
        assert_eq!(awaiting.total, 0);
        assert_eq!(awaiting.found_percentage, 0.0);
    }

    #[test]
    fn test_by_status_counts_and_rounding() {
        let stats = aggregate_by_status(&sample());
        let reserved = &stats[2];
        assert_eq!(reserved.total, 3);
        assert_eq!(reserved.found_count, 2);
        assert_eq!(reserved.not_found_count, 1);
        assert_eq!(reserved.found_percentage, 66.67);

        let available = &stats[0];
        assert_eq!(available.found_percentage, 0.0);
        assert_eq!(available.not_found_count, 1);
    }

    #[test]
    fn test_status_invariants() {
        for stats in aggregate_by_status(&sample()) {
            assert_eq!(stats.found_count + stats.not_found_count, stats.total);
            assert!((0.0..=100.0).contains(&stats.found_percentage));
        }
    }

    #[test]
    fn test_overall_includes_missing_results() {
        let results = sample();
        let by_status = aggregate_by_status(&results);
        let per_status_total: usize = by_status.iter().map(|s| s.total).sum();
        let overall = aggregate_overall(&results, by_status);

        assert_eq!(overall.total_records, 5);
        assert_eq!(per_status_total, 4);
        assert_eq!(overall.total_found, 2);
        assert_eq!(overall.total_not_found, 3);
        assert_eq!(overall.found_percentage, 40.0);
        assert_eq!(overall.by_status.len(), 4);
    }

    #[test]
    fn test_empty_results() {
        let overall = aggregate_overall(&[], aggregate_by_status(&[]));
        assert_eq!(overall.total_records, 0);
        assert_eq!(overall.found_percentage, 0.0);
        assert!(overall.by_status.iter().all(|s| s.total == 0));
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let results = sample();
        let first = aggregate_overall(&results, aggregate_by_status(&results));
        let second = aggregate_overall(&results, aggregate_by_status(&results));
        assert_eq!(first, second);
        assert_eq!(
            first.found_percentage.to_bits(),
            second.found_percentage.to_bits()
        );
    }
}
