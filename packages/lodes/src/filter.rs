//! Block Group membership filter over job records.

use std::collections::BTreeSet;

use grid_stats_lodes_models::{JobRecord, JobTotals};

/// Sums the records whose parent Block Group is in `block_groups`.
///
/// Records with malformed block identifiers never match. An empty
/// `block_groups` set yields all-zero totals.
#[must_use]
pub fn filter_and_sum<'a, I>(records: I, block_groups: &BTreeSet<String>) -> JobTotals
where
    I: IntoIterator<Item = &'a JobRecord>,
{
    let mut totals = JobTotals::zero();
    if block_groups.is_empty() {
        return totals;
    }

    let mut matched = 0usize;
    for record in records {
        if record
            .block_group()
            .is_some_and(|block_group| block_groups.contains(block_group))
        {
            totals.add(record);
            matched += 1;
        }
    }

    log::debug!(
        "Matched {matched} LODES blocks across {} Block Groups ({} jobs)",
        block_groups.len(),
        totals.total_jobs
    );

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_stats_lodes_models::{AgeBand, EarningsBand, Sector};
    use std::collections::BTreeMap;

    fn record(block_id: &str, e1: u64, e2: u64, e3: u64, agriculture: u64) -> JobRecord {
        JobRecord {
            block_id: block_id.to_string(),
            total_jobs: e1 + e2 + e3,
            earnings: BTreeMap::from([
                (EarningsBand::E1, e1),
                (EarningsBand::E2, e2),
                (EarningsBand::E3, e3),
            ]),
            ages: BTreeMap::from([(AgeBand::A2, e1 + e2 + e3)]),
            sectors: BTreeMap::from([
                (Sector::Agriculture, agriculture),
                (Sector::HealthCare, e1 + e2 + e3 - agriculture),
            ]),
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn sums_matching_block_groups() {
        let records = vec![
            record("250250101011000", 10, 20, 30, 5),
            record("250250101011001", 1, 2, 3, 0),
            record("250250101012000", 100, 100, 100, 0),
        ];
        let totals = filter_and_sum(&records, &set(&["250250101011"]));

        assert_eq!(totals.total_jobs, 66);
        assert_eq!(totals.earnings_bands[&EarningsBand::E1], 11);
        assert_eq!(totals.earnings_bands[&EarningsBand::E2], 22);
        assert_eq!(totals.earnings_bands[&EarningsBand::E3], 33);
        assert_eq!(totals.age_bands[&AgeBand::A1], 0);
        assert_eq!(totals.age_bands[&AgeBand::A2], 66);
        assert_eq!(totals.by_sector[&Sector::Agriculture], 5);
        assert_eq!(totals.by_sector[&Sector::HealthCare], 61);
        assert_eq!(totals.by_sector[&Sector::Mining], 0);
    }

    #[test]
    fn empty_block_group_set_is_all_zero() {
        let records = vec![record("250250101011000", 10, 20, 30, 5)];
        let totals = filter_and_sum(&records, &BTreeSet::new());
        assert_eq!(totals, JobTotals::zero());
    }

    #[test]
    fn no_records_is_all_zero() {
        let totals = filter_and_sum(&Vec::new(), &set(&["250250101011"]));
        assert_eq!(totals, JobTotals::zero());
    }

    #[test]
    fn malformed_block_ids_never_match() {
        let records = vec![record("2502501010110", 10, 0, 0, 0)];
        let totals = filter_and_sum(&records, &set(&["250250101011"]));
        assert_eq!(totals.total_jobs, 0);
    }

    #[test]
    fn disjoint_sets_add_up() {
        let records = vec![
            record("250250101011000", 10, 20, 30, 5),
            record("250250101012000", 7, 8, 9, 1),
        ];
        let a = filter_and_sum(&records, &set(&["250250101011"]));
        let b = filter_and_sum(&records, &set(&["250250101012"]));
        let both = filter_and_sum(&records, &set(&["250250101011", "250250101012"]));
        assert_eq!(a.total_jobs + b.total_jobs, both.total_jobs);
        assert_eq!(
            a.by_sector[&Sector::Agriculture] + b.by_sector[&Sector::Agriculture],
            both.by_sector[&Sector::Agriculture]
        );
    }
}
