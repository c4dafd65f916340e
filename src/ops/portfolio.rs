//! Portfolio summaries for dashboard charts.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::project::Project;
use crate::util::date::{month_index, month_label, month_start};

/// Project count per current state, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StateHistogram(pub IndexMap<String, usize>);

impl StateHistogram {
    pub fn get(&self, label: &str) -> usize {
        self.0.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Count projects by their current state. Each project lands in exactly
/// one bucket; unknown labels are counted verbatim.
pub fn state_histogram(projects: &[Project]) -> StateHistogram {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for project in projects {
        *counts.entry(project.state_label().to_string()).or_insert(0) += 1;
    }
    StateHistogram(counts)
}

/// Months before and after the current month covered by the funnel.
///
/// The range is half-open: `[current - months_back, current + months_forward)`.
/// The current month is the first month counted by `months_forward`, so
/// `(1, 1)` covers last month and this month, and `(0, 0)` covers nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunnelWindow {
    pub months_back: u32,
    pub months_forward: u32,
}

impl FunnelWindow {
    pub fn new(months_back: u32, months_forward: u32) -> Self {
        FunnelWindow {
            months_back,
            months_forward,
        }
    }

    /// Number of months covered. Months outside the calendar range
    /// `NaiveDate` can represent yield no bucket, so a funnel may be
    /// shorter than this near those limits.
    pub fn len(&self) -> usize {
        let months = u64::from(self.months_back) + u64::from(self.months_forward);
        usize::try_from(months).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One month of the cohort funnel. Serializes as
/// `{"label": "Jan 2025", "<state>": n, ...}` with only the states present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelBucket {
    pub label: String,
    /// First day of the month
    #[serde(skip)]
    pub month: NaiveDate,
    #[serde(flatten)]
    pub counts: IndexMap<String, usize>,
}

impl FunnelBucket {
    pub fn count(&self, state: &str) -> usize {
        self.counts.get(state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Bucket projects by target month over the window around `today`.
///
/// Projects without a parsable target date, or whose target month falls
/// outside the window, are left out.
pub fn monthly_funnel(projects: &[Project], window: FunnelWindow, today: NaiveDate) -> Vec<FunnelBucket> {
    // Months chrono cannot represent get no bucket
    let lowest = i64::from(month_index(NaiveDate::MIN));
    let highest = i64::from(month_index(NaiveDate::MAX));

    let current = i64::from(month_index(today));
    let first = (current - i64::from(window.months_back)).max(lowest);
    let last = (current + i64::from(window.months_forward)).min(highest + 1); // exclusive

    let mut buckets: Vec<FunnelBucket> = (first..last)
        .filter_map(|idx| i32::try_from(idx).ok().and_then(month_start))
        .map(|month| FunnelBucket {
            label: month_label(month),
            month,
            counts: IndexMap::new(),
        })
        .collect();

    for project in projects {
        let Some(target) = project.target() else {
            continue;
        };
        let idx = i64::from(month_index(target));
        if idx < first || idx >= last {
            continue;
        }
        let Some(bucket) = usize::try_from(idx - first).ok().and_then(|i| buckets.get_mut(i)) else {
            continue;
        };
        *bucket
            .counts
            .entry(project.state_label().to_string())
            .or_insert(0) += 1;
    }

    buckets
}

/// Every state that appears in any bucket, in first-seen order. One chart
/// dataset per entry.
pub fn funnel_states(buckets: &[FunnelBucket]) -> Vec<String> {
    let mut states: Vec<String> = Vec::new();
    for bucket in buckets {
        for state in bucket.counts.keys() {
            if !states.contains(state) {
                states.push(state.clone());
            }
        }
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::ProjectState;
    use chrono::Datelike;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn project(state: Option<&str>, target: Option<&str>) -> Project {
        Project {
            state: state.map(|s| ProjectState::from(s.to_string())),
            target_date: target.map(str::to_string),
            ..Default::default()
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn histogram_counts_current_state() {
        let projects = vec![
            project(Some("Active"), None),
            project(Some("Active"), None),
            project(Some("Completed"), None),
            project(Some("Lead"), None),
        ];
        let hist = state_histogram(&projects);
        let pairs: Vec<(&str, usize)> = hist.iter().collect();
        assert_eq!(pairs, vec![("Active", 2), ("Completed", 1), ("Lead", 1)]);
        assert_eq!(hist.total(), projects.len());
    }

    #[test]
    fn histogram_keeps_unknown_and_unset_labels() {
        let mut with_history = project(Some("Active"), None);
        with_history.state_history = vec![crate::model::project::StateChange {
            state: "Lead".into(),
            changed_at: chrono::Utc::now(),
        }];
        let projects = vec![
            project(Some("On Hold"), None),
            project(None, None),
            with_history,
        ];
        let hist = state_histogram(&projects);
        assert_eq!(hist.get("On Hold"), 1);
        assert_eq!(hist.get("unset"), 1);
        assert_eq!(hist.get("Active"), 1);
        // History never counts
        assert_eq!(hist.get("Lead"), 0);
        assert_eq!(hist.total(), 3);
    }

    #[test]
    fn empty_collection() {
        assert_eq!(state_histogram(&[]).total(), 0);
        let buckets = monthly_funnel(&[], FunnelWindow::new(2, 2), ymd(2025, 3, 10));
        assert_eq!(buckets.len(), 4);
        assert!(buckets.iter().all(|b| b.counts.is_empty()));
    }

    #[test]
    fn one_back_one_forward_in_march() {
        let buckets = monthly_funnel(&[], FunnelWindow::new(1, 1), ymd(2025, 3, 18));
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Feb 2025", "Mar 2025"]);
    }

    #[test]
    fn zero_window_has_no_buckets() {
        assert!(monthly_funnel(&[], FunnelWindow::new(0, 0), ymd(2025, 3, 1)).is_empty());
        assert!(FunnelWindow::new(0, 0).is_empty());
    }

    #[test]
    fn bucket_count_and_order_for_many_windows() {
        let today = ymd(2025, 1, 31);
        for back in 0..15 {
            for forward in 0..15 {
                let buckets = monthly_funnel(&[], FunnelWindow::new(back, forward), today);
                assert_eq!(buckets.len(), (back + forward) as usize);
                for pair in buckets.windows(2) {
                    assert!(pair[0].month < pair[1].month);
                }
            }
        }
    }

    #[test]
    fn window_crosses_year_boundary() {
        let buckets = monthly_funnel(&[], FunnelWindow::new(2, 2), ymd(2025, 1, 15));
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Nov 2024", "Dec 2024", "Jan 2025", "Feb 2025"]);
    }

    #[test]
    fn projects_land_in_their_target_month() {
        let projects = vec![
            project(Some("Active"), Some("2025-03-01")),
            project(Some("Active"), Some("2025-03-31")),
            project(Some("Lead"), Some("2025-03-15")),
            project(Some("Lead"), Some("2025-02-10")),
            project(Some("Completed"), Some("2025-05-01")), // outside
            project(Some("Active"), None),                  // no target
            project(Some("Active"), Some("soon")),          // unparsable
            project(Some("Proposal"), Some("2024-03-15")),  // same month, other year
        ];
        let buckets = monthly_funnel(&projects, FunnelWindow::new(1, 2), ymd(2025, 3, 18));
        assert_eq!(buckets.len(), 3);

        assert_eq!(buckets[0].label, "Feb 2025");
        assert_eq!(buckets[0].count("Lead"), 1);
        assert_eq!(buckets[0].counts.len(), 1);

        assert_eq!(buckets[1].label, "Mar 2025");
        assert_eq!(buckets[1].count("Active"), 2);
        assert_eq!(buckets[1].count("Lead"), 1);
        assert_eq!(buckets[1].count("Proposal"), 0);
        assert!(!buckets[1].counts.contains_key("Proposal"));

        assert_eq!(buckets[2].label, "Apr 2025");
        assert!(buckets[2].counts.is_empty());
    }

    #[test]
    fn bucket_serializes_sparse_states() {
        let projects = vec![
            project(Some("Active"), Some("2025-03-02")),
            project(Some("Lead"), Some("2025-03-09")),
            project(Some("Active"), Some("2025-03-20")),
        ];
        let buckets = monthly_funnel(&projects, FunnelWindow::new(0, 1), ymd(2025, 3, 1));
        let value = serde_json::to_value(&buckets).unwrap();
        assert_eq!(value, json!([{"label": "Mar 2025", "Active": 2, "Lead": 1}]));
    }

    #[test]
    fn states_in_first_seen_order() {
        let projects = vec![
            project(Some("Lead"), Some("2025-01-05")),
            project(Some("Active"), Some("2025-03-05")),
            project(Some("Lead"), Some("2025-03-09")),
        ];
        let buckets = monthly_funnel(&projects, FunnelWindow::new(2, 1), ymd(2025, 3, 1));
        assert_eq!(funnel_states(&buckets), vec!["Lead".to_string(), "Active".to_string()]);
        assert_eq!(buckets[1].total(), 0);
        assert_eq!(buckets[2].total(), 2);
    }

    #[test]
    fn huge_windows_stop_at_the_calendar_limits() {
        let window = FunnelWindow::new(u32::MAX, u32::MAX);
        assert_eq!(window.len() as u64, 2 * u64::from(u32::MAX));

        let last_year = NaiveDate::MAX.year();
        let buckets = monthly_funnel(&[], FunnelWindow::new(1, 3), ymd(last_year, 12, 10));
        let months: Vec<NaiveDate> = buckets.iter().map(|b| b.month).collect();
        assert_eq!(months, vec![ymd(last_year, 11, 1), ymd(last_year, 12, 1)]);

        let first_year = NaiveDate::MIN.year();
        let buckets = monthly_funnel(&[], FunnelWindow::new(4_000_000, 1), ymd(first_year, 1, 10));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].month, ymd(first_year, 1, 1));

        let projects = vec![project(Some("Lead"), Some("2025-03-05"))];
        let buckets = monthly_funnel(&projects, FunnelWindow::new(0, 1), ymd(2025, 3, 1));
        assert_eq!(buckets[0].count("Lead"), 1);
    }

    #[test]
    fn histogram_counts_records_with_null_fields() {
        let docs: Vec<crate::model::document::Document> = serde_json::from_value(json!([
            {"id": "p1", "state": "Active", "notes": null},
            {"id": "p2", "state": "Lead", "address": null, "budget": null}
        ]))
        .unwrap();
        let projects: Vec<Project> = docs.iter().map(|d| Project::from_document(d).unwrap()).collect();
        let hist = state_histogram(&projects);
        assert_eq!(hist.total(), docs.len());
        assert_eq!(hist.get("Active"), 1);
    }

    #[test]
    fn results_are_fresh_per_call() {
        let projects = vec![project(Some("Lead"), Some("2025-03-05"))];
        let window = FunnelWindow::new(1, 1);
        let mut first = monthly_funnel(&projects, window, ymd(2025, 3, 1));
        first[1].counts.insert("Lead".into(), 99);
        let second = monthly_funnel(&projects, window, ymd(2025, 3, 1));
        assert_eq!(second[1].count("Lead"), 1);
    }
}
