//! Gantt layout for a project's tasks.
//!
//! Tasks carry only a due date, so each bar's start is borrowed from the
//! bar before it: tasks are sorted by due date and chained end to end.
//! This is a display convention, not a scheduler; there is no notion of
//! dependencies or capacity.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::document::Document;
use crate::model::task::Task;

/// One synthesized timeline segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GanttBar {
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// 0, 50 or 100
    pub progress: u8,
}

/// Result of synthesizing a raw snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub bars: Vec<GanttBar>,
    /// Documents that did not decode as tasks
    pub skipped_malformed: usize,
    /// Tasks without a project
    pub skipped_drafts: usize,
}

/// Decode a raw store snapshot and lay out every well-formed, non-draft
/// task.
pub fn synthesize(records: &[Document], now: DateTime<Utc>) -> Schedule {
    let mut tasks = Vec::with_capacity(records.len());
    let mut skipped_malformed = 0;
    let mut skipped_drafts = 0;

    for doc in records {
        match Task::from_document(doc) {
            Ok(task) if task.is_draft() => {
                tracing::debug!(id = %doc.id, "skipping draft task");
                skipped_drafts += 1;
            }
            Ok(task) => tasks.push(task),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed task record");
                skipped_malformed += 1;
            }
        }
    }

    Schedule {
        bars: layout(&tasks, now),
        skipped_malformed,
        skipped_drafts,
    }
}

/// Lay out tasks as chained bars.
///
/// - sort ascending by due date; undated tasks sort first (epoch key)
/// - `end` is the due date, or `now` when there is none
/// - `start` is the previous bar's `end`; the first bar starts at its own
///   `end` and so has zero width
/// - any later bar with `end <= start` becomes a one-day bar anchored at
///   `now`, or at the previous end if that is later
pub fn layout(tasks: &[Task], now: DateTime<Utc>) -> Vec<GanttBar> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &Task)> =
        tasks.iter().map(|t| (t.due_instant(), t)).collect();
    // Stable: equal keys keep their input order
    keyed.sort_by_key(|(due, _)| due.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));

    let mut bars: Vec<GanttBar> = Vec::with_capacity(keyed.len());
    for (due, task) in keyed {
        let mut end = due.unwrap_or(now);
        let mut start = bars.last().map_or(end, |prev| prev.end);

        if !bars.is_empty() && end <= start {
            start = start.max(now);
            end = start + Duration::days(1);
        }

        bars.push(GanttBar {
            id: task.id.clone(),
            name: task.display_name().to_string(),
            start,
            end,
            progress: task.status.progress(),
        });
    }
    bars
}
