use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::client::Client;
use crate::model::project::Project;
use crate::model::task::{Task, TaskStatus};
use crate::ops::portfolio::{FunnelBucket, StateHistogram, funnel_states};
use crate::ops::schedule::{GanttBar, Schedule};
use crate::util::date::format_date;
use crate::util::unicode::{display_width, pad_to_width, truncate_to_width};

/// Cells used by the timeline column of the Gantt view
const GANTT_WIDTH: usize = 24;
/// Longest task name shown before truncation
const NAME_MAX_WIDTH: usize = 28;
/// Longest histogram bar
const HISTOGRAM_MAX_BAR: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

/// A typed record with its store id in front
#[derive(Serialize)]
pub struct RecordJson<'a, T: Serialize> {
    pub id: &'a str,
    #[serde(flatten)]
    pub record: &'a T,
}

pub fn task_json(task: &Task) -> RecordJson<'_, Task> {
    RecordJson {
        id: &task.id,
        record: task,
    }
}

pub fn project_json(project: &Project) -> RecordJson<'_, Project> {
    RecordJson {
        id: &project.id,
        record: project,
    }
}

pub fn client_json(client: &Client) -> RecordJson<'_, Client> {
    RecordJson {
        id: &client.id,
        record: client,
    }
}

#[derive(Serialize)]
pub struct GanttJson<'a> {
    pub project: &'a str,
    #[serde(flatten)]
    pub schedule: &'a Schedule,
}

#[derive(Serialize)]
pub struct StatsJson<'a> {
    pub total: usize,
    pub states: &'a StateHistogram,
}

#[derive(Serialize)]
pub struct FunnelJson<'a> {
    pub months_back: u32,
    pub months_forward: u32,
    pub states: Vec<String>,
    pub buckets: &'a [FunnelBucket],
}

#[derive(Serialize)]
pub struct CreatedJson<'a> {
    pub id: &'a str,
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn status_char(status: TaskStatus) -> char {
    match status {
        TaskStatus::Pending => ' ',
        TaskStatus::InProgress => '>',
        TaskStatus::Completed => 'x',
    }
}

fn day(instant: DateTime<Utc>) -> String {
    format_date(instant.date_naive())
}

/// `[>] <id>  <name>  due <date>`
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] {}  {}",
        status_char(task.status),
        task.id,
        task.display_name()
    );
    match (task.due_instant(), task.due_date.as_deref()) {
        (Some(due), _) => line.push_str(&format!("  due {}", day(due))),
        (None, Some(raw)) if !raw.trim().is_empty() => {
            line.push_str(&format!("  due {} (unparsed)", raw.trim()))
        }
        _ => {}
    }
    line
}

/// `<id>  [<state>]  <address>  target <date>`
pub fn format_project_line(project: &Project) -> String {
    let mut line = format!("{}  [{}]  {}", project.id, project.state_label(), project.address);
    if let Some(target) = project.target() {
        line.push_str(&format!("  target {}", format_date(target)));
    }
    line
}

pub fn format_client_line(client: &Client) -> String {
    format!("{}  {}", client.id, client.contact_line())
}

/// One line per bar: name, date range, progress and a timeline track
/// scaled to the whole schedule. Zero-length bars show as a marker.
pub fn format_gantt(bars: &[GanttBar]) -> Vec<String> {
    let (Some(span_start), Some(span_end)) = (
        bars.iter().map(|b| b.start).min(),
        bars.iter().map(|b| b.end).max(),
    ) else {
        return Vec::new();
    };
    let total = (span_end - span_start).num_seconds();
    let col = |t: DateTime<Utc>| -> usize {
        if total <= 0 {
            return 0;
        }
        let offset = (t - span_start).num_seconds() as i128;
        ((offset * GANTT_WIDTH as i128) / total as i128).clamp(0, GANTT_WIDTH as i128) as usize
    };

    let names: Vec<String> = bars
        .iter()
        .map(|b| truncate_to_width(&b.name, NAME_MAX_WIDTH))
        .collect();
    let name_w = names.iter().map(|n| display_width(n)).max().unwrap_or(0);

    bars.iter()
        .zip(&names)
        .map(|(bar, name)| {
            let mut track = vec![' '; GANTT_WIDTH];
            let (c0, c1) = (col(bar.start), col(bar.end));
            if c1 > c0 {
                track[c0..c1].fill('█');
            } else {
                track[c0.min(GANTT_WIDTH - 1)] = '◆';
            }
            format!(
                "{}  {} → {}  {:>3}%  |{}|",
                pad_to_width(name, name_w),
                day(bar.start),
                day(bar.end),
                bar.progress,
                track.into_iter().collect::<String>()
            )
        })
        .collect()
}

pub fn format_histogram(hist: &StateHistogram) -> Vec<String> {
    let total = hist.total();
    let label_w = hist
        .iter()
        .map(|(label, _)| display_width(label))
        .chain(std::iter::once("total".len()))
        .max()
        .unwrap_or(0);
    let count_w = total.to_string().len();
    let max = hist.iter().map(|(_, n)| n).max().unwrap_or(0);

    let mut lines: Vec<String> = hist
        .iter()
        .map(|(label, n)| {
            let bar_len = if max > HISTOGRAM_MAX_BAR {
                (n * HISTOGRAM_MAX_BAR / max).max(1)
            } else {
                n
            };
            format!(
                "{}  {:>count_w$}  {}",
                pad_to_width(label, label_w),
                n,
                "▇".repeat(bar_len)
            )
        })
        .collect();
    lines.push(format!("{}  {:>count_w$}", pad_to_width("total", label_w), total));
    lines
}

/// Month-by-state table with a total column. States appear in the order
/// they are first seen.
pub fn format_funnel(buckets: &[FunnelBucket]) -> Vec<String> {
    if buckets.is_empty() {
        return Vec::new();
    }
    let states = funnel_states(buckets);
    let label_w = buckets
        .iter()
        .map(|b| display_width(&b.label))
        .chain(std::iter::once("month".len()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = states
        .iter()
        .map(|s| {
            let widest = buckets.iter().map(|b| b.count(s)).max().unwrap_or(0);
            display_width(s).max(widest.to_string().len())
        })
        .collect();
    let total_w = buckets
        .iter()
        .map(|b| b.total().to_string().len())
        .max()
        .unwrap_or(0)
        .max("total".len());

    let mut header = pad_to_width("month", label_w);
    for (state, w) in states.iter().zip(&widths) {
        header.push_str("  ");
        header.push_str(&" ".repeat(w - display_width(state)));
        header.push_str(state);
    }
    header.push_str(&format!("  {:>total_w$}", "total"));

    let mut lines = vec![header];
    for bucket in buckets {
        let mut row = pad_to_width(&bucket.label, label_w);
        for (state, w) in states.iter().zip(&widths) {
            row.push_str(&format!("  {:>w$}", bucket.count(state), w = *w));
        }
        row.push_str(&format!("  {:>total_w$}", bucket.total()));
        lines.push(row);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::project::ProjectState;
    use crate::ops::portfolio::{FunnelWindow, monthly_funnel, state_histogram};
    use crate::ops::schedule::layout;
    use crate::util::date::parse_instant;
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn task(id: &str, name: &str, due: Option<&str>, status: TaskStatus) -> Task {
        Task {
            id: id.into(),
            project_id: Some("p1".into()),
            name: name.into(),
            due_date: due.map(str::to_string),
            status,
            ..Default::default()
        }
    }

    fn project(state: &str, target: Option<&str>) -> Project {
        Project {
            state: Some(ProjectState::from(state.to_string())),
            target_date: target.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn gantt_chain() {
        let now = parse_instant("2025-01-01T00:00:00Z").unwrap();
        let tasks = vec![
            task("t3", "Tiling", Some("2025-01-25"), TaskStatus::Pending),
            task("t2", "Demolition", Some("2025-01-05"), TaskStatus::InProgress),
            task("t1", "Survey", None, TaskStatus::Completed),
        ];
        let out = format_gantt(&layout(&tasks, now)).join("\n");
        assert_snapshot!(out, @r"
        Survey      2025-01-01 → 2025-01-01  100%  |◆                       |
        Demolition  2025-01-01 → 2025-01-05   50%  |████                    |
        Tiling      2025-01-05 → 2025-01-25    0%  |    ████████████████████|
        ");
    }

    #[test]
    fn gantt_empty() {
        assert!(format_gantt(&[]).is_empty());
    }

    #[test]
    fn histogram_table() {
        let projects = vec![
            project("Active", None),
            project("Active", None),
            project("Completed", None),
            project("Lead", None),
        ];
        let out = format_histogram(&state_histogram(&projects)).join("\n");
        assert_snapshot!(out, @r"
        Active     2  ▇▇
        Completed  1  ▇
        Lead       1  ▇
        total      4
        ");
    }

    #[test]
    fn histogram_bars_are_capped() {
        let projects: Vec<Project> = (0..100).map(|_| project("Lead", None)).collect();
        let lines = format_histogram(&state_histogram(&projects));
        assert_eq!(lines[0].chars().filter(|c| *c == '▇').count(), HISTOGRAM_MAX_BAR);
    }

    #[test]
    fn funnel_table() {
        let projects = vec![
            project("Lead", Some("2025-02-10")),
            project("Active", Some("2025-03-01")),
            project("Lead", Some("2025-03-15")),
            project("Active", Some("2025-03-31")),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 3, 18).unwrap();
        let buckets = monthly_funnel(&projects, FunnelWindow::new(1, 2), today);
        let out = format_funnel(&buckets).join("\n");
        assert_snapshot!(out, @r"
        month     Lead  Active  total
        Feb 2025     1       0      1
        Mar 2025     1       2      3
        Apr 2025     0       0      0
        ");
    }

    #[test]
    fn task_lines() {
        let dated = task("a1", "Paint", Some("2025-04-02T10:00:00Z"), TaskStatus::InProgress);
        assert_eq!(format_task_line(&dated), "[>] a1  Paint  due 2025-04-02");
        let vague = task("b2", "", Some("after monsoon"), TaskStatus::Pending);
        assert_eq!(format_task_line(&vague), "[ ] b2  Unnamed  due after monsoon (unparsed)");
        let done = task("c3", "Handover", None, TaskStatus::Completed);
        assert_eq!(format_task_line(&done), "[x] c3  Handover");
    }

    #[test]
    fn project_line_shows_target() {
        let mut p = project("Proposal", Some("2025-06-30"));
        p.id = "p9".into();
        p.address = "7 Palm Grove".into();
        assert_eq!(format_project_line(&p), "p9  [Proposal]  7 Palm Grove  target 2025-06-30");
    }

    #[test]
    fn record_json_puts_id_first() {
        let t = task("t1", "Survey", Some("2025-01-03"), TaskStatus::Pending);
        let value = serde_json::to_value(task_json(&t)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "t1",
                "projectId": "p1",
                "name": "Survey",
                "description": "",
                "dueDate": "2025-01-03",
                "status": "Pending"
            })
        );
    }
}
