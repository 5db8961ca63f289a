use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::state::ClientState;
use crate::analytics::TaskSummary;
use crate::models::Task;

const BAR_WIDTH: f64 = 30.0;

const FEATURES: [(&str, &str); 3] = [
    (
        "Task Management",
        "Organize your development tasks with intuitive lists and priorities.",
    ),
    (
        "Session Tracking",
        "Monitor your coding sessions and boost productivity with insightful stats.",
    ),
    (
        "Coding Notes",
        "Take quick notes, jot down ideas, and never lose your coding thoughts.",
    ),
];

/// Seconds as `"<h>h <m>m"`.
pub fn format_time(seconds: u64) -> String {
    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}

pub fn landing() -> String {
    let mut out = String::from("DevTrack - track what you build\n\n");
    for (title, desc) in FEATURES {
        let _ = writeln!(out, "  {title}\n    {desc}");
    }
    out.push_str("\nRun `devtrack-cli signup` or `devtrack-cli login` to get started.\n");
    out
}

pub fn render_task(task: &Task) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", task.id, task.title);
    let _ = writeln!(
        out,
        "  status: {}  priority: {}  time: {}",
        task.status,
        task.priority,
        format_time(task.time_spent)
    );
    if !task.tags.is_empty() {
        let _ = writeln!(out, "  tags: {}", task.tags.join(", "));
    }
    if !task.notes.is_empty() {
        for line in task.notes.lines() {
            let _ = writeln!(out, "  | {line}");
        }
    }
    out
}

/// Task list under the current filter. The timed task shows its running time.
pub fn render_board(tasks: &[Task], state: &ClientState, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let filter = state.filter.map_or("all", |s| s.as_str());
    let visible = state.visible(tasks);
    let _ = writeln!(out, "Tasks ({filter}): {} of {}", visible.len(), tasks.len());

    if visible.is_empty() {
        out.push_str("  no tasks\n");
        return out;
    }

    let timer = state.active_timer();
    for task in visible {
        let marker = match timer {
            Some(t) if t.task_id == task.id => {
                format!("  [timing +{}]", format_time(t.elapsed(now).seconds))
            }
            _ => String::new(),
        };
        let tags = if task.tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", task.tags.join(" #"))
        };
        let _ = writeln!(
            out,
            "  {:<24} {:<12} {:<7} {:>8}  {}{}{}",
            task.id,
            task.status.as_str(),
            task.priority.as_str(),
            format_time(task.time_spent),
            task.title,
            tags,
            marker
        );
    }
    out
}

pub fn render_analytics(summary: &TaskSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  total tasks   {}", summary.total);
    let _ = writeln!(out, "  pending       {}", summary.pending);
    let _ = writeln!(out, "  in progress   {}", summary.in_progress);
    let _ = writeln!(out, "  completed     {}", summary.completed);
    let _ = writeln!(out, "  time spent    {}", format_time(summary.total_time_spent));

    let _ = writeln!(out, "\nProductivity Trend");
    if summary.trend.is_empty() {
        out.push_str("  no data yet\n");
        return out;
    }

    let max = summary
        .trend
        .iter()
        .map(|p| p.hours)
        .fold(0.0_f64, f64::max);
    for point in &summary.trend {
        let width = if max > 0.0 {
            (point.hours / max * BAR_WIDTH).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "  {}  {:<30} {:.1}h",
            point.date,
            "#".repeat(width),
            point.hours
        );
    }
    out
}
