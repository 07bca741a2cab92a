use crate::controller::ViewSurface;
use crate::models::{Task, UserLabel};
use crate::series::{Snapshot, format_percent};

pub fn render_summary(label: UserLabel, snapshot: &Snapshot) -> String {
    format!(
        "{}: {}% ({}/{})",
        label.as_str(),
        format_percent(snapshot.completion_percentage),
        snapshot.completed_tasks,
        snapshot.total_tasks
    )
}

pub fn render_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!("[{mark}] #{} {}", task.id, task.content)
}

pub fn render_task_list(label: UserLabel, tasks: &[Task]) -> String {
    let mut out = format!("{}'s tasks\n", label.as_str());
    if tasks.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for task in tasks {
        out.push_str("  ");
        out.push_str(&render_task_line(task));
        out.push('\n');
    }
    out
}

/// Terminal rendition of the view surface: lists and summaries go to
/// stdout, errors to stderr.
#[derive(Debug, Default)]
pub struct TerminalView;

impl ViewSurface for TerminalView {
    fn show_tasks(&mut self, label: UserLabel, tasks: &[Task]) {
        print!("{}", render_task_list(label, tasks));
    }

    fn show_summary(&mut self, label: UserLabel, snapshot: &Snapshot) {
        println!("{}", render_summary(label, snapshot));
    }

    fn show_no_data(&mut self) {
        println!("No progress data available for the selected timeframe.");
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }
}
