use std::collections::HashSet;

use console::style;
use konspekt_core::{
    ChatEntry, ChatEntryKind, MindmapRenderer, OutlineMap, STATUS_DONE, STATUS_FAILED,
};

/// Badge colors follow the web client: green once done, red once failed,
/// yellow for everything the backend reports in between.
pub fn status_badge(status: &str) -> String {
    let styled = match status {
        STATUS_DONE => style(status).green(),
        STATUS_FAILED => style(status).red(),
        _ => style(status).yellow(),
    };
    format!("[{}]", styled.bold())
}

pub fn print_summary(result: &str) {
    println!("\n{}", style("Summary").bold().underlined());
    println!("{result}");
}

pub fn print_mindmap(markdown: &str) {
    let renderer = OutlineMap;
    let Ok(view) = renderer.render(markdown) else {
        return;
    };
    println!("\n{}", style("Mind map").bold().underlined());
    for line in view.to_text().lines() {
        let depth = (line.len() - line.trim_start().len()) / 2;
        println!("{}", colorize(line, depth));
    }
}

// depth-cycled palette, like the web map's node colors
fn colorize(line: &str, depth: usize) -> String {
    match depth % 4 {
        0 => style(line).blue(),
        1 => style(line).green(),
        2 => style(line).yellow(),
        _ => style(line).red(),
    }
    .to_string()
}

pub fn print_chat_entry(entry: &ChatEntry) {
    match entry.kind {
        ChatEntryKind::Question => println!("{} {}", style("You:").cyan().bold(), entry.content),
        ChatEntryKind::Answer => println!("{} {}", style("Answer:").green().bold(), entry.content),
        ChatEntryKind::Error => println!("{} {}", style("Error:").red().bold(), entry.content),
    }
}

/// Per-task expansion flags. View state only: never persisted, no backend
/// correlate.
#[derive(Default)]
pub struct TaskView {
    expanded: HashSet<String>,
}

impl TaskView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, task_id: &str) {
        self.expanded.insert(task_id.to_string());
    }

    pub fn is_expanded(&self, task_id: &str) -> bool {
        self.expanded.contains(task_id)
    }
}
