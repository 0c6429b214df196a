use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_date;
use crate::model::{CoreView, List, Selection, Status, Task};
use crate::state::AppState;
use crate::view::{self, VisibleTasks};

/// Text rendition of the three columns: sidebar, task list, detail panel.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_board<W: Write>(
        &self,
        mut out: W,
        state: &AppState,
        visible: &VisibleTasks<'_>,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        if let Some(user) = &state.user {
            writeln!(out, "Signed in as {}", user.email)?;
            writeln!(out)?;
        }

        self.write_sidebar(&mut out, state, visible)?;
        writeln!(out)?;

        writeln!(
            out,
            "{} ({})",
            self.paint(&state.selection.to_string(), "1"),
            visible.len()
        )?;
        if visible.is_empty() {
            if let Selection::List(name) = &state.selection
                && state.lists.iter().any(|list| &list.name == name)
            {
                writeln!(out, "No tasks in \"{name}\" yet.")?;
            } else {
                writeln!(out, "Nothing here.")?;
            }
        } else {
            self.write_tasks(&mut out, &visible.active, today)?;
        }

        if !visible.completed.is_empty() {
            writeln!(out)?;
            writeln!(out, "Completed ({})", visible.completed.len())?;
            self.write_tasks(&mut out, &visible.completed, today)?;
        }

        if let Some(task) = state.selected() {
            writeln!(out)?;
            writeln!(out, "{}", self.paint("Details", "1"))?;
            self.write_task_info(&mut out, task)?;
        }

        Ok(())
    }

    fn write_sidebar<W: Write>(
        &self,
        out: &mut W,
        state: &AppState,
        visible: &VisibleTasks<'_>,
    ) -> anyhow::Result<()> {
        writeln!(out, "TASKS")?;
        for view in CoreView::ALL {
            let selected = state.selection == Selection::View(view);
            let count = if selected {
                visible.active.len().to_string()
            } else {
                String::new()
            };
            writeln!(
                out,
                "  {} {:<12} {}",
                marker(selected),
                view.as_str(),
                count
            )?;
        }

        writeln!(out, "LISTS")?;
        if state.lists.is_empty() {
            writeln!(out, "    (none yet; shelf list-add <name>)")?;
        }
        for list in &state.lists {
            let selected = state.selection == Selection::List(list.name.clone());
            writeln!(
                out,
                "  {} {:<12} {}",
                marker(selected),
                list.name,
                view::active_count(&state.tasks, list)
            )?;
        }
        Ok(())
    }

    fn write_tasks<W: Write>(
        &self,
        out: &mut W,
        tasks: &[&Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Due".to_string(),
            "List".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let due = task.due.map(format_date).unwrap_or_default();
            let due = match task.due {
                Some(date) if date < today && !task.status.is_done() => self.paint(&due, "31"),
                Some(date) if date == today => self.paint(&due, "33"),
                _ => due,
            };
            rows.push(vec![
                self.paint(task.short_id(), "33"),
                self.paint_status(task.status),
                due,
                task.list.clone(),
                task.title.clone(),
            ]);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_info<W: Write>(&self, mut out: W, task: &Task) -> anyhow::Result<()> {
        self.write_task_info(&mut out, task)
    }

    fn write_task_info<W: Write>(&self, out: &mut W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "status    {}", self.paint_status(task.status))?;
        writeln!(out, "list      {}", task.list)?;
        writeln!(
            out,
            "due       {}",
            task.due.map(format_date).unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(out, "tag       {}", task.core_view_tag)?;
        writeln!(
            out,
            "created   {}",
            task.created_at.format("%Y-%m-%d %H:%M")
        )?;
        if let Some(description) = &task.description {
            writeln!(out, "desc      {description}")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_lists<W: Write>(
        &self,
        out: W,
        lists: &[List],
        tasks: &[Task],
    ) -> anyhow::Result<()> {
        let headers = vec!["List".to_string(), "Open".to_string(), "Created".to_string()];
        let rows = lists
            .iter()
            .map(|list| {
                vec![
                    list.name.clone(),
                    view::active_count(tasks, list).to_string(),
                    list.created_at.format("%Y-%m-%d").to_string(),
                ]
            })
            .collect();
        write_table(out, headers, rows)
    }

    fn paint_status(&self, status: Status) -> String {
        match status {
            Status::Pending => status.as_str().to_string(),
            Status::InProgress => self.paint(status.as_str(), "36"),
            Status::Done => self.paint(status.as_str(), "32"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn marker(selected: bool) -> &'static str {
    if selected { ">" } else { " " }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{Renderer, strip_ansi};
    use crate::model::{Selection, Status, Task};
    use crate::state::AppState;
    use crate::view;

    #[test]
    fn board_lists_active_then_completed_and_details() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid date");
        let created = Utc
            .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp");
        let task = |id: &str, title: &str, status| Task {
            id: id.to_string(),
            list: "Work".to_string(),
            list_id: "l1".to_string(),
            title: title.to_string(),
            description: None,
            due: Some(today),
            status,
            core_view_tag: "Today".to_string(),
            created_at: created,
        };
        let state = AppState {
            tasks: vec![
                task("aaaaaaaa11", "Write report", Status::Pending),
                task("bbbbbbbb22", "File expenses", Status::Done),
            ],
            selected_task: Some("aaaaaaaa11".to_string()),
            ..AppState::default()
        };
        let visible = view::visible(&state.tasks, &Selection::default(), today);

        let mut out = Vec::new();
        Renderer::plain()
            .print_board(&mut out, &state, &visible, today)
            .expect("render");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("  > Today        1"));
        assert!(text.contains("Today (2)"));
        assert!(text.contains("Completed (1)"));
        assert!(text.contains("aaaaaaaa Pending"));
        assert!(text.contains("title     Write report"));
        assert!(text.find("Write report") < text.find("File expenses"));
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }
}
