use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime;
use crate::form::{FormFields, Mode};
use crate::task::Task;
use crate::validate::ValidationErrors;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Render the derived view as a table. Overdue due dates are painted
    /// red, ids yellow.
    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[&Task], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks to display.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Done".to_string(),
            "Description".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id.to_string(), "33");

            let due = datetime::format_date(task.due);
            let due = if task.due < today {
                self.paint(&due, "31")
            } else {
                due
            };

            let done = if task.completed { "x" } else { "" };

            rows.push(vec![
                id,
                task.name.clone(),
                due,
                task.priority.to_string(),
                done.to_string(),
                task.description.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Show the form: mode, every field's raw value, the errors visible
    /// for touched fields, and whether a submit would currently succeed.
    #[tracing::instrument(skip_all)]
    pub fn print_form(
        &mut self,
        mode: Mode,
        fields: &FormFields,
        errors: &ValidationErrors,
        ready: bool,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "mode         {mode}")?;
        writeln!(out, "name         {}", fields.name)?;
        writeln!(out, "due          {}", fields.due)?;
        writeln!(out, "priority     {}", fields.priority)?;
        writeln!(out, "description  {}", fields.description)?;
        writeln!(
            out,
            "completed    {}",
            if fields.completed { "yes" } else { "no" }
        )?;
        writeln!(out, "ready        {}", if ready { "yes" } else { "no" })?;

        self.write_errors(&mut out, errors)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_errors(&mut self, errors: &ValidationErrors) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_errors(&mut out, errors)?;
        Ok(())
    }

    fn write_errors<W: Write>(&self, mut out: W, errors: &ValidationErrors) -> anyhow::Result<()> {
        for (field, message) in errors {
            let tag = self.paint(&format!("{field}:"), "31");
            writeln!(out, "  {tag} {message}")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
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

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
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
