use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::identity::Identity;
use crate::task::Task;
use crate::view::{self, Urgency};

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

    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[Task], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let headers = ["ID", "Due", "Status", "Description"];
        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let derived = view::task_view(task, today);

            let id = task.id.clone().unwrap_or_else(|| "-".to_string());
            let due = task.date.format("%Y-%m-%d").to_string();
            let status = derived.status.to_string();
            let status = if task.completed {
                self.paint(&status, "32")
            } else {
                match derived.urgency {
                    Urgency::Severe => self.paint(&status, "31"),
                    Urgency::Warning => self.paint(&status, "33"),
                    Urgency::Normal => status,
                }
            };
            let text = task.text.clone().unwrap_or_default();

            rows.push(vec![id, due, status, text]);
        }

        write_table(&mut out, &headers, &rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, identity))]
    pub fn print_identity(&mut self, identity: Option<&Identity>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        match identity {
            Some(identity) => {
                writeln!(out, "{} ({})", identity.display_name, identity.uid)?;
            }
            None => writeln!(out, "Not signed in.")?,
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

fn write_table<W: Write>(mut writer: W, headers: &[&str], rows: &[Vec<String>]) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(*header))
        .collect();

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            if visible > widths[idx] {
                widths[idx] = visible;
            }
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write!(writer, "{:width$}  ", header, width = widths[idx])?;
    }
    writeln!(writer)?;

    for &width in &widths {
        write!(writer, "{:-<width$}  ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible);
            write!(writer, "{}{}  ", cell, " ".repeat(padding))?;
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
    use super::{strip_ansi, write_table};

    #[test]
    fn table_columns_align_on_visible_width() {
        let mut buffer = Vec::new();
        let rows = vec![
            vec![
                "1".to_string(),
                "2024-06-11".to_string(),
                "\x1b[33m1 day remaining\x1b[0m".to_string(),
            ],
            vec![
                "12".to_string(),
                "2024-06-09".to_string(),
                "overdue".to_string(),
            ],
        ];
        write_table(&mut buffer, &["ID", "Due", "Status"], &rows).expect("write table");

        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID  "));
        assert!(strip_ansi(lines[2]).contains("1 day remaining"));
    }

    #[test]
    fn ansi_codes_do_not_count_toward_width() {
        assert_eq!(strip_ansi("\x1b[31moverdue\x1b[0m"), "overdue");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
