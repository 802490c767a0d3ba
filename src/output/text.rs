//! Card-style text output
//!
//! One card per entry: a separator, the DN tagged with its coarse object
//! type, then the decoded attributes in sorted order. Streaming mode
//! flushes after every card so results appear as the DC returns them.

use std::io::Write;

use anyhow::Result;
use ldap3::SearchEntry;
use tokio::sync::mpsc;

use crate::decode::format_entry_attributes;

use super::{object_type_from_dn, open_writer, PrinterConfig};

const SEPARATOR_WIDTH: usize = 80;
const VALUE_WIDTH: usize = 120;
const MIN_KEY_WIDTH: usize = 20;
const MAX_KEY_WIDTH: usize = 50;

pub struct TextPrinter {
    config: PrinterConfig,
}

impl TextPrinter {
    pub fn new(config: PrinterConfig) -> Self {
        TextPrinter { config }
    }

    pub fn print(&self, entries: &[SearchEntry]) -> Result<()> {
        let mut w = open_writer(&self.config.path)?;
        if entries.is_empty() {
            writeln!(w, "[INFO] No entries found")?;
            return Ok(());
        }

        print_header(&mut w)?;
        for entry in entries {
            print_entry_card(&mut w, entry)?;
        }
        print_footer(&mut w, entries.len())?;
        Ok(())
    }

    pub async fn stream_print(&self, mut entries: mpsc::Receiver<SearchEntry>) -> Result<()> {
        let mut w = open_writer(&self.config.path)?;
        print_header(&mut w)?;

        let mut count = 0usize;
        while let Some(entry) = entries.recv().await {
            print_entry_card(&mut w, &entry)?;
            w.flush()?;
            count += 1;
        }

        print_footer(&mut w, count)?;
        w.flush()?;
        Ok(())
    }
}

fn print_header(w: &mut dyn Write) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "  ADRECON REPORT  |  Search Results")?;
    writeln!(w)?;
    Ok(())
}

fn print_footer(w: &mut dyn Write, count: usize) -> Result<()> {
    writeln!(w, "Total Entries: {}", count)?;
    Ok(())
}

fn print_entry_card(w: &mut dyn Write, entry: &SearchEntry) -> Result<()> {
    let attr_map = format_entry_attributes(entry);
    let obj_type = object_type_from_dn(&entry.dn);
    let separator = "-".repeat(SEPARATOR_WIDTH);

    writeln!(w, "{}", separator)?;
    writeln!(w, "[{}] {}", obj_type, entry.dn)?;
    writeln!(w, "{}", separator)?;

    let mut key_width = attr_map
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(0);
    key_width = key_width.clamp(MIN_KEY_WIDTH, MAX_KEY_WIDTH);

    for (key, value) in &attr_map {
        if value.is_empty() {
            continue;
        }

        let value = sanitize_value(value);
        let key_text = format!("  [*] {}", key);
        let padding = " ".repeat(key_width.saturating_sub(key.len()));

        // Security descriptor summaries keep their full content, wrapped
        if key == "nTSecurityDescriptor" || value.starts_with("Owner=") || value.starts_with("O:")
        {
            let indent = " ".repeat(key_text.chars().count() + padding.len() + 3);
            for (i, part) in wrap_chars(&value, VALUE_WIDTH).into_iter().enumerate() {
                if i == 0 {
                    writeln!(w, "{}{} : {}", key_text, padding, part)?;
                } else {
                    writeln!(w, "{}{}", indent, part)?;
                }
            }
            continue;
        }

        let display = if value.chars().count() > VALUE_WIDTH {
            let truncated: String = value.chars().take(VALUE_WIDTH - 3).collect();
            format!("{}...", truncated)
        } else {
            value
        };

        writeln!(w, "{}{} : {}", key_text, padding, display)?;
    }

    writeln!(w)?;
    Ok(())
}

/// Collapses embedded line breaks and tabs so a value stays on its card line
fn sanitize_value(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r', '\t'], " ")
}

/// Splits a string into chunks of at most `width` characters
fn wrap_chars(s: &str, width: usize) -> Vec<String> {
    if width == 0 || s.is_empty() {
        return vec![s.to_string()];
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= width {
        return vec![s.to_string()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
