//! JSON output
//!
//! Batch mode serializes `{meta, data, summary}` in one call. Streaming
//! mode writes the skeleton by hand so each entry can be emitted as it
//! arrives: metadata first, then the open `data` array, one entry at a
//! time, and finally the summary with the count.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use ldap3::SearchEntry;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::decode::format_entry_attributes;

use super::{open_writer, PrinterConfig};

const REPORT_VERSION: &str = "1.0";

#[derive(Serialize)]
struct JsonMeta {
    version: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct JsonSummary {
    count: usize,
}

#[derive(Serialize)]
struct JsonEntry {
    dn: String,
    attributes: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct JsonReport {
    meta: JsonMeta,
    data: Vec<JsonEntry>,
    summary: JsonSummary,
}

pub struct JsonPrinter {
    config: PrinterConfig,
}

impl JsonPrinter {
    pub fn new(config: PrinterConfig) -> Self {
        JsonPrinter { config }
    }

    fn meta() -> JsonMeta {
        JsonMeta {
            version: REPORT_VERSION,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    fn convert(entry: &SearchEntry) -> JsonEntry {
        JsonEntry {
            dn: entry.dn.clone(),
            attributes: format_entry_attributes(entry),
        }
    }

    pub fn print(&self, entries: &[SearchEntry]) -> Result<()> {
        let report = JsonReport {
            meta: Self::meta(),
            data: entries.iter().map(Self::convert).collect(),
            summary: JsonSummary {
                count: entries.len(),
            },
        };

        let mut w = open_writer(&self.config.path)?;
        serde_json::to_writer_pretty(&mut w, &report)?;
        writeln!(w)?;
        Ok(())
    }

    pub async fn stream_print(&self, mut entries: mpsc::Receiver<SearchEntry>) -> Result<()> {
        let mut w = open_writer(&self.config.path)?;

        let meta_json = serde_json::to_string_pretty(&Self::meta())?;
        write!(w, "{{\n  \"meta\": {},\n  \"data\": [\n", indent_block(&meta_json, "  "))?;

        let mut count = 0usize;
        while let Some(entry) = entries.recv().await {
            if count > 0 {
                writeln!(w, ",")?;
            }
            count += 1;

            let entry_json = serde_json::to_string_pretty(&Self::convert(&entry))?;
            write!(w, "{}", indent_block(&entry_json, "    "))?;
            w.flush()?;
        }

        let summary_json = serde_json::to_string_pretty(&JsonSummary { count })?;
        write!(
            w,
            "\n  ],\n  \"summary\": {}\n}}\n",
            indent_block(&summary_json, "  ")
        )?;
        w.flush()?;
        Ok(())
    }
}

/// Indents every line after the first, so a pretty-printed block nests
/// inside the hand-written skeleton
fn indent_block(block: &str, indent: &str) -> String {
    let mut lines = block.lines();
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(indent);
        out.push_str(line);
    }
    out
}
