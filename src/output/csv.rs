//! CSV output
//!
//! Batch mode writes wide-form rows: the header is the union of attribute
//! names across all entries (which forces buffering), one column per
//! attribute. Streaming mode writes long-form rows, one row per attribute
//! value, so output needs no buffering at all.

use std::collections::BTreeSet;

use anyhow::Result;
use ldap3::SearchEntry;
use tokio::sync::mpsc;

use crate::decode::format_entry_attributes;

use super::{open_writer, PrinterConfig};

pub struct CsvPrinter {
    config: PrinterConfig,
}

impl CsvPrinter {
    pub fn new(config: PrinterConfig) -> Self {
        CsvPrinter { config }
    }

    /// Wide-form: `DN, attr1, attr2, ...` with sorted attribute columns
    pub fn print(&self, entries: &[SearchEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut attr_set = BTreeSet::new();
        for entry in entries {
            for name in entry.attrs.keys().chain(entry.bin_attrs.keys()) {
                attr_set.insert(name.clone());
            }
        }
        let columns: Vec<String> = attr_set.into_iter().collect();

        let mut writer = csv::Writer::from_writer(open_writer(&self.config.path)?);

        let mut header = vec!["DN".to_string()];
        header.extend(columns.iter().cloned());
        writer.write_record(&header)?;

        for entry in entries {
            let attrs = format_entry_attributes(entry);
            let mut row = Vec::with_capacity(header.len());
            row.push(entry.dn.clone());
            for column in &columns {
                row.push(attrs.get(column).cloned().unwrap_or_default());
            }
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Long-form: one `DN, attribute, value` row per non-empty attribute,
    /// flushed per entry
    pub async fn stream_print(&self, mut entries: mpsc::Receiver<SearchEntry>) -> Result<()> {
        let mut writer = csv::Writer::from_writer(open_writer(&self.config.path)?);

        writer.write_record(["DN (Distinguished Name)", "Attribute Name", "Attribute Value"])?;

        while let Some(entry) = entries.recv().await {
            let attrs = format_entry_attributes(&entry);
            for (name, value) in &attrs {
                if value.is_empty() {
                    continue;
                }
                writer.write_record([entry.dn.as_str(), name.as_str(), value.as_str()])?;
            }
            writer.flush()?;
        }

        writer.flush()?;
        Ok(())
    }
}
