//! Report encoders
//!
//! Every encoder consumes decoded entries the same way: attributes are
//! formatted through [`crate::decode::format_entry_attributes`], failed
//! decodes render as empty strings, and a closed entry channel is the
//! terminal signal. The card/text encoder flushes per entry; CSV wide-form
//! buffers to derive its header; JSON streams a skeleton; BloodHound buffers
//! to fill its metadata.

mod bloodhound;
mod csv;
mod json;
mod text;

pub use bloodhound::BloodHoundPrinter;
pub use csv::CsvPrinter;
pub use json::JsonPrinter;
pub use text::TextPrinter;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ldap3::SearchEntry;
use tokio::sync::mpsc;

use crate::config::OutputFormat;
use crate::naming::split_dn;

/// Configuration for report printers
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Output format
    pub format: OutputFormat,
    /// Optional file path; stdout when absent
    pub path: Option<PathBuf>,
}

/// A report printer for one output format
pub enum Printer {
    Text(TextPrinter),
    Json(JsonPrinter),
    Csv(CsvPrinter),
    BloodHound(BloodHoundPrinter),
}

impl Printer {
    /// Creates the printer for the configured format
    pub fn new(config: PrinterConfig) -> Printer {
        match config.format {
            OutputFormat::Text => Printer::Text(TextPrinter::new(config)),
            OutputFormat::Json => Printer::Json(JsonPrinter::new(config)),
            OutputFormat::Csv => Printer::Csv(CsvPrinter::new(config)),
            OutputFormat::BloodHound => Printer::BloodHound(BloodHoundPrinter::new(config)),
        }
    }

    /// Renders a batch of entries
    pub fn print(&self, entries: &[SearchEntry]) -> Result<()> {
        match self {
            Printer::Text(p) => p.print(entries),
            Printer::Json(p) => p.print(entries),
            Printer::Csv(p) => p.print(entries),
            Printer::BloodHound(p) => p.print(entries),
        }
    }

    /// Renders entries as they arrive on the channel
    pub async fn stream_print(&self, entries: mpsc::Receiver<SearchEntry>) -> Result<()> {
        match self {
            Printer::Text(p) => p.stream_print(entries).await,
            Printer::Json(p) => p.stream_print(entries).await,
            Printer::Csv(p) => p.stream_print(entries).await,
            Printer::BloodHound(p) => p.stream_print(entries).await,
        }
    }
}

/// Opens the output sink: the configured file, or stdout
pub(crate) fn open_writer(path: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("failed to create output file {}", p.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Coarse object classification from the DN, used for display tags and
/// BloodHound type fallback
pub(crate) fn object_type_from_dn(dn: &str) -> &'static str {
    if dn.contains("OU=Domain Controllers,") {
        "DC"
    } else if dn.contains("CN=Computers,") {
        "COMPUTER"
    } else if dn.contains("CN=Users,") || dn.contains("OU=Users,") {
        "USER"
    } else if dn.contains("CN=Groups,") || dn.contains("OU=Groups,") {
        "GROUP"
    } else if dn.contains("OU=") {
        "OU"
    } else {
        "OTHER"
    }
}

/// Extracts the DNS domain from a DN's DC components
pub(crate) fn extract_domain(dn: &str) -> String {
    let parts: Vec<String> = split_dn(dn)
        .into_iter()
        .filter_map(|part| {
            let trimmed = part.trim();
            match trimmed.get(..3) {
                Some(prefix) if prefix.eq_ignore_ascii_case("DC=") && trimmed.len() > 3 => {
                    Some(trimmed[3..].to_string())
                }
                _ => None,
            }
        })
        .collect();

    if parts.is_empty() {
        return "UNKNOWN".to_string();
    }
    parts.join(".")
}
