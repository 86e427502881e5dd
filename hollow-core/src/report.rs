// Report generation from run snapshots

use anyhow::{Context, Result};
use hollow_scanner::{ProbeResult, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

/// Order of the found section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoundOrder {
    /// The order results completed in
    #[default]
    Completion,
    /// The order of the wordlist
    Wordlist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub base_url: String,
    pub generated_at: String,
    pub summary: Summary,
    pub found: Vec<FoundEntry>,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub processed: usize,
    pub remaining: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundEntry {
    pub word: String,
    pub url: String,
    pub status_code: u16,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub word: String,
    pub url: String,
    pub error: String,
}

pub fn gather_report_data(snapshot: &Snapshot, base_url: &str, order: FoundOrder) -> ReportData {
    let found_results: Vec<ProbeResult> = match order {
        FoundOrder::Completion => snapshot.found.clone(),
        FoundOrder::Wordlist => snapshot.found_in_wordlist_order(),
    };

    let found = found_results
        .into_iter()
        .map(|result| FoundEntry {
            word: result.candidate.word,
            url: result.url,
            status_code: result.status_code.unwrap_or(0),
            elapsed_ms: result.elapsed.as_millis(),
        })
        .collect();

    let errors = snapshot
        .failures
        .iter()
        .map(|result| ErrorEntry {
            word: result.candidate.word.clone(),
            url: result.url.clone(),
            error: result.error.clone().unwrap_or_default(),
        })
        .collect();

    ReportData {
        base_url: base_url.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary: Summary {
            total: snapshot.total,
            processed: snapshot.processed,
            remaining: snapshot.remaining,
            found: snapshot.found.len(),
            not_found: snapshot.not_found,
            errors: snapshot.errors,
            cancelled: snapshot.cancelled,
        },
        found,
        errors,
    }
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("═══════════════════════════════════════════════════════════════════════════════\n");
    report.push_str("                            FUZZ RESULTS\n");
    report.push_str("═══════════════════════════════════════════════════════════════════════════════\n\n");

    report.push_str(&format!("Target: {}\n", data.base_url));
    report.push_str(&format!(
        "Processed: {}/{}{}\n",
        data.summary.processed,
        data.summary.total,
        if data.summary.cancelled { " (interrupted)" } else { "" }
    ));
    report.push_str(&format!("Found directories: {}\n", data.summary.found));
    report.push_str(&format!("Errors: {}\n\n", data.summary.errors));

    // Group by status code, keeping the chosen order inside each group
    let mut by_status: BTreeMap<u16, Vec<&FoundEntry>> = BTreeMap::new();
    for entry in &data.found {
        by_status.entry(entry.status_code).or_default().push(entry);
    }

    for (status_code, entries) in &by_status {
        let status_label = match status_code {
            200..=299 => format!("[{}] Success", status_code),
            300..=399 => format!("[{}] Redirect", status_code),
            400..=499 => format!("[{}] Restricted", status_code),
            _ => format!("[{}]", status_code),
        };

        report.push_str(&format!("{} ({} found)\n", status_label, entries.len()));
        report.push_str("───────────────────────────────────────────────────────────────────────────────\n");
        for entry in entries {
            report.push_str(&format!("  {}\n", entry.url));
        }
        report.push('\n');
    }

    if data.found.is_empty() {
        report.push_str("No directories found\n\n");
    }

    if !data.errors.is_empty() {
        report.push_str(&format!("Errors ({})\n", data.errors.len()));
        report.push_str("───────────────────────────────────────────────────────────────────────────────\n");
        for entry in &data.errors {
            report.push_str(&format!("  {} ({})\n", entry.url, entry.error));
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize report")
}

pub fn generate_csv_report(data: &ReportData) -> String {
    let mut csv = String::from("word,url,status,status_code,error\n");

    for entry in &data.found {
        csv.push_str(&format!(
            "{},{},found,{},\n",
            csv_escape(&entry.word),
            csv_escape(&entry.url),
            entry.status_code
        ));
    }
    for entry in &data.errors {
        csv.push_str(&format!(
            "{},{},error,,{}\n",
            csv_escape(&entry.word),
            csv_escape(&entry.url),
            csv_escape(&entry.error)
        ));
    }

    csv
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write report {}", path.display()))
}
