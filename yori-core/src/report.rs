// Report generation from scan results

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use yori_scanner::{ProbeResult, RunSnapshot, ScanReport, ScanWarning};

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

/// One listed result, flattened for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub url: String,
    pub status: u16,
    pub content_length: u64,
    pub elapsed_ms: u128,
    pub classification: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ProbeResult> for Finding {
    fn from(result: &ProbeResult) -> Self {
        Self {
            url: result.url.clone(),
            status: result.status_code,
            content_length: result.content_length,
            elapsed_ms: result.elapsed.as_millis(),
            classification: result.classification.to_string(),
            depth: result.candidate.depth(),
            directory: result.directory.clone(),
            redirect: result.redirect.clone(),
            error: result.error.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub target: String,
    pub generated_at: String,
    pub summary: RunSnapshot,
    pub hits: Vec<Finding>,
    pub errors: Vec<Finding>,
    pub warnings: Vec<ScanWarning>,
}

impl ReportData {
    /// Hits sorted by URL; misses and soft-404s only show up in the counters.
    pub fn gather(report: &ScanReport, generated_at: DateTime<Local>) -> Self {
        let mut hits: Vec<Finding> = report.hits().map(Finding::from).collect();
        hits.sort_by(|a, b| a.url.cmp(&b.url));
        let mut errors: Vec<Finding> = report.errors().map(Finding::from).collect();
        errors.sort_by(|a, b| a.url.cmp(&b.url));

        Self {
            target: report.target.clone(),
            generated_at: generated_at.to_rfc3339(),
            summary: report.summary.clone(),
            hits,
            errors,
            warnings: report.warnings.clone(),
        }
    }
}

pub fn generate_report(report: &ScanReport, format: ReportFormat) -> Result<String> {
    let data = ReportData::gather(report, Local::now());
    match format {
        ReportFormat::Text => Ok(generate_text_report(&data)),
        ReportFormat::Json => generate_json_report(&data),
        ReportFormat::Csv => Ok(generate_csv_report(&data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let rule = "═".repeat(79);
    let thin_rule = "─".repeat(79);
    let mut report = String::new();

    report.push_str(&format!("\n{}\n", rule));
    report.push_str("                            YORI FUZZ RESULTS\n");
    report.push_str(&format!("{}\n\n", rule));

    report.push_str(&format!("Target:       {}\n", data.target));
    report.push_str(&format!("Generated:    {}\n", data.generated_at));
    report.push_str(&format!("Findings:     {}\n\n", data.hits.len()));

    // Group by status code
    let mut by_status: BTreeMap<u16, Vec<&Finding>> = BTreeMap::new();
    for hit in &data.hits {
        by_status.entry(hit.status).or_default().push(hit);
    }

    for (status, hits) in &by_status {
        let label = match status {
            200..=299 => format!("[{}] Success", status),
            300..=399 => format!("[{}] Redirect", status),
            400..=499 => format!("[{}] Client Error", status),
            _ => format!("[{}]", status),
        };
        report.push_str(&format!("{} ({} findings)\n", label, hits.len()));
        report.push_str(&format!("{}\n", thin_rule));

        for hit in hits {
            report.push_str(&format!("  {} ({} bytes)", hit.url, hit.content_length));
            if let Some(ref redirect) = hit.redirect {
                report.push_str(&format!(" -> {}", redirect));
            }
            if hit.directory.is_some() {
                report.push_str(" [dir]");
            }
            report.push('\n');
        }
        report.push('\n');
    }

    if !data.errors.is_empty() {
        report.push_str(&format!("Errors ({})\n", data.errors.len()));
        report.push_str(&format!("{}\n", thin_rule));
        for error in &data.errors {
            report.push_str(&format!(
                "  {}: {}\n",
                error.url,
                error.error.as_deref().unwrap_or("unknown error")
            ));
        }
        report.push('\n');
    }

    if !data.warnings.is_empty() {
        report.push_str("Warnings\n");
        report.push_str(&format!("{}\n", thin_rule));
        for warning in &data.warnings {
            report.push_str(&format!("  {}\n", warning));
        }
        report.push('\n');
    }

    let summary = &data.summary;
    report.push_str("Summary\n");
    report.push_str(&format!("{}\n", thin_rule));
    report.push_str(&format!("  Requests:     {}\n", summary.requests));
    report.push_str(&format!("  Hits:         {}\n", summary.hits));
    report.push_str(&format!("  Misses:       {}\n", summary.misses));
    report.push_str(&format!("  Soft 404s:    {}\n", summary.soft_404s));
    report.push_str(&format!("  Errors:       {}\n", summary.errors));
    report.push_str(&format!(
        "  Directories:  {} discovered, {} scanned\n",
        summary.directories_discovered, summary.directories_scanned
    ));
    report.push_str(&format!(
        "  Elapsed:      {:.2}s\n",
        summary.elapsed.as_secs_f64()
    ));
    if summary.cancelled {
        report.push_str("  Status:       cancelled before completion\n");
    }

    report.push_str(&format!("\n{}\n", rule));
    report.push_str("                            End of Report\n");
    report.push_str(&format!("{}\n", rule));

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize report")
}

pub fn generate_csv_report(data: &ReportData) -> String {
    let mut csv =
        String::from("url,status,content_length,elapsed_ms,classification,depth,directory\n");

    for finding in data.hits.iter().chain(&data.errors) {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            escape_csv(&finding.url),
            finding.status,
            finding.content_length,
            finding.elapsed_ms,
            finding.classification,
            finding.depth,
            escape_csv(finding.directory.as_deref().unwrap_or(""))
        ));
    }

    csv
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write a report, creating parent directories as needed.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("http://a/b"), "http://a/b");
        assert_eq!(escape_csv("http://a/b,c"), "\"http://a/b,c\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
