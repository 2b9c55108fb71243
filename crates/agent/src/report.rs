//! Result export to CSV or JSON files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use application::scenario_runner::PacketOutcome;
use serde::Serialize;

/// Report file format, chosen from the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

impl ReportFormat {
    /// `.json` (any case) selects JSON, everything else CSV.
    pub fn from_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            Self::Json
        } else {
            Self::Csv
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => f.write_str("CSV"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// One flat report row per evaluated packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub index: usize,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: Option<u16>,
    pub dst_port: u16,
    pub protocol: &'static str,
    pub action: &'static str,
    pub matched_rule_id: Option<String>,
    pub matched_rule_index: Option<usize>,
}

impl From<&PacketOutcome> for ReportRecord {
    fn from(o: &PacketOutcome) -> Self {
        Self {
            index: o.index,
            src_ip: o.packet.src_addr.to_string(),
            dst_ip: o.packet.dst_addr.to_string(),
            src_port: o.packet.src_port,
            dst_port: o.packet.dst_port,
            protocol: o.packet.protocol.as_str(),
            action: o.verdict.action().as_str(),
            matched_rule_id: o.rule_id.as_ref().map(ToString::to_string),
            matched_rule_index: o.verdict.rule_index(),
        }
    }
}

/// Write `outcomes` to `path` in the format its extension selects.
pub fn write_report(path: &Path, outcomes: &[PacketOutcome]) -> Result<ReportFormat> {
    if outcomes.is_empty() {
        bail!("no results to save: the scenario has no packets");
    }

    let format = ReportFormat::from_path(path);
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let records: Vec<ReportRecord> = outcomes.iter().map(ReportRecord::from).collect();

    match format {
        ReportFormat::Csv => write_csv(file, &records),
        ReportFormat::Json => write_json(file, &records),
    }
    .with_context(|| format!("failed to write {format} report to {}", path.display()))?;

    tracing::info!(path = %path.display(), format = %format, rows = records.len(), "report saved");
    Ok(format)
}

fn write_csv<W: Write>(writer: W, records: &[ReportRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

fn write_json<W: Write>(writer: W, records: &[ReportRecord]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
