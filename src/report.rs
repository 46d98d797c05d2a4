use crate::stats::HoursSummary;
use eyre::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;

/// Write one CSV row per summary, with a header line.
pub fn write_summaries<W: io::Write>(writer: W, summaries: &[HoursSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        writer
            .serialize(summary)
            .with_context(|| format!("cannot write summary of {}", summary.student))?;
    }
    writer.flush().context("cannot flush csv output")?;
    Ok(())
}

pub fn export_summaries(path: &Path, summaries: &[HoursSummary]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    write_summaries(file, summaries)
}
