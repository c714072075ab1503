use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::fetcher::Page;
use crate::parser::accordion::AccordionEntry;
use crate::parser::sections::Sections;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Sections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accordion: Option<Vec<AccordionEntry>>,
}

impl PageReport {
    pub fn new(page: &Page) -> PageReport {
        PageReport {
            source: page.source.clone(),
            fetched_at: page.fetched_at,
            status: page.status,
            sections: None,
            accordion: None,
        }
    }

    pub fn with_sections(mut self, sections: Sections) -> PageReport {
        self.sections = Some(sections);
        self
    }

    pub fn with_accordion(mut self, entries: Vec<AccordionEntry>) -> PageReport {
        self.accordion = Some(entries);
        self
    }
}

/// Buffered writer to `path`, or to stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file =
                File::create(p).with_context(|| format!("Failed to create {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout()))),
    }
}

pub fn write_reports(out: &mut dyn Write, reports: &[PageReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, reports)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for report in reports {
                write_report_text(out, report)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn write_report_text(out: &mut dyn Write, report: &PageReport) -> Result<()> {
    writeln!(out, "# {}\n", report.source)?;
    for section in report.sections.iter().flatten() {
        writeln!(out, "## {}", section.title)?;
        if !section.body.is_empty() {
            writeln!(out, "{}", section.body)?;
        }
        writeln!(out)?;
    }
    for entry in report.accordion.iter().flatten() {
        writeln!(out, "### {}", entry.title)?;
        if !entry.body.is_empty() {
            writeln!(out, "{}", entry.body)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One entry per line; trailing newlines inside entries are dropped.
pub fn write_lines(out: &mut dyn Write, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(out, "{}", line.trim_end_matches(['\r', '\n']))?;
    }
    out.flush()?;
    Ok(())
}

pub fn save_text_lines(lines: &[String], path: &Path) -> Result<()> {
    let mut out = open_output(Some(path))?;
    write_lines(&mut *out, lines)
}

// ── Tests ──
