use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use abet_scraper::config::{
    BodyFormat, DuplicatePolicy, ExtractConfig, PreamblePolicy, RootPolicy, Settings,
};
use abet_scraper::fetcher::{Fetcher, Page, Target};
use abet_scraper::output::{self, OutputFormat, PageReport};
use abet_scraper::parser::fragments::{self, HeadingMatch};

const CS_CRITERIA_URL: &str = "https://www.abet.org/accreditation/accreditation-criteria/criteria-for-accrediting-computing-programs-2025-2026/";
const CSE_CRITERIA_URL: &str = "https://www.abet.org/accreditation/accreditation-criteria/criteria-for-accrediting-engineering-programs-2025-2026/";
const CSE_PROGRAM_TITLE: &str = "Systems and Similarly Named Engineering Programs";
const CS_DATAFILE: &str = "CS_datafile.txt";
const CSE_DATAFILE: &str = "CSE_datafile.txt";

#[derive(Parser)]
#[command(name = "abet_scraper", about = "Extract sections and accordion entries from ABET pages")]
struct Cli {
    /// Settings file (TOML). Defaults to ./abet_scraper.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (default: none)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Write results here instead of stdout
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Body rendering: plain text or inner HTML
    #[arg(long, value_enum, global = true)]
    body: Option<BodyFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split pages into sections at each heading
    Sections {
        /// URLs or saved HTML files
        #[arg(required = true)]
        targets: Vec<String>,
        #[command(flatten)]
        opts: SectionOpts,
    },
    /// List accordion entries (title + body)
    Accordion {
        #[arg(required = true)]
        targets: Vec<String>,
        #[command(flatten)]
        opts: AccordionOpts,
        /// Keep only this entry and print its text lines
        #[arg(long)]
        title: Option<String>,
    },
    /// Sections and accordion entries in one report per page
    Scrape {
        #[arg(required = true)]
        targets: Vec<String>,
        #[command(flatten)]
        sections: SectionOpts,
        #[command(flatten)]
        accordion: AccordionOpts,
    },
    /// Raw HTML between two headings identified by id
    Between {
        target: String,
        #[arg(long)]
        start: String,
        /// Stop at this heading id instead of the next heading
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "h2")]
        heading: String,
    },
    /// Items of an ordered list, found by style or by a preceding heading
    List {
        target: String,
        #[command(flatten)]
        anchor: ListAnchor,
        /// Heading tag for --after-id / --after-text
        #[arg(long, default_value = "h3")]
        heading: String,
    },
    /// Built-in ABET run: CS outcomes and the Systems engineering program criteria
    Criteria {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Args)]
struct SectionOpts {
    /// Tag that delimits sections (h1..h6)
    #[arg(long)]
    heading: Option<String>,
    /// CSS selector of the element whose children are scanned
    #[arg(long)]
    root: Option<String>,
    /// Scan the first heading's parent instead of <body> when --root is absent
    #[arg(long)]
    heading_parent_root: bool,
    /// Keep content before the first heading under "preamble"
    #[arg(long)]
    keep_preamble: bool,
    #[arg(long, value_enum)]
    duplicates: Option<DuplicatePolicy>,
}

#[derive(Args)]
struct AccordionOpts {
    /// CSS selector of accordion headers
    #[arg(long)]
    selector: Option<String>,
    /// CSS selector of accordion panels
    #[arg(long)]
    body_selector: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ListAnchor {
    /// Substring of the list's style attribute, e.g. "decimal"
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    after_id: Option<String>,
    #[arg(long)]
    after_text: Option<String>,
}

impl SectionOpts {
    fn apply(&self, cfg: &mut ExtractConfig) {
        if let Some(h) = &self.heading {
            cfg.heading_tag = h.clone();
        }
        if let Some(r) = &self.root {
            cfg.root_selector = Some(r.clone());
        }
        if self.heading_parent_root {
            cfg.root_policy = RootPolicy::HeadingParent;
        }
        if self.keep_preamble {
            cfg.preamble = PreamblePolicy::Keep;
        }
        if let Some(d) = self.duplicates {
            cfg.duplicates = d;
        }
    }
}

impl AccordionOpts {
    fn apply(&self, cfg: &mut ExtractConfig) {
        if let Some(s) = &self.selector {
            cfg.accordion_selector = s.clone();
        }
        if let Some(b) = &self.body_selector {
            cfg.accordion_body_selector = Some(b.clone());
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(secs) = cli.timeout {
        settings.fetch.timeout_secs = Some(secs);
    }
    if let Some(body) = cli.body {
        settings.extract.body_format = body;
    }
    let fetcher = Fetcher::new(&settings.fetch)?;
    let out = cli.out.as_deref();

    let result = match cli.command {
        Commands::Sections { targets, opts } => {
            let mut cfg = settings.extract.clone();
            opts.apply(&mut cfg);
            let reports = for_each_target(&fetcher, &targets, |page| {
                let sections = page.document()?.sections(&cfg)?;
                info!("{}: {} sections", page.source, sections.len());
                Ok(PageReport::new(page).with_sections(sections))
            })?;
            write_reports(out, &reports, cli.format)
        }
        Commands::Accordion { targets, opts, title } => {
            let mut cfg = settings.extract.clone();
            opts.apply(&mut cfg);
            match title {
                Some(title) => {
                    cfg.body_format = BodyFormat::Html;
                    let mut lines = Vec::new();
                    for_each_target(&fetcher, &targets, |page| {
                        lines.extend(entry_lines(page, &cfg, &title)?);
                        Ok(())
                    })?;
                    let mut w = output::open_output(out)?;
                    output::write_lines(&mut *w, &lines)
                }
                None => {
                    let reports = for_each_target(&fetcher, &targets, |page| {
                        let entries = page.document()?.accordion_items(&cfg)?;
                        info!("{}: {} accordion entries", page.source, entries.len());
                        Ok(PageReport::new(page).with_accordion(entries))
                    })?;
                    write_reports(out, &reports, cli.format)
                }
            }
        }
        Commands::Scrape { targets, sections, accordion } => {
            let mut cfg = settings.extract.clone();
            sections.apply(&mut cfg);
            accordion.apply(&mut cfg);
            let reports = for_each_target(&fetcher, &targets, |page| {
                let doc = page.document()?;
                Ok(PageReport::new(page)
                    .with_sections(doc.sections(&cfg)?)
                    .with_accordion(doc.accordion_items(&cfg)?))
            })?;
            write_reports(out, &reports, cli.format)
        }
        Commands::Between { target, start, end, heading } => {
            let page = fetcher.load(&Target::parse(&target))?;
            let html = fragments::extract_between_headings(&page.html, &heading, &start, end.as_deref())?;
            if html.is_empty() {
                warn!("No {} with id {:?} in {}", heading, start, page.source);
            }
            let mut w = output::open_output(out)?;
            writeln!(w, "{}", html)?;
            w.flush()?;
            Ok(())
        }
        Commands::List { target, anchor, heading } => {
            let page = fetcher.load(&Target::parse(&target))?;
            let items = match (anchor.style, anchor.after_id, anchor.after_text) {
                (Some(style), _, _) => fragments::ordered_list_by_style(&page.html, &style)?,
                (_, Some(id), _) => {
                    fragments::ordered_list_after_heading(&page.html, &heading, &HeadingMatch::Id(id))?
                }
                (_, _, Some(text)) => fragments::ordered_list_after_heading(
                    &page.html,
                    &heading,
                    &HeadingMatch::TextContains(text),
                )?,
                (None, None, None) => bail!("one of --style, --after-id or --after-text is required"),
            };
            info!("{}: {} list items", page.source, items.len());
            let mut w = output::open_output(out)?;
            output::write_lines(&mut *w, &items)
        }
        Commands::Criteria { out_dir } => run_criteria(&fetcher, &settings.extract, &out_dir),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    }

    result
}

/// Load every target in order, stopping at the first failure.
fn for_each_target<T>(
    fetcher: &Fetcher,
    targets: &[String],
    mut f: impl FnMut(&Page) -> Result<T>,
) -> Result<Vec<T>> {
    let pb = if targets.len() > 1 {
        let pb = ProgressBar::new(targets.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut results = Vec::with_capacity(targets.len());
    for raw in targets {
        pb.set_message(raw.clone());
        let page = fetcher.load(&Target::parse(raw))?;
        results.push(f(&page).with_context(|| format!("Failed to extract from {}", raw))?);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(results)
}

fn write_reports(out: Option<&Path>, reports: &[PageReport], format: OutputFormat) -> Result<()> {
    let mut w = output::open_output(out)?;
    output::write_reports(&mut *w, reports, format)?;
    if let Some(path) = out {
        info!("Wrote {} report(s) to {}", reports.len(), path.display());
    }
    Ok(())
}

/// Text lines of the accordion entry titled `title`; empty when absent.
fn entry_lines(page: &Page, cfg: &ExtractConfig, title: &str) -> Result<Vec<String>> {
    let entries = page.document()?.accordion_items(cfg)?;
    match entries.iter().find(|e| e.title == title) {
        Some(entry) => Ok(fragments::text_lines(&entry.body)),
        None => {
            warn!("{}: accordion entry {:?} not found", page.source, title);
            Ok(Vec::new())
        }
    }
}

fn run_criteria(fetcher: &Fetcher, base: &ExtractConfig, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    println!("Fetching CS page...");
    let cs_page = fetcher.fetch(CS_CRITERIA_URL)?;
    let cs = fragments::ordered_list_by_style(&cs_page.html, "decimal")?;
    println!("CS: extracted {} items", cs.len());
    output::save_text_lines(&cs, &out_dir.join(CS_DATAFILE))?;
    print_preview("CS", &cs, 8);

    println!("\nFetching CSE page...");
    let cse_page = fetcher.fetch(CSE_CRITERIA_URL)?;
    let cfg = ExtractConfig {
        body_format: BodyFormat::Html,
        ..base.clone()
    };
    let cse = entry_lines(&cse_page, &cfg, CSE_PROGRAM_TITLE)?;
    output::save_text_lines(&cse, &out_dir.join(CSE_DATAFILE))?;
    println!("CSE: extracted {} lines for {:?}", cse.len(), CSE_PROGRAM_TITLE);
    print_preview("CSE", &cse, 12);

    Ok(())
}

fn print_preview(label: &str, lines: &[String], n: usize) {
    println!("\n{} preview (first {} lines):", label, n);
    for (i, line) in lines.iter().take(n).enumerate() {
        println!("{}. {}", i + 1, line);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
