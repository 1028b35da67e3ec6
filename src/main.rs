//! wikidom - page bundle conversion and selective-update classification

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{debug, info};

use wikidom::{
    Document, DomPageBundle, LoadOptions, PageBundle, StaticPageConfig, StoreOptions,
    classify, visit_and_load_data_attribs,
};

#[derive(Parser)]
#[command(name = "wikidom")]
#[command(version, about = "Annotated wiki HTML tools", long_about = None)]
#[command(after_help = "EXAMPLES:
    wikidom classify old.json new.json      Classify an edit for selective update
    wikidom store page.html -o page.json    Split inline data attributes into a page bundle
    wikidom load page.json -o page.html     Merge a page bundle back into inline attributes")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write output here instead of stdout
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two renders of a page and print selective-update labels
    Classify {
        /// Previous render: {"page": ..., "pageBundle": ...}
        #[arg(value_name = "OLD")]
        old: PathBuf,

        /// Current render, in the same shape
        #[arg(value_name = "NEW")]
        new: PathBuf,
    },

    /// Move inline data-parsoid/data-mw out of an HTML document
    Store {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Embed the bundle in the document instead of printing JSON
        #[arg(long)]
        single_document: bool,

        /// Drop data-parsoid entirely
        #[arg(long)]
        discard_data_parsoid: bool,
    },

    /// Merge a page bundle (JSON, or HTML with an embedded bundle) back into
    /// inline attributes
    Load {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print only the contents of <body>
        #[arg(long)]
        body_only: bool,
    },
}

/// One render of a page, as read by `classify`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Render {
    #[serde(default)]
    page: StaticPageConfig,
    page_bundle: PageBundle,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Classify { old, new } => run_classify(&old, &new),
        Command::Store {
            input,
            single_document,
            discard_data_parsoid,
        } => run_store(&input, single_document, discard_data_parsoid),
        Command::Load { input, body_only } => run_load(&input, body_only),
    };

    match result.and_then(|out| write_output(cli.output.as_deref(), &out)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_classify(old: &Path, new: &Path) -> wikidom::Result<String> {
    let old: Render = serde_json::from_slice(&fs::read(old)?)?;
    let new: Render = serde_json::from_slice(&fs::read(new)?)?;

    let labels = classify(Some((&old.page, &old.page_bundle)), &new.page, &new.page_bundle)?;
    info!(kind = %labels.kind, "classified");
    Ok(serde_json::to_string_pretty(&labels)?)
}

fn run_store(input: &Path, single_document: bool, discard_data_parsoid: bool) -> wikidom::Result<String> {
    let mut doc = Document::parse_bytes(&fs::read(input)?);
    let body = doc.body().ok_or(wikidom::Error::MissingElement("body"))?;
    visit_and_load_data_attribs(&mut doc, body, LoadOptions::default())?;

    let options = StoreOptions {
        discard_data_parsoid,
        ..Default::default()
    };
    let dpb = DomPageBundle::from_loaded_document(doc, options)?;
    if let Some(parsoid) = &dpb.parsoid {
        debug!(entries = parsoid.ids.len(), "stored data-parsoid");
    }

    if single_document {
        dpb.to_single_document_html()
    } else {
        let pb = PageBundle::from_dom_page_bundle(dpb);
        Ok(serde_json::to_string_pretty(&pb)?)
    }
}

fn run_load(input: &Path, body_only: bool) -> wikidom::Result<String> {
    let bytes = fs::read(input)?;
    let dpb = match serde_json::from_slice::<PageBundle>(&bytes) {
        Ok(pb) => DomPageBundle::from_page_bundle(pb)?,
        Err(e) => {
            debug!(error = %e, "not a JSON page bundle, reading as HTML");
            DomPageBundle::from_single_document(Document::parse_bytes(&bytes))?
        }
    };
    dpb.to_inline_attribute_html(body_only)
}

fn write_output(path: Option<&Path>, out: &str) -> wikidom::Result<()> {
    match path {
        Some(path) => fs::write(path, out)?,
        None => println!("{out}"),
    }
    Ok(())
}
