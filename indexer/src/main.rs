use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use termdex::tokenizer::{scan_document, tokenize};
use termdex::{DocId, FrequencyPolicy, IndexConfig, InvertedIndex, SharedIndex};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Parser)]
#[command(name = "termdex-indexer")]
#[command(about = "Build and inspect a positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a text file or a directory of text files
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index file
        #[arg(long)]
        output: String,
        /// JSON file with an IndexConfig
        #[arg(long)]
        config: Option<String>,
        /// Seed each posting's frequency from the first occurrence's count hint
        #[arg(long, default_value_t = false)]
        seed_from_hint: bool,
        /// Number of tokenizer threads
        #[arg(long, default_value_t = 1)]
        jobs: usize,
    },
    /// Print the postings of one term
    Search {
        #[arg(long)]
        index: String,
        /// Raw word; normalized the same way documents are
        term: String,
    },
    /// Print the whole index
    Dump {
        #[arg(long)]
        index: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Written next to the index file after a build.
#[derive(Debug, Serialize, Deserialize)]
struct MetaFile {
    num_docs: usize,
    num_terms: usize,
    created_at: String,
    format_version: u32,
    config: IndexConfig,
}

#[derive(Serialize)]
struct DumpPosting<'a> {
    doc_id: DocId,
    path: Option<&'a str>,
    frequency: u32,
    positions: &'a [u32],
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, seed_from_hint, jobs } => {
            let mut cfg = match config {
                Some(path) => read_config(Path::new(&path))?,
                None => IndexConfig::default(),
            };
            if seed_from_hint {
                cfg.frequency_policy = FrequencyPolicy::SeedFromHint;
            }
            build_index(Path::new(&input), Path::new(&output), cfg, jobs.max(1))
        }
        Commands::Search { index, term } => search(Path::new(&index), &term),
        Commands::Dump { index, json } => dump(Path::new(&index), json),
    }
}

fn read_config(path: &Path) -> Result<IndexConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Files to index, sorted so docIds are stable across runs.
fn discover_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "txt" | "md") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    files.sort();
    Ok(files)
}

fn build_index(input: &Path, output: &Path, config: IndexConfig, jobs: usize) -> Result<()> {
    let files = discover_files(input)?;
    let shared = SharedIndex::new(InvertedIndex::with_config(config.clone()));

    let numbered: Vec<(DocId, &PathBuf)> = files.iter().enumerate().map(|(i, p)| (i as DocId, p)).collect();
    let chunk = numbered.len().div_ceil(jobs).max(1);
    thread::scope(|s| -> Result<()> {
        let workers: Vec<_> = numbered
            .chunks(chunk)
            .map(|part| {
                let shared = &shared;
                s.spawn(move || -> Result<()> {
                    for &(doc_id, path) in part {
                        ingest_file(shared, doc_id, path)?;
                    }
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker.join().map_err(|_| anyhow::anyhow!("indexing thread panicked"))??;
        }
        Ok(())
    })?;

    let mut index = shared.into_inner();
    index.optimize();
    tracing::info!(num_docs = index.num_docs(), num_terms = index.len(), "ingested documents");

    index.save(output).with_context(|| format!("saving index to {}", output.display()))?;
    let meta = MetaFile {
        num_docs: index.num_docs(),
        num_terms: index.len(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        format_version: termdex::persist::FORMAT_VERSION,
        config,
    };
    let meta_path = meta_path(output);
    fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)
        .with_context(|| format!("writing {}", meta_path.display()))?;

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

fn ingest_file(shared: &SharedIndex, doc_id: DocId, path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let doc_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let doc = scan_document(doc_id, doc_path.to_string_lossy(), &text);
    shared.add(&doc);
    Ok(())
}

fn meta_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn search(index_path: &Path, word: &str) -> Result<()> {
    let index = InvertedIndex::<String>::open(index_path)
        .with_context(|| format!("loading {}", index_path.display()))?;
    let Some((term, _)) = tokenize(word).into_iter().next() else {
        println!("'{word}' has no indexable term");
        return Ok(());
    };
    match index.search(&term) {
        Some(list) => {
            println!("{term}: {} document(s)", list.len());
            for p in list {
                let path = index.doc_path(p.doc_id).unwrap_or("?");
                println!("  {} {} freq={} positions={:?}", p.doc_id, path, p.frequency, p.positions);
            }
        }
        None => println!("{term}: not found"),
    }
    Ok(())
}

fn dump(index_path: &Path, json: bool) -> Result<()> {
    let index = InvertedIndex::<String>::open(index_path)
        .with_context(|| format!("loading {}", index_path.display()))?;
    if !json {
        print!("{index}");
        return Ok(());
    }
    let mut terms: Vec<&String> = index.dictionary().collect();
    terms.sort();
    let mut out = serde_json::Map::new();
    for term in terms {
        let postings: Vec<DumpPosting<'_>> = index
            .search(term)
            .into_iter()
            .flatten()
            .map(|p| DumpPosting {
                doc_id: p.doc_id,
                path: index.doc_path(p.doc_id),
                frequency: p.frequency,
                positions: &p.positions,
            })
            .collect();
        out.insert(term.clone(), serde_json::to_value(postings)?);
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
