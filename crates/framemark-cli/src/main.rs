//! framemark: command-line front end for the annotation workflow.
//!
//! Drives one step of the workflow per invocation against the configured
//! session directory and ledger, and exposes the highlighter on its own.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use framemark_annotate::{render_view, AnnotationWorkflow, FormState, View};
use framemark_core::{defaults, EvidencePhrase, TaskConfig};
use framemark_highlight::{split_evidence, Highlighter, KeywordHighlighter, MatchOptions, Palette};
use framemark_store::{sync_sessions, CsvDatasets, CsvLedger, FileSessionStore};
use tracing::info;

type Workflow = AnnotationWorkflow<CsvDatasets, FileSessionStore, CsvLedger>;

#[derive(Parser)]
#[command(name = "framemark")]
#[command(author, version, about = "Frame annotation of news articles with evidence highlighting")]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: $FRAMEMARK_CONFIG, then ./framemark.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the user's current article (or the completion page)
    Show {
        #[arg(short, long)]
        user: String,

        /// Print the view model as JSON instead of HTML
        #[arg(long)]
        json: bool,
    },

    /// Save labels for the current article and move to the next one
    Submit {
        #[arg(short, long)]
        user: String,

        /// Primary classification (default from config)
        #[arg(short, long)]
        primary: Option<String>,

        /// Frame label marked present (repeatable)
        #[arg(short, long = "frame")]
        frames: Vec<String>,

        #[arg(short, long, default_value = "")]
        notes: String,

        /// Flag the article for review
        #[arg(long)]
        flag: bool,
    },

    /// Go back one article
    Prev {
        #[arg(short, long)]
        user: String,
    },

    /// Go to an article by zero-based index
    Jump {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        index: usize,
    },

    /// Return from the completion page to the last article
    Back {
        #[arg(short, long)]
        user: String,
    },

    /// Print the user's progress as JSON
    Status {
        #[arg(short, long)]
        user: String,
    },

    /// Highlight evidence phrases in arbitrary text
    Highlight {
        #[arg(short, long)]
        text: String,

        /// Semicolon-separated phrases
        #[arg(short, long)]
        evidence: String,

        /// Tag the phrases are attributed to
        #[arg(long, default_value = defaults::LLM_EVIDENCE_TAG)]
        tag: String,

        /// Allow approximate matches
        #[arg(long)]
        fuzzy: bool,

        /// Also highlight the configured key terms
        #[arg(long)]
        keywords: bool,
    },

    /// Copy sessions and the ledger to the configured sync directory
    Sync,
}

fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TaskConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Show { user, json } => {
            let view = workflow(&config).view(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", render_view(&view));
            }
        }
        Commands::Submit {
            user,
            primary,
            frames,
            notes,
            flag,
        } => {
            let mut form = FormState::defaults(&config).with_present_frames(&frames);
            if let Some(primary) = primary {
                form.primary_label = primary;
            }
            form.notes = notes;
            if flag {
                form.flagged = true;
            }
            print_summary(&workflow(&config).submit(&user, form)?)?;
        }
        Commands::Prev { user } => {
            print_summary(&workflow(&config).previous(&user)?)?;
        }
        Commands::Jump { user, index } => {
            print_summary(&workflow(&config).jump(&user, index)?)?;
        }
        Commands::Back { user } => {
            print_summary(&workflow(&config).back_from_completion(&user)?)?;
        }
        Commands::Status { user } => {
            let status = workflow(&config).status(&user)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Highlight {
            text,
            evidence,
            tag,
            fuzzy,
            keywords,
        } => {
            cmd_highlight(&config, &text, &evidence, &tag, fuzzy, keywords);
        }
        Commands::Sync => {
            cmd_sync(&config)?;
        }
    }

    Ok(())
}

fn workflow(config: &TaskConfig) -> Workflow {
    AnnotationWorkflow::new(
        config.clone(),
        CsvDatasets::from_config(config),
        FileSessionStore::from_config(&config),
        CsvLedger::from_config(config),
    )
}

fn print_summary(view: &View) -> anyhow::Result<()> {
    let output = match view {
        View::Article(v) => serde_json::json!({
            "user_id": v.user_id,
            "state": "article",
            "index": v.index,
            "position": v.position_text(),
            "uri": v.article.uri,
        }),
        View::Completed(v) => serde_json::json!({
            "user_id": v.user_id,
            "state": "completed",
            "total": v.total,
            "annotated": v.annotated,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_highlight(
    config: &TaskConfig,
    text: &str,
    evidence: &str,
    tag: &str,
    fuzzy: bool,
    keywords: bool,
) {
    let options = if fuzzy {
        MatchOptions {
            fuzzy: true,
            ..MatchOptions::from(&config.fuzzy)
        }
    } else {
        MatchOptions::exact()
    };
    let terms: &[String] = if keywords { &config.key_terms } else { &[] };
    let highlighter = Highlighter::new(
        options,
        Palette::from_config(config),
        KeywordHighlighter::new(terms, config.keyword_color.clone()),
    );

    let phrases: Vec<EvidencePhrase> = split_evidence(evidence)
        .into_iter()
        .map(|p| EvidencePhrase::new(tag, p))
        .collect();
    let out = highlighter.highlight_text(text, &phrases);

    info!(phrase_count = phrases.len(), span_count = out.span_count, "Highlighted text");
    println!("{}{}", out.html, out.legend_html());
}

fn cmd_sync(config: &TaskConfig) -> anyhow::Result<()> {
    let Some(target) = config.sync_dir.as_deref() else {
        bail!("no sync_dir configured (set sync_dir or FRAMEMARK_SYNC_DIR)");
    };
    let report = sync_sessions(&config.session_dir, &config.ledger_path, target)
        .with_context(|| format!("syncing to {}", target.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failed() > 0 {
        bail!("{} of {} files failed to sync", report.failed(), report.entries.len());
    }
    Ok(())
}
