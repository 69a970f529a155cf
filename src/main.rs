use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use creator_match::config::Config;
use creator_match::embedding::{LazyEmbedder, OnnxEmbedder, TextEmbedder};
use creator_match::output::{export, terminal};
use creator_match::scoring::ranking::MAX_TOP_COUNT;
use creator_match::scoring::MatchFilter;
use creator_match::session::MatchSession;

/// creator-match: find the creators whose bios best fit a campaign brief.
///
/// Upload a creator dataset (CSV or Excel with name, bio, niche, location and
/// audience_size columns), describe the campaign, and get creators ranked by
/// semantic similarity.
#[derive(Parser)]
#[command(name = "creator-match", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the ONNX sentence embedding model (~130 MB)
    DownloadModel,

    /// Score a dataset against a brief once and show the top matches
    Match {
        /// Creator dataset (.csv, .xls or .xlsx)
        file: PathBuf,

        /// Campaign brief, e.g. "eco-friendly fashion influencers in India"
        #[arg(long)]
        brief: String,

        /// Only keep creators in this niche ("All" for every niche)
        #[arg(long, default_value = "All")]
        niche: String,

        /// Only keep creators in this location ("All" for every location)
        #[arg(long, default_value = "All")]
        location: String,

        /// Number of top matches (default: CREATOR_MATCH_TOP_COUNT or 10)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_TOP_COUNT as i64))]
        top: Option<u32>,

        /// Write the ranked matches to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the ranked matches as JSON instead of cards
        #[arg(long)]
        json: bool,
    },

    /// Validate a dataset and list the niches and locations it contains
    Facets {
        /// Creator dataset (.csv, .xls or .xlsx)
        file: PathBuf,
    },

    /// Interactive session: enter briefs, adjust filters, export results
    Session {
        /// Creator dataset (.csv, .xls or .xlsx)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("creator_match=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DownloadModel => {
            let config = Config::load()?;

            println!("Downloading ONNX embedding model...");
            println!("  Destination: {}", config.model_dir.display());

            creator_match::embedding::download::download_model(&config.model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `creator-match match <FILE> --brief \"...\"`.");
        }

        Commands::Match {
            file,
            brief,
            niche,
            location,
            top,
            export: export_path,
            json,
        } => {
            let config = Config::load()?;
            config.require_model()?;

            let mut session = MatchSession::new(create_embedder(&config));
            upload_file(&mut session, &file)?;

            session.filter = MatchFilter {
                niche: MatchFilter::selection(&niche),
                location: MatchFilter::selection(&location),
                top: top.map(|n| n as usize).unwrap_or(config.top_count),
            };

            session.evaluate(&brief, false).await?;
            let (scored, ranked) = session
                .ranked()
                .context("No scored result available")?;

            if json {
                let value = export::to_json(scored.schema(), &ranked);
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                terminal::display_creator_cards(&ranked, &session.filter);
            }

            if let Some(path) = export_path {
                let csv = export::to_csv(scored.schema(), &ranked)?;
                write_export(&path, &csv)?;
            }
        }

        Commands::Facets { file } => {
            let bytes = read_upload(&file)?;
            let dataset = creator_match::dataset::load_dataset(&bytes, &display_name(&file))?;
            terminal::display_facets(dataset.len(), &dataset.niches(), &dataset.locations());
        }

        Commands::Session { file } => {
            let config = Config::load()?;
            config.require_model()?;

            let mut session = MatchSession::new(create_embedder(&config));
            session.filter.top = config.top_count;
            upload_file(&mut session, &file)?;

            run_session(&mut session, &config).await?;
        }
    }

    Ok(())
}

/// Build the shared embedder. The ONNX model is loaded on the first scoring
/// call and reused for the rest of the process.
fn create_embedder(config: &Config) -> Arc<dyn TextEmbedder> {
    let embed_dir = config.embedding_dir();
    Arc::new(LazyEmbedder::new(move || {
        info!("Loading embedding model from {}", embed_dir.display());
        Ok(Arc::new(OnnxEmbedder::load(&embed_dir)?) as Arc<dyn TextEmbedder>)
    }))
}

fn read_upload(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a dataset from disk into the session and print its facets.
fn upload_file(session: &mut MatchSession, path: &Path) -> Result<()> {
    let bytes = read_upload(path)?;
    let upload = session.upload(&bytes, &display_name(path))?;

    let dataset = &upload.dataset;
    terminal::display_facets(dataset.len(), &dataset.niches(), &dataset.locations());
    Ok(())
}

fn write_export(path: &Path, csv: &str) -> Result<()> {
    std::fs::write(path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Results exported to {}", "✓".green(), path.display());
    Ok(())
}

const SESSION_HELP: &str = "\
Enter a campaign brief to find matching creators. Commands:
  :recompute          score the last brief again, ignoring the cache
  :niche <value|All>  filter by niche
  :location <v|All>   filter by location
  :top <n>            number of top matches (1-50)
  :load <file>        upload a different dataset
  :export [path]      write the shown matches to CSV
  :facets             list niches and locations
  :help               show this help
  :quit               leave the session";

/// Interactive loop over stdin. Errors from a single action are reported and
/// the loop continues; only IO failures on stdin/stdout end the session.
async fn run_session(session: &mut MatchSession, config: &Config) -> Result<()> {
    println!("\n{}", SESSION_HELP.dimmed());

    let stdin = io::stdin();
    let mut last_brief: Option<String> = None;

    loop {
        print!("\n{} ", "brief>".cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            println!("Please enter a campaign brief to find matches.");
            continue;
        }

        let (command, arg) = match line.strip_prefix(':') {
            Some(rest) => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let command = parts.next().unwrap_or("");
                (Some(command), parts.next().unwrap_or("").trim())
            }
            None => (None, line),
        };

        let outcome = match command {
            None => {
                last_brief = Some(arg.to_string());
                evaluate_and_show(session, arg, false).await
            }
            Some("recompute") => match last_brief.clone() {
                Some(brief) => evaluate_and_show(session, &brief, true).await,
                None => {
                    println!("Enter a brief first.");
                    Ok(())
                }
            },
            Some("niche") => {
                session.filter.niche = MatchFilter::selection(arg);
                show_ranked(session);
                Ok(())
            }
            Some("location") => {
                session.filter.location = MatchFilter::selection(arg);
                show_ranked(session);
                Ok(())
            }
            Some("top") => match arg.parse::<usize>() {
                Ok(n) if (1..=MAX_TOP_COUNT).contains(&n) => {
                    session.filter.top = n;
                    show_ranked(session);
                    Ok(())
                }
                _ => {
                    println!("Top count must be a number between 1 and {MAX_TOP_COUNT}.");
                    Ok(())
                }
            },
            Some("load") => {
                if arg.is_empty() {
                    println!("Usage: :load <file>");
                    Ok(())
                } else {
                    upload_file(session, Path::new(arg))
                }
            }
            Some("export") => {
                let path = if arg.is_empty() {
                    config.export_path.clone()
                } else {
                    PathBuf::from(arg)
                };
                match session.ranked() {
                    Some((scored, ranked)) => export::to_csv(scored.schema(), &ranked)
                        .map_err(anyhow::Error::from)
                        .and_then(|csv| write_export(&path, &csv)),
                    None => {
                        println!("Nothing to export yet. Enter a brief first.");
                        Ok(())
                    }
                }
            }
            Some("facets") => {
                match session.current_upload() {
                    Some(upload) => {
                        let dataset = &upload.dataset;
                        terminal::display_facets(
                            dataset.len(),
                            &dataset.niches(),
                            &dataset.locations(),
                        )
                    }
                    None => println!("No dataset loaded."),
                }
                Ok(())
            }
            Some("help") => {
                println!("{SESSION_HELP}");
                Ok(())
            }
            Some("quit") | Some("exit") | Some("q") => break,
            Some(other) => {
                println!("Unknown command :{other}. Type :help for commands.");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("{} {:#}", "Error:".red().bold(), e);
        }
    }

    Ok(())
}

async fn evaluate_and_show(session: &mut MatchSession, brief: &str, recompute: bool) -> Result<()> {
    let evaluation = session.evaluate(brief, recompute).await?;
    if evaluation.cached {
        println!(
            "{}",
            "Using cached embedding results. Type :recompute to refresh.".dimmed()
        );
    } else {
        println!(
            "{} Scored {} creators.",
            "✓".green(),
            evaluation.scored.len()
        );
    }
    show_ranked(session);
    Ok(())
}

fn show_ranked(session: &MatchSession) {
    match session.ranked() {
        Some((_, ranked)) => terminal::display_creator_cards(&ranked, &session.filter),
        None => println!("Enter a brief to see matches."),
    }
}
