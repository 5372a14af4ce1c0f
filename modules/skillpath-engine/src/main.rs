use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use skillpath_common::{Config, InteractionKind, Strategy, Tuning, VectorFilter};
use skillpath_engine::{BatchRequest, CancelFlag, RecommendRequest, SkillsService};

#[derive(Parser)]
#[command(name = "skillpath", about = "Learning content generation and recommendations")]
struct Cli {
    /// Tuning TOML file. Falls back to SKILLPATH_CONFIG, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply graph constraints and SQL migrations.
    Migrate,
    /// Generate, evaluate and store content for each topic.
    Generate {
        #[arg(required = true)]
        topics: Vec<String>,
        #[arg(long, default_value_t = 70.0)]
        quality_threshold: f64,
        #[arg(long, default_value_t = 2)]
        max_regenerations: u32,
        /// Print a readable evaluation report per topic instead of JSON.
        #[arg(long)]
        report: bool,
    },
    /// Ask the generator for new topics.
    Suggest {
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
    /// Recommendations for a user.
    Recommend {
        user_id: String,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "personalized")]
        strategy: String,
        #[arg(long)]
        no_diversity: bool,
        #[arg(long)]
        no_explanations: bool,
    },
    /// Record a read, rating or bookmark.
    Interact {
        user_id: String,
        content_id: Uuid,
        /// read, rate or bookmark
        kind: String,
        #[arg(long)]
        rating: Option<u8>,
    },
    /// A user's reading history, newest first.
    History {
        user_id: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Store and graph statistics.
    Stats,
    /// Show one content item.
    Get { id: Uuid },
    /// List stored content, optionally for one topic.
    List {
        #[arg(long)]
        topic: Option<String>,
    },
    /// Delete a content item from both stores.
    Delete { id: Uuid },
    /// Recompute similarity edges over the whole corpus.
    RebuildSimilarity,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("skillpath=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;
    let tuning = match &cli.config {
        Some(path) => Tuning::load(path)?,
        None => config.load_tuning()?,
    };

    let service = SkillsService::connect(&config, tuning)
        .await
        .context("Failed to initialize service")?;

    match cli.command {
        Command::Migrate => {
            service.migrate().await?;
            info!("Migrations complete");
        }
        Command::Generate {
            topics,
            quality_threshold,
            max_regenerations,
            report,
        } => {
            let request = BatchRequest::builder()
                .topics(topics)
                .quality_threshold(quality_threshold)
                .max_regenerations(max_regenerations)
                .build();
            let cancel = CancelFlag::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, stopping after the current topic");
                    on_signal.cancel();
                }
            });
            let batch = service.generate_batch(&request, &cancel).await?;
            if report {
                for outcome in &batch.outcomes {
                    println!("Topic: {}", outcome.topic);
                    match &outcome.evaluation {
                        Some(evaluation) => println!("{}", evaluation.render_report()),
                        None => println!("(not evaluated)\n"),
                    }
                }
            } else {
                print_json(&batch)?;
            }
        }
        Command::Suggest { count } => {
            print_json(&service.suggest_topics(count).await?)?;
        }
        Command::Recommend {
            user_id,
            limit,
            strategy,
            no_diversity,
            no_explanations,
        } => {
            let request = RecommendRequest::builder()
                .user_id(user_id)
                .limit(limit)
                .strategy(strategy.parse::<Strategy>()?)
                .apply_diversity(!no_diversity)
                .include_explanations(!no_explanations)
                .build();
            print_json(&service.recommend(&request).await?)?;
        }
        Command::Interact {
            user_id,
            content_id,
            kind,
            rating,
        } => {
            let kind: InteractionKind = kind.parse()?;
            service
                .record_interaction(&user_id, content_id, kind, rating)
                .await?;
        }
        Command::History { user_id, limit } => {
            print_json(&service.history(&user_id, limit).await?)?;
        }
        Command::Stats => {
            print_json(&service.stats().await?)?;
        }
        Command::Get { id } => {
            print_json(&service.get(id).await?)?;
        }
        Command::List { topic } => {
            let filter = VectorFilter {
                topic,
                ..Default::default()
            };
            print_json(&service.list(&filter).await?)?;
        }
        Command::Delete { id } => {
            service.delete(id).await?;
            info!(%id, "Deleted");
        }
        Command::RebuildSimilarity => {
            let edges = service.rebuild_similarity().await?;
            info!(edges, "Similarity graph rebuilt");
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
