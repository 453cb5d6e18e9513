use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use leksika_core::model::{Direction, RetryPolicy, SessionPolicy, SessionPolicyDraft, Termination};
use leksika_services::{AppServices, Clock};
use leksika_storage::repository::Storage;
use tracing::debug;

mod quiz;

const DEFAULT_DB_URL: &str = "sqlite://leksika.sqlite3";

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Parser)]
#[command(name = "leksika", version, about = "Vocabulary import and multiple-choice quizzes")]
struct Cli {
    /// SQLite database URL or file path
    #[arg(long = "db", env = "LEKSIKA_DB_URL", default_value = DEFAULT_DB_URL, global = true)]
    db_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a word list, report rejected lines and optionally store it
    Import {
        /// Word list file
        file: PathBuf,

        /// Store the parsed words
        #[arg(long)]
        commit: bool,

        /// Store even when some lines were rejected
        #[arg(long, requires = "commit")]
        force: bool,

        /// Print the parse outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored words
    Words {
        #[arg(long)]
        json: bool,
    },

    /// List stored units and categories with word counts
    Scopes {
        #[arg(long)]
        json: bool,
    },

    /// Run an interactive quiz on stdin/stdout
    Quiz(QuizArgs),

    /// Show finished quizzes, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    /// Show the source term, pick the target
    Forward,
    /// Show the target term, pick the source
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RetryArg {
    End,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TerminationArg {
    FinishAll,
    TimeLimit,
    CountLimit,
}

#[derive(Debug, Args)]
struct QuizArgs {
    /// Unit to include; repeat for several, omit for all
    #[arg(long = "unit")]
    units: Vec<String>,

    /// Category to include, omit for all
    #[arg(long)]
    category: Option<String>,

    #[arg(long, value_enum, default_value_t = DirectionArg::Forward)]
    direction: DirectionArg,

    /// Seconds per question, or for the whole quiz with --termination time-limit
    #[arg(long, default_value_t = 0)]
    timer: u32,

    /// Answer options per question
    #[arg(long, default_value_t = 4)]
    options: u32,

    #[arg(long, value_enum, default_value_t = RetryArg::End)]
    retry: RetryArg,

    #[arg(long, value_enum, default_value_t = TerminationArg::FinishAll)]
    termination: TerminationArg,

    /// Number of words for --termination count-limit
    #[arg(long)]
    limit: Option<u32>,

    /// Percentage of matching words to ask
    #[arg(long, default_value_t = 100)]
    coverage: u32,

    /// Fix the question order for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

impl QuizArgs {
    fn to_draft(&self) -> SessionPolicyDraft {
        SessionPolicyDraft {
            units: self.units.iter().cloned().collect(),
            category: self.category.clone().unwrap_or_default(),
            direction: match self.direction {
                DirectionArg::Forward => Direction::SourceToTarget,
                DirectionArg::Reverse => Direction::TargetToSource,
            },
            timer_seconds: self.timer,
            option_count: self.options,
            retry_policy: match self.retry {
                RetryArg::End => RetryPolicy::RequeueAtEnd,
                RetryArg::Random => RetryPolicy::RequeueRandom,
            },
            termination: match self.termination {
                TerminationArg::FinishAll => Termination::FinishAll,
                TerminationArg::TimeLimit => Termination::TimeLimit,
                TerminationArg::CountLimit => Termination::CountLimit,
            },
            limit_value: self.limit,
            coverage_percent: self.coverage,
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.db_url.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: cli.db_url }.into());
    }
    let db_url = normalize_sqlite_url(cli.db_url);

    // Policy flags are checked before any file is touched.
    let policy: Option<SessionPolicy> = match &cli.command {
        Command::Quiz(args) => Some(args.to_draft().validate()?),
        _ => None,
    };

    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    debug!(%db_url, "storage ready");
    let services = AppServices::from_storage(&storage, Clock::default_clock());

    match cli.command {
        Command::Import {
            file,
            commit,
            force,
            json,
        } => {
            let text = std::fs::read_to_string(&file)?;
            let import = services.import();
            let outcome = import.preview(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "{} word(s), {} rejected line(s), units: {}, categories: {}",
                    outcome.records.len(),
                    outcome.errors.len(),
                    join(outcome.units.iter()),
                    join(outcome.categories.iter()),
                );
                for err in &outcome.errors {
                    println!("  {} [{}] {}", err, err.reason.code(), err.content.trim());
                }
            }

            if commit {
                let report = import.commit_reviewed(&outcome, force).await?;
                println!("stored {} word(s)", report.inserted.len());
            }
            Ok(())
        }
        Command::Words { json } => {
            let words = services.library().list_words().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&words)?);
            } else {
                for word in &words {
                    let id = word.id().map(|id| id.to_string()).unwrap_or_default();
                    println!(
                        "{id}\t{}\t{}\t{} - {}\t{}",
                        word.unit(),
                        word.category(),
                        word.source_term(),
                        word.target_term(),
                        word.mistake_count(),
                    );
                }
            }
            Ok(())
        }
        Command::Scopes { json } => {
            let overview = services.library().overview().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                println!("{} word(s)", overview.total_words);
                println!("units:");
                for unit in &overview.units {
                    println!("  {} ({})", unit.name, unit.words);
                }
                println!("categories:");
                for category in &overview.categories {
                    println!("  {} ({})", category.name, category.words);
                }
            }
            Ok(())
        }
        Command::Quiz(args) => {
            let policy = policy.ok_or("quiz policy missing")?;
            quiz::run_quiz(&services, policy, args.seed).await
        }
        Command::History { limit, json } => {
            let items = services.history().list_recent(limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in &items {
                    let accuracy = item
                        .accuracy_percent()
                        .map_or_else(|| String::from("-"), |p| format!("{p:.0}%"));
                    println!(
                        "{}\t{}\t{}/{}\t{}\t{:.1}s total\t{:.1}s avg",
                        item.completed_at.format("%Y-%m-%d %H:%M"),
                        item.unit_names,
                        item.correct,
                        item.total,
                        accuracy,
                        item.total_time_secs,
                        item.avg_time_secs,
                    );
                }
            }
            Ok(())
        }
    }
}

fn join<'a>(labels: impl Iterator<Item = &'a String>) -> String {
    let labels: Vec<&str> = labels.map(String::as_str).collect();
    if labels.is_empty() {
        String::from("-")
    } else {
        labels.join(", ")
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
