use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tetl::{
    init_tracing_once, EnvToken, EtlError, EtlOptions, FirstOf, HttpTransport, Prompt, RateLimitPolicy,
    SearchQuery, SearchWindow, SecretsFile, Stop, TokenSource, TweetETL, WaitOut, DEFAULT_SAVE_LOCATION, DEFAULT_SECRETS_PATH,
};

#[derive(Parser)]
#[command(name = "tetl")]
#[command(about = "Collect, anonymise and reconcile posts from the search API", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML file holding BEARER_TOKEN (optionally under [twitter])
    #[arg(long, global = true, default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect recent posts, anonymise them, and append to the TSV file
    Collect {
        #[arg(long, default_value = DEFAULT_SAVE_LOCATION)]
        out: PathBuf,

        /// Number of posts to collect
        #[arg(long, default_value_t = 2000)]
        total: usize,

        /// What to do when the request ceiling is reached
        #[arg(long, value_enum, default_value_t = OnRateLimit::Prompt)]
        on_rate_limit: OnRateLimit,

        /// Only collect posts from the last N hours
        #[arg(long)]
        since_hours: Option<u32>,
    },

    /// Drop stored posts that no longer exist upstream
    Sync {
        #[arg(long, default_value = DEFAULT_SAVE_LOCATION)]
        stored: PathBuf,

        /// Write here instead of overwriting the stored file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pause between lookup batches
        #[arg(long, env = "TETL_BATCH_DELAY_MS", default_value_t = 1000)]
        batch_delay_ms: u64,

        /// Rewrite even if some stored rows cannot be parsed (they are dropped)
        #[arg(long)]
        allow_skipped_rows: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OnRateLimit {
    Prompt,
    Wait,
    Stop,
}

fn main() -> ExitCode {
    init_tracing_once();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(EtlError::Config(msg)) = e.downcast_ref::<EtlError>() {
                eprintln!("Error: {msg}");
                return ExitCode::from(2);
            }
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let tokens = FirstOf(vec![
        Box::new(EnvToken::default()) as Box<dyn TokenSource>,
        Box::new(SecretsFile::new(&cli.secrets)),
    ]);
    let base = EtlOptions::default().with_progress(!cli.no_progress).apply_env_overrides();
    let transport = HttpTransport::new(&tokens, &base.user_agent)?;

    match cli.command {
        Command::Collect { out, total, on_rate_limit, since_hours } => {
            let mut query = SearchQuery::default();
            if let Some(h) = since_hours {
                let now = time::OffsetDateTime::now_utc();
                query = query.with_window(SearchWindow::trailing(now, time::Duration::hours(h as i64)));
            }
            let etl = TweetETL::from_options(base).save_location(&out).total_to_collect(total).query(query);

            let mut policy: Box<dyn RateLimitPolicy> = match on_rate_limit {
                OnRateLimit::Prompt => Box::new(Prompt::stdin()),
                OnRateLimit::Wait => Box::new(WaitOut),
                OnRateLimit::Stop => Box::new(Stop),
            };
            let summary = etl.collect_and_anonymise(&transport, policy.as_mut())?;
            println!(
                "{} posts collected, {} written to {} ({} duplicates skipped).",
                summary.collected,
                summary.written,
                summary.path.display(),
                summary.skipped_duplicates
            );
        }
        Command::Sync { stored, out, batch_delay_ms, allow_skipped_rows } => {
            let lookup = base.lookup;
            let mut etl = TweetETL::from_options(base)
                .save_location(&stored)
                .allow_skipped_rows(allow_skipped_rows)
                .lookup(lookup.batch_size, Duration::from_millis(batch_delay_ms));
            if let Some(out) = out {
                etl = etl.sync_output(out);
            }
            let summary = etl.synchronise(&transport)?;
            println!(
                "{} posts searched for, {} removed, {} remain in {}.",
                summary.searched,
                summary.removed,
                summary.surviving,
                summary.output.display()
            );
            if summary.skipped_rows > 0 {
                println!("{} unparseable rows were dropped.", summary.skipped_rows);
            }
            if let Some(n) = summary.replenish {
                println!("Dataset is below its floor; run `tetl collect --total {n}` to replenish.");
            }
        }
    }
    Ok(())
}
