//! Operator CLI for the HAICOR reasoning backend.

use clap::{Args, Parser, Subcommand};
use haicor_client::{
    format_score, ClientConfig, GraphJob, Inference, JobKind, PathJob, ProgressUpdate,
    ReasonClient, StepJob, StoryCatalog, StoryDraft,
};
use haicor_types::{Aspect, GraphRequest, Order, PathHit, PathRequest, StepRequest, Usage};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "haicor", about = "Run narrative reasoning jobs against a HAICOR backend")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "HAICOR_API_URL", default_value = "http://localhost:3001")]
    api_url: String,

    /// Give up on a job after this many seconds.
    #[arg(long, env = "HAICOR_POLL_MAX_WAIT_SECS")]
    max_wait: Option<u64>,

    /// Give up on a job after this many status polls.
    #[arg(long, env = "HAICOR_POLL_MAX_POLLS")]
    max_polls: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List title ranges of the story catalog.
    Ranges,
    /// List the titles in one range.
    Titles { range: String },
    /// Print one story.
    Story { uuid: String },
    /// Single-step inference.
    Step {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(long)]
        question: String,
        #[arg(long, default_value = "general")]
        usage: Usage,
        #[arg(long, default_value = "forward")]
        order: Order,
        #[arg(long, default_value = "causal")]
        aspect: Aspect,
        #[arg(long, default_value_t = 3)]
        number: u32,
        /// Split results into subject / relation / object.
        #[arg(long)]
        structured: bool,
    },
    /// Path inference from a source to a target.
    Path {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Graph inference toward a target.
    Graph {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(long)]
        target: String,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Args)]
struct ContextArgs {
    /// Catalog story to use as context.
    #[arg(long)]
    story: Option<String>,
    /// Context line (repeatable); replaces the story lines when given.
    #[arg(long = "line")]
    lines: Vec<String>,
    /// Edit a story line, as LINE=TEXT with lines numbered from 1 (repeatable).
    #[arg(long = "edit", value_parser = parse_edit)]
    edits: Vec<(usize, String)>,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, default_value_t = 2)]
    length: u32,
    #[arg(long, default_value_t = 2)]
    branch: u32,
    #[arg(long, default_value_t = 3)]
    total: u32,
}

fn parse_edit(s: &str) -> Result<(usize, String), String> {
    let (index, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=TEXT, got {:?}", s))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid line index {:?}", index))?;
    if index == 0 {
        return Err("line numbers start at 1".to_string());
    }
    Ok((index - 1, text.to_string()))
}

async fn build_context(client: &ReasonClient, args: ContextArgs) -> Result<Vec<String>, BoxError> {
    let mut draft = match args.story {
        Some(uuid) => {
            let story = client.get_story(&uuid).await?;
            if !story.is_found() {
                return Err(format!("story {} not found", uuid).into());
            }
            StoryDraft::from_story(story)
        }
        None => StoryDraft::default(),
    };
    if !args.lines.is_empty() {
        draft.replace_lines(args.lines);
    }
    for (index, text) in args.edits {
        draft.set_line(index, text);
    }
    if draft.is_catalog_story() {
        tracing::info!(title = %draft.title, "using catalog story");
    } else {
        tracing::info!(title = %draft.title, "using edited context");
    }
    Ok(draft.context())
}

fn print_progress(update: &ProgressUpdate) {
    eprintln!(
        "[{:>7.3}%] {} ({})",
        update.fraction * 100.0,
        update.message,
        update.tag
    );
}

async fn run_job<K: JobKind>(
    client: &ReasonClient,
    request: &K::Request,
) -> Result<K::Output, BoxError> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    let policy = client.config().poll_policy::<K>();
    let out = client
        .track_with::<K, _>(request, &policy, &cancel, print_progress)
        .await?;
    Ok(out)
}

fn print_paths(hits: &[PathHit]) {
    for hit in hits {
        println!("Score: {}", format_score(hit.score));
        for (i, node) in hit.path.iter().enumerate() {
            println!("  {}. {}", i + 1, node);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    config.api_url = cli.api_url;
    config.max_wait = cli.max_wait.map(Duration::from_secs);
    config.max_polls = cli.max_polls;
    let client = ReasonClient::http(config);

    match cli.command {
        Command::Ranges => {
            let catalog = StoryCatalog::load(&client).await?;
            for range in catalog.ranges() {
                println!("{}\t{}", range.key, range.label);
            }
        }
        Command::Titles { range } => {
            let catalog = StoryCatalog::load(&client).await?;
            for t in catalog.titles(&range)? {
                println!("{}\t{}", t.uuid, t.title);
            }
        }
        Command::Story { uuid } => {
            let story = client.get_story(&uuid).await?;
            if !story.is_found() {
                return Err(format!("story {} not found", uuid).into());
            }
            let draft = StoryDraft::from_story(story);
            println!("{}", draft.title);
            for (i, line) in draft.lines.iter().enumerate() {
                println!("{}. {}", i + 1, line);
            }
        }
        Command::Step {
            context,
            question,
            usage,
            order,
            aspect,
            number,
            structured,
        } => {
            let request = StepRequest {
                usage,
                order,
                aspect,
                context: build_context(&client, context).await?,
                question,
                number,
            };
            let hits = run_job::<StepJob>(&client, &request).await?;
            for hit in hits {
                match Inference::parse(&hit.text).filter(|_| structured) {
                    Some(i) => {
                        println!("Score: {}", format_score(hit.score));
                        println!("  {}", i.subject.trim());
                        println!("  {}", i.relation.trim());
                        println!("  {}", i.object.trim());
                    }
                    None => println!("{:>8}  {}", format_score(hit.score), hit.text),
                }
            }
        }
        Command::Path {
            context,
            source,
            target,
            search,
        } => {
            let request = PathRequest {
                source,
                target,
                context: build_context(&client, context).await?,
                length: search.length,
                branch: search.branch,
                total: search.total,
            };
            print_paths(&run_job::<PathJob>(&client, &request).await?);
        }
        Command::Graph {
            context,
            target,
            search,
        } => {
            let request = GraphRequest {
                target,
                context: build_context(&client, context).await?,
                length: search.length,
                branch: search.branch,
                total: search.total,
            };
            print_paths(&run_job::<GraphJob>(&client, &request).await?);
        }
    }
    Ok(())
}
