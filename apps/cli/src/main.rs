use std::{collections::HashMap, io::Write, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};

use konspekt_core::{
    ChatSession, ClientConfig, HttpApi, Poller, RegistryEvent, SubmissionController, SummarizerApi,
    TaskEntry, TaskHealth, TaskPhase, TaskRegistry, default_export_dir, export_summary,
};

use crate::render::{TaskView, print_chat_entry, print_mindmap, print_summary, status_badge};

mod render;

#[derive(Parser)]
#[command(name = "konspekt")]
#[command(
    about = "Submit video links or media files for summarization and follow the jobs to their results"
)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "KONSPEKT_API_URL")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit links and/or media files, then watch every job to completion
    Process(ProcessArgs),
    /// Fetch the current status of one task
    Status { task_id: String },
    /// Ask questions about a completed task
    Ask {
        task_id: String,
        /// One question; omit for an interactive session
        question: Option<String>,
    },
    /// Ask the backend to persist a completed result
    Save { task_id: String },
}

#[derive(Args)]
struct ProcessArgs {
    /// Video links (YouTube, Bilibili, ...)
    urls: Vec<String>,

    /// Local audio/video file to upload (repeatable)
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,

    /// Free-text style directive applied to every job in the batch
    #[arg(short, long, default_value = "")]
    style: String,

    /// Delay between status polls, in milliseconds
    #[arg(long, default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Directory for exported summary_<taskId>.txt files
    /// (defaults to the platform download dir)
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Skip the summary export files
    #[arg(long)]
    no_export: bool,

    /// Only list task badges; skip the expanded summary and mind-map views
    #[arg(long)]
    collapsed: bool,

    /// Ask the backend to persist every completed result
    #[arg(long)]
    save: bool,

    /// Open an interactive Q&A session once the jobs are finished
    #[arg(long)]
    chat: bool,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Process(args) => process(&cli.api_url, args).await,
        Command::Status { task_id } => status(&cli.api_url, &task_id).await,
        Command::Ask { task_id, question } => ask(&cli.api_url, &task_id, question).await,
        Command::Save { task_id } => save(&cli.api_url, &task_id).await,
    }
}

async fn process(api_url: &str, args: ProcessArgs) -> Result<()> {
    if args.urls.iter().all(|url| url.trim().is_empty()) && args.files.is_empty() {
        eprintln!(
            "{} nothing to submit: pass at least one link or --file",
            style("Error:").red().bold()
        );
        std::process::exit(1);
    }

    let config = ClientConfig::new(api_url)
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms));
    let api: Arc<dyn SummarizerApi> = Arc::new(HttpApi::new(&config)?);
    let registry = TaskRegistry::new();
    let poller = Poller::new(Arc::clone(&api), registry.clone(), &config);
    let controller = SubmissionController::new(Arc::clone(&api), registry.clone(), poller);

    println!(
        "\n{}  {}\n",
        style("konspekt").cyan().bold(),
        style("Video Summarizer").dim()
    );

    let mut updates = registry.subscribe();

    let spinner = create_spinner("Submitting jobs...");
    let outcome = controller
        .dispatch(&args.urls, &args.files, &args.style)
        .await?;
    spinner.finish_and_clear();

    // single error slot, last error wins
    if let Some(e) = outcome.last_error() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
    }
    if outcome.handles.is_empty() {
        std::process::exit(1);
    }

    println!(
        "{} Submitted {} job(s)",
        style("✓").green().bold(),
        outcome.handles.len()
    );
    println!("{}", style("─".repeat(60)).dim());

    watch(&registry, &mut updates).await;

    let mut view = TaskView::new();
    if !args.collapsed {
        for entry in registry.entries() {
            view.expand(&entry.task_id);
        }
    }

    for entry in registry.entries() {
        print_entry(&entry, &view, &args).await;
    }

    if args.save {
        save_completed(&registry, &api).await;
    }

    if args.chat {
        for entry in registry.entries() {
            if task_phase(&entry) == Some(TaskPhase::Done) {
                chat_loop(Arc::clone(&api), &entry.task_id, &entry.source).await?;
            }
        }
    }

    Ok(())
}

async fn watch(registry: &TaskRegistry, updates: &mut broadcast::Receiver<RegistryEvent>) {
    let progress = MultiProgress::new();
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();

    for entry in registry.entries() {
        let bar = bars
            .entry(entry.task_id.clone())
            .or_insert_with(|| task_bar(&progress));
        refresh_bar(bar, &entry);
    }

    while !registry.is_settled() {
        match updates.recv().await {
            Ok(event) => {
                let task_id = event.task_id().to_string();
                if let Some(entry) = registry.get(&task_id) {
                    let bar = bars.entry(task_id).or_insert_with(|| task_bar(&progress));
                    refresh_bar(bar, &entry);
                }
            }
            Err(RecvError::Lagged(_)) => {
                // missed some updates; repaint everything from the registry
                for entry in registry.entries() {
                    if let Some(bar) = bars.get(&entry.task_id) {
                        refresh_bar(bar, &entry);
                    }
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn task_bar(progress: &MultiProgress) -> ProgressBar {
    let bar = progress.add(ProgressBar::new_spinner());
    bar.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn refresh_bar(bar: &ProgressBar, entry: &TaskEntry) {
    let status = entry
        .snapshot
        .as_ref()
        .map(|s| s.status.clone())
        .unwrap_or_else(|| "submitted".to_string());

    match &entry.health {
        TaskHealth::Progressing => {
            bar.set_message(format!("{} {}", entry.source, status_badge(&status)));
        }
        TaskHealth::Terminal => {
            let mark = if task_phase(entry) == Some(TaskPhase::Done) {
                style("✓").green().bold()
            } else {
                style("✗").red().bold()
            };
            bar.finish_with_message(format!("{} {} {}", mark, entry.source, status_badge(&status)));
        }
        TaskHealth::Unreachable { reason } => {
            bar.finish_with_message(format!(
                "{} {} {}",
                style("!").yellow().bold(),
                entry.source,
                style(format!("unreachable: {reason}")).dim()
            ));
        }
    }
}

fn task_phase(entry: &TaskEntry) -> Option<TaskPhase> {
    entry.snapshot.as_ref().map(|s| s.phase())
}

async fn print_entry(entry: &TaskEntry, view: &TaskView, args: &ProcessArgs) {
    let status = entry
        .snapshot
        .as_ref()
        .map(|s| s.status.clone())
        .unwrap_or_else(|| "submitted".to_string());
    println!(
        "\n{} {}",
        style(&entry.source).bold(),
        status_badge(&status)
    );
    if let TaskHealth::Unreachable { reason } = &entry.health {
        println!("{}", style(format!("status stale: {reason}")).yellow());
    }

    if !view.is_expanded(&entry.task_id) {
        return;
    }
    let Some(snapshot) = &entry.snapshot else {
        return;
    };

    if let Some(result) = &snapshot.result {
        print_summary(result);
        if !args.no_export {
            let dir = args
                .export_dir
                .clone()
                .unwrap_or_else(default_export_dir);
            match export_summary(&dir, &entry.task_id, result).await {
                Ok(path) => println!(
                    "{} Exported: {}",
                    style("✓").green().bold(),
                    style(path.display()).cyan()
                ),
                Err(e) => eprintln!("{} export failed: {}", style("Error:").red().bold(), e),
            }
        }
    }

    if let Some(mindmap) = &snapshot.mindmap {
        print_mindmap(mindmap);
    }

    if let Some(error) = &snapshot.error {
        println!("{} {}", style("Error:").red().bold(), error);
    }
}

/// Fire-and-forget persistence for every completed task; outcomes are only
/// logged, never rendered.
async fn save_completed(registry: &TaskRegistry, api: &Arc<dyn SummarizerApi>) {
    let mut saves = Vec::new();
    for entry in registry.entries() {
        if task_phase(&entry) != Some(TaskPhase::Done) {
            continue;
        }
        let api = Arc::clone(api);
        let task_id = entry.task_id.clone();
        saves.push(tokio::spawn(async move {
            match api.save_result(&task_id).await {
                Ok(path) => tracing::info!(task_id = %task_id, path = %path, "result saved"),
                Err(e) => tracing::warn!(task_id = %task_id, error = %e, "save failed"),
            }
        }));
    }
    for save in saves {
        let _ = save.await;
    }
}

async fn chat_loop(api: Arc<dyn SummarizerApi>, task_id: &str, source: &str) -> Result<()> {
    println!(
        "\n{} {} {}",
        style("?").cyan().bold(),
        style("Ask about").bold(),
        source
    );
    println!("{}", style("empty line to move on").dim());

    let mut session = ChatSession::new(api, task_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }

        let spinner = create_spinner("Thinking...");
        let reply = session.ask(&line).await?;
        spinner.finish_and_clear();
        if let Some(entry) = reply {
            print_chat_entry(entry);
        }
    }
    Ok(())
}

async fn status(api_url: &str, task_id: &str) -> Result<()> {
    let config = ClientConfig::new(api_url);
    let api = HttpApi::new(&config)?;

    match api.task_status(task_id).await {
        Ok(snapshot) => {
            println!(
                "{} {}",
                style(&snapshot.url).bold(),
                status_badge(&snapshot.status)
            );
            if let Some(result) = &snapshot.result {
                print_summary(result);
            }
            if let Some(mindmap) = &snapshot.mindmap {
                print_mindmap(mindmap);
            }
            if let Some(error) = &snapshot.error {
                println!("{} {}", style("Error:").red().bold(), error);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn ask(api_url: &str, task_id: &str, question: Option<String>) -> Result<()> {
    let config = ClientConfig::new(api_url);
    let api: Arc<dyn SummarizerApi> = Arc::new(HttpApi::new(&config)?);

    // chat only opens for finished tasks
    let snapshot = match api.task_status(task_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    if snapshot.phase() != TaskPhase::Done {
        eprintln!(
            "{} task {} is not finished yet {}",
            style("Error:").red().bold(),
            task_id,
            status_badge(&snapshot.status)
        );
        std::process::exit(1);
    }

    match question {
        Some(question) => {
            let mut session = ChatSession::new(Arc::clone(&api), task_id);
            let spinner = create_spinner("Thinking...");
            let reply = session.ask(&question).await?;
            spinner.finish_and_clear();
            if let Some(entry) = reply {
                print_chat_entry(entry);
            }
            Ok(())
        }
        None => chat_loop(api, task_id, &snapshot.url).await,
    }
}

async fn save(api_url: &str, task_id: &str) -> Result<()> {
    let config = ClientConfig::new(api_url);
    let api = HttpApi::new(&config)?;

    match api.save_result(task_id).await {
        Ok(path) => {
            println!(
                "{} Saved: {}",
                style("✓").green().bold(),
                style(&path).cyan()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}
