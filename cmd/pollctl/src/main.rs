//! # pollctl
//!
//! Terminal client for a PollStream store. Keeps a Local Mirror in the
//! configured cache directory, so votes are applied optimistically and
//! polls stay readable while the store is down.

mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use api_adapters::HttpPollClient;
use clap::{Parser, Subcommand};
use configs::ClientSettings;
use domains::OptionId;
use services::mirror::{EnvironmentProfile, LocalMirror, MirrorError, Reconciler, ViewState};
use storage_adapters::FileCache;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pollctl", version, about = "Create, share and vote on polls")]
struct Cli {
    /// Store URL including the API base path
    #[arg(long, env = "POLLCTL_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a poll and print its share link
    Create {
        question: String,
        /// Between 2 and 8 choices
        #[arg(required = true, num_args = 1..)]
        choices: Vec<String>,
    },
    /// Show a poll's results
    Show { poll_id: String },
    /// Vote for an option, by its number as shown by `show`
    Vote { poll_id: String, option: OptionId },
    /// List every poll on the store
    List,
    /// Follow a poll's results until interrupted
    Watch { poll_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut settings = configs::load().context("loading settings")?.client;
    if let Some(url) = cli.url {
        settings.base_url = url;
    }

    let remote = Arc::new(HttpPollClient::new(settings.base_url.clone()));
    let mirror = Arc::new(LocalMirror::new(
        Arc::new(FileCache::new(settings.cache_dir.clone())),
        remote.clone(),
        &EnvironmentProfile::detect(),
    ));

    match cli.command {
        Command::Create { question, choices } => create(&mirror, &settings, &question, &choices).await,
        Command::Show { poll_id } => show(&mirror, &poll_id).await,
        Command::Vote { poll_id, option } => vote(&mirror, &poll_id, option).await,
        Command::List => list(&remote).await,
        Command::Watch { poll_id } => watch(mirror, &settings, poll_id).await,
    }
}

async fn create(
    mirror: &LocalMirror,
    settings: &ClientSettings,
    question: &str,
    choices: &[String],
) -> Result<()> {
    let id = mirror.create_poll(question, choices).await?;
    println!("{id}");
    println!("{}", render::share_link(&settings.share_origin, &id));
    Ok(())
}

async fn show(mirror: &LocalMirror, poll_id: &str) -> Result<()> {
    let Some(found) = mirror.reconcile(poll_id).await else {
        bail!("poll {poll_id} not found");
    };
    print!("{}", render::results(&found.poll, found.choice));
    Ok(())
}

async fn vote(mirror: &LocalMirror, poll_id: &str, option: OptionId) -> Result<()> {
    if mirror.open_poll(poll_id).await.is_none() {
        bail!("poll {poll_id} not found");
    }

    let pending = match mirror.cast_vote(poll_id, option).await {
        Ok(pending) => pending,
        Err(MirrorError::Ineligible(reason)) => bail!("{reason}"),
        Err(err) => return Err(err.into()),
    };

    println!("{}", pending.message());
    if !pending.is_confirmed() {
        bail!("vote was not recorded");
    }
    if let Some(poll) = mirror.retrieve_poll(poll_id).await {
        print!("{}", render::results(&poll, Some(option)));
    }
    Ok(())
}

async fn list(remote: &HttpPollClient) -> Result<()> {
    let polls = remote.list_polls().await?;
    if polls.is_empty() {
        println!("no polls");
    }
    for poll in polls.values() {
        println!("{}", render::summary_line(poll));
    }
    Ok(())
}

async fn watch(mirror: Arc<LocalMirror>, settings: &ClientSettings, poll_id: String) -> Result<()> {
    let handle = Reconciler::new(mirror, poll_id.clone())
        .with_interval(Some(Duration::from_millis(settings.refresh_interval_ms)))
        .spawn();
    let mut view = handle.view();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                match current.state() {
                    ViewState::Loading => continue,
                    ViewState::NotFound => bail!("poll {poll_id} not found"),
                    ViewState::Voting => {
                        if let Some(poll) = current.poll() {
                            print!("{}", render::results(poll, None));
                        }
                    }
                    ViewState::Viewing { choice } => {
                        if let Some(poll) = current.poll() {
                            print!("{}", render::results(poll, *choice));
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    Ok(())
}
