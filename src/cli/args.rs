use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Offline request layer for the pantry shopping-list API")]
#[command(long_about = "pantry - offline request layer

Sends requests to the shopping-list backend the way the app does when it is
offline-capable: static assets come from cache, API reads fall back to the
last good response, and API writes that cannot reach the server are queued
and replayed in order once the network is back.

QUICK START:
  pantry fetch http://localhost:54321/rest/v1/items
  pantry fetch -X POST -d '{\"name\":\"milk\"}' http://localhost:54321/rest/v1/items
  pantry sync status        How many writes are waiting
  pantry sync run           Replay them now
  pantry watch              Replay in the background and report each pass

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  pantry <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output, or 'json' for
    /// machine-readable output suitable for scripting. Defaults to
    /// `general.default_output` from the config file.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug)
    ///
    /// Logs go to stderr. `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a request through the offline layer
    ///
    /// The request is classified and handled the same way the app's own
    /// requests are:
    ///
    ///   Static asset GET    served from cache, fetched and cached on a miss
    ///   API GET             fetched, falling back to the cached copy offline
    ///   API POST/PATCH/DELETE  sent, or queued when the network is down
    ///
    /// A queued write answers 202 with {"offline":true,"queued":true,"id":N}.
    ///
    /// # Examples
    ///
    ///   pantry fetch http://localhost:54321/rest/v1/items
    ///   pantry fetch -X PATCH -H 'Content-Type: application/json' \
    ///       -d '{"done":true}' http://localhost:54321/rest/v1/items?id=eq.4
    #[command(alias = "f")]
    Fetch(FetchArgs),

    /// Manage the queue of offline writes
    ///
    /// # Subcommands
    ///
    ///   status     Show pending and discarded counts
    ///   run        Replay queued writes now
    ///   list       List queued writes in replay order
    ///   discarded  List writes the server rejected
    ///   dismiss    Empty the discarded list
    ///   clear      Drop every queued write
    ///
    /// # Examples
    ///
    ///   pantry sync status
    ///   pantry sync run -o json
    Sync(SyncArgs),

    /// Manage the response caches
    ///
    /// # Subcommands
    ///
    ///   list       Show every cache with its size
    ///   install    Precache the configured static assets
    ///   activate   Delete caches from older generations
    ///   clear      Delete one cache, or all of them
    Cache(CacheArgs),

    /// Replay queued writes in the background and report each pass
    ///
    /// Runs a pass immediately, then again every `sync.poll_interval_secs`
    /// while the queue holds anything. Each completed pass is printed as
    /// one line (one JSON object per line with -o json).
    Watch(WatchArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for `fetch`.
#[derive(Args)]
pub struct FetchArgs {
    /// Absolute URL to request
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request header as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long = "data")]
    pub body: Option<String>,
}

/// Arguments for `sync`.
#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommands,
}

/// Offline queue subcommands.
#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show offline queue status
    ///
    /// Displays how many writes are waiting and how many were rejected.
    Status,

    /// Replay queued writes now
    ///
    /// Sends each write oldest first. Delivered writes leave the queue,
    /// writes the server rejects with a 4xx move to the discarded list,
    /// and the pass stops at the first write that gets no answer or a
    /// server error.
    Run,

    /// List queued writes
    ///
    /// Shows the queue in replay order.
    List {
        /// Maximum writes to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// List writes the server rejected during replay
    Discarded,

    /// Empty the discarded list
    Dismiss,

    /// Drop every queued write without sending it
    Clear {
        /// Confirm dropping unsent writes
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for `cache`.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

/// Response cache subcommands.
#[derive(Subcommand)]
pub enum CacheCommands {
    /// List caches with entry counts and sizes
    List,

    /// Fetch and store every URL in `cache.precache`
    ///
    /// Nothing is stored unless every URL succeeds.
    Install,

    /// Delete caches that do not belong to the current `cache.version`
    Activate,

    /// Delete cached responses
    Clear {
        /// Only delete the cache with this name
        #[arg(long)]
        name: Option<String>,
    },
}

/// Arguments for `watch`.
#[derive(Args)]
pub struct WatchArgs {
    /// Exit after this many passes have been reported
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

/// Arguments for `config`.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
