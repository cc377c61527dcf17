use std::path::PathBuf;

use clap::{Parser, Subcommand};
use framefeed::app::discover::{LiveUpdate, RecentActivityOptions};
use framefeed::app::{App, Command};
use framefeed::{ArcPath, ArcStr};

#[derive(Parser)]
#[command(name = "framefeed")]
#[command(about = "Aggregates image stories from the accounts you follow")]
struct Cli {
    /// Config file to use instead of the per-user default
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the feed of a viewer, most recently active authors first
    Feed {
        /// Handle or account id; defaults to $FRAMEFEED_VIEWER
        viewer: Option<String>,
    },
    /// Load older posts of one author
    More {
        /// Handle or account id
        account: String,
        /// Cursor printed by a previous page
        #[arg(long)]
        cursor: Option<String>,
    },
    /// List the accounts that publish to a category
    Accounts {
        #[arg(long)]
        category: Option<String>,
    },
    /// Show the newest activity across a category
    Recent {
        #[arg(long)]
        category: Option<String>,
        /// Most entries shown
        #[arg(long)]
        limit: Option<usize>,
        /// Accounts checked concurrently
        #[arg(long)]
        batch_size: Option<usize>,
        /// Check again accounts that had nothing to show
        #[arg(long)]
        recheck_empty: bool,
    },
    /// Record a post pushed by a live subscription
    Live {
        /// Handle or account id
        account: String,
        /// Attachment reference of the post
        content_id: String,
        /// Creation time, ISO-8601
        created_at: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        alt: Option<String>,
    },
    /// Mark an author as seen by a viewer up to a creation time
    Seen {
        /// Handle or account id of the author
        author: String,
        /// Creation time, ISO-8601
        created_at: String,
        /// Handle or account id; defaults to $FRAMEFEED_VIEWER
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Delete expired cache entries and old logs
    Clean,
}

fn arc(value: String) -> ArcStr {
    ArcStr::from(value)
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Feed { viewer } => Command::Feed {
                viewer: viewer.map(arc),
            },
            Commands::More { account, cursor } => Command::More {
                account: arc(account),
                cursor: cursor.map(arc),
            },
            Commands::Accounts { category } => Command::Accounts {
                category: category.map(arc),
            },
            Commands::Recent {
                category,
                limit,
                batch_size,
                recheck_empty,
            } => Command::Recent(RecentActivityOptions {
                category: category.map(arc),
                limit,
                batch_size,
                recheck_empty,
            }),
            Commands::Live {
                account,
                content_id,
                created_at,
                category,
                caption,
                alt,
            } => Command::Live(LiveUpdate {
                account: arc(account),
                content_id: arc(content_id),
                created_at: arc(created_at),
                category: category.map(arc),
                caption: caption.map(arc),
                alt_text: alt.map(arc),
            }),
            Commands::Seen {
                author,
                created_at,
                viewer,
            } => Command::Seen {
                viewer: viewer.map(arc),
                author: arc(author),
                created_at: arc(created_at),
            },
            Commands::Clean => Command::Clean,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app = App::build(cli.config.as_deref().map(ArcPath::from)).await?;
    let result = app.resolve(cli.command.into()).await;
    app.shutdown().await;

    print!("{}", result?);
    Ok(())
}
