pub mod init;
pub mod load;
pub mod migrate;
pub mod serve;

use crate::services::ranking::PostRanking;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blog")]
#[command(version)]
#[command(about = "Read-only views of a small blog", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "blog.toml", env = "BLOG_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a site directory with a default config
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Apply database migrations
    Migrate,
    /// Load users, tags, posts and comments from a JSON fixture
    Load { fixture: PathBuf },
    /// Serve the site; host and port default to the [server] config section
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Post popularity metric (likes or comments); overrides [ranking] posts
        #[arg(long)]
        ranking: Option<PostRanking>,
    },
}
