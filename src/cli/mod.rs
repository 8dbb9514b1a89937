pub mod onboard;

use crate::heatmap::intensity::Theme;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "folio",
    version,
    about = "Personal portfolio server with markdown posts and a contribution heatmap"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server (and the daily GitHub sync when enabled).
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Print the contribution heatmap in the terminal.
    Heatmap {
        #[arg(long)]
        months: Option<u32>,
        /// Draw days in palette colours instead of plain glyphs.
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        #[arg(long)]
        owner: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum PostCommands {
    /// Create a post from a local markdown file.
    Import {
        file: PathBuf,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ActivityCommands {
    Add {
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        count: u32,
        #[arg(long)]
        owner: Option<i64>,
    },
    /// Replace recent activity with the GitHub contribution calendar.
    SyncGithub {
        #[arg(long)]
        months: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}
