pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::StrategyId;
use crate::fetcher::EscalationPolicy;

#[derive(Parser)]
#[command(name = "page-extractor")]
#[command(about = "Fetch web pages and extract their content", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/page-extractor/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP extraction service
    Serve {
        /// Address to bind
        #[arg(long, env = "PAGE_EXTRACTOR_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PAGE_EXTRACTOR_PORT")]
        port: Option<u16>,

        /// Escalation policy: sequential or race
        #[arg(long, env = "PAGE_EXTRACTOR_POLICY")]
        policy: Option<EscalationPolicy>,

        /// Chrome/Chromium executable for both browser strategies
        #[arg(long, env = "CHROME_EXECUTABLE")]
        chrome: Option<PathBuf>,
    },
    /// Extract a single URL and print the outcome as JSON
    Extract {
        /// URL of the page
        url: String,

        /// Strategy to use; repeat for several (request, browser, stealth)
        #[arg(short, long = "adapter")]
        adapters: Vec<StrategyId>,

        /// The page loads its content through XHR
        #[arg(long)]
        xhr: bool,

        /// Escalation policy: sequential or race
        #[arg(long, env = "PAGE_EXTRACTOR_POLICY")]
        policy: Option<EscalationPolicy>,

        /// Include the cleaned HTML in the output
        #[arg(long)]
        html: bool,

        /// Chrome/Chromium executable for both browser strategies
        #[arg(long, env = "CHROME_EXECUTABLE")]
        chrome: Option<PathBuf>,
    },
}
