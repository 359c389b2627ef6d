use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use crossterm::event::{DisableFocusChange, EnableFocusChange};
use ratatui::DefaultTerminal;
use tracing::info;

use roster::api::ApiClient;
use roster::app::{Flags, RosterApp};
use roster::config::Config;
use roster::logging;
use roster::query::{Connectivity, LifecycleListeners, QueryClient};
use roster::roster::RosterApi;
use roster::route::Route;
use roster::runtime::Runtime;

const FRAME_RATE: u32 = 30;

/// Terminal console for the team roster
#[derive(Parser, Debug)]
#[command(name = "roster", version, about)]
struct Cli {
    /// Base URL of the roster API
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    /// Write logs to this file
    #[arg(long, env = "ROSTER_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Screen to open: /, /add or /edit/{id}
    #[arg(default_value = "/")]
    path: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = Config::from_lookup(|name| match name {
        "API_BASE_URL" => cli.base_url.clone(),
        "ROSTER_LOG_FILE" => cli.log_file.as_ref().map(|path| path.display().to_string()),
        _ => std::env::var(name).ok(),
    })?;
    logging::init(config.log_file.as_deref())?;

    let start = Route::parse(&cli.path).ok_or_else(|| eyre!("unknown screen {:?}", cli.path))?;
    info!(base_url = %config.base_url, %start, "starting roster");

    let queries = Arc::new(QueryClient::with_config(config.query_config()));
    let roster = RosterApi::new(ApiClient::new(config.base_url.clone()), Arc::clone(&queries))?;
    let flags = Flags {
        lifecycle: LifecycleListeners::install(Arc::clone(&queries), queries.config()),
        connectivity: Connectivity::for_url(&config.base_url, config.probe_interval),
        roster,
        page_size: config.page_size,
        start,
    };

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, flags).await;
    ratatui::restore();
    result
}

async fn run(terminal: &mut DefaultTerminal, flags: Flags) -> Result<()> {
    crossterm::execute!(io::stdout(), EnableFocusChange).wrap_err("enable focus reporting")?;
    let result = Runtime::<RosterApp>::new(flags).run(terminal, FRAME_RATE).await;
    crossterm::execute!(io::stdout(), DisableFocusChange).wrap_err("disable focus reporting")?;
    result
}
