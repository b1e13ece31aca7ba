use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use tunebridge::{cli, config, error, logging};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Log verbosely (same as RUST_LOG=tunebridge=debug)
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// List the tracks of a Spotify playlist
    Fetch(FetchOptions),

    /// Match the tracks of a Spotify playlist on YouTube
    Convert(ConvertOptions),

    /// Show or reset the locally tracked YouTube quota
    Quota(QuotaOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct FetchOptions {
    /// Spotify playlist URL or URI
    #[clap(long)]
    pub url: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ConvertOptions {
    /// Spotify playlist URL or URI
    #[clap(long)]
    pub url: String,

    /// Only convert the first N tracks
    #[clap(long)]
    pub limit: Option<usize>,

    /// Print the results as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct QuotaOptions {
    /// Clear today's usage
    #[clap(long)]
    pub reset: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    let default_filter = match (&cli.command, cli.verbose) {
        (_, true) => "tunebridge=debug",
        (Command::Serve, false) => logging::DEFAULT_FILTER,
        (_, false) => "tunebridge=warn",
    };
    logging::init_logging(default_filter);

    match cli.command {
        Command::Serve => cli::serve().await,
        Command::Fetch(opt) => cli::fetch(opt.url).await,
        Command::Convert(opt) => cli::convert(opt.url, opt.limit, opt.json).await,
        Command::Quota(opt) => cli::quota(opt.reset).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
