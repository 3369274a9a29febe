use clap::{Parser, Subcommand};

use resumax_tui::app::Runtime;
use resumax_tui::commands;
use resumax_tui::commands::chat::ChatArgs;
use resumax_tui::commands::config::ConfigCommand;
use resumax_tui::commands::threads::ThreadCommand;
use resumax_tui::commands::tui::TuiArgs;
use resumax_tui::config::CliConfig;
use resumax_tui::errors::CliError;
use resumax_tui::logging;
use resumax_tui::output::{OutputMode, print_error};

#[derive(Debug, Parser)]
#[command(
    name = "resumax",
    version,
    about = "Resumax client: chat about your resume from the terminal."
)]
struct Cli {
    #[arg(long, global = true)]
    profile: Option<String>,
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    quiet: bool,
    #[arg(long, global = true, default_value_t = 60_000)]
    timeout: u64,
    #[arg(long, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Interactive chat with the thread panel
    Tui(TuiArgs),
    /// Send one prompt and print the reply
    Chat(ChatArgs),
    /// List threads grouped by age
    Threads,
    Thread {
        #[command(subcommand)]
        command: ThreadCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    // The TUI installs its own file logger once the terminal is taken over.
    if !matches!(cli.command, Commands::Tui(_)) {
        logging::init_stderr(&output);
    }

    let result = run(cli, output.clone()).await;
    if let Err(err) = result {
        print_error(&err, &output);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli, output: OutputMode) -> Result<(), CliError> {
    let config_path = CliConfig::default_path()?;
    let config = CliConfig::load_from(&config_path)?;

    let mut runtime = Runtime {
        output,
        config,
        config_path,
        profile_override: cli.profile,
        api_url_override: cli.api_url,
        timeout_ms: cli.timeout,
    };

    match cli.command {
        Commands::Config { command } => commands::config::handle(&mut runtime, command).await,
        Commands::Tui(args) => commands::tui::handle(&runtime, args).await,
        Commands::Chat(args) => commands::chat::handle(&runtime, args).await,
        Commands::Threads => commands::threads::list(&runtime).await,
        Commands::Thread { command } => commands::threads::handle(&runtime, command).await,
    }
}
