use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use transit_cli::cli::{init_logging, run, CliConfig, Command};
use transit_core::{ClientConfig, Role};

#[derive(Parser)]
#[command(name = "transit")]
#[command(about = "Passenger notifications and ticket validation for the transit service")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (apiUrl, dataDir, pageSize)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8080/api/v1
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the identity and access token used by every other command
    Login {
        #[arg(long)]
        user_id: i64,
        /// passenger, controller or admin
        #[arg(long)]
        role: Role,
        #[arg(long)]
        token: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in identity
    Whoami,

    /// List notifications
    Inbox {
        /// Zero-based page to load
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
        /// Keep loading until the last page
        #[arg(long)]
        all: bool,
    },

    /// Unread count (or the unread notifications with --list)
    Unread {
        #[arg(long)]
        list: bool,
    },

    /// Mark one notification as read
    Read { id: i64 },

    /// Mark every notification as read
    ReadAll,

    /// Delete a notification
    Delete { id: i64 },

    /// Send a notification to a passenger (controllers only)
    Send {
        /// Recipient user ID
        #[arg(long)]
        to: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// CONTROLLER_WARNING, TICKET_VIOLATION or SYSTEM_ALERT
        #[arg(long = "type", default_value = "CONTROLLER_WARNING")]
        notification_type: String,
    },

    /// Validate a ticket QR code on a route
    Validate {
        code: String,
        #[arg(long)]
        route: Option<i64>,
    },

    /// Look up a ticket by QR code
    Ticket { code: String },

    /// Poll the unread count until Ctrl-C
    Watch {
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Login {
                user_id,
                role,
                token,
                name,
            } => Command::Login {
                user_id,
                role,
                token,
                name,
            },
            Commands::Logout => Command::Logout,
            Commands::Whoami => Command::Whoami,
            Commands::Inbox { page, size, all } => Command::Inbox { page, size, all },
            Commands::Unread { list } => Command::Unread { list },
            Commands::Read { id } => Command::Read { id },
            Commands::ReadAll => Command::ReadAll,
            Commands::Delete { id } => Command::Delete { id },
            Commands::Send {
                to,
                title,
                message,
                notification_type,
            } => Command::Send {
                to,
                title,
                message,
                notification_type,
            },
            Commands::Validate { code, route } => Command::Validate { code, route },
            Commands::Ticket { code } => Command::Ticket { code },
            Commands::Watch { interval } => Command::Watch { interval },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Warning: {:#}", e);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command.into(), &config, cli.pretty).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Defaults, then environment, then the config file, then `--api-url`.
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env();
    if let Some(ref path) = cli.config {
        config = CliConfig::load(path)?.apply(config);
    }
    if let Some(ref url) = cli.api_url {
        config = config.with_api_base_url(url.trim());
    }
    Ok(config)
}
