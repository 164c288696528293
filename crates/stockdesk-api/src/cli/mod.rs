//! CLI command definitions for the `sdesk` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod token;
pub mod user;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use stockdesk_types::identity::Role;

/// Realtime chat backend for the StockDesk admin/client desk.
#[derive(Parser)]
#[command(name = "sdesk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat server (WebSocket + REST).
    Serve {
        /// Port to listen on. Defaults to `port` from config.toml.
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to. Defaults to `host` from config.toml.
        #[arg(long)]
        host: Option<String>,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Manage user accounts in the local user store.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Print a signed access token for an existing account.
    Token {
        /// Account email.
        email: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create an account.
    Create {
        email: String,
        username: String,

        #[arg(long, value_enum)]
        role: RoleArg,

        /// Create the account already approved.
        #[arg(long)]
        approved: bool,
    },

    /// Approve a pending client.
    Approve { email: String },

    /// Reject a client registration.
    Reject { email: String },

    /// List all accounts.
    #[command(alias = "ls")]
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Admin,
    Client,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Client => Role::Client,
        }
    }
}
