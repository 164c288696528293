//! StockDesk chat server and admin CLI entry point.
//!
//! Binary name: `sdesk`
//!
//! Parses CLI arguments, opens the database, then dispatches to the command
//! handler or starts the WebSocket/REST server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, UserCommand};
use state::{AppContext, AppState};
use stockdesk_types::identity::ApprovalStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, Commands::Serve { .. });
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 if serving => "info",
        0 => "warn",
        1 => "info,stockdesk=debug",
        _ => "trace",
    };
    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    stockdesk_observe::init_tracing(filter, otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need the database
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "sdesk", &mut std::io::stdout());
        return Ok(());
    }

    let ctx = AppContext::init().await?;

    match cli.command {
        Commands::User { action } => match action {
            UserCommand::Create {
                email,
                username,
                role,
                approved,
            } => {
                cli::user::create_user(&ctx, &email, &username, role.into(), approved, cli.json)
                    .await?;
            }
            UserCommand::Approve { email } => {
                cli::user::set_approval(&ctx, &email, ApprovalStatus::Approved, cli.json).await?;
            }
            UserCommand::Reject { email } => {
                cli::user::set_approval(&ctx, &email, ApprovalStatus::Rejected, cli.json).await?;
            }
            UserCommand::List => {
                cli::user::list_users(&ctx, cli.json).await?;
            }
        },

        Commands::Token { email } => {
            cli::token::issue_token(&ctx, &email, cli.json).await?;
        }

        Commands::Serve { port, host, .. } => {
            let state = AppState::from_context(&ctx)?;

            let host = host.unwrap_or_else(|| ctx.config.host.clone());
            let port = port.unwrap_or(ctx.config.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!(%addr, data_dir = %ctx.data_dir.display(), "chat server listening");
            if !cli.quiet {
                println!(
                    "  {} StockDesk chat listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!(
                    "  {} {}",
                    console::style("ws").dim(),
                    console::style(format!("ws://{addr}/ws/chat?token=...")).dim()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!(online = state.registry.online_count(), "chat server stopped");
            ctx.db_pool.close().await;
            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    stockdesk_observe::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
