use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use mcp_imap::auth::keyring_password::{StoredPassword, stored_password};
use mcp_imap::config::{Config, load_config};
use mcp_imap::mail::imap_client::ImapAccount;
use mcp_imap::mcp::serve_stdio;
use mcp_imap::resources::ResourceRouter;

/// How long the IMAP logout may take once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "mcp_imap")]
#[command(about = "Expose an IMAP inbox as MCP resources over stdio", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the mailbox on stdin/stdout (the default)
    Serve(ServeArgs),

    /// Store the IMAP password for a mailbox in the keyring
    SetPassword {
        #[arg(long)]
        mailbox: String,
    },
}

#[derive(Args, Clone, Default)]
struct ServeArgs {
    /// Login name of the mailbox
    #[arg(long, env = "MCP_MAILBOX")]
    mailbox: Option<String>,

    /// IMAP server, reached over TLS on port 993
    #[arg(long, env = "MCP_HOST")]
    host: Option<String>,

    #[arg(long, env = "MCP_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.cmd.unwrap_or(Command::Serve(cli.serve)) {
        Command::SetPassword { mailbox } => {
            eprintln!("Paste password (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            let secret = secret.trim();
            StoredPassword::for_mailbox(&mailbox)?.store(secret)?;
            println!("Saved password for mailbox {}", mailbox);
            Ok(())
        }

        Command::Serve(args) => serve(args),
    }
}

fn serve(args: ServeArgs) -> Result<()> {
    let file = load_config().context("loading config file")?;
    let identity = Config {
        mailbox: args.mailbox,
        host: args.host,
        password: args.password,
    }
    .merged_over(file)
    .into_identity(stored_password)
    .context("configuration error")?;
    info!("mailbox {}@{}", identity.mailbox, identity.host);

    let account = Arc::new(ImapAccount::new(identity));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;

    let served = runtime.block_on(serve_stdio(
        ResourceRouter::new(Arc::clone(&account)),
        shutdown_signal(),
    ));
    runtime.shutdown_background();

    if let Err(e) = account.close(SHUTDOWN_GRACE) {
        warn!("Failed to close IMAP session: {e}");
    }
    served
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
