use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::config::normalize_database_url;
use shared::domain::{is_valid_operation_code, ADMIN_SCOPE};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "WSOP__DATABASE_URL", default_value = "sqlite://./data/wsop.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grant `scope` (an operation code fragment, or ADMIN) to `email`.
    Grant { email: String, scope: String },
    Revoke { email: String, scope: String },
    Grants {
        #[arg(long)]
        email: Option<String>,
    },
    /// Most recent audit entries, newest first.
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

fn check_scope(scope: &str) -> Result<()> {
    if scope.trim().is_empty() {
        bail!("scope must not be empty");
    }
    if scope != ADMIN_SCOPE && scope.eq_ignore_ascii_case(ADMIN_SCOPE) {
        bail!("the administrative scope is spelled {ADMIN_SCOPE}");
    }
    if scope != ADMIN_SCOPE && is_valid_operation_code(scope) {
        println!("note: '{scope}' is a full operation code and only matches codes containing it");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&normalize_database_url(&cli.database_url)).await?;

    match cli.command {
        Command::Grant { email, scope } => {
            check_scope(&scope)?;
            if storage.add_grant(&email, &scope).await? {
                println!("granted {scope} to {email}");
            } else {
                println!("{email} already holds {scope}");
            }
        }
        Command::Revoke { email, scope } => {
            if storage.remove_grant(&email, &scope).await? {
                println!("revoked {scope} from {email}");
            } else {
                println!("{email} does not hold {scope}");
            }
        }
        Command::Grants { email } => {
            let grants = match email {
                Some(email) => storage.grants_for_user(&email).await?,
                None => storage.list_grants().await?,
            };
            for grant in grants {
                println!("{}\t{}", grant.email, grant.scope.as_raw());
            }
        }
        Command::Audit { limit } => {
            for entry in storage.recent_audit(limit).await? {
                println!(
                    "{}\t{}\t{}",
                    entry.id,
                    entry.logged_at.to_rfc3339(),
                    entry.payload
                );
            }
        }
    }

    Ok(())
}
