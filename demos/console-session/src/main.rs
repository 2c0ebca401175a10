use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dirconsole::prelude::*;
use dirconsole::DEFAULT_HOST_LOCATION;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "console-session")]
#[command(about = "Drive a directory admin console session from the terminal")]
struct Cli {
    /// File holding the durable (regular-login) session.
    #[arg(long, default_value = ".dirconsole/session.json")]
    state: PathBuf,

    /// Address the console "opened", e.g. `http://localhost/?admin_token=abc`.
    #[arg(long, default_value = DEFAULT_HOST_LOCATION)]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Restore the session and print who is signed in.
    Status,
    /// Sign in with a username and password.
    Login {
        username: String,
        #[arg(long, env = "DIRCONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session.
    Logout,
    /// Authorized GET against the admin API; prints the JSON body.
    Get { path: String },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), ConsoleError> {
    let cli = Cli::parse();
    let config = ConsoleConfig::from_env()?;
    init_logging(config.debug_auth);

    let location: url::Url = cli
        .url
        .parse()
        .map_err(|e| ConsoleError::Config(format!("--url: {e}")))?;
    let host = Arc::new(ScriptedHost::new(location));

    let console = AdminConsole::builder()
        .config(config)
        .host(host.clone())
        .durable_storage(Arc::new(FileStorage::open(&cli.state)?))
        .build()?;

    let state = console.start().await;
    tracing::debug!(?state, "session restored");

    match cli.command {
        Command::Status => print_status(&state),
        Command::Login { username, password } => {
            let admin = console.session().login(&username, &password).await?;
            println!("logged in as {} ({})", admin.username, admin.role);
        }
        Command::Logout => {
            console.session().logout_notified().await;
            println!("logged out");
        }
        Command::Get { path } => {
            let body: serde_json::Value = match console.api().get(&path).await {
                Ok(body) => body,
                Err(e) => {
                    for redirect in host.navigations() {
                        eprintln!("redirected to {redirect}");
                    }
                    return Err(e.into());
                }
            };
            let pretty = serde_json::to_string_pretty(&body)
                .map_err(|e| ConsoleError::Config(e.to_string()))?;
            println!("{pretty}");
        }
    }
    Ok(())
}

fn print_status(state: &SessionState) {
    match state.session() {
        Some(Session::Regular { identity, .. }) => {
            println!("regular session: {} ({})", identity.username, identity.role);
        }
        Some(Session::Console { identity, payload, .. }) => {
            println!("console session: {} (admin {})", identity.username, payload.admin_id);
            println!("  roles: {}", payload.roles.join(", "));
            println!("  permissions: {}", payload.permissions.join(", "));
        }
        None => println!("not signed in"),
    }
}
