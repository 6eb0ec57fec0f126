//! Subcommand execution
//!
//! Every command except `login`, `logout` and `status` is protected: the
//! shell's startup check must authenticate before any admin call is made.
//! Results are printed to stdout as pretty JSON.

use std::io::BufRead;
use std::time::SystemTime;

use admin_client::{OpenChannelRequest, recommended_nodes};
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use common::Secret;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::shell::{AuthState, Shell};

/// Env var holding the sign-in password when `--password` is not given.
pub const PASSWORD_ENV: &str = "ARATIRI_ADMIN_PASSWORD";

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with an admin account
    Login {
        #[arg(short, long)]
        username: String,

        /// Read from ARATIRI_ADMIN_PASSWORD, else one line of stdin
        #[arg(short, long, env = PASSWORD_ENV, hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Check whether the stored session still grants admin access
    Status,

    /// Node info, wallet balance, channels and peers in one view
    Dashboard,

    /// Show the node's identity, version and sync state
    NodeInfo,

    /// Show the on-chain wallet balance
    Balance,

    /// Generate a new on-chain receive address
    NewAddress,

    /// List open channels
    Channels,

    /// Open a channel to a remote node
    OpenChannel {
        /// Remote node public key
        node_pubkey: String,

        /// Local funding amount in satoshis
        local_funding_amount: i64,

        /// Satoshis pushed to the remote side on open
        #[arg(long, default_value_t = 0)]
        push_sat: i64,

        /// Do not announce the channel
        #[arg(long)]
        private: bool,
    },

    /// List connected peers and recommended nodes to connect to
    Peers,

    /// Connect to a peer; without a host, use the node's first advertised address
    ConnectPeer {
        pubkey: String,
        host: Option<String>,
    },
}

impl Command {
    fn is_protected(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Logout | Command::Status
        )
    }
}

pub async fn run(shell: &Shell, command: Command) -> Result<()> {
    if command.is_protected() {
        require_session(shell).await?;
    }

    let client = shell.client();
    match command {
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => Secret::new(p),
                None => read_password()?,
            };
            let user = shell.login(&username, &password).await?;
            print_json(&json!({"authenticated": true, "user": user}))
        }
        Command::Logout => {
            shell.logout();
            print_json(&json!({"authenticated": false}))
        }
        Command::Status => {
            let state = shell.start(SystemTime::now()).await;
            print_json(&status_json(&state))
        }
        Command::Dashboard => {
            let (info, balance, channels, peers) = tokio::join!(
                client.node_info(),
                client.wallet_balance(),
                client.channels(),
                client.peers(),
            );
            print_json(&json!({
                "nodeInfo": section(info),
                "walletBalance": section(balance),
                "channels": section(channels),
                "peers": section(peers),
            }))
        }
        Command::NodeInfo => print_json(&client.node_info().await?),
        Command::Balance => print_json(&client.wallet_balance().await?),
        Command::NewAddress => print_json(&client.new_address().await?),
        Command::Channels => print_json(&client.channels().await?),
        Command::OpenChannel {
            node_pubkey,
            local_funding_amount,
            push_sat,
            private,
        } => {
            let result = client
                .open_channel(&OpenChannelRequest {
                    node_pubkey,
                    local_funding_amount,
                    push_sat,
                    private_channel: private,
                })
                .await?;
            print_json(&json!({"fundingTx": result}))
        }
        Command::Peers => {
            let (remotes, peers) = tokio::try_join!(client.remotes(), client.peers())?;
            let recommended = recommended_nodes(remotes, &peers);
            print_json(&json!({"connected": peers, "recommended": recommended}))
        }
        Command::ConnectPeer { pubkey, host } => {
            match host {
                Some(host) => client.connect_peer(&pubkey, &host).await?,
                None => {
                    let node = client
                        .remotes()
                        .await?
                        .into_iter()
                        .find(|n| n.pub_key == pubkey)
                        .with_context(|| format!("{pubkey} is not among the known remote nodes"))?;
                    client
                        .connect_node(&node)
                        .await
                        .with_context(|| format!("Failed to connect to {}", node.alias))?;
                }
            }
            print_json(&json!({"connected": pubkey}))
        }
    }
}

async fn require_session(shell: &Shell) -> Result<()> {
    match shell.start(SystemTime::now()).await {
        AuthState::Authenticated(user) => {
            debug!(role = user.role.as_deref(), "session confirmed");
            Ok(())
        }
        AuthState::LoggedOut {
            notice: Some(notice),
        } => bail!("{notice}"),
        _ => bail!("Not signed in. Run `aratiri-admin login` first."),
    }
}

fn status_json(state: &AuthState) -> Value {
    match state {
        AuthState::Authenticated(user) => json!({"authenticated": true, "user": user}),
        AuthState::LoggedOut { notice } => json!({
            "authenticated": false,
            "notice": notice.map(|n| n.to_string()),
        }),
        AuthState::Checking => json!({"authenticated": false, "checking": true}),
    }
}

/// One dashboard panel: the data, or the error that panel would display.
fn section<T: Serialize>(result: admin_client::Result<T>) -> Value {
    match result {
        Ok(data) => serde_json::to_value(data).unwrap_or(Value::Null),
        Err(e) => json!({"error": e.to_string()}),
    }
}

fn read_password() -> Result<Secret<String>> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("no password given (use --password, {PASSWORD_ENV} or stdin)");
    }
    Ok(Secret::new(password))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
