use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::{io::Write, path::PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fraudwatch::{
    api::{ApiClient, ApiError},
    config::Config,
    core::prelude::*,
    domain::prelude::*,
    stream::{
        chat::{ChatSession, ChatTranscript},
        metrics::poll_metrics,
    },
};

#[derive(Parser, Debug)]
#[command(name = "fraudwatch", version, about = "Fraud-monitoring analyst console")]
struct Cli {
    /// Backend base URL (overrides FRAUDWATCH_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides FRAUDWATCH_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Analyst e-mail used to sign in when no token is set
    #[arg(long, global = true, env = "FRAUDWATCH_EMAIL")]
    email: Option<String>,

    /// Analyst password used to sign in when no token is set
    #[arg(long, global = true, env = "FRAUDWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the access token
    Login,
    /// Talk to the support assistant
    Chat {
        /// Single prompt; omit for an interactive session
        prompt: Option<String>,
        /// Use a quick action (freeze, transactions, contact, passwords)
        #[arg(long)]
        action: Option<String>,
    },
    /// Order a batch of generated transactions offline
    Demo {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    #[command(flatten)]
    Backend(BackendCommand),
}

/// Commands that talk to the backend on behalf of a signed-in analyst.
#[derive(Subcommand, Debug)]
enum BackendCommand {
    /// Show dashboard metrics
    Metrics {
        /// Keep refreshing every poll interval
        #[arg(long)]
        watch: bool,
    },
    /// List transactions
    Transactions {
        /// Only suspicious / confirmed fraud
        #[arg(long)]
        fraud_only: bool,
        /// Filter by id, user id or city
        #[arg(long)]
        search: Option<String>,
        /// Order by user id, then timestamp
        #[arg(long)]
        sorted: bool,
    },
    /// Send a fraud alert for a transaction
    Notify {
        id: String,
        /// Recipient; defaults to the card holder's address
        #[arg(long)]
        to: Option<String>,
    },
    /// Delete every stored transaction
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Upload a CSV file of transactions for scoring
    Upload { file: PathBuf },
    /// Download the PDF fraud report
    Report {
        /// Target directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

/// Everything a command needs: configuration, session and backend client.
struct Console {
    config: Config,
    session: Session,
    client: ApiClient,
}

impl Console {
    fn new(config: Config) -> Self {
        let mut session = Session::default();
        if let Some(token) = &config.token {
            session.login(User {
                id: "token".to_string(),
                username: "analyst".to_string(),
                role: Role::Analyst,
                token: token.clone(),
            });
        }
        let client = ApiClient::for_session(config.api_url.clone(), &session);
        Self {
            config,
            session,
            client,
        }
    }

    /// Signs in with the given credentials unless a token is already set.
    async fn ensure_session(&mut self, email: Option<&str>, password: Option<&str>) -> Result<()> {
        if self.session.is_authenticated() {
            return Ok(());
        }
        let (Some(email), Some(password)) = (email, password) else {
            bail!("not signed in: set FRAUDWATCH_TOKEN or pass --email and --password");
        };
        let user = self.client.login(email, password).await?;
        self.session.login(user);
        self.client = ApiClient::for_session(self.config.api_url.clone(), &self.session);
        Ok(())
    }

    /// Applies the logout policy to an API result.
    fn check<T>(&mut self, result: Result<T, ApiError>) -> Result<T> {
        let (result, transition) = self.session.observe(result);
        if transition == SessionTransition::ToLogin {
            self.client.set_token(None);
            warn!("session rejected by the backend");
            bail!("session expired, run `fraudwatch login` again");
        }
        Ok(result?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fraudwatch=info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }

    let mut console = Console::new(config);
    let (email, password) = (cli.email.as_deref(), cli.password.as_deref());

    match cli.command {
        Command::Login => {
            if console.session.is_authenticated() {
                console.session.logout();
                console.client.set_token(None);
            }
            console.ensure_session(email, password).await?;
            if let Some(token) = console.session.token() {
                println!("{token}");
            }
        }
        Command::Demo { count } => demo(count),
        Command::Chat { prompt, action } => chat(&console.config, prompt, action).await?,
        Command::Backend(command) => {
            console.ensure_session(email, password).await?;
            run(&mut console, command).await?;
        }
    }
    Ok(())
}

async fn run(console: &mut Console, command: BackendCommand) -> Result<()> {
    match command {
        BackendCommand::Metrics { watch: false } => {
            let result = console.client.fraud_metrics().await;
            print_metrics(&console.check(result)?);
        }
        BackendCommand::Metrics { watch: true } => {
            info!(every = ?console.config.poll_interval, "watching dashboard metrics");
            let mut metrics = poll_metrics(console.client.clone(), console.config.poll_interval);
            loop {
                tokio::select! {
                    next = metrics.next() => match next {
                        Some(Ok(m)) => print_metrics(&m),
                        Some(Err(err)) => {
                            // transient errors were already logged by the poller
                            if matches!(err, ApiError::Unauthenticated) {
                                console.check::<()>(Err(err))?;
                            }
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        BackendCommand::Transactions {
            fraud_only,
            search,
            sorted,
        } => {
            let result = console.client.transactions().await;
            let all = console.check(result)?;
            let mut state = ConsoleState::default();
            if fraud_only {
                state.load(all);
            } else {
                state.transactions = all;
            }
            if let Some(term) = search {
                state.set_search(term);
            }
            let rows = if sorted {
                state.visible_sorted()
            } else {
                state.visible().into_iter().cloned().collect()
            };
            print_transactions(&rows);
            if fraud_only {
                println!("{} awaiting notification", state.new_fraud_count());
            }
        }
        BackendCommand::Notify { id, to } => {
            let result = console.client.transactions().await;
            let mut state = ConsoleState::default();
            state.load(console.check(result)?);
            let recipient = match (to, state.find(&id)) {
                (Some(email), _) => email,
                (None, Some(txn)) => txn.default_alert_recipient(),
                (None, None) => bail!("transaction {id} is not in the fraud queue"),
            };
            let result = console
                .client
                .notify_transaction(&id, Some(&recipient))
                .await;
            let response = console.check(result)?;
            state.mark_notified(&id);
            println!(
                "{}",
                response
                    .message
                    .unwrap_or_else(|| format!("Email successfully sent to {recipient}"))
            );
            println!("{} awaiting notification", state.new_fraud_count());
        }
        BackendCommand::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every transaction without --yes");
            }
            let result = console.client.clear_transactions().await;
            let response = console.check(result)?;
            println!("deleted {} transactions", response.deleted);
        }
        BackendCommand::Upload { file } => {
            let result = console.client.upload_csv(&file).await;
            let response = console.check(result)?;
            println!("{} ({} rows)", response.message, response.rows_processed);
        }
        BackendCommand::Report { out } => {
            let result = console.client.download_fraud_report(&out).await;
            let path = console.check(result)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn chat(config: &Config, prompt: Option<String>, action: Option<String>) -> Result<()> {
    let mut session = ChatSession::new(config.chat.clone())?;
    let mut transcript = ChatTranscript::default();

    let first = match action {
        Some(name) => {
            let action: QuickAction = name
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown quick action: {name}"))?;
            Some(action.prompt().to_string())
        }
        None => prompt,
    };

    if let Some(prompt) = first {
        return ask(&mut session, &mut transcript, &prompt).await;
    }

    println!("Quick actions:");
    for action in QuickAction::ALL {
        println!("  {:<20} {}", action.label(), action.prompt());
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        // keep the conversation going after a failed turn
        let _ = ask(&mut session, &mut transcript, &line).await;
    }
    Ok(())
}

async fn ask(
    session: &mut ChatSession,
    transcript: &mut ChatTranscript,
    prompt: &str,
) -> Result<()> {
    let outcome = session
        .ask(prompt, transcript, |fragment| {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();
    if let Err(err) = outcome {
        if let Some(notice) = transcript.last_reply() {
            println!("{}", notice.text);
        }
        return Err(err.into());
    }
    Ok(())
}

fn demo(count: usize) {
    let mut batch: Vec<Transaction> = (0..count).map(|_| Transaction::simple_mock()).collect();
    if let Some(first) = batch.first_mut() {
        first.user_id = None;
    }
    let ordered = order_transactions(&batch);
    print_transactions(&ordered);
}

fn print_metrics(metrics: &FraudMetrics) {
    println!(
        "total {:>8}  flagged {:>6}  overall risk {:>6.2}%",
        metrics.total_transactions, metrics.flagged_transactions, metrics.overall_risk_score
    );
    if let Some(user) = &metrics.most_active_user {
        println!("most active user: {user}");
    }
    for bucket in &metrics.risk_distribution {
        println!("  {:<20} {}", bucket.name, bucket.value);
    }
}

fn print_transactions(rows: &[Transaction]) {
    for txn in rows {
        let tier = txn.risk_tier().map(|t| t.label()).unwrap_or("-");
        println!(
            "{:<15} {:<10} {:<26} {:>10.2} {:<14} {:<16} {:<18} {}",
            txn.short_id(),
            txn.user_id(),
            txn.timestamp(),
            txn.amount,
            txn.city,
            txn.status,
            tier,
            if txn.notification_sent { "notified" } else { "" }
        );
    }
    println!("{} transactions", rows.len());
}
