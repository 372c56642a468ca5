use cakehouse::application::dispatch::NotificationDispatcher;
use cakehouse::application::orchestrator::Orchestrator;
use cakehouse::application::reminders::ReminderTask;
use cakehouse::application::status::{HookRegistry, StatusManager};
use cakehouse::config::{CheckoutConfig, NotifyConfig, ReminderConfig};
use cakehouse::domain::ports::{
    SharedBookingStore, SharedClock, SharedNotifier, SharedOrderStore, SharedPaymentGateway,
};
use cakehouse::infrastructure::auth::JwtAuthorizer;
use cakehouse::infrastructure::clock::SystemClock;
use cakehouse::infrastructure::email::{
    ConsoleMailer, EmailNotifier, Mailer, PlainTextRenderer, SmtpMailer,
};
use cakehouse::infrastructure::in_memory::{InMemoryBookingStore, InMemoryOrderStore};
use cakehouse::infrastructure::payment::{SimulatedGateway, StripeGateway, stripe};
#[cfg(feature = "storage-rocksdb")]
use cakehouse::infrastructure::rocksdb::RocksDBStore;
use cakehouse::interfaces::api::{ApiService, Envelope};
use cakehouse::interfaces::csv::OrderWriter;
use cakehouse::interfaces::jsonl::RequestReader;
use cakehouse::telemetry;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Replay JSON-lines API requests and print one response envelope per line.
    Process {
        input: PathBuf,

        /// Also write the order report to this CSV file.
        #[arg(long)]
        orders_csv: Option<PathBuf>,
    },
    /// Run the delivery-reminder scan once.
    Remind {
        /// Scan as if it were this instant (RFC 3339).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Run the daily reminder scheduler until interrupted.
    Run,
}

#[derive(Args)]
struct Settings {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "CAKEHOUSE_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// Secret that signs bearer tokens. Falls back to a development secret, with a warning.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true, global = true)]
    jwt_secret: Option<String>,

    /// Uses the simulated gateway when unset.
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true, global = true)]
    stripe_secret_key: Option<String>,

    #[arg(long, env = "STRIPE_API_BASE", default_value = stripe::DEFAULT_API_BASE, global = true)]
    stripe_api_base: String,

    /// Logs emails instead of sending them when unset.
    #[arg(long, env = "SMTP_HOST", global = true)]
    smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587, global = true)]
    smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME", default_value = "", global = true)]
    smtp_username: String,

    #[arg(long, env = "SMTP_PASSWORD", default_value = "", hide_env_values = true, global = true)]
    smtp_password: String,

    #[arg(long, env = "EMAIL_FROM", default_value = "orders@argiescake.example", global = true)]
    email_from: String,

    #[arg(long, env = "BUSINESS_EMAIL", default_value = "owner@argiescake.example", global = true)]
    business_email: String,

    #[arg(long, env = "BUSINESS_NAME", default_value = "Argies Cake", global = true)]
    business_name: String,

    /// Local hour the daily reminder scan runs at.
    #[arg(long, default_value_t = 9, global = true)]
    reminder_hour: u32,

    /// Offset of the business's local time from UTC, in minutes.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true, global = true)]
    utc_offset_minutes: i32,

    /// Remember which bookings were reminded today and skip them on a rerun.
    #[arg(long, global = true)]
    reminder_ledger: bool,
}

const DEV_JWT_SECRET: &str = "dev-secret";

fn jwt_secret(settings: &Settings) -> &str {
    match settings.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("JWT_SECRET is not set, using the development secret; admin tokens can be forged");
            DEV_JWT_SECRET
        }
    }
}

struct Stores {
    bookings: SharedBookingStore,
    orders: SharedOrderStore,
}

fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        let store = RocksDBStore::open(path)?;
        return Ok(Stores {
            bookings: Arc::new(store.clone()),
            orders: Arc::new(store),
        });
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        warn!(
            "persistent storage requested via --db-path but the 'storage-rocksdb' feature is not enabled, falling back to in-memory storage"
        );
    }

    Ok(Stores {
        bookings: Arc::new(InMemoryBookingStore::new()),
        orders: Arc::new(InMemoryOrderStore::new()),
    })
}

fn build_gateway(settings: &Settings, timeout: Duration) -> Result<SharedPaymentGateway> {
    match &settings.stripe_secret_key {
        Some(key) if !key.is_empty() => Ok(Arc::new(StripeGateway::new(
            key.clone(),
            settings.stripe_api_base.clone(),
            timeout,
        )?)),
        _ => {
            info!("no Stripe key configured, using the simulated gateway");
            Ok(Arc::new(SimulatedGateway::new()))
        }
    }
}

fn build_notifier(settings: &Settings, notify: &NotifyConfig) -> Result<SharedNotifier> {
    let mailer: Arc<dyn Mailer> = match &settings.smtp_host {
        Some(host) if !host.is_empty() => Arc::new(SmtpMailer::new(
            host,
            settings.smtp_port,
            settings.smtp_username.clone(),
            settings.smtp_password.clone(),
            settings.email_from.clone(),
        )?),
        _ => Arc::new(ConsoleMailer::new()),
    };
    Ok(Arc::new(EmailNotifier::new(
        Arc::new(PlainTextRenderer::new(notify.business_name.clone())),
        mailer,
        notify.owner_email.clone(),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();
    let settings = cli.settings;

    let checkout = CheckoutConfig::default();
    let notify = NotifyConfig::default()
        .with_owner_email(settings.business_email.clone())
        .with_business_name(settings.business_name.clone());
    let reminder = ReminderConfig::default()
        .with_run_hour(settings.reminder_hour)?
        .with_utc_offset_minutes(settings.utc_offset_minutes)?
        .with_ledger(settings.reminder_ledger);

    let stores = open_stores(settings.db_path.clone())?;
    let notifier = build_notifier(&settings, &notify)?;
    let dispatcher = NotificationDispatcher::new(notifier, notify.timeout);

    match cli.command {
        Command::Process { input, orders_csv } => {
            let clock: SharedClock = Arc::new(SystemClock);
            let gateway = build_gateway(&settings, checkout.payment_timeout)?;
            let orchestrator = Orchestrator::new(
                stores.bookings.clone(),
                stores.orders.clone(),
                gateway,
                dispatcher.clone(),
                clock,
            )
            .with_checkout_config(checkout);
            let status = StatusManager::new(
                stores.bookings.clone(),
                stores.orders.clone(),
                HookRegistry::with_defaults(dispatcher),
            );
            let api = ApiService::new(
                orchestrator,
                status,
                stores.bookings.clone(),
                stores.orders.clone(),
                Arc::new(JwtAuthorizer::new(jwt_secret(&settings).as_bytes())),
            );

            let file = File::open(input).into_diagnostic()?;
            let reader = RequestReader::new(BufReader::new(file));
            for (idx, request) in reader.requests().enumerate() {
                let envelope = match request {
                    Ok(line) => api.handle(line).await,
                    Err(e) => {
                        warn!(line = idx + 1, error = %e, "unreadable request");
                        Envelope::from_error(&e)
                    }
                };
                let mut out = io::stdout().lock();
                serde_json::to_writer(&mut out, &envelope).into_diagnostic()?;
                writeln!(out).into_diagnostic()?;
            }

            if let Some(path) = orders_csv {
                let mut orders = stores.orders.get_all().await?;
                orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let file = File::create(path).into_diagnostic()?;
                OrderWriter::new(file).write_orders(&orders)?;
            }
        }
        Command::Remind { at } => {
            let now = at.unwrap_or_else(Utc::now);
            let task = ReminderTask::new(stores.bookings, dispatcher, reminder);
            let report = task.run_once(now).await?;
            let mut out = io::stdout().lock();
            serde_json::to_writer(&mut out, &report).into_diagnostic()?;
            writeln!(out).into_diagnostic()?;
        }
        Command::Run => {
            let task = ReminderTask::new(stores.bookings, dispatcher, reminder);
            let cancel = CancellationToken::new();
            let scheduler = tokio::spawn(task.run_scheduler(Arc::new(SystemClock), cancel.clone()));
            tokio::signal::ctrl_c().await.into_diagnostic()?;
            info!("shutting down");
            cancel.cancel();
            scheduler.await.into_diagnostic()??;
        }
    }

    Ok(())
}
