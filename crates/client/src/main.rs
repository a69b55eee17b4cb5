use clap::Parser;
use std::time::Duration;
use stockdesk_core::dashboard::Dashboard;
use stockdesk_core::domain::Period;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod report;

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Parser)]
#[command(name = "stockdesk")]
struct Args {
    /// Backend base URL. Falls back to STOCKDESK_API_URL, then localhost:8000.
    #[arg(long)]
    api_url: Option<String>,

    /// Add a symbol to the watchlist (repeatable).
    #[arg(long)]
    add: Vec<String>,

    /// Remove a symbol from the watchlist (repeatable).
    #[arg(long)]
    remove: Vec<String>,

    /// Look up symbols matching a query.
    #[arg(long)]
    search: Option<String>,

    /// Load detail and price history for a symbol.
    #[arg(long)]
    select: Option<String>,

    /// History window for --select: 1D, 5D, 1M, 3M, 1Y or 5Y.
    #[arg(long, default_value = "1D")]
    period: Period,

    /// Ask the assistant a question (about the selected symbol, if any).
    #[arg(long)]
    ask: Option<String>,

    /// Keep polling for this many seconds, printing the watchlist on each refresh.
    #[arg(long, default_value_t = 0)]
    watch_secs: u64,

    /// Only check that the backend is reachable.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = stockdesk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Some(url) = args.api_url.clone() {
        settings.api_url = Some(url);
    }
    if settings.api_url.is_none() {
        settings.api_url = Some(DEFAULT_API_URL.to_string());
    }

    let dashboard = Dashboard::connect(&settings)?;

    match dashboard.health().await {
        Ok(status) => tracing::info!(api_url = ?settings.api_url, %status, "backend reachable"),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "backend health check failed");
            if args.dry_run {
                return Err(err);
            }
        }
    }

    if args.dry_run {
        tracing::info!(dry_run = true, "health check only; exiting");
        return Ok(());
    }

    dashboard.start().await;

    for symbol in &args.add {
        let outcome = dashboard.add(symbol).await;
        tracing::info!(%symbol, ?outcome, "add");
    }
    for symbol in &args.remove {
        let outcome = dashboard.remove(symbol).await;
        tracing::info!(%symbol, ?outcome, "remove");
    }

    if let Some(query) = args.search.as_deref() {
        dashboard.on_query_change(query).await;
        tokio::time::sleep(settings.sync.search_debounce).await;
        while dashboard.search().is_pending() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        report::print_search(query, &dashboard.search().results().await);
    }

    if let Some(symbol) = args.select.as_deref() {
        dashboard.select_period(args.period).await;
        let outcome = dashboard.select(symbol).await;
        tracing::info!(%symbol, period = %args.period, ?outcome, "select");
        if let Some(selection) = dashboard.store().selection().await {
            report::print_selection(&selection, args.period);
        }
    }

    if let Some(question) = args.ask.as_deref() {
        if let Some(reply) = dashboard.chat().send(question).await {
            report::print_reply(&reply);
        }
    }

    report::print_watchlist(&dashboard.store().entries().await);

    if args.watch_secs > 0 {
        watch(&dashboard, Duration::from_secs(args.watch_secs), settings.sync.poll_interval).await;
    } else {
        dashboard.market().refresh().await;
    }
    report::print_market(&dashboard.market().snapshot().await);

    dashboard.shutdown();
    Ok(())
}

async fn watch(dashboard: &Dashboard, duration: Duration, every: Duration) {
    let deadline = tokio::time::Instant::now() + duration;
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; the poller has just fetched.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; stopping");
                break;
            }
            _ = ticker.tick() => {
                report::print_watchlist(&dashboard.store().entries().await);
            }
        }
    }
}

fn init_sentry(settings: &stockdesk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
