// ████████╗██╗     ██████╗
// ╚══██╔══╝██║     ██╔══██╗
//    ██║   ██║     ██║  ██║
//    ██║   ██║     ██║  ██║
//    ██║   ███████╗██████╔╝
//    ╚═╝   ╚══════╝╚═════╝
//
// H A R V E S T E R
//
// Every public top-level domain on the planet, fetched in parallel, merged
// by a single owner, sorted, and written to disk. Or nothing at all.

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tld_harvester::{output, Config, Harvester, HttpFetcher};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(true).init();
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Could not load configuration")?;
    init_tracing(config.log_json);

    info!("🌐 TLD HARVESTER initializing...");

    let sources = config
        .compile_sources()
        .context("Could not compile TLD sources")?;
    info!(
        sources = sources.len(),
        output = %config.output_path.display(),
        "✅ Configuration loaded"
    );

    let fetcher = HttpFetcher::new(config.fetch_timeout, &config.user_agent)
        .context("Could not build HTTP client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("🛑 Shutdown signal received!");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut harvester = Harvester::new(fetcher)
        .with_retry(config.retry_policy())
        .with_shutdown(shutdown_rx);
    if let Some(deadline) = config.overall_timeout {
        harvester = harvester.with_deadline(deadline);
    }

    let harvest = harvester
        .run(sources)
        .await
        .context("Could not get TLD list")?;

    match serde_json::to_string(&harvest.report) {
        Ok(report) => debug!(report = %report, "Harvest report"),
        Err(e) => warn!(error = %e, "Could not serialize harvest report"),
    }

    info!("📝 Generating {}...", config.output_path.display());
    output::write_list(&config.output_path, &harvest.list, config.output_format)
        .with_context(|| format!("Could not write {}", config.output_path.display()))?;

    info!(
        tlds = harvest.list.len(),
        lines = harvest.report.lines_scanned(),
        elapsed_ms = harvest.report.elapsed().as_millis() as u64,
        "🏁 Done. {} TLDs written",
        harvest.list.len()
    );
    Ok(())
}
