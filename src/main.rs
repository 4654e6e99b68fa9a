use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;

use circadian_hue::backend::hass::{CircadianSensor, HassSensorPoller};
use circadian_hue::backend::hue::registry::BridgeRegistry;
use circadian_hue::config;
use circadian_hue::error::{ApiError, ApiResult};
use circadian_hue::model::state::{RestoreState, StateFile};
use circadian_hue::server::appstate::AppState;
use circadian_hue::server::http::HttpServer;
use circadian_hue::server::{self, scheduler};
use circadian_hue::switch::SCAN_INTERVAL;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: Utf8PathBuf,
}

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
#[allow(clippy::match_same_arms)]
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug => 7,
            log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &[
        "debug",
        "hyper_util=info",
        "reqwest=info",
        "tower_http::trace::on_request=info",
        "axum::rejection=trace",
    ];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

/// Flag `tx` once Ctrl-C or SIGTERM is received.
fn install_signal_handlers(tx: watch::Sender<bool>) -> ApiResult<()> {
    let mut sigterm = signal::unix::signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        let msg = tokio::select! {
            _ = signal::ctrl_c() => "Ctrl-C pressed, exiting..",
            _ = sigterm.recv() => "SIGTERM received, exiting..",
        };
        log::warn!("{msg}");
        let _ = std::io::stderr().flush();
        tx.send_replace(true);
    });

    Ok(())
}

async fn run() -> ApiResult<()> {
    init_logging()?;

    let args = Args::parse();

    let config = config::parse(&args.config)?;
    log::debug!("Configuration loaded successfully");

    let Some(hass) = config.hass.clone() else {
        return Err(ApiError::service_error(
            "No hass section in config, cannot read circadian values".to_string(),
        ));
    };

    if !config.has_bridges() {
        log::warn!("{}", "-".repeat(80));
        log::warn!("No bridges configured in config!");
        log::warn!("{} will run, but cannot adjust any lights.", config.circadian.name);
        log::warn!("{}", "-".repeat(80));
    }

    let (stop_tx, mut shutdown) = watch::channel(false);
    install_signal_handlers(stop_tx.clone())?;

    // circadian readings from home assistant
    let (tx, sensor) = CircadianSensor::channel();
    let poller = HassSensorPoller::new(hass, tx)?;
    let poller = tokio::spawn(poller.run());

    // persisted entity state
    let state = RestoreState::load(config.circadian.state_file.clone())?;
    let (store, writer) = StateFile::new(state);
    let writer = tokio::spawn(writer.run());

    let bridges = BridgeRegistry::from_config(&config)?;
    let appstate = AppState::new(config, bridges, Arc::new(sensor), Arc::new(store));

    let switch = appstate.switch();
    scheduler::setup(&switch).await;
    log::info!("{} ready, state is {:?}", switch.entity_id(), switch.state_str());
    let schedule = tokio::spawn(scheduler::run(switch, SCAN_INTERVAL));

    let conf = appstate.config();
    let http = HttpServer::http(
        conf.circadian.listen,
        conf.circadian.http_port,
        server::build_service(appstate),
    );

    let mut stop = shutdown.clone();
    let mut http = tokio::spawn(http.run(async move {
        let _ = stop.wait_for(|done| *done).await;
    }));

    let http_done = tokio::select! {
        res = &mut http => {
            res??;
            true
        }
        res = poller => {
            res??;
            false
        }
        res = writer => {
            res??;
            false
        }
        _ = shutdown.wait_for(|done| *done) => false,
    };

    schedule.abort();

    // let in-flight requests finish
    stop_tx.send_replace(true);
    if !http_done {
        http.await??;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("Circadian Hue error: {err}");
        log::error!("Fatal error encountered, cannot continue.");
    }
}
