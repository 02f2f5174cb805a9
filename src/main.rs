pub mod config;
pub mod headless;
pub mod mqtt;
pub mod relay;
pub mod ui;

use crate::config::{DisplayMode, ViewerConfig};
use crate::mqtt::message_manager::MessageRelay;
use crate::mqtt::mqtt_handler::{BrokerHandle, BrokerStatus};
use crate::relay::{Dispatcher, LogSink, RelayQueue, TopicRegistry};
use crate::ui::topic_log::TopicLog;
use crate::ui::{common::tab_label, ViewerUI};
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::config_path(std::env::args().nth(1));
    let config = ViewerConfig::load_or_create(&config_path).await?;
    info!(
        "Loaded config from {}: {} topics, display {:?}",
        config_path.display(),
        config.topics.len(),
        config.display
    );

    // Gemeinsame Queue und Shutdown-Signal
    let queue = Arc::new(RelayQueue::with_policy(config.queue_policy()));
    let shutdown = CancellationToken::new();
    let (status_tx, status_rx) = watch::channel(BrokerStatus::default());

    let broker = BrokerHandle::spawn(
        &config.broker,
        config.topics.clone(),
        MessageRelay::new(queue.clone()),
        status_tx,
        shutdown.clone(),
    )?;

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    info!("Ctrl-C received, shutting down");
                    ctrl_c.cancel();
                }
                Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
            },
            _ = ctrl_c.cancelled() => {}
        }
    });

    match config.display {
        DisplayMode::Window => {
            let result = run_window(&config, queue.clone(), status_rx, shutdown.clone());
            shutdown_relay(broker, &queue, &shutdown).await;
            result
        }
        DisplayMode::Headless => {
            let registry = TopicRegistry::from_topics(&config.topics, LogSink::new);
            let dispatcher = Dispatcher::new(queue.clone(), registry);
            let mut dispatcher =
                headless::run(dispatcher, config.dispatch_period(), shutdown.clone()).await;

            shutdown_relay(broker, &queue, &shutdown).await;
            let last = dispatcher.dispatch();
            info!(
                "Final dispatch pass delivered {} messages, totals {:?}",
                last.delivered,
                dispatcher.totals()
            );
            Ok(())
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Accepts the usual `RUST_LOG` directives (`debug`, `topicview=trace,rumqttc=warn`).
/// Anything unparsable falls back to `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Blocks on the window until it is closed by the user or by shutdown.
fn run_window(
    config: &ViewerConfig,
    queue: Arc<RelayQueue>,
    status_rx: watch::Receiver<BrokerStatus>,
    shutdown: CancellationToken,
) -> Result<()> {
    let strip_prefix = config.window.strip_prefix.clone();
    let registry = TopicRegistry::from_topics(&config.topics, |topic| {
        TopicLog::new(topic, tab_label(topic, &strip_prefix))
    });
    let dispatcher = Dispatcher::new(queue, registry);
    let dispatch_period = config.dispatch_period();
    let broker_url = config.broker.url();

    info!("Starting UI");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default()
        .with_title(config.window.title.clone())
        .with_inner_size([config.window.width, config.window.height]);

    eframe::run_native(
        &config.window.title,
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(ViewerUI::new(
                cc,
                dispatcher,
                dispatch_period,
                broker_url,
                status_rx,
                shutdown,
            )))
        }),
    )
    .map_err(|e| eyre!("Failed to run window: {}", e))
}

/// Stops the broker, closes the queue and waits for the connection thread.
async fn shutdown_relay(broker: BrokerHandle, queue: &RelayQueue, shutdown: &CancellationToken) {
    shutdown.cancel();
    if let Err(e) = broker.stop() {
        // the connection may already be gone
        debug!("{}", e);
    }
    queue.close();

    if let Err(e) = tokio::task::spawn_blocking(move || broker.join()).await {
        error!("Failed to join MQTT connection thread: {}", e);
    }
    info!("Shutdown complete, {} messages left in queue", queue.len());
}
