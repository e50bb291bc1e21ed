mod band;
mod cell;
mod config;
mod csv_sink;
mod error;
mod history;
mod keep_alive;
mod metrics;
mod monitor;
mod provider;
mod sampling;
mod throughput;

use config::Config;
use csv_sink::CsvSink;
use keep_alive::BackgroundNotice;
use monitor::Monitor;
use provider::{RadioProvider, SimulatedRadio, SystemTraffic};
use sampling::SamplingLoop;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Forward stdin lines to the async side from a plain thread, so a pending
/// read never holds up runtime shutdown
fn spawn_command_reader() -> mpsc::UnboundedReceiver<String> {
    let (sender, receiver) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to read command: {}", e);
                    break;
                }
            }
        }
    });
    receiver
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}; using defaults", e);
            Config::default()
        }
    };

    let system_traffic = if config.use_system_traffic {
        SystemTraffic::detect()
    } else {
        None
    };
    let provider: Arc<dyn RadioProvider> =
        Arc::new(SimulatedRadio::new(config.location_permission, system_traffic));

    let sink = CsvSink::new(config.log_directory());
    log::info!(
        "Logging to {} (CSV schema v{})",
        sink.directory().display(),
        metrics::labels::SCHEMA_VERSION
    );

    // The logger lives on its own thread, independent of the monitor below.
    // Both read the same simulated radio, which advances with wall time.
    let sampling = Arc::new(SamplingLoop::spawn(
        provider.clone(),
        Arc::new(sink),
        Arc::new(BackgroundNotice::new()),
        config.loop_settings(),
    ));
    if config.log_on_launch {
        sampling.start();
    }

    let mut monitor = Monitor::new(provider, config.capabilities(), config.history_capacity);
    let mut refresh = tokio::time::interval(config.sample_interval());
    let mut commands = spawn_command_reader();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                monitor.refresh();
                if config.show_monitor {
                    let session = sampling.session_path();
                    print!("{}", monitor.render(sampling.is_running(), session.as_deref()));
                }
            }
            line = commands.recv(), if stdin_open => {
                match line {
                    Some(line) => match line.trim() {
                        "l" => {
                            if sampling.is_running() {
                                let rows = sampling.rows_written();
                                if sampling.stop() {
                                    log::info!("Logged {} rows", rows);
                                }
                            } else {
                                sampling.start();
                            }
                        }
                        "q" => break,
                        "" => {}
                        other => log::warn!("Unknown command {:?} (l = toggle logging, q = quit)", other),
                    },
                    None => stdin_open = false,
                }
            }
            _ = &mut ctrl_c => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    sampling.stop();
    log::info!("Shutting down after {} sampling ticks", sampling.ticks());
}
