// Pwspush - Push personal weather station readings to Weather Underground
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use prometheus::Registry;
use pwspush::http::{http_route, RequestContext};
use pwspush::metrics::{MetricsExposition, PushMetrics};
use pwspush::params::ReadingSet;
use pwspush::station::Station;
use pwspush::transport::{HyperTransport, Transport};
use serde::Deserialize;
use std::error::Error;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::{io, process};
use tokio::signal::unix::{self, SignalKind};
use tokio::task;
use tracing::{Instrument, Level};

const DEFAULT_SOFTWARE_TYPE: &str = concat!("pwspush/", env!("CARGO_PKG_VERSION"));
const DEFAULT_PUSH_SECS: u64 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 9783);

/// Push personal weather station readings to Weather Underground
///
/// Read the current readings of a personal weather station from a JSON file at
/// an interval and send them to the Weather Underground update API. The file is
/// expected to be kept up to date by some other process reading the sensors of
/// the station.
///
/// Readings may use `tempc`, `indoortempc`, and `barohpa` for values in celsius and
/// hectopascals, these are converted before being sent. Prometheus metrics about
/// updates and pushes are exposed at `/metrics`.
#[derive(Debug, Parser)]
#[clap(name = "pwspush", version = clap::crate_version!())]
struct PwspushApplication {
    /// Weather Underground station ID
    #[clap(long)]
    station_id: String,

    /// Weather Underground station key (password)
    #[clap(long, env = "PWSPUSH_PASSWORD", hide_env_values = true)]
    password: String,

    /// Name of the software reported to Weather Underground with each update
    #[clap(long, default_value = DEFAULT_SOFTWARE_TYPE)]
    software_type: String,

    /// Compute the dewpoint from temperature and humidity readings and send it in
    /// place of any dewpoint reading
    #[clap(long)]
    calculate_dewpoint: bool,

    /// JSON file with current readings, re-read before each push
    #[clap(long)]
    readings: PathBuf,

    /// Push readings at this interval, in seconds
    #[clap(long, default_value_t = DEFAULT_PUSH_SECS)]
    push_secs: u64,

    /// Give up on a push after this many seconds
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Push readings a single time and exit instead of pushing at an interval
    #[clap(long)]
    once: bool,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Address to bind to for exposing Prometheus metrics
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

/// Contents of the readings file
#[derive(Debug, Deserialize)]
struct ReadingsFile {
    /// Time of the readings, UTC, `YYYY-MM-DD HH:MM:SS`. Current time if missing.
    #[serde(default)]
    date: Option<String>,
    readings: ReadingSet,
}

async fn load_readings(path: &Path) -> Result<ReadingsFile, Box<dyn Error + Send + Sync>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Replace readings of the station with the contents of the readings file and push
/// them, recording the result of each step.
async fn push_cycle<T>(
    station: &Station,
    transport: &T,
    metrics: &PushMetrics,
    path: &Path,
) -> Result<String, Box<dyn Error + Send + Sync>>
where
    T: Transport,
{
    let file = load_readings(path).await?;

    let res = station.update_weather(file.readings);
    metrics.record_update(&res);
    res?;

    let res = station.push_update(transport, file.date.as_deref()).await;
    metrics.record_push(&res);
    Ok(res?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = PwspushApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    if opts.push_secs == 0 {
        tracing::error!(message = "push interval must be at least one second", push_secs = opts.push_secs);
        process::exit(1);
    }

    let station = Arc::new(Station::new(
        opts.station_id.clone(),
        opts.password.clone(),
        opts.software_type.clone(),
        opts.calculate_dewpoint,
    ));
    let transport = HyperTransport::new(Duration::from_secs(opts.timeout_secs));

    let registry = Registry::new();
    #[cfg(target_os = "linux")]
    registry
        .register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))
        .unwrap_or_else(|e| {
            tracing::error!(message = "failed to register process metric collector", error = %e);
            process::exit(1)
        });

    let metrics = PushMetrics::new(&registry).unwrap_or_else(|e| {
        tracing::error!(message = "failed to register push metrics", error = %e);
        process::exit(1)
    });

    if opts.once {
        return match push_cycle(&station, &transport, &metrics, &opts.readings).await {
            Ok(status) => {
                tracing::info!(message = "pushed station readings", station = %station.id(), status = %status);
                Ok(())
            }
            Err(e) => {
                tracing::error!(message = "failed to push station readings", path = %opts.readings.display(), error = %e);
                process::exit(1)
            }
        };
    }

    // Periodically read the readings file and push whatever it contains.
    let path = opts.readings.clone();
    let push_secs = opts.push_secs;
    let push_station = station.clone();
    task::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(push_secs));

        loop {
            let _ = interval.tick().await;

            match push_cycle(&push_station, &transport, &metrics, &path)
                .instrument(tracing::span!(Level::DEBUG, "push_cycle"))
                .await
            {
                Ok(status) => {
                    tracing::info!(message = "pushed station readings", station = %push_station.id(), status = %status)
                }
                Err(e) => {
                    tracing::error!(message = "failed to push station readings", path = %path.display(), error = %e)
                }
            }
        }
    });

    let context = Arc::new(RequestContext::new(MetricsExposition::new(registry)));
    let service = make_service_fn(move |_| {
        let context = context.clone();

        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                http_route(req, context.clone()).instrument(tracing::span!(Level::DEBUG, "pwspush_request"))
            }))
        }
    });

    let server = Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error starting server", address = %opts.bind, err = %e);
        process::exit(1)
    });

    tracing::info!(
        message = "starting server",
        address = %opts.bind,
        station = %station,
        push_secs = opts.push_secs,
    );

    server
        .serve(service)
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
