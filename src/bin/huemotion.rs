// Huemotion - Hue motion sensor metrics exporter for Prometheus
//
// Copyright 2026 Nick Pillitteri
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

use chrono_tz::Tz;
use clap::Parser;
use huemotion::bridge::{
    http_client, BridgeAuthenticator, BridgeLocator, Credential, DiscoveryError, Endpoint, RegistrationError,
    SensorFetcher, DEFAULT_DISCOVERY_URL,
};
use huemotion::http::{http_route, RequestContext};
use huemotion::logging::{parse_timezone, ZonedTimer};
use huemotion::mapper::{RoomEntry, RoomTable, SensorMapper};
use huemotion::metrics::{MetricsExposition, SensorMetrics};
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use prometheus::Registry;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::signal::unix::{self, SignalKind};
use tracing::{event, span, Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_EXPORTER_NAME: &str = "hue-motion-sensor-exporter";
const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 8123;
const DEFAULT_TIMEZONE: &str = "Europe/Paris";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Expose Philips Hue motion sensor readings as Prometheus metrics
///
/// Read temperature, presence, light level, battery, and state of the motion sensors
/// paired with a Hue bridge each time metrics are scraped and expose them as Prometheus
/// gauges labeled by room. The bridge is found on the local network using the Hue
/// discovery service.
///
/// If no username for the bridge is provided, huemotion registers itself with the bridge
/// (press the link button when asked), logs the username issued, and exits.
#[derive(Debug, Parser)]
#[command(name = "huemotion", version = clap::crate_version!())]
struct HueMotionApplication {
    /// Username issued by the bridge. If not set, register with the bridge and exit
    #[arg(long, env = "HUE_USERNAME")]
    username: Option<String>,

    /// Value of the `job` label added to every sensor metric
    #[arg(long, env = "HUE_MOTION_SENSOR_EXPORTER_NAME", default_value = DEFAULT_EXPORTER_NAME)]
    exporter_name: String,

    /// Sensor unique ID (or the part shared by all sensors of a device) and the room it is
    /// in, as UNIQUEID=ROOM. May be repeated, or comma separated in the environment variable
    #[arg(long = "sensor", env = "HUE_MOTION_SENSORS", value_delimiter = ',')]
    sensors: Vec<RoomEntry>,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[arg(long, env = "HUE_MOTION_SENSOR_LOGLEVEL", default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timezone used for log timestamps
    #[arg(long, env = "TZ", default_value = DEFAULT_TIMEZONE, value_parser = parse_timezone)]
    timezone: Tz,

    /// Address to bind to. By default, huemotion will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[arg(long, env = "HUE_MOTION_SENSOR_EXPORTER_ADDRESS", default_value_t = DEFAULT_ADDRESS)]
    address: IpAddr,

    /// Port to bind to
    #[arg(long, env = "HUE_MOTION_SENSOR_EXPORTER_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Verify the TLS certificate of the bridge. Bridges use a self-signed certificate
    #[arg(
        long,
        env = "HUE_MOTION_SENSOR_EXPORTER_TLS_VERIFY",
        value_parser = clap::builder::BoolishValueParser::new(),
    )]
    tls_verify: bool,

    /// URL of the service used to find the bridge on the local network
    #[arg(long, env = "HUE_DISCOVERY_URL", default_value = DEFAULT_DISCOVERY_URL)]
    discovery_url: String,

    /// Timeout for each request to the bridge or discovery service, in seconds
    #[arg(
        long,
        env = "HUE_MOTION_SENSOR_EXPORTER_TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    timeout_secs: u64,

    /// Give up registering after this many attempts while waiting for the link button
    /// to be pressed. Retry forever if not set
    #[arg(
        long,
        env = "HUE_MOTION_SENSOR_EXPORTER_LINK_ATTEMPTS",
        value_parser = clap::value_parser!(u32).range(1..),
    )]
    link_attempts: Option<u32>,
}

/// Error starting or running the exporter
#[derive(Debug, Error)]
enum StartupError {
    #[error("unable to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("unable to find bridge: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("unable to register with bridge: {0}")]
    Registration(#[from] RegistrationError),

    #[error("failed to register exporter metrics: {0}")]
    Metrics(#[source] prometheus::Error),

    #[error("server failed to start on {0}: {1}")]
    Bind(SocketAddr, #[source] hyper::Error),

    #[error("server error: {0}")]
    Server(#[source] hyper::Error),

    #[error("unable to listen for shutdown signals: {0}")]
    Signal(#[source] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = HueMotionApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_timer(ZonedTimer::new(opts.timezone))
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    match run(opts).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            event!(
                Level::ERROR,
                message = "exporter failed",
                error = %e,
            );

            ExitCode::FAILURE
        }
    }
}

async fn run(opts: HueMotionApplication) -> Result<(), StartupError> {
    let startup = Instant::now();
    let client = http_client(Duration::from_secs(opts.timeout_secs), opts.tls_verify).map_err(StartupError::Client)?;
    let endpoint = BridgeLocator::new(client.clone(), opts.discovery_url).locate().await?;

    let credential = match opts.username {
        Some(username) => Credential::from(username),
        None => return register(client, &endpoint, opts.link_attempts).await,
    };

    let table: RoomTable = opts.sensors.into_iter().collect();
    if table.is_empty() {
        event!(
            Level::WARN,
            message = "no sensors assigned to rooms, all sensors will be reported as unknown",
        );
    }

    let num_rooms = table.len();
    let mapper = SensorMapper::new(table);
    let fetcher = SensorFetcher::new(client, endpoint.clone(), credential);
    let sensors = SensorMetrics::new(fetcher, mapper, opts.exporter_name);

    let registry = Registry::new();
    sensors.register(&registry).map_err(StartupError::Metrics)?;

    let context = Arc::new(RequestContext::new(MetricsExposition::new(registry, sensors)));
    let service = make_service_fn(move |_| {
        let context = context.clone();

        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                http_route(req, context.clone()).instrument(span!(Level::DEBUG, "huemotion_request"))
            }))
        }
    });

    let bind = SocketAddr::new(opts.address, opts.port);
    let server = Server::try_bind(&bind).map_err(|e| StartupError::Bind(bind, e))?;

    event!(
        Level::INFO,
        message = "server started",
        address = %bind,
        bridge = %endpoint,
        num_sensor_entries = num_rooms,
    );

    server
        .serve(service)
        .with_graceful_shutdown(async {
            if let Err(e) = shutdown().await {
                event!(
                    Level::ERROR,
                    message = "unable to listen for shutdown signals, server will run until killed",
                    error = %e,
                );
                std::future::pending::<()>().await;
            }
        })
        .await
        .map_err(StartupError::Server)?;

    event!(
        Level::INFO,
        message = "server shutdown",
        runtime_secs = %startup.elapsed().as_secs(),
    );

    Ok(())
}

/// Register with the bridge and log the issued username so it can be provided the
/// next time the exporter starts. Metrics are not served.
async fn register(
    client: reqwest::Client,
    endpoint: &Endpoint,
    link_attempts: Option<u32>,
) -> Result<(), StartupError> {
    let authenticator = BridgeAuthenticator::new(client).with_max_attempts(link_attempts);
    register_until(&authenticator, endpoint, shutdown()).await
}

/// Register with the bridge unless `cancel` completes first. Failing to wait for
/// cancellation is an error, not a cancellation.
async fn register_until<F>(
    authenticator: &BridgeAuthenticator,
    endpoint: &Endpoint,
    cancel: F,
) -> Result<(), StartupError>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        res = authenticator.ensure_credential(endpoint) => {
            let credential = res?;
            event!(
                Level::INFO,
                message = "set the HUE_USERNAME environment variable to the issued username and restart, exiting",
                username = %credential,
            );
        }
        res = cancel => {
            res.map_err(StartupError::Signal)?;
            event!(Level::INFO, message = "registration cancelled");
        }
    }

    Ok(())
}

/// Return after the first SIGTERM or SIGINT signal received by this process
async fn shutdown() -> io::Result<()> {
    tokio::select! {
        res = sigterm() => res,
        res = sigint() => res,
    }
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

#[cfg(test)]
mod test {
    use super::{register_until, StartupError};
    use huemotion::bridge::{BridgeAuthenticator, Endpoint};
    use std::io;
    use tokio::net::TcpListener;

    /// Endpoint that accepts connections but never answers, so registration never finishes
    async fn silent_bridge() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", port))
    }

    #[tokio::test]
    async fn test_register_until_cancelled() {
        let (_listener, endpoint) = silent_bridge().await;
        let authenticator = BridgeAuthenticator::new(reqwest::Client::new());

        let res = register_until(&authenticator, &endpoint, async { Ok(()) }).await;

        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn test_register_until_signal_error() {
        let (_listener, endpoint) = silent_bridge().await;
        let authenticator = BridgeAuthenticator::new(reqwest::Client::new());

        let res = register_until(&authenticator, &endpoint, async {
            Err(io::Error::new(io::ErrorKind::Other, "no signal handler"))
        })
        .await;

        assert!(matches!(res, Err(StartupError::Signal(_))));
    }
}
