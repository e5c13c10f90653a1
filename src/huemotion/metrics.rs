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

use crate::bridge::{FetchError, SensorFetcher};
use crate::mapper::{MetricKey, RoomMetricSet, SensorMapper, UnknownSensorSet};
use prometheus::core::Collector;
use prometheus::proto::{MetricFamily, MetricType};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{event, span, Instrument, Level};

/// Help text and type of a metric exported for each room. All of them are gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub key: MetricKey,
    pub help: &'static str,
    pub kind: MetricType,
}

pub static DESCRIPTORS: [MetricDescriptor; 5] = [
    MetricDescriptor {
        key: MetricKey::Battery,
        help: "Remaining battery in percent",
        kind: MetricType::GAUGE,
    },
    MetricDescriptor {
        key: MetricKey::LightLevel,
        help: "Light level as 10000 * log10(lux) + 1",
        kind: MetricType::GAUGE,
    },
    MetricDescriptor {
        key: MetricKey::Presence,
        help: "Presence detected (1: yes, 0: no)",
        kind: MetricType::GAUGE,
    },
    MetricDescriptor {
        key: MetricKey::State,
        help: "Sensor state (1: on, 0: off)",
        kind: MetricType::GAUGE,
    },
    MetricDescriptor {
        key: MetricKey::Temperature,
        help: "Temperature in hundredths of a degree celsius",
        kind: MetricType::GAUGE,
    },
];

pub fn descriptor(key: MetricKey) -> &'static MetricDescriptor {
    let index = match key {
        MetricKey::Battery => 0,
        MetricKey::LightLevel => 1,
        MetricKey::Presence => 2,
        MetricKey::State => 3,
        MetricKey::Temperature => 4,
    };

    &DESCRIPTORS[index]
}

/// Read sensors from the bridge on each scrape and turn them into per-room gauges.
///
/// Nothing about a collection is kept between scrapes except the counters describing
/// the exporter itself, so concurrent scrapes don't interfere with each other.
pub struct SensorMetrics {
    fetcher: SensorFetcher,
    mapper: SensorMapper,
    job: String,
    collections: IntCounter,
    errors: IntCounterVec,
    unknown: IntGauge,
}

impl SensorMetrics {
    pub fn new<S: Into<String>>(fetcher: SensorFetcher, mapper: SensorMapper, job: S) -> Self {
        let collections = IntCounter::new(
            "hue_motion_sensor_exporter_collections_total",
            "Number of attempted reads of the bridge sensors",
        )
        .expect("unable to declare collections counter");

        let errors = IntCounterVec::new(
            Opts::new(
                "hue_motion_sensor_exporter_errors_total",
                "Number of failed reads of the bridge sensors by type",
            ),
            &["kind"],
        )
        .expect("unable to declare errors counter");

        let unknown = IntGauge::new(
            "hue_motion_sensor_exporter_unknown_sensors",
            "Number of motion sensors without a room during the last read",
        )
        .expect("unable to declare unknown sensors gauge");

        Self {
            fetcher,
            mapper,
            job: job.into(),
            collections,
            errors,
            unknown,
        }
    }

    /// Register metrics about the exporter itself with the given registry.
    pub fn register(&self, reg: &Registry) -> prometheus::Result<()> {
        reg.register(Box::new(self.collections.clone()))?;
        reg.register(Box::new(self.errors.clone()))?;
        reg.register(Box::new(self.unknown.clone()))
    }

    /// Fetch sensors from the bridge and render gauges for every room, returning an
    /// error if the bridge couldn't be read.
    pub async fn collect(&self) -> Result<Vec<MetricFamily>, FetchError> {
        self.collections.inc();

        let records = match self.fetcher.fetch().await {
            Ok(records) => records,
            Err(e) => {
                self.errors.with_label_values(&[e.kind().as_label()]).inc();
                event!(
                    Level::ERROR,
                    message = "unable to read sensors for metric collection",
                    address = %self.fetcher.endpoint(),
                    error = %e,
                );

                return Err(e);
            }
        };

        let mapping = self.mapper.map(&records);
        self.unknown.set(mapping.unknown.len() as i64);
        log_unknown(&mapping.unknown);

        event!(
            Level::DEBUG,
            message = "mapped sensors to rooms",
            rooms = ?mapping.rooms,
        );

        Ok(render(&self.job, &mapping.rooms))
    }
}

fn log_unknown(unknown: &UnknownSensorSet) {
    for uniqueid in unknown {
        event!(
            Level::INFO,
            message = "unknown sensor, add it to the room table to export its readings",
            uniqueid = %uniqueid,
            syntax = %format!("--sensor '{}=Room Name'", uniqueid),
        );
    }
}

fn sensor_gauge(key: MetricKey) -> IntGaugeVec {
    IntGaugeVec::new(Opts::new(key.metric_name(), descriptor(key).help), &["job", "room"])
        .expect("unable to declare sensor gauge")
}

/// Turn per-room values into one metric family per key, with a sample for each room
/// labeled by the job and room name.
pub fn render(job: &str, rooms: &RoomMetricSet) -> Vec<MetricFamily> {
    let mut gauges: BTreeMap<MetricKey, IntGaugeVec> = BTreeMap::new();

    for (room, values) in rooms {
        for (key, value) in values {
            gauges
                .entry(*key)
                .or_insert_with(|| sensor_gauge(*key))
                .with_label_values(&[job, room.as_str()])
                .set(*value);
        }
    }

    gauges.values().flat_map(|g| g.collect()).collect()
}

/// Error exposing Prometheus metrics in the text exposition format.
#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unable to encode Prometheus metrics: {0}")]
    Encoding(#[source] prometheus::Error),
}

/// Wrapper that exposes sensor metrics and metrics from a Prometheus registry in the
/// text exposition format.
pub struct MetricsExposition {
    registry: Registry,
    sensors: SensorMetrics,
}

impl MetricsExposition {
    pub fn new(registry: Registry, sensors: SensorMetrics) -> Self {
        Self { registry, sensors }
    }

    /// Read sensors from the bridge and encode them, along with everything in the registry,
    /// in the Prometheus text exposition format. No partial output is returned if the bridge
    /// can't be read.
    pub async fn encoded_text(&self) -> Result<Vec<u8>, ExpositionError> {
        let mut metric_families = self
            .sensors
            .collect()
            .instrument(span!(Level::DEBUG, "huemotion_collect"))
            .await?;
        metric_families.extend(self.registry.gather());

        event!(
            Level::DEBUG,
            message = "encoding metric families to text exposition format",
            num_metrics = metric_families.len(),
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(ExpositionError::Encoding)?;

        Ok(buffer)
    }
}
