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

use crate::bridge::core::{ApiResponse, Credential, Endpoint, ErrorKind};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{event, Level};

/// Type of a sensor as reported by the bridge.
///
/// A single Hue motion sensor shows up as three logical sensors: one each for
/// temperature, presence, and light level. Everything else the bridge knows about
/// (daylight, switches, generic CLIP sensors) is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Presence,
    LightLevel,
    Other(String),
}

impl From<String> for SensorKind {
    fn from(v: String) -> Self {
        match v.as_str() {
            "ZLLTemperature" => SensorKind::Temperature,
            "ZLLPresence" => SensorKind::Presence,
            "ZLLLightLevel" => SensorKind::LightLevel,
            _ => SensorKind::Other(v),
        }
    }
}

/// Type specific readings of a sensor. Only the fields used by motion sensors are parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorState {
    /// Hundredths of a degree celsius
    pub temperature: Option<i64>,
    pub presence: Option<bool>,
    /// `10000 * log10(lux) + 1`
    pub lightlevel: Option<i64>,
}

/// Configuration shared by all sensor types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorConfig {
    /// Percent
    pub battery: Option<i64>,
    pub on: Option<bool>,
    pub reachable: Option<bool>,
}

/// One sensor from the bridge sensor listing.
///
/// `state` and `config` are only read for motion sensor types and are left empty
/// for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSensorRecord {
    pub kind: SensorKind,
    pub name: Option<String>,
    pub uniqueid: Option<String>,
    pub state: SensorState,
    pub config: SensorConfig,
}

impl RawSensorRecord {
    /// Decode a single entry of the listing. Returns `None` if the entry has no type.
    ///
    /// Values of the wrong type are dropped individually so that one odd sensor can't
    /// prevent the others from being read. Fractional numbers are truncated.
    fn from_value(index: &str, value: &Value) -> Option<Self> {
        let kind = match value.get("type").and_then(Value::as_str) {
            Some(t) => SensorKind::from(t.to_owned()),
            None => {
                event!(
                    Level::DEBUG,
                    message = "skipping sensor without a type",
                    index = index,
                );
                return None;
            }
        };

        let name = value.get("name").and_then(Value::as_str).map(str::to_owned);
        let uniqueid = value.get("uniqueid").and_then(Value::as_str).map(str::to_owned);

        if let SensorKind::Other(_) = kind {
            return Some(Self {
                kind,
                name,
                uniqueid,
                state: SensorState::default(),
                config: SensorConfig::default(),
            });
        }

        let state = Section::new(index, "state", value);
        let config = Section::new(index, "config", value);

        Some(Self {
            kind,
            name,
            uniqueid,
            state: SensorState {
                temperature: state.integer("temperature"),
                presence: state.boolean("presence"),
                lightlevel: state.integer("lightlevel"),
            },
            config: SensorConfig {
                battery: config.integer("battery"),
                on: config.boolean("on"),
                reachable: config.boolean("reachable"),
            },
        })
    }
}

/// `state` or `config` object of a listing entry
struct Section<'a> {
    index: &'a str,
    name: &'static str,
    value: Option<&'a Value>,
}

impl<'a> Section<'a> {
    fn new(index: &'a str, name: &'static str, record: &'a Value) -> Self {
        Self {
            index,
            name,
            value: record.get(name),
        }
    }

    fn field(&self, field: &str) -> Option<&'a Value> {
        self.value.and_then(|v| v.get(field))
    }

    fn integer(&self, field: &str) -> Option<i64> {
        match self.field(field)? {
            Value::Null => None,
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            other => {
                self.invalid(field, other);
                None
            }
        }
    }

    fn boolean(&self, field: &str) -> Option<bool> {
        match self.field(field)? {
            Value::Null => None,
            Value::Bool(b) => Some(*b),
            other => {
                self.invalid(field, other);
                None
            }
        }
    }

    fn invalid(&self, field: &str, value: &Value) {
        event!(
            Level::WARN,
            message = "ignoring sensor value of unexpected type",
            index = self.index,
            section = self.name,
            field = field,
            value = %value,
        );
    }
}

/// Error reading the sensor listing from the bridge
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to read sensors from bridge: {0}")]
    Request(#[source] reqwest::Error),

    #[error("bridge returned status {0} reading sensors")]
    Status(StatusCode),

    #[error("unable to parse sensor listing: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("bridge returned an error reading sensors: {0}")]
    Bridge(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Request(e) => ErrorKind::from_request(e),
            FetchError::Status(_) => ErrorKind::Status,
            FetchError::Parse(_) => ErrorKind::Body,
            FetchError::Bridge(_) => ErrorKind::Bridge,
        }
    }
}

/// Read all sensors known to a bridge.
#[derive(Debug, Clone)]
pub struct SensorFetcher {
    client: Client,
    endpoint: Endpoint,
    credential: Credential,
}

impl SensorFetcher {
    pub fn new(client: Client, endpoint: Endpoint, credential: Credential) -> Self {
        Self {
            client,
            endpoint,
            credential,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Fetch every sensor from the bridge, ordered by the index the bridge assigned it.
    pub async fn fetch(&self) -> Result<Vec<RawSensorRecord>, FetchError> {
        let url = format!("{}/{}/sensors", self.endpoint.api_url(), self.credential.as_str());
        let res = self.client.get(url).send().await.map_err(FetchError::Request)?;

        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }

        let body = res.bytes().await.map_err(FetchError::Request)?;
        let records = parse_listing(&body)?;

        event!(
            Level::DEBUG,
            message = "fetched sensors from bridge",
            address = %self.endpoint,
            num_sensors = records.len(),
        );

        Ok(records)
    }
}

/// Parse the body of a sensor listing.
///
/// On success the bridge returns an object keyed by sensor index. When something is wrong
/// (an unknown username, for example) it returns a list of errors with a 200 status instead.
fn parse_listing(body: &[u8]) -> Result<Vec<RawSensorRecord>, FetchError> {
    let value: Value = serde_json::from_slice(body).map_err(FetchError::Parse)?;

    if value.is_array() {
        let results: Vec<ApiResponse<Value>> = serde_json::from_value(value).map_err(FetchError::Parse)?;
        let description = results
            .into_iter()
            .find_map(|r| match r {
                ApiResponse::Error(e) => Some(e.description),
                ApiResponse::Success(_) => None,
            })
            .unwrap_or_else(|| "unexpected list response".to_owned());

        return Err(FetchError::Bridge(description));
    }

    let listing: HashMap<String, Value> = serde_json::from_value(value).map_err(FetchError::Parse)?;
    let mut entries: Vec<(String, Value)> = listing.into_iter().collect();
    entries.sort_by_key(|(index, _)| (index.parse::<u64>().unwrap_or(u64::MAX), index.clone()));

    Ok(entries
        .iter()
        .filter_map(|(index, entry)| RawSensorRecord::from_value(index, entry))
        .collect())
}
