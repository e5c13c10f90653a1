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

use crate::bridge::{RawSensorRecord, SensorKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Formatter};
use std::str::FromStr;
use thiserror::Error;
use tracing::{event, Level};

/// Length of the suffix that distinguishes the logical sensors of a single device,
/// e.g. `-0402` in `00:17:88:01:04:b6:e5:df-02-0402`.
const SUB_SENSOR_SUFFIX_LEN: usize = 5;

/// Per-room value exported for motion sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKey {
    Battery,
    LightLevel,
    Presence,
    State,
    Temperature,
}

impl MetricKey {
    pub const ALL: [MetricKey; 5] = [
        MetricKey::Battery,
        MetricKey::LightLevel,
        MetricKey::Presence,
        MetricKey::State,
        MetricKey::Temperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Battery => "battery",
            MetricKey::LightLevel => "lightlevel",
            MetricKey::Presence => "presence",
            MetricKey::State => "state",
            MetricKey::Temperature => "temperature",
        }
    }

    pub fn metric_name(&self) -> String {
        format!("hue_motion_sensor_{}", self.as_str())
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

pub type RoomMetrics = BTreeMap<MetricKey, i64>;

/// Values for each room, keyed by room name
pub type RoomMetricSet = BTreeMap<String, RoomMetrics>;

/// Sensor IDs (without sub-sensor suffix) that didn't match any room
pub type UnknownSensorSet = BTreeSet<String>;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid sensor entry '{0}', expected UNIQUEID=ROOM")]
pub struct RoomEntryError(String);

/// Association between a sensor unique ID (or a prefix of one) and a room name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEntry {
    uniqueid: String,
    room: String,
}

impl RoomEntry {
    pub fn new<S1, S2>(uniqueid: S1, room: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            uniqueid: uniqueid.into(),
            room: room.into(),
        }
    }

    pub fn uniqueid(&self) -> &str {
        &self.uniqueid
    }

    pub fn room(&self) -> &str {
        &self.room
    }
}

impl FromStr for RoomEntry {
    type Err = RoomEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((id, room)) if !id.trim().is_empty() && !room.trim().is_empty() => {
                Ok(RoomEntry::new(id.trim(), room.trim()))
            }
            _ => Err(RoomEntryError(s.to_owned())),
        }
    }
}

/// Mapping of sensor unique IDs to room names, searched in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomTable {
    entries: Vec<RoomEntry>,
}

impl RoomTable {
    pub fn new(entries: Vec<RoomEntry>) -> Self {
        Self { entries }
    }

    /// Room of the first entry whose ID is contained in `uniqueid`, if any.
    ///
    /// Matching by containment lets a single entry for the MAC based part of an ID
    /// cover all three logical sensors of a physical device.
    pub fn room_for(&self, uniqueid: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| uniqueid.contains(e.uniqueid.as_str()))
            .map(|e| e.room.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RoomEntry> for RoomTable {
    fn from_iter<T: IntoIterator<Item = RoomEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of mapping a single sensor listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    pub rooms: RoomMetricSet,
    pub unknown: UnknownSensorSet,
}

/// Groups motion sensor readings by room.
///
/// Battery and on/off state are reported by each of the three logical sensors of a
/// device. They're written for every record in the order given, so when a room has more
/// than one device the last record processed determines the value.
#[derive(Debug, Clone)]
pub struct SensorMapper {
    table: RoomTable,
}

impl SensorMapper {
    pub fn new(table: RoomTable) -> Self {
        Self { table }
    }

    pub fn map(&self, records: &[RawSensorRecord]) -> Mapping {
        let mut mapping = Mapping::default();

        for record in records {
            let (key, value) = match &record.kind {
                SensorKind::Temperature => (MetricKey::Temperature, record.state.temperature),
                SensorKind::Presence => (MetricKey::Presence, record.state.presence.map(i64::from)),
                SensorKind::LightLevel => (MetricKey::LightLevel, record.state.lightlevel),
                SensorKind::Other(_) => continue,
            };

            let uniqueid = match record.uniqueid.as_deref() {
                Some(id) => id,
                None => {
                    event!(
                        Level::DEBUG,
                        message = "skipping sensor without unique ID",
                        name = ?record.name,
                    );
                    continue;
                }
            };

            let room = match self.table.room_for(uniqueid) {
                Some(room) => room,
                None => {
                    mapping.unknown.insert(without_suffix(uniqueid).to_owned());
                    continue;
                }
            };

            let values = mapping.rooms.entry(room.to_owned()).or_default();
            if let Some(v) = value {
                values.insert(key, v);
            }

            if let Some(battery) = record.config.battery {
                values.insert(MetricKey::Battery, battery);
            }

            if let Some(on) = record.config.on {
                values.insert(MetricKey::State, i64::from(on));
            }
        }

        mapping
    }
}

fn without_suffix(uniqueid: &str) -> &str {
    match uniqueid.char_indices().rev().nth(SUB_SENSOR_SUFFIX_LEN - 1) {
        Some((end, _)) => &uniqueid[..end],
        None => "",
    }
}
