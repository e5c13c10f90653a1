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

//! Export Philips Hue motion sensor readings as Prometheus metrics.
//!
//! ## Features
//!
//! Huemotion reads temperature, presence, light level, battery, and on/off state from the
//! motion sensors paired with a [Hue bridge](https://developers.meethue.com/) and exports
//! them as Prometheus metrics, one sample per room. The bridge is read each time the
//! exporter is scraped, not in the background.
//!
//! The following metrics are exported, each labeled with `job` and `room`:
//!
//! * `hue_motion_sensor_temperature` - Temperature in hundredths of a degree celsius.
//! * `hue_motion_sensor_presence` - Presence detected (1) or not (0).
//! * `hue_motion_sensor_lightlevel` - Light level as `10000 * log10(lux) + 1`.
//! * `hue_motion_sensor_battery` - Remaining battery in percent.
//! * `hue_motion_sensor_state` - Sensor enabled (1) or disabled (0).
//!
//! Metrics about the exporter itself are exported too:
//!
//! * `hue_motion_sensor_exporter_collections_total` - Total number of attempts to read the bridge.
//! * `hue_motion_sensor_exporter_errors_total` - Total errors by type while trying to read the bridge.
//! * `hue_motion_sensor_exporter_unknown_sensors` - Motion sensors not assigned to a room during the last read.
//!
//! ## Install
//!
//! ### Register
//!
//! The exporter needs a username issued by the bridge. Run it without `HUE_USERNAME` set and
//! press the link button on the bridge when asked. The issued username is logged and the
//! exporter exits.
//!
//! ```text
//! huemotion
//! ```
//!
//! ### Rooms
//!
//! Each physical motion sensor is reported by the bridge as three sensors that share the
//! first part of their unique ID. Assign rooms by that shared part. Sensors that aren't
//! assigned to a room are logged with their ID when the exporter is scraped.
//!
//! ```text
//! export HUE_USERNAME=83b7780291a6ceffbe0bd049104df
//! huemotion --sensor '00:17:88:01:04:b6:e5:df-02=Living room' --sensor '00:17:88:01:06:f4:a5:9b-02=Porch'
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `8123` at `/metrics`. Once `huemotion`
//! is running, configure scrapes of it by your Prometheus server. Add the host running
//! `huemotion` as a target under the Prometheus `scrape_configs` section as described by
//! the example below.
//!
//! ```yaml
//! # Sample config for Prometheus.
//!
//! global:
//!   scrape_interval:     1m
//!   evaluation_interval: 1m
//!   external_labels:
//!       monitor: 'my_prom'
//!
//! scrape_configs:
//!   - job_name: huemotion
//!     static_configs:
//!       - targets: ['example:8123']
//! ```
//!

pub mod bridge;
pub mod http;
pub mod logging;
pub mod mapper;
pub mod metrics;
mod test;
