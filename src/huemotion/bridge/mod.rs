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

mod auth;
mod core;
mod locate;
mod sensors;

pub use crate::bridge::auth::{BridgeAuthenticator, Registration, RegistrationError, APP_NAME, DEFAULT_RETRY_INTERVAL};
pub use crate::bridge::core::{http_client, ApiError, ApiResponse, Credential, Endpoint, ErrorKind};
pub use crate::bridge::locate::{BridgeLocator, DiscoveryError, DEFAULT_DISCOVERY_URL};
pub use crate::bridge::sensors::{
    FetchError, RawSensorRecord, SensorConfig, SensorFetcher, SensorKind, SensorState,
};
