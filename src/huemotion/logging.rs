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

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Log timestamp formatter that renders the current time in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct ZonedTimer {
    tz: Tz,
}

impl ZonedTimer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timestamp(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format(TIMESTAMP_FORMAT).to_string()
    }
}

impl FormatTime for ZonedTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        w.write_str(&self.timestamp(Utc::now()))
    }
}

/// Parse an IANA timezone name such as `Europe/Paris`.
pub fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| format!("invalid timezone '{}': {}", s, e))
}
