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

use serde::Deserialize;
use std::fmt::{self, Formatter};
use std::time::Duration;

/// Network location of a bridge on the local network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bridges only serve TLS on port 443, any other port is plaintext.
    pub fn scheme(&self) -> &'static str {
        if self.port == 443 {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL of the bridge API, e.g. `https://192.168.1.20/api`. The port is only
    /// included when it isn't the default for the scheme.
    pub fn api_url(&self) -> String {
        match self.port {
            80 | 443 => format!("{}://{}/api", self.scheme(), self.host),
            port => format!("{}://{}:{}/api", self.scheme(), self.host, port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// API username issued by a bridge once the link button has been pressed.
///
/// The `Debug` implementation doesn't include the value so that credentials don't end
/// up in logs by accident. Use `Display` when the value needs to be shown to an operator.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Credential {
    fn from(v: String) -> Self {
        Self(v)
    }
}

impl From<&str> for Credential {
    fn from(v: &str) -> Self {
        Self(v.to_owned())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Potential kinds of errors that can be encountered talking to the bridge
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Status,
    Body,
    Bridge,
}

impl ErrorKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Status => "status",
            ErrorKind::Body => "body",
            ErrorKind::Bridge => "bridge",
        }
    }

    pub(crate) fn from_request(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            ErrorKind::Timeout
        } else if e.is_decode() || e.is_body() {
            ErrorKind::Body
        } else if e.is_status() {
            ErrorKind::Status
        } else {
            ErrorKind::Connection
        }
    }
}

/// Error object returned by the bridge API in place of a result
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub kind: u32,
    #[serde(default)]
    pub address: String,
    pub description: String,
}

/// One element of the result list the bridge returns for API calls that fail or
/// that create resources.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success(T),
    Error(ApiError),
}

/// Build the HTTP client used for every request to the bridge and the discovery service.
///
/// Bridges use a self-signed certificate so verification is usually disabled.
pub fn http_client(timeout: Duration, tls_verify: bool) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!tls_verify)
        .build()
}
