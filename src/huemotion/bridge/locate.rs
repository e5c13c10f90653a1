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

use crate::bridge::core::Endpoint;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{event, Level};

pub const DEFAULT_DISCOVERY_URL: &str = "https://discovery.meethue.com";

const DEFAULT_BRIDGE_PORT: u16 = 443;

/// Error finding a bridge on the local network via the discovery service
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("unable to reach discovery service: {0}")]
    Request(#[source] reqwest::Error),

    #[error("discovery service returned status {0}")]
    Status(StatusCode),

    #[error("unable to parse discovery response: {0}")]
    Body(#[source] reqwest::Error),

    #[error("discovery service did not return any bridges")]
    NoBridges,

    #[error("discovery service returned a bridge without an address")]
    MissingAddress,
}

#[derive(Debug, Deserialize)]
struct DiscoveredBridge {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    internalipaddress: String,
    #[serde(default = "default_bridge_port")]
    port: u16,
}

fn default_bridge_port() -> u16 {
    DEFAULT_BRIDGE_PORT
}

/// Find the address of a bridge using the Hue discovery service.
///
/// The discovery service is queried exactly once per call to `locate`. Callers are
/// expected to decide whether a failure is worth retrying.
#[derive(Debug, Clone)]
pub struct BridgeLocator {
    client: Client,
    url: String,
}

impl BridgeLocator {
    pub fn new<S: Into<String>>(client: Client, url: S) -> Self {
        Self { client, url: url.into() }
    }

    /// Return the address of the first bridge reported by the discovery service.
    pub async fn locate(&self) -> Result<Endpoint, DiscoveryError> {
        let res = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(DiscoveryError::Request)?;

        if !res.status().is_success() {
            return Err(DiscoveryError::Status(res.status()));
        }

        let bridges: Vec<DiscoveredBridge> = res.json().await.map_err(DiscoveryError::Body)?;
        event!(
            Level::DEBUG,
            message = "bridges returned by discovery service",
            num_bridges = bridges.len(),
        );

        let bridge = bridges.into_iter().next().ok_or(DiscoveryError::NoBridges)?;
        if bridge.internalipaddress.is_empty() {
            return Err(DiscoveryError::MissingAddress);
        }

        let endpoint = Endpoint::new(bridge.internalipaddress, bridge.port);
        event!(
            Level::INFO,
            message = "discovered bridge",
            id = ?bridge.id,
            address = %endpoint,
        );

        Ok(endpoint)
    }
}

#[cfg(test)]
mod test {
    use super::{BridgeLocator, DiscoveryError};
    use crate::bridge::Endpoint;
    use crate::test::{test_client, FakeBridge};
    use hyper::StatusCode;

    #[tokio::test]
    async fn test_locate_first_bridge() {
        let body = r#"[
            {"id": "001788fffe6a2b3c", "internalipaddress": "192.168.1.20", "port": 443},
            {"id": "001788fffe6a2b3d", "internalipaddress": "192.168.1.21", "port": 443}
        ]"#;
        let discovery = FakeBridge::fixed(StatusCode::OK, body).await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let endpoint = locator.locate().await.unwrap();

        assert_eq!(Endpoint::new("192.168.1.20", 443), endpoint);
        assert_eq!("https", endpoint.scheme());
        assert_eq!(1, discovery.requests());
    }

    #[tokio::test]
    async fn test_locate_missing_port() {
        let body = r#"[{"id": "001788fffe6a2b3c", "internalipaddress": "192.168.1.20"}]"#;
        let discovery = FakeBridge::fixed(StatusCode::OK, body).await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let endpoint = locator.locate().await.unwrap();

        assert_eq!(443, endpoint.port());
    }

    #[tokio::test]
    async fn test_locate_plaintext_port() {
        let body = r#"[{"internalipaddress": "192.168.1.20", "port": 80}]"#;
        let discovery = FakeBridge::fixed(StatusCode::OK, body).await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let endpoint = locator.locate().await.unwrap();

        assert_eq!("http", endpoint.scheme());
    }

    #[tokio::test]
    async fn test_locate_no_bridges() {
        let discovery = FakeBridge::fixed(StatusCode::OK, "[]").await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let res = locator.locate().await;

        assert!(matches!(res, Err(DiscoveryError::NoBridges)));
    }

    #[tokio::test]
    async fn test_locate_missing_address() {
        let discovery = FakeBridge::fixed(StatusCode::OK, r#"[{"id": "abc", "port": 443}]"#).await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let res = locator.locate().await;

        assert!(matches!(res, Err(DiscoveryError::MissingAddress)));
    }

    #[tokio::test]
    async fn test_locate_malformed() {
        let discovery = FakeBridge::fixed(StatusCode::OK, r#"{"error": "rate limited"}"#).await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let res = locator.locate().await;

        assert!(matches!(res, Err(DiscoveryError::Body(_))));
    }

    #[tokio::test]
    async fn test_locate_error_status() {
        let discovery = FakeBridge::fixed(StatusCode::TOO_MANY_REQUESTS, "").await;
        let locator = BridgeLocator::new(test_client(), discovery.url("/"));

        let res = locator.locate().await;

        match res {
            Err(DiscoveryError::Status(status)) => assert_eq!(429, status.as_u16()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_locate_unreachable() {
        let locator = BridgeLocator::new(test_client(), "http://127.0.0.1:1/");

        let res = locator.locate().await;

        assert!(matches!(res, Err(DiscoveryError::Request(_))));
    }
}
