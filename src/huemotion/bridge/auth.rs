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

use crate::bridge::core::{ApiResponse, Credential, Endpoint};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{event, Level};

pub const APP_NAME: &str = "Hue Motion Sensors Prometheus Exporter";
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

const LINK_BUTTON_NOT_PRESSED: &str = "link button not pressed";

/// Error registering this exporter as an application on the bridge
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("unable to send registration request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("registration request returned status {0}")]
    Status(StatusCode),

    #[error("unable to parse registration response: {0}")]
    Body(#[source] reqwest::Error),

    #[error("registration response did not contain a result")]
    Empty,

    #[error("bridge rejected registration: {0}")]
    Rejected(String),

    #[error("link button was not pressed after {0} attempts")]
    LinkTimeout(u32),
}

/// Outcome of a single registration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered(Credential),
    AwaitingLinkPress,
}

#[derive(Debug, Serialize)]
struct RegistrationRequest<'a> {
    devicetype: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegistrationSuccess {
    username: String,
}

/// Obtain an API username from a bridge.
///
/// Bridges only issue a username within a short window after the physical link button
/// on the bridge has been pressed. Until then, each registration request is answered with
/// a "link button not pressed" error and `ensure_credential` waits and tries again. By
/// default it does so forever; use `with_max_attempts` to give up eventually.
#[derive(Debug, Clone)]
pub struct BridgeAuthenticator {
    client: Client,
    app_name: String,
    retry_interval: Duration,
    max_attempts: Option<u32>,
}

impl BridgeAuthenticator {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            app_name: APP_NAME.to_owned(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Send a single registration request to the bridge.
    pub async fn register(&self, endpoint: &Endpoint) -> Result<Registration, RegistrationError> {
        let req = RegistrationRequest {
            devicetype: &self.app_name,
        };

        let res = self
            .client
            .post(endpoint.api_url())
            .json(&req)
            .send()
            .await
            .map_err(RegistrationError::Request)?;

        if !res.status().is_success() {
            return Err(RegistrationError::Status(res.status()));
        }

        let results: Vec<ApiResponse<RegistrationSuccess>> = res.json().await.map_err(RegistrationError::Body)?;
        match results.into_iter().next() {
            Some(ApiResponse::Success(s)) => Ok(Registration::Registered(Credential::from(s.username))),
            Some(ApiResponse::Error(e)) if e.description == LINK_BUTTON_NOT_PRESSED => {
                Ok(Registration::AwaitingLinkPress)
            }
            Some(ApiResponse::Error(e)) => Err(RegistrationError::Rejected(e.description)),
            None => Err(RegistrationError::Empty),
        }
    }

    /// Register with the bridge, waiting for the link button to be pressed if needed.
    ///
    /// This blocks the calling task until the bridge issues a username, the bridge
    /// rejects the request for some other reason, or the configured number of attempts
    /// has been used up. Drop the future to cancel.
    pub async fn ensure_credential(&self, endpoint: &Endpoint) -> Result<Credential, RegistrationError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.register(endpoint).await? {
                Registration::Registered(credential) => {
                    event!(
                        Level::INFO,
                        message = "registered with bridge",
                        address = %endpoint,
                        attempts = attempts,
                    );

                    return Ok(credential);
                }
                Registration::AwaitingLinkPress => {
                    if let Some(max) = self.max_attempts {
                        if attempts >= max {
                            return Err(RegistrationError::LinkTimeout(attempts));
                        }
                    }

                    event!(
                        Level::INFO,
                        message = "press the link button on the bridge to allow registration",
                        address = %endpoint,
                        attempts = attempts,
                        retry_secs = self.retry_interval.as_secs_f64(),
                    );

                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}
