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

#![cfg(test)]

use crate::bridge::{http_client, Endpoint};
use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const SENSORS_BODY: &str = r#"{
    "1": {
        "state": {"daylight": false, "lastupdated": "2024-01-01T10:00:00"},
        "config": {"on": true, "configured": true},
        "name": "Daylight",
        "type": "Daylight",
        "modelid": "PHDL00"
    },
    "4": {
        "state": {"presence": true, "lastupdated": "2024-01-01T10:00:00"},
        "config": {"on": true, "battery": 87, "reachable": true},
        "name": "Living room sensor",
        "type": "ZLLPresence",
        "uniqueid": "00:17:88:01:04:b6:e5:df-02-0406"
    },
    "5": {
        "state": {"lightlevel": 14002, "dark": false, "daylight": false},
        "config": {"on": true, "battery": 87, "reachable": true},
        "name": "Hue ambient light sensor 1",
        "type": "ZLLLightLevel",
        "uniqueid": "00:17:88:01:04:b6:e5:df-02-0400"
    },
    "6": {
        "state": {"temperature": 2150},
        "config": {"on": true, "battery": 87, "reachable": true},
        "name": "Hue temperature sensor 1",
        "type": "ZLLTemperature",
        "uniqueid": "00:17:88:01:04:b6:e5:df-02-0402"
    },
    "9": {
        "state": {"temperature": 1800},
        "config": {"on": false, "battery": 40, "reachable": true},
        "name": "Hue temperature sensor 2",
        "type": "ZLLTemperature",
        "uniqueid": "00:17:88:01:08:aa:bb:cc-02-0402"
    }
}"#;

type Handler = dyn Fn(&Method, &str, usize) -> (StatusCode, String) + Send + Sync;

/// Bridge (or discovery service) running on a loopback port that responds to each
/// request with whatever the provided handler returns. The handler is given the method,
/// path, and zero-based index of the request.
pub(crate) struct FakeBridge {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl FakeBridge {
    pub(crate) async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Method, &str, usize) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let handler: Arc<Handler> = Arc::new(handler);
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        let service = make_service_fn(move |_| {
            let handler = handler.clone();
            let counter = counter.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    let (status, body) = (*handler)(req.method(), req.uri().path(), index);

                    async move {
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header(CONTENT_TYPE, "application/json")
                                .body(Body::from(body))
                                .unwrap(),
                        )
                    }
                }))
            }
        });

        let server = Server::bind(&([127, 0, 0, 1], 0).into()).serve(service);
        let addr = server.local_addr();
        tokio::spawn(server);

        Self { addr, requests }
    }

    /// Bridge that always responds with the same status and body.
    pub(crate) async fn fixed(status: StatusCode, body: &str) -> Self {
        let body = body.to_owned();
        Self::start(move |_, _, _| (status, body.clone())).await
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.addr.ip().to_string(), self.addr.port())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub(crate) fn test_client() -> reqwest::Client {
    http_client(Duration::from_secs(5), false).unwrap()
}
