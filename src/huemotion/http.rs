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

use crate::metrics::MetricsExposition;
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LOCATION, PRAGMA, X_CONTENT_TYPE_OPTIONS};
use hyper::{Body, Method, Request, Response, StatusCode};
use prometheus::TEXT_FORMAT;
use std::sync::Arc;
use tracing::{event, Level};

/// Global state shared between all HTTP requests via Arc.
pub struct RequestContext {
    exposition: MetricsExposition,
}

impl RequestContext {
    pub fn new(exposition: MetricsExposition) -> Self {
        RequestContext { exposition }
    }
}

/// Route a request to `/metrics` (the bridge is read for each `GET`), `/` (redirect to
/// `/metrics`), or `/favicon.ico` (empty). Everything else is a 404.
pub async fn http_route(req: Request<Body>, context: Arc<RequestContext>) -> Result<Response<Body>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let res = match (&method, path.as_ref()) {
        (&Method::GET, "/metrics") => match context.exposition.encoded_text().await {
            Ok(buffer) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, TEXT_FORMAT)
                .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate, max-age=0")
                .header(PRAGMA, "no-cache")
                .header(EXPIRES, "0")
                .header(X_CONTENT_TYPE_OPTIONS, "nosniff")
                .body(Body::from(buffer))
                .unwrap(),
            Err(e) => {
                event!(
                    Level::ERROR,
                    message = "error scraping metrics",
                    error = %e,
                );

                http_status_no_body(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },

        (_, "/metrics") => http_status_no_body(StatusCode::METHOD_NOT_ALLOWED),

        (&Method::GET, "/") => Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(LOCATION, "/metrics")
            .body(Body::empty())
            .unwrap(),

        (&Method::GET, "/favicon.ico") => http_status_no_body(StatusCode::OK),

        _ => http_status_no_body(StatusCode::NOT_FOUND),
    };

    Ok(res)
}

fn http_status_no_body(code: StatusCode) -> Response<Body> {
    Response::builder().status(code).body(Body::empty()).unwrap()
}

#[cfg(test)]
mod test {
    use super::{http_route, RequestContext};
    use crate::bridge::{Credential, Endpoint, SensorFetcher};
    use crate::mapper::{RoomEntry, RoomTable, SensorMapper};
    use crate::metrics::{MetricsExposition, SensorMetrics};
    use crate::test::{test_client, FakeBridge, SENSORS_BODY};
    use hyper::header::{CACHE_CONTROL, LOCATION};
    use hyper::{Body, Method, Request, StatusCode};
    use prometheus::Registry;
    use std::sync::Arc;

    fn context(endpoint: Endpoint) -> Arc<RequestContext> {
        let fetcher = SensorFetcher::new(test_client(), endpoint, Credential::from("abc123"));
        let mapper = SensorMapper::new(RoomTable::new(vec![RoomEntry::new(
            "00:17:88:01:04:b6:e5:df-02",
            "Salon",
        )]));
        let sensors = SensorMetrics::new(fetcher, mapper, "hue-motion-sensor-exporter");
        let registry = Registry::new();
        sensors.register(&registry).unwrap();

        Arc::new(RequestContext::new(MetricsExposition::new(registry, sensors)))
    }

    fn unused_context() -> Arc<RequestContext> {
        context(Endpoint::new("127.0.0.1", 1))
    }

    fn request(method: Method, path: &str) -> Request<Body> {
        Request::builder().method(method).uri(path).body(Body::empty()).unwrap()
    }

    async fn body_text(res: hyper::Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_root_redirects() {
        let res = http_route(request(Method::GET, "/"), unused_context()).await.unwrap();

        assert_eq!(StatusCode::MOVED_PERMANENTLY, res.status());
        assert_eq!("/metrics", res.headers()[LOCATION]);
    }

    #[tokio::test]
    async fn test_favicon() {
        let res = http_route(request(Method::GET, "/favicon.ico"), unused_context())
            .await
            .unwrap();

        assert_eq!(StatusCode::OK, res.status());
    }

    #[tokio::test]
    async fn test_not_found() {
        let res = http_route(request(Method::GET, "/api"), unused_context()).await.unwrap();

        assert_eq!(StatusCode::NOT_FOUND, res.status());
    }

    #[tokio::test]
    async fn test_metrics_method_not_allowed() {
        let res = http_route(request(Method::POST, "/metrics"), unused_context())
            .await
            .unwrap();

        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, res.status());
    }

    #[tokio::test]
    async fn test_metrics_success() {
        let bridge = FakeBridge::fixed(StatusCode::OK, SENSORS_BODY).await;

        let res = http_route(request(Method::GET, "/metrics"), context(bridge.endpoint()))
            .await
            .unwrap();

        assert_eq!(StatusCode::OK, res.status());
        assert_eq!(
            "no-cache, no-store, must-revalidate, max-age=0",
            res.headers()[CACHE_CONTROL]
        );
        let text = body_text(res).await;
        assert!(text.contains(r#"hue_motion_sensor_temperature{job="hue-motion-sensor-exporter",room="Salon"} 2150"#));
    }

    #[tokio::test]
    async fn test_metrics_fetch_failure_then_recovery() {
        let bridge = FakeBridge::start(|_, _, i| {
            if i == 0 {
                (StatusCode::SERVICE_UNAVAILABLE, "".to_owned())
            } else {
                (StatusCode::OK, SENSORS_BODY.to_owned())
            }
        })
        .await;
        let ctx = context(bridge.endpoint());

        let failed = http_route(request(Method::GET, "/metrics"), ctx.clone()).await.unwrap();
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, failed.status());
        assert!(body_text(failed).await.is_empty());

        let recovered = http_route(request(Method::GET, "/metrics"), ctx).await.unwrap();
        assert_eq!(StatusCode::OK, recovered.status());
        let text = body_text(recovered).await;
        assert!(text.contains(r#"hue_motion_sensor_presence{job="hue-motion-sensor-exporter",room="Salon"} 1"#));
        assert!(text.contains(r#"hue_motion_sensor_exporter_errors_total{kind="status"} 1"#));
        assert!(text.contains("hue_motion_sensor_exporter_collections_total 2"));
    }

    fn sensor_lines(text: &str) -> Vec<&str> {
        text.lines()
            .filter(|l| l.starts_with("hue_motion_sensor_") && !l.starts_with("hue_motion_sensor_exporter_"))
            .collect()
    }

    #[tokio::test]
    async fn test_metrics_concurrent_scrapes() {
        let bridge = FakeBridge::fixed(StatusCode::OK, SENSORS_BODY).await;
        let ctx = context(bridge.endpoint());

        let (first, second) = tokio::join!(
            http_route(request(Method::GET, "/metrics"), ctx.clone()),
            http_route(request(Method::GET, "/metrics"), ctx.clone()),
        );
        let first = body_text(first.unwrap()).await;
        let second = body_text(second.unwrap()).await;

        assert_eq!(2, bridge.requests());
        assert_eq!(5, sensor_lines(&first).len());
        assert_eq!(sensor_lines(&first), sensor_lines(&second));
        assert!(first.contains(r#"hue_motion_sensor_battery{job="hue-motion-sensor-exporter",room="Salon"} 87"#));
    }
}
