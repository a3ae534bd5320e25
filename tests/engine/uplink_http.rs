use std::time::Duration;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kioskd::device::TelemetryUplink;
use kioskd::emergency::{LocationProvider, LocationSample};
use kioskd::uplink::HttpUplink;

fn sample() -> LocationSample {
    LocationSample::new(52.5, 13.4, LocationProvider::Gps, 1_700_000_000_000)
}

#[tokio::test]
async fn posts_batch_to_device_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/public/locations/district-3/tab-07"))
        .and(body_json(json!([
            { "ts": 1_700_000_000_000_i64, "lat": 52.5, "lon": 13.4 }
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let uplink = HttpUplink::new(&server.uri(), Duration::from_secs(5)).unwrap();
    assert_ok!(
        uplink
            .send_locations("district-3", "tab-07", &[sample()])
            .await
    );
}

#[tokio::test]
async fn server_error_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let uplink = HttpUplink::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = assert_err!(uplink.send_locations("p", "d", &[sample()]).await);
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("maintenance"));
}
