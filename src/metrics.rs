//! Prometheus metrics for the docchat pipeline.
//!
//! Exposes:
//! - `docchat_stage_duration_seconds` (histogram)
//! - `docchat_stage_total` (counter with status)
//! - `docchat_stage_inflight` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "docchat_stage_duration_seconds",
        "Pipeline stage duration in seconds",
        &["stage"],
        buckets
    )
    .expect("failed to register stage duration histogram")
});

static STAGE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "docchat_stage_total",
        "Total stage executions by status",
        &["stage", "status"]
    )
    .expect("failed to register stage counter")
});

static STAGE_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "docchat_stage_inflight",
        "Number of in-flight stage executions",
        &["stage"]
    )
    .expect("failed to register inflight gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&STAGE_DURATION);
    Lazy::force(&STAGE_TOTAL);
    Lazy::force(&STAGE_INFLIGHT);
}

/// Increment inflight gauge for a pipeline stage.
pub fn record_stage_start(stage: &'static str) {
    init_collectors();
    STAGE_INFLIGHT.with_label_values(&[stage]).inc();
}

/// Record stage completion with duration and status.
pub fn record_stage_result(stage: &'static str, duration: Duration, success: bool) {
    init_collectors();
    STAGE_INFLIGHT.with_label_values(&[stage]).dec();
    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(duration.as_secs_f64());
    STAGE_TOTAL
        .with_label_values(&[stage, if success { "ok" } else { "error" }])
        .inc();
}

/// Encode every registered metric in the Prometheus text format.
fn render_metrics() -> std::result::Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.uri().path() != "/metrics" {
        return Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap());
    }

    let response = match render_metrics() {
        Ok((content_type, body)) => Response::builder()
            .status(StatusCode::OK)
            .header(hyper::header::CONTENT_TYPE, content_type)
            .body(Full::from(body))
            .unwrap(),
        Err(err) => {
            error!("Failed to encode metrics: {}", err);
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::from("encode error"))
                .unwrap()
        }
    };

    Ok(response)
}

/// Spawn the metrics HTTP endpoint on the given address.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(%addr, "Failed to bind metrics endpoint: {}", err);
                return;
            }
        };
        info!(%addr, "metrics endpoint listening");

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!(%addr, "Metrics accept failed: {}", err);
                    return;
                }
            };

            tokio::spawn(async move {
                let conn = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(handle_request));
                if let Err(err) = conn.await {
                    warn!(?peer, "Metrics connection error: {}", err);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_successful_stage_metrics() {
        let stage = "test_stage_metrics_success";

        record_stage_start(stage);
        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage]).get(), 1);

        record_stage_result(stage, Duration::from_millis(120), true);

        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage]).get(), 0);
        assert_eq!(STAGE_TOTAL.with_label_values(&[stage, "ok"]).get(), 1);
        assert_eq!(
            STAGE_DURATION.with_label_values(&[stage]).get_sample_count(),
            1
        );
    }

    #[test]
    fn records_failed_stage_metrics() {
        let stage = "test_stage_metrics_error";

        record_stage_start(stage);
        record_stage_result(stage, Duration::from_secs(2), false);

        assert_eq!(STAGE_TOTAL.with_label_values(&[stage, "error"]).get(), 1);
        assert_eq!(
            STAGE_DURATION.with_label_values(&[stage]).get_sample_count(),
            1
        );
    }

    #[test]
    fn rendered_metrics_contain_registered_stages() {
        let stage = "test_rendered_metrics";
        record_stage_start(stage);
        record_stage_result(stage, Duration::from_millis(10), true);

        let (content_type, body) = render_metrics().expect("render metrics");
        let text = String::from_utf8(body).expect("utf-8 metrics body");

        assert!(content_type.contains("text/"));
        assert!(text.contains("docchat_stage_total"));
        assert!(text.contains("docchat_stage_duration_seconds"));
        assert!(text.contains(stage));
    }

    #[test]
    fn multiple_stages_tracked_separately() {
        let stage1 = "test_stage_separate_1";
        let stage2 = "test_stage_separate_2";

        record_stage_start(stage1);
        record_stage_start(stage2);

        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage1]).get(), 1);
        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage2]).get(), 1);

        record_stage_result(stage1, Duration::from_millis(50), true);

        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage1]).get(), 0);
        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage2]).get(), 1);

        record_stage_result(stage2, Duration::from_millis(100), false);

        assert_eq!(STAGE_INFLIGHT.with_label_values(&[stage2]).get(), 0);
    }

    #[test]
    fn init_collectors_can_be_called_multiple_times() {
        init_collectors();
        init_collectors();
        init_collectors();
        // Should not panic
    }
}
