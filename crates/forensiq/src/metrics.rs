use std::fmt;
use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, Registry};

use crate::context::{CallContext, ContextError};

/// Name every request timing is reported under.
pub const REQUEST_TIME: &str = "forensiq.request_time";

/// Which endpoint a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Check,
    Ready,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Check => "check",
            RequestKind::Ready => "ready",
        }
    }
}

/// Coarse outcome of a request, as reported to metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Timeout,
    Canceled,
    Error,
}

impl ResponseStatus {
    /// Classify a finished exchange. A done context overrides the status code.
    pub fn classify(ctx: &CallContext, status_code: Option<u16>) -> Self {
        match ctx.err() {
            Some(err) => err.into(),
            None => match status_code {
                Some(200..=399) => ResponseStatus::Ok,
                _ => ResponseStatus::Error,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Ok => "ok",
            ResponseStatus::Timeout => "timeout",
            ResponseStatus::Canceled => "canceled",
            ResponseStatus::Error => "error",
        }
    }
}

impl From<ContextError> for ResponseStatus {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Timeout => ResponseStatus::Timeout,
            ContextError::Canceled => ResponseStatus::Canceled,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timing measurement for a request to Forensiq.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSample {
    pub request: RequestKind,
    pub status: ResponseStatus,
    /// `None` when no response was received.
    pub status_code: Option<u16>,
    pub elapsed: Duration,
}

impl RequestSample {
    /// statsd-style `key:value` tags for this sample.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![
            format!("request:{}", self.request.as_str()),
            format!("status:{}", self.status),
        ];
        if let Some(code) = self.status_code {
            tags.push(format!("status_code:{code}"));
        }
        tags
    }
}

/// Sink for request timings.
///
/// Reporting is fire-and-forget; implementations must not block or fail the
/// call that produced the sample.
pub trait Metrics: Send + Sync {
    fn timing(&self, name: &str, sample: &RequestSample);
}

/// [`Metrics`] sink recording into a Prometheus histogram.
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    request_time: HistogramVec,
}

impl PrometheusMetrics {
    /// Create the `forensiq_request_time_seconds` histogram and register it
    /// with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let request_time = HistogramVec::new(
            HistogramOpts::new(
                "forensiq_request_time_seconds",
                "Duration of requests to the Forensiq API in seconds",
            ),
            &["request", "status", "status_code"],
        )?;
        registry.register(Box::new(request_time.clone()))?;
        Ok(Self { request_time })
    }
}

impl Metrics for PrometheusMetrics {
    fn timing(&self, _name: &str, sample: &RequestSample) {
        let status_code = sample
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_default();
        self.request_time
            .with_label_values(&[
                sample.request.as_str(),
                sample.status.as_str(),
                status_code.as_str(),
            ])
            .observe(sample.elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};
    use tokio_util::sync::CancellationToken;

    #[test]
    fn classify_by_status_code() {
        let ctx = CallContext::background();
        assert_eq!(ResponseStatus::classify(&ctx, Some(200)), ResponseStatus::Ok);
        assert_eq!(ResponseStatus::classify(&ctx, Some(302)), ResponseStatus::Ok);
        assert_eq!(ResponseStatus::classify(&ctx, Some(403)), ResponseStatus::Error);
        assert_eq!(ResponseStatus::classify(&ctx, Some(500)), ResponseStatus::Error);
        assert_eq!(ResponseStatus::classify(&ctx, None), ResponseStatus::Error);
    }

    #[test]
    fn classify_prefers_context() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::background().with_cancellation(token);
        assert_eq!(
            ResponseStatus::classify(&ctx, Some(200)),
            ResponseStatus::Canceled
        );
    }

    #[test]
    fn tags_include_status_code_when_known() {
        let sample = RequestSample {
            request: RequestKind::Check,
            status: ResponseStatus::Ok,
            status_code: Some(200),
            elapsed: Duration::from_millis(12),
        };
        assert_eq!(
            sample.tags(),
            ["request:check", "status:ok", "status_code:200"]
        );

        let sample = RequestSample {
            request: RequestKind::Ready,
            status: ResponseStatus::Timeout,
            status_code: None,
            elapsed: Duration::from_millis(12),
        };
        assert_eq!(sample.tags(), ["request:ready", "status:timeout"]);
    }

    #[test]
    fn prometheus_sink_observes_samples() {
        let registry = Registry::new();
        let sink = PrometheusMetrics::register(&registry).unwrap();
        sink.timing(
            REQUEST_TIME,
            &RequestSample {
                request: RequestKind::Check,
                status: ResponseStatus::Error,
                status_code: Some(403),
                elapsed: Duration::from_millis(250),
            },
        );

        let observed = sink
            .request_time
            .with_label_values(&["check", "error", "403"])
            .get_sample_count();
        assert_eq!(observed, 1);

        let mut text = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut text)
            .unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("forensiq_request_time_seconds_count"));
        assert!(text.contains(r#"status_code="403""#));
    }

    #[test]
    fn prometheus_sink_rejects_double_registration() {
        let registry = Registry::new();
        PrometheusMetrics::register(&registry).unwrap();
        assert!(PrometheusMetrics::register(&registry).is_err());
    }
}
