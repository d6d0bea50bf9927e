/*!
 * Structured Tracing
 * Subscriber setup and lifecycle operation spans using the tracing crate
 *
 * Features:
 * - Env-driven filtering through RUST_LOG
 * - JSON-formatted logs for structured parsing
 * - Per-operation spans carrying the unit id and outcome
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Operations slower than this are reported at warn level
const SLOW_OPERATION_MS: u128 = 250;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SUPERVISOR_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let use_json = std::env::var("SUPERVISOR_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("Structured tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .init();
        info!("Structured tracing initialized");
    }
}

/// Span covering one lifecycle operation on a unit
pub struct LifecycleSpan {
    span: tracing::Span,
    start: Instant,
    operation: &'static str,
    unit_id: String,
}

impl LifecycleSpan {
    pub fn new(operation: &'static str, unit_id: &str) -> Self {
        let span = span!(
            Level::DEBUG,
            "lifecycle",
            operation = operation,
            unit_id = unit_id,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        {
            let _entered = span.enter();
            debug!(operation, unit_id, "operation started");
        }

        Self {
            span,
            start: Instant::now(),
            operation,
            unit_id: unit_id.to_string(),
        }
    }

    /// Record the outcome of a fallible operation
    pub fn record_outcome<T, E: std::fmt::Display>(&self, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => {
                self.span.record("result", "success");
            }
            Err(e) => {
                self.span.record("result", "error");
                self.span.record("error", e.to_string().as_str());
            }
        }
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for LifecycleSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_OPERATION_MS {
            warn!(
                operation = self.operation,
                unit_id = %self.unit_id,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lifecycle operation"
            );
        } else {
            debug!(
                operation = self.operation,
                unit_id = %self.unit_id,
                duration_us = duration.as_micros() as u64,
                "operation completed"
            );
        }
    }
}

/// Create a lifecycle span for a unit operation
#[inline]
pub fn span_lifecycle(operation: &'static str, unit_id: &str) -> LifecycleSpan {
    LifecycleSpan::new(operation, unit_id)
}
