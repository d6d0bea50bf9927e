/*!
 * Monitoring
 * Structured logging setup and lifecycle tracing
 */

mod tracer;

pub use tracer::{init_tracing, span_lifecycle, LifecycleSpan};
