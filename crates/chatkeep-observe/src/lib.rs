//! Observability for chatkeep: tracing subscriber setup with structured
//! text or JSON logs and optional OpenTelemetry span export.

pub mod tracing_setup;
