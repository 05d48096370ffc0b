// Observability around the loop: live metrics, per-cycle event tracing and CSV export.

pub mod metrics;
pub mod export;
