//! # Lifecycle Metrics
//!
//! OpenTelemetry counters for case lifecycle operations. Instruments are
//! created from the global meter provider, so they are no-ops until the host
//! application installs one.
//!
//! ## Usage
//!
//! ```rust
//! use caseflow_core::metrics::step_completions_total;
//! use opentelemetry::KeyValue;
//!
//! step_completions_total().add(1, &[KeyValue::new("outcome", "advanced")]);
//! ```

use opentelemetry::metrics::{Counter, Meter};
use std::sync::OnceLock;

static CASEFLOW_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    CASEFLOW_METER.get_or_init(|| opentelemetry::global::meter("caseflow-core"))
}

/// Total number of cases created
pub fn cases_created_total() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.cases.created.total")
        .with_description("Total number of cases created")
        .build()
}

/// Total number of cases whose workflow reached completion
pub fn cases_completed_total() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.cases.completed.total")
        .with_description("Total number of cases completed by workflow advancement")
        .build()
}

/// Total number of step completions
///
/// Labels:
/// - outcome: `advanced` or `case_completed`
pub fn step_completions_total() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.steps.completions.total")
        .with_description("Total number of workflow steps completed")
        .build()
}

/// Completion requests that matched no active step
pub fn no_active_step_matches_total() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.steps.no_active_match.total")
        .with_description("Completion requests with no matching active step")
        .build()
}

/// Optimistic commits rejected because the case changed underneath
pub fn commit_conflicts_total() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.commits.conflicts.total")
        .with_description("Case unit commits rejected by version check")
        .build()
}

/// Capability checks that failed
///
/// Labels:
/// - capability: `resource:action` string
pub fn authorization_denials_total() -> Counter<u64> {
    meter()
        .u64_counter("caseflow.authorization.denials.total")
        .with_description("Capability checks denied by the authorization gate")
        .build()
}
