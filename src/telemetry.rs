//! Telemetry
//!
//! Structured logging for playback:
//! - Sequencer state transitions
//! - Step spans
//! - Isolated callback failures
//! - Configurable log levels via RUST_LOG

use tracing::{info, info_span, warn, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sanitize a string for safe log output by escaping control characters.
pub fn sanitize_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x1b' => out.push_str("\\e"),
            '\x00' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(c),
        }
    }
    out
}

/// Initialize tracing from RUST_LOG.
///
/// Without RUST_LOG nothing is installed, which keeps CLI output clean.
pub fn init_tracing() {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        init_tracing_with_filter(&filter);
    }
}

pub fn init_tracing_verbose() {
    init_tracing_with_filter("info")
}

pub fn init_tracing_with_filter(filter: &str) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_level(true)
            .compact()
            .with_writer(std::io::stderr);

        let filter_layer = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .try_init();
    });
}

/// Span wrapping the execution of one sequencer step.
pub fn enter_step(index: usize, total: usize) -> Span {
    info_span!("sequencer.step", index = index, total = total)
}

/// Record a sequencer state transition.
pub fn record_state_transition(from: &str, to: &str) {
    let safe_from = sanitize_for_log(from);
    let safe_to = sanitize_for_log(to);
    info!(
        from = safe_from.as_str(),
        to = safe_to.as_str(),
        "Sequencer state transition"
    );
}

/// Report a wait callback that failed without stopping playback.
pub fn record_callback_failure(position: usize, error: &str) {
    let safe_err = sanitize_for_log(error);
    warn!(
        callback = position,
        error = safe_err.as_str(),
        "Wait callback failed; continuing"
    );
}

/// Initialize tracing for tests with a simple subscriber
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
