//! Tracing Subscriber Setup
//!
//! Structured logging with an environment filter.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard tracing directives, merged with the defaults below.
//!
//! Defaults keep the monitor at `info` and quiet the HTTP stack.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with environment filter.
///
/// Uses static directive strings that are compile-time constants guaranteed to parse.
#[allow(clippy::expect_used)]
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    "stream_rate_monitor=info"
                        .parse()
                        .expect("static directive 'stream_rate_monitor=info' is valid"),
                )
                .add_directive(
                    "tower_http=info"
                        .parse()
                        .expect("static directive 'tower_http=info' is valid"),
                )
                .add_directive(
                    "hyper=warn"
                        .parse()
                        .expect("static directive 'hyper=warn' is valid"),
                ),
        )
        .init();
}
