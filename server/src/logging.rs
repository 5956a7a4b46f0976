//! Tracing subscriber setup for the `semsearch` binary.

use tracing_subscriber::EnvFilter;

/// Directives applied when `RUST_LOG` does not override them.
const DEFAULT_DIRECTIVES: &[&str] = &[
    "semsearch=info",
    "semsearch_server=info",
    "semsearch_retrieval=info",
    "semsearch_corpus=info",
    "semsearch_embeddings=info",
];

/// Install the global subscriber, as JSON lines when `json` is set.
///
/// Installing twice is a no-op.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES.join(",")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
