//! Logging setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`, or
/// `debug` for this crate when `verbose` is set.
pub fn init(verbose: bool) {
    let fallback = if verbose { "info,homyak=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into());
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
