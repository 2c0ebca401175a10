//! Log output setup for binaries embedding dirconsole.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` the level is `info`, or `info,dirconsole=debug` when
/// `debug_auth` is set (the console handshake logs at debug). Returns
/// `false` if a global subscriber was already installed.
pub fn init_logging(debug_auth: bool) -> bool {
    let default = if debug_auth {
        "info,dirconsole=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
