use std::path::Path;
use std::{fs::File, sync::Arc};

use tracing_subscriber::{filter, prelude::*};

use crate::error::RoutingError;

/// Installs the global subscriber: pretty `INFO` output on stdout and, when
/// `log_file` is given, every level written to that file.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), RoutingError> {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let debug_log = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|source| RoutingError::TraceIo {
                path: path.to_path_buf(),
                source,
            })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .try_init()
        .map_err(|error| RoutingError::Tracing(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_rejected() {
        // Another test may already have installed a subscriber, so only the
        // second call is guaranteed to fail.
        let _ = init_tracing(None);
        assert!(matches!(init_tracing(None), Err(RoutingError::Tracing(_))));
    }
}
