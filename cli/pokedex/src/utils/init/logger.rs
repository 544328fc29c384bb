use std::sync::OnceLock;

use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;
use crate::utils::TERMINAL_STDERR;

struct LockingTerminalStderr;
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LockingTerminalStderr {
    type Writer = LockingTerminalStderr;

    fn make_writer(&'a self) -> Self::Writer {
        LockingTerminalStderr
    }
}

impl std::io::Write for LockingTerminalStderr {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut guard) = TERMINAL_STDERR.lock() {
            guard.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut guard) = TERMINAL_STDERR.lock() {
            guard.flush()?
        }
        Ok(())
    }
}

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let verbosity = verbosity.unwrap_or_default();
    let log_filter = log_filter(verbosity);

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        // Start out permissive, the actual filter is set right below.
        let (filter, reload_handle) = tracing_subscriber::reload::Layer::new(EnvFilter::new("trace"));
        let log_layer = tracing_subscriber::fmt::layer()
            .with_writer(LockingTerminalStderr)
            .with_filter(filter);
        tracing_subscriber::registry().with(log_layer).init();
        reload_handle
    });

    update_filters(filter_handle, log_filter);
}

/// Filter directives for a verbosity level.
///
/// `$RUST_LOG` takes precedence if it is set.
fn log_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,pokedex=error,pokedex_catalog=error",
        // Only show warnings
        Verbosity::Verbose(0) => "off,pokedex=warn,pokedex_catalog=warn",
        // Show our own info logs
        Verbosity::Verbose(1) => "off,pokedex=info,pokedex_catalog=info",
        // Also show debug from our library
        Verbosity::Verbose(2) => "off,pokedex=debug,pokedex_catalog=debug",
        // Also show trace from our library
        Verbosity::Verbose(3) => "off,pokedex=trace,pokedex_catalog=trace",
        // Also show debug from dependencies, e.g. reqwest
        Verbosity::Verbose(4) => "debug,pokedex=trace,pokedex_catalog=trace",
        Verbosity::Verbose(_) => "trace",
    }
}

fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}
