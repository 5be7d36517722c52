use std::str::FromStr;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

static RELOAD_HANDLE: OnceCell<Handle<EnvFilter, Registry>> = OnceCell::new();

/// Installs the global tracing subscriber.
///
/// The first call decides the output format; later calls only swap the filter,
/// so tests can re-init freely with new levels.
pub fn init(level: &str, json: bool) -> Result<()> {
    let handle = RELOAD_HANDLE.get_or_try_init(|| {
        let filter = EnvFilter::from_str(level).expect("failed to parse log level");

        let (filter, handle) = tracing_subscriber::reload::Layer::new(filter);

        let fmt = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true);

        let registry = tracing_subscriber::registry().with(filter);

        if json {
            registry.with(fmt.json()).try_init()
        } else {
            registry.with(fmt.pretty()).try_init()
        }
        .map(|_| handle)
    })?;

    handle.reload(level)?;

    Ok(())
}
