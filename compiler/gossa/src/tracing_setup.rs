use std::sync::Once;

use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_tree::HierarchicalLayer;

static TRACING_INIT: Once = Once::new();

/// Filter used by `-trace` when `RUST_LOG` is not set.
const TRACE_FILTER: &str = "gossa_interp=trace";

/// Install the hierarchical tracing subscriber on stderr.
///
/// Does nothing unless `RUST_LOG` is set or `trace` asks for interpreter
/// tracing. Safe to call more than once.
pub fn init_tracing(trace: bool) {
    TRACING_INIT.call_once(|| {
        let filter = if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else if trace {
            EnvFilter::new(TRACE_FILTER)
        } else {
            return;
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(
                HierarchicalLayer::new(2)
                    .with_targets(true)
                    .with_indent_lines(true),
            )
            .init();
    });
}
