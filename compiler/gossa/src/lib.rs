//! Test harness and command-line driver for gossa.
//!
//! The harness runs one Go program through the whole pipeline and reports
//! whether it passed:
//!
//! ```text
//! HarnessConfig
//!     │
//!     ▼
//! Config::from_args ──► Config::load ──► Program::build ──► interpret
//!                        (gossa_loader)    (gossa_ssa)      (gossa_interp)
//!     │
//!     ▼
//! RunReport | HarnessError
//! ```
//!
//! Progress goes to a caller-supplied log sink as `ssa-` prefixed lines,
//! followed by `PASS`, or `FAIL` and a hint for reproducing the failure by
//! hand. [`run_batch`] runs several programs in parallel, each with its own
//! log and captured output.

mod batch;
pub mod commands;
mod error;
mod harness;
mod tracing_setup;

pub use batch::{run_batch, BatchSummary, EntryResult};
pub use error::HarnessError;
pub use harness::{
    load_hint, run, trace_hint, HarnessConfig, RunReport, DEFAULT_ENTRY, HOME_VAR, LOG_PREFIX,
};
pub use tracing_setup::init_tracing;
