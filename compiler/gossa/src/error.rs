//! Harness error taxonomy.

use gossa_loader::LoadError;
use gossa_ssa::SanityError;
use thiserror::Error;

/// Why a harness run did not pass.
///
/// The messages are the log lines the harness writes for each failure.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The entry could not be turned into a loader configuration.
    #[error("FromArgs({entry}) failed: {source}")]
    Args {
        entry: String,
        #[source]
        source: LoadError,
    },
    #[error("Load({entry}) failed: {source}")]
    Load {
        entry: String,
        #[source]
        source: LoadError,
    },
    #[error("Build({entry}) failed: {source}")]
    Build {
        entry: String,
        #[source]
        source: SanityError,
    },
    #[error("not a main package: {entry}")]
    NotMainPackage { entry: String },
    #[error("interpreting {entry}: exit code was {code}")]
    NonZeroExit {
        entry: String,
        code: i32,
        output: Vec<u8>,
    },
    #[error("interpreting {entry}: exited zero but output contained 'BUG'")]
    BugMarkerFound { entry: String, output: Vec<u8> },
}

impl HarnessError {
    /// Whether the failure should end the whole process.
    ///
    /// Argument and loading problems are reported and the caller carries
    /// on; a program that built but misbehaved is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::NotMainPackage { .. }
                | HarnessError::NonZeroExit { .. }
                | HarnessError::BugMarkerFound { .. }
        )
    }

    pub fn entry(&self) -> &str {
        match self {
            HarnessError::Args { entry, .. }
            | HarnessError::Load { entry, .. }
            | HarnessError::Build { entry, .. }
            | HarnessError::NotMainPackage { entry }
            | HarnessError::NonZeroExit { entry, .. }
            | HarnessError::BugMarkerFound { entry, .. } => entry,
        }
    }

    /// Output the program printed before failing, if it ran at all.
    pub fn captured_output(&self) -> Option<&[u8]> {
        match self {
            HarnessError::NonZeroExit { output, .. } | HarnessError::BugMarkerFound { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}
