//! Single-program harness run.
//!
//! [`run`] logs to a caller-supplied sink and always ends the log with a
//! verdict once loading has started: `PASS`, or `FAIL` followed by a hint
//! for reproducing the failure by hand. The hint changes as the run gets
//! further, so it always points at the step that broke.

use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use gossa_interp::{interpret, CapturedOutput, Mode};
use gossa_loader::{BuildContext, Config};
use gossa_ssa::{BuilderMode, Program};
use gossa_types::Sizes;

use crate::HarnessError;

/// Entry run when the command line names none.
pub const DEFAULT_ENTRY: &str = "cmd/simple/simple.go";

/// Environment variable naming the directory that holds `testdata/`.
pub const HOME_VAR: &str = "GOSSA_HOME";

/// Prefix of every harness log line.
pub const LOG_PREFIX: &str = "ssa-";

/// Everything a harness run needs to know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Go file to run, relative to the working directory or to `root`.
    pub entry: String,
    /// Import root: packages are found in `<root>/src/<path>`.
    pub root: PathBuf,
    pub goos: String,
    pub goarch: String,
    pub search_paths: Vec<PathBuf>,
    pub sizes: Sizes,
    pub mode: Mode,
    /// `os.Args[1:]` of the interpreted program.
    pub args: Vec<String>,
}

impl HarnessConfig {
    /// A `linux`/`amd64` configuration with 8-byte words, whatever the host.
    pub fn new(entry: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        HarnessConfig {
            entry: entry.into(),
            root: root.into(),
            goos: "linux".to_string(),
            goarch: "amd64".to_string(),
            search_paths: Vec::new(),
            sizes: Sizes::new(8, 8),
            mode: Mode::empty(),
            args: Vec::new(),
        }
    }

    /// The default entry under `$GOSSA_HOME/testdata`.
    ///
    /// An unset variable yields `/testdata`; the root is not validated.
    pub fn from_env() -> Self {
        Self::with_home(std::env::var_os(HOME_VAR))
    }

    fn with_home(home: Option<OsString>) -> Self {
        let mut root = home.unwrap_or_default();
        root.push("/testdata");
        HarnessConfig::new(DEFAULT_ENTRY, root)
    }

    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn build_context(&self) -> BuildContext {
        let mut build =
            BuildContext::new(&self.root).with_target(self.goos.clone(), self.goarch.clone());
        build.search_paths.clone_from(&self.search_paths);
        build
    }
}

/// A passing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub entry: String,
    /// Everything the program printed.
    pub output: Vec<u8>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Hint shown when a run fails before the program is built.
pub fn load_hint(entry: &str) -> String {
    format!("To dump SSA representation, run:\n% gossa dump -build=CFP {entry}\n")
}

/// Hint shown when a built program fails while running.
pub fn trace_hint(entry: &str) -> String {
    format!("To trace execution, run:\n% gossa run -build=C -trace {entry}\n")
}

/// Log sink plus the verdict printed when the run ends.
///
/// `hint` is `None` until loading starts; from then on the verdict is
/// printed on drop, so every return path gets one.
struct Session<'w, W: Write> {
    out: &'w mut W,
    hint: Option<String>,
}

impl<'w, W: Write> Session<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Session { out, hint: None }
    }

    fn log(&mut self, line: &str) {
        tracing::info!(target: "gossa::harness", "{line}");
        self.write(format_args!("{LOG_PREFIX}{line}\n"));
    }

    /// A broken sink must not change the verdict, only lose the log.
    fn write(&mut self, text: fmt::Arguments<'_>) {
        if let Err(error) = self.out.write_fmt(text) {
            tracing::warn!(%error, "harness log write failed");
        }
    }

    fn set_hint(&mut self, hint: String) {
        self.hint = Some(hint);
    }

    fn clear_hint(&mut self) {
        if let Some(hint) = &mut self.hint {
            hint.clear();
        }
    }

    /// Log `error` and hand it back for returning.
    #[cold]
    fn fail(&mut self, error: HarnessError) -> HarnessError {
        if error.is_fatal() {
            tracing::error!(entry = error.entry(), "fatal harness failure");
        }
        self.log(&error.to_string());
        error
    }
}

impl<W: Write> Drop for Session<'_, W> {
    fn drop(&mut self) {
        let Some(hint) = &self.hint else {
            return;
        };
        let verdict = if hint.is_empty() {
            "PASS\n".to_string()
        } else {
            format!("FAIL\n{hint}\n")
        };
        self.write(format_args!("{verdict}"));
        if let Err(error) = self.out.flush() {
            tracing::warn!(%error, "harness log flush failed");
        }
    }
}

/// Load, build and interpret `config.entry`, logging to `out`.
///
/// The run passes when the program exits with code 0 and its output does
/// not contain `BUG`. Each call captures the program's output in a buffer
/// of its own.
#[tracing::instrument(level = "info", skip_all, fields(entry = %config.entry))]
pub fn run<W: Write>(config: &HarnessConfig, out: &mut W) -> Result<RunReport, HarnessError> {
    let start = Instant::now();
    let entry = config.entry.as_str();
    let mut session = Session::new(out);
    session.log(&format!("Input: {entry}"));

    let mut loader = match Config::from_args(config.build_context(), &[entry.to_string()], true) {
        Ok(loader) => loader,
        Err(source) => {
            return Err(session.fail(HarnessError::Args {
                entry: entry.to_string(),
                source,
            }))
        }
    };
    loader.import("runtime");

    session.set_hint(load_hint(entry));

    let loaded = loader.load().map_err(|source| {
        session.fail(HarnessError::Load {
            entry: entry.to_string(),
            source,
        })
    })?;

    let program = Program::build(&loaded, BuilderMode::SANITY_CHECK_FUNCTIONS).map_err(|source| {
        session.fail(HarnessError::Build {
            entry: entry.to_string(),
            source,
        })
    })?;

    let Some(package) = program
        .created_package(&loaded, 0)
        .filter(|package| package.name == "main")
    else {
        return Err(session.fail(HarnessError::NotMainPackage {
            entry: entry.to_string(),
        }));
    };

    session.set_hint(trace_hint(entry));

    let captured = CapturedOutput::new();
    let code = interpret(
        &program,
        package,
        config.mode,
        config.sizes,
        entry,
        &config.args,
        Some(&captured),
    );
    let output = captured.take();

    if code != 0 {
        return Err(session.fail(HarnessError::NonZeroExit {
            entry: entry.to_string(),
            code,
            output,
        }));
    }
    // Go's own test suite marks failures this way.
    if output.windows(3).any(|w| w == b"BUG") {
        return Err(session.fail(HarnessError::BugMarkerFound {
            entry: entry.to_string(),
            output,
        }));
    }

    session.clear_hint();
    let elapsed = start.elapsed();
    tracing::debug!(?elapsed, "run passed");
    Ok(RunReport {
        entry: entry.to_string(),
        output,
        elapsed,
    })
}

#[cfg(test)]
mod tests;
