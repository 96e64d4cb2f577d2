use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::Result;

/// Per-call knobs for the evaluation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Emit `tracing` events on every rule entry and exit.
    #[serde(default)]
    pub trace: bool,

    /// Maximum nesting of rule invocations before the parse is abandoned.
    ///
    /// Evaluation is recursive, so this is a guard for the thread's stack
    /// rather than a grammar property: each rule invocation also costs the
    /// frames of the nodes inside it. Valid input that nests deeper than the
    /// default of 256 needs a higher limit, run on a thread with a stack large
    /// enough for it.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Also report ordinary (non-committed) top-level failures through the
    /// error handler. Committed failures are always reported.
    #[serde(default)]
    pub report_failures: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trace: false,
            max_depth: default_max_depth(),
            report_failures: false,
        }
    }
}

impl ParseOptions {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        from_file(path)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        from_str(s)
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_report_failures(mut self, report_failures: bool) -> Self {
        self.report_failures = report_failures;
        self
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T> {
    let config = serde_json::from_str(s)?;
    Ok(config)
}

fn default_max_depth() -> usize {
    256
}
