//! Interpreter command builder
//!
//! Builds the argv used to run a source file with hardened interpreter flags.

use std::path::{Path, PathBuf};

use crate::config::LanguageId;

/// Python: isolated mode (no user site, no PYTHON* env, no cwd on sys.path)
/// with the fault handler dumping tracebacks on fatal signals.
const PYTHON_FLAGS: [&str; 3] = ["-I", "-X", "faulthandler"];

/// Node: cap the native call stack (in KiB) so runaway recursion fails fast.
const NODE_FLAGS: [&str; 1] = ["--stack-size=1024"];

/// Builder for interpreter invocations
#[derive(Debug, Clone)]
pub struct InterpreterCommand {
    language: LanguageId,
    interpreter: PathBuf,
    source: PathBuf,
}

impl InterpreterCommand {
    /// Create a command for `language` using its default interpreter
    pub fn new(language: LanguageId, source: impl Into<PathBuf>) -> Self {
        Self {
            language,
            interpreter: PathBuf::from(language.default_interpreter()),
            source: source.into(),
        }
    }

    /// Use a specific interpreter binary
    pub fn interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Build the full argv, interpreter first
    pub fn build(&self) -> Vec<String> {
        let flags: &[&str] = match self.language {
            LanguageId::Python => &PYTHON_FLAGS,
            LanguageId::JavaScript => &NODE_FLAGS,
        };

        let mut args = Vec::with_capacity(flags.len() + 2);
        args.push(self.interpreter.to_string_lossy().into_owned());
        args.extend(flags.iter().map(|flag| (*flag).to_owned()));
        args.push(self.source.to_string_lossy().into_owned());
        args
    }
}
