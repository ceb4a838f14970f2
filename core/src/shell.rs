//! Shell-availability fallback.
//!
//! The bundled program probes a list of candidate interpreters at startup and
//! treats an exhausted search as fatal. Once it ships as a self-contained
//! executable for a known OS family that failure is meaningless, so the
//! rewritten program always lands on a default interpreter instead.

use crate::platform::{BuildTarget, is_windows_family};

pub const WINDOWS_DEFAULT_SHELL: &str = "cmd.exe";
pub const POSIX_DEFAULT_SHELL: &str = "/bin/sh";

pub fn default_interpreter(os: &str) -> &'static str {
    if is_windows_family(os) {
        WINDOWS_DEFAULT_SHELL
    } else {
        POSIX_DEFAULT_SHELL
    }
}

/// JS expression assigned when the rewritten search comes up empty.
pub fn fallback_expression(target: BuildTarget) -> String {
    match target {
        BuildTarget::Windows => format!("\"{}\"", WINDOWS_DEFAULT_SHELL),
        BuildTarget::General => format!(
            "process.platform===\"win32\"?\"{}\":\"{}\"",
            WINDOWS_DEFAULT_SHELL, POSIX_DEFAULT_SHELL
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellState {
    Searching { next: usize },
    Resolved(ShellResolution),
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellResolution {
    Found(String),
    Defaulted(String),
}

impl ShellResolution {
    pub fn path(&self) -> &str {
        match self {
            ShellResolution::Found(path) | ShellResolution::Defaulted(path) => path,
        }
    }
}

/// Candidate-by-candidate interpreter search, mirroring the rewritten runtime logic.
#[derive(Debug, Clone)]
pub struct ShellSearch {
    candidates: Vec<String>,
    state: ShellState,
}

impl ShellSearch {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            state: ShellState::Searching { next: 0 },
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Check one candidate. No-op once the search has left `Searching`.
    pub fn step(&mut self, is_usable: &mut impl FnMut(&str) -> bool) -> &ShellState {
        if let ShellState::Searching { next } = self.state {
            self.state = match self.candidates.get(next) {
                Some(candidate) if is_usable(candidate.as_str()) => ShellState::Resolved(ShellResolution::Found(candidate.clone())),
                Some(_) => ShellState::Searching { next: next + 1 },
                None => ShellState::Unresolved,
            };
        }
        &self.state
    }

    /// Run the search to completion; `Unresolved` transitions to the OS default.
    pub fn resolve(mut self, os: &str, mut is_usable: impl FnMut(&str) -> bool) -> ShellResolution {
        while matches!(self.state, ShellState::Searching { .. }) {
            self.step(&mut is_usable);
        }
        match self.state {
            ShellState::Resolved(resolution) => resolution,
            _ => {
                let fallback = default_interpreter(os);
                tracing::debug!("no usable shell among candidates; defaulting to {}", fallback);
                ShellResolution::Defaulted(fallback.to_string())
            }
        }
    }
}
