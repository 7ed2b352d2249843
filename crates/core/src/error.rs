//! Fatal error taxonomy: every core violation is unrecoverable, so this
//! type exists to tag *why* a failure happened rather than to enable
//! recovery. Higher layers (`sam-runtime`'s giblet-stack diagnostics)
//! use the tag and message to produce a contextual report before the
//! unwind reaches the embedder.

use std::cell::Cell;
use std::fmt;

/// The five fatal-error families this core distinguishes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    Structural,
    Type,
    Arity,
    Invariant,
    OutOfRange,
}

#[derive(Clone, Debug)]
pub struct SamError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SamError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        SamError {
            kind,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn arity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invariant, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfRange, message)
    }
}

impl fmt::Display for SamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for SamError {}

thread_local! {
    static DYING: Cell<bool> = const { Cell::new(false) };
}

/// Logs `err` and panics, unwinding the current thread. A recursion
/// guard handles the case where producing this diagnostic itself
/// triggers another fatal error: the second one is let through without
/// re-entering the logging path.
pub fn fatal(err: SamError) -> ! {
    if DYING.with(|d| d.replace(true)) {
        panic!("{} (while already reporting a fatal error)", err);
    }
    tracing::error!(kind = ?err.kind, "{}", err.message);
    DYING.with(|d| d.set(false));
    panic!("fatal: {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "fatal: [Arity]")]
    fn fatal_panics_with_the_tagged_message() {
        fatal(SamError::arity("too few arguments"));
    }
}
