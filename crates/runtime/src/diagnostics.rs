//! Giblet stack: a sidecar call-context trail for fatal-error reports,
//! walked before a fatal error terminates.
//!
//! Plain `RefCell<Vec<String>>` rather than a `thread_local!`, since
//! `Evaluator` is already the per-heap singleton this state belongs to.

use std::cell::RefCell;

pub struct GibletStack {
    frames: RefCell<Vec<String>>,
}

impl GibletStack {
    pub fn new() -> Self {
        GibletStack {
            frames: RefCell::new(Vec::new()),
        }
    }

    /// Pushes `label` (typically a closure's display name) onto the
    /// trail; popped automatically when the returned guard drops,
    /// regardless of whether the call unwound via a fatal error.
    pub fn push(&self, label: impl Into<String>) -> GibletGuard<'_> {
        self.frames.borrow_mut().push(label.into());
        GibletGuard(self)
    }

    fn pop(&self) {
        self.frames.borrow_mut().pop();
    }

    /// Renders the current trail, innermost call first, for inclusion
    /// in a fatal-error log line. Empty at top level.
    pub fn format_context(&self) -> String {
        let frames = self.frames.borrow();
        if frames.is_empty() {
            return String::new();
        }
        let mut out = String::from("while evaluating:");
        for f in frames.iter().rev() {
            out.push_str("\n    in ");
            out.push_str(f);
        }
        out
    }
}

impl Default for GibletStack {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GibletGuard<'a>(&'a GibletStack);

impl Drop for GibletGuard<'_> {
    fn drop(&mut self) {
        self.0.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_has_no_context() {
        let g = GibletStack::new();
        assert_eq!(g.format_context(), "");
    }

    #[test]
    fn pushed_frames_appear_innermost_first_and_pop_on_drop() {
        let g = GibletStack::new();
        {
            let _outer = g.push("outer");
            let _inner = g.push("inner");
            let ctx = g.format_context();
            assert!(ctx.find("inner").unwrap() < ctx.find("outer").unwrap());
        }
        assert_eq!(g.format_context(), "");
    }
}
