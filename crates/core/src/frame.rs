//! Frame stack: a single-threaded shadow stack of [`ZRef`]s.
//!
//! Every call pushes a frame marker, roots its live references into
//! that frame, then pops back to the marker on return — the GC walks
//! the whole stack as its root set.

use crate::limits::MAX_STACK;
use crate::zref::ZRef;

/// An opaque mark returned by [`FrameStack::start`]; pass it back to
/// [`FrameStack::return_`]/[`FrameStack::reset`] to pop back to it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SavedStack(usize);

pub struct FrameStack {
    entries: Vec<ZRef>,
    limit: usize,
}

impl FrameStack {
    pub fn new() -> Self {
        FrameStack {
            entries: Vec::with_capacity(256),
            limit: MAX_STACK,
        }
    }

    /// Marks the start of a new frame of live references.
    pub fn start(&self) -> SavedStack {
        SavedStack(self.entries.len())
    }

    /// Appends `v` to the current (topmost) frame.
    pub fn add(&mut self, v: ZRef) {
        if self.entries.len() >= self.limit {
            panic!("fatal: value stack overflow ({} entries)", self.limit);
        }
        self.entries.push(v);
    }

    /// Pops entries back down to `saved`; if `opt_return` is `Some`,
    /// re-adds it to the now-current frame.
    ///
    /// `saved` may name any ancestor frame, not just the immediate
    /// parent — this is what makes evaluator nonlocal exits work.
    pub fn return_(&mut self, saved: SavedStack, opt_return: Option<ZRef>) {
        if saved.0 > self.entries.len() {
            panic!("fatal: cannot return to a deeper frame than current");
        }
        self.entries.truncate(saved.0);
        if let Some(v) = opt_return {
            self.add(v);
        }
    }

    /// Same effect as [`FrameStack::return_`]; the distinct name
    /// signals intent at call sites ("keep only this one value of the
    /// frame").
    pub fn reset(&mut self, saved: SavedStack, opt_kept: Option<ZRef>) {
        self.return_(saved, opt_kept)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All currently-live roots, for the GC mark phase.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &ZRef> {
        self.entries.iter()
    }
}

impl Default for FrameStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn start_add_return_roundtrip() {
        let heap = Heap::new();
        let mut frames = FrameStack::new();
        let saved = frames.start();
        let v = heap.new_int(1);
        frames.add(v);
        assert_eq!(frames.len() - saved.0, 1);
        frames.return_(saved, None);
        assert_eq!(frames.len(), saved.0);
    }

    #[test]
    fn return_keeps_value_in_parent_frame() {
        let heap = Heap::new();
        let mut frames = FrameStack::new();
        let saved = frames.start();
        let v = heap.new_int(42);
        frames.add(v);
        frames.return_(saved, Some(v));
        assert_eq!(frames.len(), saved.0 + 1);
    }

    #[test]
    #[should_panic(expected = "deeper frame")]
    fn return_to_deeper_frame_is_fatal() {
        let mut frames = FrameStack::new();
        let outer = frames.start();
        let _inner = frames.start();
        // Pretend we popped outer already, then try to "return" to a
        // point deeper than current (len==0 < outer==0 won't panic, so
        // force a real violation by advancing then rolling back past it).
        frames.return_(outer, None);
        let heap = Heap::new();
        let v = heap.new_int(7);
        frames.add(v);
        let bogus = SavedStack(frames.len() + 1);
        frames.return_(bogus, None);
    }
}
