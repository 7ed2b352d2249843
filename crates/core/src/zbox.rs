//! Box: a single-slot container with one of three disciplines — Cell,
//! Promise, Result — distinguished only by two flags, `can_store` and
//! `set_once`.
//!
//! `fetch` re-roots its result in the current frame before returning
//! it — a box can become garbage the instant after this call returns,
//! and the fetched value must survive that. Result (`can_store=false`
//! from birth, no `set_once` transition needed) falls out of the same
//! two-flag representation as Cell and Promise for free.

use crate::class::CLASS_BOX;
use crate::header::Tag;
use crate::heap::Heap;
use crate::zref::ZRef;
use std::cell::Cell;

#[repr(C)]
pub struct BoxPayload {
    pub(crate) header: crate::header::Header,
    pub(crate) value: Cell<Option<ZRef>>,
    pub(crate) can_store: Cell<bool>,
    pub(crate) set_once: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct SamBox(pub(crate) ZRef);

impl SamBox {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &BoxPayload {
        unsafe { self.0.payload::<BoxPayload>() }
    }

    /// Returns the stored value, or `None` if void. Re-adds the result
    /// to the current frame before returning it.
    pub fn fetch(&self, heap: &Heap) -> Option<ZRef> {
        let v = self.payload().value.get();
        if let Some(v) = v {
            heap.frame_add(v);
        }
        v
    }

    /// Stores `value` (`None` stores void). Fatal if this box cannot
    /// currently be stored to: a Result, or a Promise that has already
    /// received its one store.
    pub fn store(&self, value: Option<ZRef>) -> Option<ZRef> {
        if !self.payload().can_store.get() {
            panic!(
                "fatal: attempt to store into a box that cannot be stored to \
                 (a Result box, or a Promise that was already set)"
            );
        }
        self.payload().value.set(value);
        if self.payload().set_once {
            self.payload().can_store.set(false);
        }
        value
    }

    pub fn can_store(&self) -> bool {
        self.payload().can_store.get()
    }
}

pub(crate) fn alloc_box(heap: &Heap, value: Option<ZRef>, can_store: bool, set_once: bool) -> ZRef {
    heap.alloc_value(Tag::Box, CLASS_BOX, false, |header| BoxPayload {
        header,
        value: Cell::new(value),
        can_store: Cell::new(can_store),
        set_once,
    })
}

impl Heap {
    /// Cell: `can_store=true`, `set_once=false` — stores freely.
    pub fn new_cell_box(&self, initial: Option<ZRef>) -> ZRef {
        alloc_box(self, initial, true, false)
    }

    /// Promise (yield box): `can_store=true`, `set_once=true` — the
    /// first `store` seals it.
    pub fn new_promise_box(&self) -> ZRef {
        alloc_box(self, None, true, true)
    }

    /// Result: `can_store=false` from birth; any `store` is fatal.
    pub fn new_result_box(&self, value: Option<ZRef>) -> ZRef {
        alloc_box(self, value, false, false)
    }

    pub fn as_box(&self, zref: ZRef) -> Option<SamBox> {
        if zref.tag() == Tag::Box {
            Some(SamBox(zref))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_store_replaces_freely() {
        let heap = Heap::new();
        let b = heap.as_box(heap.new_cell_box(None)).unwrap();
        let one = heap.new_int(1);
        let two = heap.new_int(2);
        b.store(Some(one));
        assert_eq!(b.fetch(&heap).map(|v| v.is_same(&one)), Some(true));
        b.store(Some(two));
        assert_eq!(b.fetch(&heap).map(|v| v.is_same(&two)), Some(true));
    }

    #[test]
    fn promise_fetch_is_void_until_set() {
        let heap = Heap::new();
        let b = heap.as_box(heap.new_promise_box()).unwrap();
        assert!(b.fetch(&heap).is_none());
        let ten = heap.new_int(10);
        b.store(Some(ten));
        assert_eq!(b.fetch(&heap).map(|v| v.is_same(&ten)), Some(true));
    }

    #[test]
    #[should_panic(expected = "cannot be stored to")]
    fn restoring_a_promise_is_fatal() {
        let heap = Heap::new();
        let b = heap.as_box(heap.new_promise_box()).unwrap();
        b.store(Some(heap.new_int(10)));
        b.store(Some(heap.new_int(11)));
    }

    #[test]
    #[should_panic(expected = "cannot be stored to")]
    fn storing_into_a_result_is_fatal() {
        let heap = Heap::new();
        let b = heap.as_box(heap.new_result_box(Some(heap.new_int(1)))).unwrap();
        b.store(Some(heap.new_int(2)));
    }

    #[test]
    fn result_box_is_readable_without_storing() {
        let heap = Heap::new();
        let v = heap.new_int(99);
        let b = heap.as_box(heap.new_result_box(Some(v))).unwrap();
        assert_eq!(b.fetch(&heap).map(|x| x.is_same(&v)), Some(true));
        assert!(!b.can_store());
    }
}
