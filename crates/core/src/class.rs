//! Class registry and the `Class` ("Type") value itself.
//!
//! Every class — built-in or derived-data — gets a stable, dense
//! sequence number assigned at registration time. That number is what
//! [`crate::header::Header::class`] stores and what
//! [`crate::generic::Generic`] uses to index its per-class dispatch
//! table.

use crate::header::{Header, Tag};
use crate::heap::Heap;
use crate::limits::MAX_CLASSES;
use crate::symbol::Symbol;
use crate::zref::ZRef;

/// Dense index identifying a registered class. Stable for process
/// lifetime once assigned.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ClassSeq(pub u16);

impl ClassSeq {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

struct ClassRecord {
    name: Symbol,
    parent: Option<ClassSeq>,
    identified: bool,
    /// Lazily-allocated heap `Class` value representing this class.
    value: Option<ZRef>,
}

/// Process-wide (here: per-`Heap`) table of registered classes.
pub struct ClassRegistry {
    records: Vec<ClassRecord>,
}

/// Payload of a heap-allocated `Class` value: just the seqno of the
/// class it represents. Every `Class` value's own header class-slot is
/// [`CLASS_CLASS`] — "every Class is an instance of class Class".
#[repr(C)]
pub struct ClassPayload {
    pub header: Header,
    pub represents: ClassSeq,
}

// Built-in class sequence numbers, assigned in registration order.
// `Class` itself is registered first so every other registration can
// immediately produce a well-formed `Class` value if asked.
pub const CLASS_CLASS: ClassSeq = ClassSeq(0);
pub const CLASS_INT: ClassSeq = ClassSeq(1);
pub const CLASS_STRING: ClassSeq = ClassSeq(2);
pub const CLASS_SYMBOL: ClassSeq = ClassSeq(3);
pub const CLASS_UNIQLET: ClassSeq = ClassSeq(4);
pub const CLASS_LIST: ClassSeq = ClassSeq(5);
pub const CLASS_MAP: ClassSeq = ClassSeq(6);
pub const CLASS_SYMBOL_TABLE: ClassSeq = ClassSeq(7);
pub const CLASS_RECORD: ClassSeq = ClassSeq(8);
pub const CLASS_BOX: ClassSeq = ClassSeq(9);
pub const CLASS_FUNCTION: ClassSeq = ClassSeq(10);
pub const CLASS_GENERIC: ClassSeq = ClassSeq(11);
pub const NUM_BUILTIN_CLASSES: u16 = 12;

impl ClassRegistry {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Registers the fixed set of built-in classes. Must be called
    /// exactly once, before any other class registration, by
    /// `Heap::new`.
    pub(crate) fn bootstrap(&mut self, names: [Symbol; NUM_BUILTIN_CLASSES as usize]) {
        assert!(self.records.is_empty(), "bootstrap called twice");
        for name in names {
            self.records.push(ClassRecord {
                name,
                parent: None,
                identified: true,
                value: None,
            });
        }
    }

    /// Creates a derived-data class by name. Idempotent: calling this
    /// again with the same textual name returns the same `ClassSeq`
    /// (core classes are idempotent per name; derived classes here
    /// follow the same rule for simplicity and to avoid silent
    /// duplicate registration from repeated module loads).
    pub fn create_derived(&mut self, name: Symbol, parent: Option<ClassSeq>) -> ClassSeq {
        if let Some(existing) = self.records.iter().position(|r| r.name == name) {
            return ClassSeq(existing as u16);
        }
        if self.records.len() >= MAX_CLASSES {
            panic!("class table overflow: cannot register class {:?}", name);
        }
        self.records.push(ClassRecord {
            name,
            parent,
            identified: true,
            value: None,
        });
        ClassSeq((self.records.len() - 1) as u16)
    }

    pub fn name(&self, seq: ClassSeq) -> Symbol {
        self.records[seq.index()].name
    }

    pub fn parent(&self, seq: ClassSeq) -> Option<ClassSeq> {
        self.records[seq.index()].parent
    }

    pub fn find_by_name(&self, name: Symbol) -> Option<ClassSeq> {
        self.records
            .iter()
            .position(|r| r.name == name)
            .map(|i| ClassSeq(i as u16))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn cached_value(&self, seq: ClassSeq) -> Option<ZRef> {
        self.records[seq.index()].value
    }

    fn set_cached_value(&mut self, seq: ClassSeq, v: ZRef) {
        self.records[seq.index()].value = Some(v);
    }

    /// Every memoized `Class` value allocated so far. Used by the GC
    /// (`crate::gc::collect`) to root the class-value cache: without
    /// this, a `Class` value built by `class_value` and stored only in
    /// this memo table (not on any frame) would dangle after a cycle.
    pub(crate) fn cached_values(&self) -> impl Iterator<Item = ZRef> + '_ {
        self.records.iter().filter_map(|r| r.value)
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the (lazily-allocated, then memoized) `Class` value
/// representing `seq`.
pub fn class_value(heap: &Heap, seq: ClassSeq) -> ZRef {
    if let Some(v) = heap.classes.borrow().cached_value(seq) {
        return v;
    }
    let zref = heap.alloc_value(Tag::Class, CLASS_CLASS, false, |header| ClassPayload {
        header,
        represents: seq,
    });
    heap.classes.borrow_mut().set_cached_value(seq, zref);
    zref
}

/// Thin read accessor used by the generic-dispatch and ordering code.
pub fn represents(zref: ZRef) -> ClassSeq {
    // Safety: caller has already checked `zref.tag() == Tag::Class`.
    unsafe { zref.payload::<ClassPayload>().represents }
}
