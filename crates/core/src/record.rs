//! Record: a plain record is a bag of symbol-keyed fields tagged with
//! the builtin `Record` class; a *derived-data* value is the exact
//! same representation tagged with a registered custom class instead
//! (see `DESIGN.md` for why no separate representation was introduced).
//!
//! `Tag::Record` covers both; what distinguishes a derived-data
//! instance from a plain record is purely its `ClassSeq`
//! (`crate::header::Header::class`), never its Rust type.

use crate::class::{ClassSeq, CLASS_RECORD};
use crate::header::Tag;
use crate::heap::Heap;
use crate::symbol::Symbol;
use crate::symbol_table::SamSymbolTable;
use crate::zref::ZRef;

#[repr(C)]
pub struct RecordPayload {
    pub(crate) header: crate::header::Header,
    /// Field bindings, stored as a `Tag::SymbolTable` value so
    /// `crate::order` can compare records structurally for free.
    pub(crate) data: ZRef,
}

#[derive(Clone, Copy, Debug)]
pub struct SamRecord(pub(crate) ZRef);

impl SamRecord {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &RecordPayload {
        unsafe { self.0.payload::<RecordPayload>() }
    }

    /// The class this record is an instance of: `CLASS_RECORD` for a
    /// plain record, or a derived-data `ClassSeq` otherwise.
    pub fn class(&self) -> ClassSeq {
        self.0.class()
    }

    pub fn data(&self) -> ZRef {
        self.payload().data
    }

    pub fn is_plain(&self) -> bool {
        self.class() == CLASS_RECORD
    }
}

impl Heap {
    /// Constructs a plain record (`class == CLASS_RECORD`).
    pub fn new_record(&self, data: SamSymbolTable) -> ZRef {
        self.new_record_of_class(CLASS_RECORD, data)
    }

    /// Constructs a derived-data instance of `class`. Fatal if `class`
    /// was never registered.
    pub fn new_record_of_class(&self, class: ClassSeq, data: SamSymbolTable) -> ZRef {
        if class.index() >= self.classes.borrow().len() {
            panic!("fatal: unregistered class {:?} used to construct a record", class);
        }
        self.alloc_value(Tag::Record, class, false, |header| RecordPayload {
            header,
            data: data.zref(),
        })
    }

    pub fn as_record(&self, zref: ZRef) -> Option<SamRecord> {
        if zref.tag() == Tag::Record {
            Some(SamRecord(zref))
        } else {
            None
        }
    }

    pub fn record_get(&self, record: SamRecord, key: Symbol) -> Option<ZRef> {
        let data = self.as_symbol_table(record.data()).expect("record data is always a SymbolTable");
        self.symbol_table_get(data, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_record_roundtrips_a_field() {
        let heap = Heap::new();
        let x = heap.intern("x");
        let one = heap.new_int(1);
        let data = heap.as_symbol_table(heap.new_symbol_table(&[(x, one)])).unwrap();
        let record = heap.as_record(heap.new_record(data)).unwrap();
        assert!(record.is_plain());
        assert_eq!(heap.record_get(record, x), Some(one));
    }

    #[test]
    fn derived_class_instance_is_not_plain() {
        let heap = Heap::new();
        let name = heap.intern("Point");
        let class = heap.classes.borrow_mut().create_derived(name, None);
        let data = heap.as_symbol_table(heap.new_symbol_table(&[])).unwrap();
        let record = heap.as_record(heap.new_record_of_class(class, data)).unwrap();
        assert!(!record.is_plain());
        assert_eq!(record.class(), class);
    }
}
