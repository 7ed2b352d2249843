//! SymbolTable: a finite, persistent, immutable association from
//! `Symbol` keys to arbitrary values — the representation used for
//! variable/binding environments and a Record's field storage.
//!
//! Same sorted-array cost model as [`crate::map`], but keyed
//! specifically by `Symbol` (ordered by [`crate::order::symbol_cmp`])
//! rather than the fully general total order. Kept distinct from `Map`
//! because bindings are looked up by symbol identity far more often
//! than by arbitrary key.

use crate::class::CLASS_SYMBOL_TABLE;
use crate::header::Tag;
use crate::heap::Heap;
use crate::order::{symbol_cmp, total_eq};
use crate::symbol::Symbol;
use crate::zref::ZRef;

#[repr(C)]
pub struct SymbolTablePayload {
    pub(crate) header: crate::header::Header,
    pub(crate) pairs: Box<[(Symbol, ZRef)]>,
}

#[derive(Clone, Copy, Debug)]
pub struct SamSymbolTable(pub(crate) ZRef);

impl SamSymbolTable {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &SymbolTablePayload {
        unsafe { self.0.payload::<SymbolTablePayload>() }
    }

    pub fn len(&self) -> usize {
        self.payload().pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pairs(&self) -> &[(Symbol, ZRef)] {
        &self.payload().pairs
    }
}

pub(crate) fn alloc_empty_symbol_table(heap: &Heap) -> ZRef {
    heap.new_symbol_table(&[])
}

fn normalize(heap: &Heap, pairs: &[(Symbol, ZRef)]) -> Vec<(Symbol, ZRef)> {
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| symbol_cmp(heap, a.0.zref(), b.0.zref()));
    let mut out: Vec<(Symbol, ZRef)> = Vec::with_capacity(sorted.len());
    for (k, v) in sorted {
        match out.last_mut() {
            Some(last) if last.0 == k => *last = (k, v),
            _ => out.push((k, v)),
        }
    }
    out
}

fn find(heap: &Heap, table: SamSymbolTable, key: Symbol) -> Result<usize, usize> {
    table.pairs().binary_search_by(|(k, _)| symbol_cmp(heap, k.zref(), key.zref()))
}

impl Heap {
    /// Builds a symbol table from a "pairs" helper argument list — useful
    /// both for building closure environments and for Record field
    /// initializers.
    pub fn new_symbol_table(&self, pairs: &[(Symbol, ZRef)]) -> ZRef {
        if pairs.is_empty() {
            if let Some(e) = self.empty_symbol_table.get() {
                return e;
            }
        }
        let normalized = normalize(self, pairs);
        self.alloc_value(Tag::SymbolTable, CLASS_SYMBOL_TABLE, false, |header| SymbolTablePayload {
            header,
            pairs: normalized.into_boxed_slice(),
        })
    }

    pub fn as_symbol_table(&self, zref: ZRef) -> Option<SamSymbolTable> {
        if zref.tag() == Tag::SymbolTable {
            Some(SamSymbolTable(zref))
        } else {
            None
        }
    }

    pub fn symbol_table_get(&self, table: SamSymbolTable, key: Symbol) -> Option<ZRef> {
        find(self, table, key).ok().map(|idx| table.pairs()[idx].1)
    }

    /// Fatal if `key` is already bound: redefining a variable in the
    /// same scope is a structural error.
    pub fn symbol_table_bind(&self, table: SamSymbolTable, key: Symbol, value: ZRef) -> ZRef {
        match find(self, table, key) {
            Ok(_) => panic!("fatal: duplicate binding for symbol {:?}", key.name()),
            Err(idx) => {
                let mut pairs = table.pairs().to_vec();
                pairs.insert(idx, (key, value));
                self.alloc_value(Tag::SymbolTable, CLASS_SYMBOL_TABLE, false, |header| SymbolTablePayload {
                    header,
                    pairs: pairs.into_boxed_slice(),
                })
            }
        }
    }

    pub fn symbol_table_eq(&self, a: SamSymbolTable, b: SamSymbolTable) -> bool {
        a.len() == b.len()
            && a.pairs()
                .iter()
                .zip(b.pairs().iter())
                .all(|((ka, va), (kb, vb))| ka == kb && total_eq(self, *va, *vb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_then_get_roundtrips() {
        let heap = Heap::new();
        let table = heap.as_symbol_table(heap.new_symbol_table(&[])).unwrap();
        let k = heap.intern("x");
        let v = heap.new_int(1);
        let table2 = heap.as_symbol_table(heap.symbol_table_bind(table, k, v)).unwrap();
        assert_eq!(heap.symbol_table_get(table2, k), Some(v));
    }

    #[test]
    #[should_panic(expected = "duplicate binding")]
    fn rebinding_is_fatal() {
        let heap = Heap::new();
        let table = heap.as_symbol_table(heap.new_symbol_table(&[])).unwrap();
        let k = heap.intern("x");
        let v1 = heap.new_int(1);
        let v2 = heap.new_int(2);
        let table2 = heap.as_symbol_table(heap.symbol_table_bind(table, k, v1)).unwrap();
        heap.symbol_table_bind(table2, k, v2);
    }
}
