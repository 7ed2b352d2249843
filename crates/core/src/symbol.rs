//! Symbol: interned or unlisted names.
//!
//! Interned symbols are uniqued by textual name and carry a stable
//! dense index used as a fast key for "which generic does this
//! selector name" lookups (`Heap::generic_for_symbol`). Unlisted
//! symbols are always fresh, even when their name collides with an
//! existing symbol.

use crate::class::CLASS_SYMBOL;
use crate::header::Tag;
use crate::heap::Heap;
use crate::limits::MAX_SYMBOLS;
use crate::zref::ZRef;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum SymbolKind {
    Interned(u32),
    Unlisted(u64),
}

#[repr(C)]
pub struct SymbolPayload {
    pub(crate) header: crate::header::Header,
    pub(crate) kind: SymbolKind,
    pub(crate) name: Box<str>,
}

/// A handle to a heap-allocated Symbol value.
///
/// Equality is pointer identity, which is exactly symbol equality:
/// two interned symbols with the same name *are* the same `ZRef`
/// (interning guarantees it), and two unlisted symbols are never equal
/// even with the same name.
#[derive(Clone, Copy, Debug)]
pub struct Symbol(pub(crate) ZRef);

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.is_same(&other.0)
    }
}
impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0.as_header_ptr().as_ptr() as usize).hash(state);
    }
}

impl Symbol {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &SymbolPayload {
        // Safety: constructed only over Tag::Symbol allocations.
        unsafe { self.0.payload::<SymbolPayload>() }
    }

    pub fn name(&self) -> &str {
        &self.payload().name
    }

    pub fn is_interned(&self) -> bool {
        matches!(self.payload().kind, SymbolKind::Interned(_))
    }

    /// Dense interned index, if this symbol is interned.
    pub fn interned_index(&self) -> Option<u32> {
        match self.payload().kind {
            SymbolKind::Interned(i) => Some(i),
            SymbolKind::Unlisted(_) => None,
        }
    }

    /// Per-instance identity id for unlisted symbols, used to break
    /// ordering ties.
    pub fn unlisted_id(&self) -> Option<u64> {
        match self.payload().kind {
            SymbolKind::Interned(_) => None,
            SymbolKind::Unlisted(id) => Some(id),
        }
    }
}

impl Heap {
    /// Interns (or finds) a symbol by name.
    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(existing) = self.symbol_intern_table.borrow().get(name) {
            return Symbol(*existing);
        }
        let index = self.symbol_intern_table.borrow().len();
        if index >= MAX_SYMBOLS {
            panic!("fatal: interned-symbol table overflow (max {})", MAX_SYMBOLS);
        }
        let zref = self.alloc_value(Tag::Symbol, CLASS_SYMBOL, true, |header| SymbolPayload {
            header,
            kind: SymbolKind::Interned(index as u32),
            name: name.into(),
        });
        self.symbol_intern_table
            .borrow_mut()
            .insert(name.to_string(), zref);
        Symbol(zref)
    }

    /// Constructs a fresh unlisted symbol; never shared, even if
    /// `name` collides with an existing symbol.
    pub fn new_unlisted_symbol(&self, name: &str) -> Symbol {
        let id = self.next_identity_id();
        let zref = self.alloc_value(Tag::Symbol, CLASS_SYMBOL, true, |header| SymbolPayload {
            header,
            kind: SymbolKind::Unlisted(id),
            name: name.into(),
        });
        Symbol(zref)
    }

    pub fn as_symbol(&self, zref: ZRef) -> Option<Symbol> {
        if zref.tag() == Tag::Symbol {
            Some(Symbol(zref))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_identical_symbol() {
        let heap = Heap::new();
        let a = heap.intern("x");
        let b = heap.intern("x");
        assert!(a.zref().is_same(&b.zref()));
        assert_eq!(a.interned_index(), b.interned_index());
    }

    #[test]
    fn unlisted_symbols_are_always_distinct() {
        let heap = Heap::new();
        let a = heap.new_unlisted_symbol("x");
        let b = heap.new_unlisted_symbol("x");
        assert!(!a.zref().is_same(&b.zref()));
        assert_ne!(a, b);
    }

    #[test]
    fn interned_and_unlisted_with_same_name_differ() {
        let heap = Heap::new();
        let a = heap.intern("dup");
        let b = heap.new_unlisted_symbol("dup");
        assert_ne!(a, b);
        assert_eq!(a.name(), b.name());
    }
}
