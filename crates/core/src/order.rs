//! Total order over every value: used by `Map`'s sorted key storage,
//! `Record`'s sorted binding storage, and the ordering-sensitive
//! container comparisons themselves.
//!
//! Same-pointer values compare equal without inspecting anything else:
//! pointer equality implies value equality. Values of the same built-in
//! class fall back to their natural order; values of different classes
//! order by class name, giving every pair of values in the system a
//! defined relative order even across unrelated types.

use crate::class::represents;
use crate::header::Tag;
use crate::heap::Heap;
use crate::zref::ZRef;
use std::cmp::Ordering;

pub fn total_eq(heap: &Heap, a: ZRef, b: ZRef) -> bool {
    a.is_same(&b) || total_cmp(heap, a, b) == Ordering::Equal
}

pub fn total_cmp(heap: &Heap, a: ZRef, b: ZRef) -> Ordering {
    if a.is_same(&b) {
        return Ordering::Equal;
    }
    if a.class() != b.class() {
        let registry = heap.classes.borrow();
        return registry.name(a.class()).name().cmp(registry.name(b.class()).name());
    }
    match a.tag() {
        Tag::Int => heap.as_int(a).unwrap().cmp(&heap.as_int(b).unwrap()),
        Tag::String => heap.as_string(a).unwrap().cmp(&heap.as_string(b).unwrap()),
        Tag::Symbol => symbol_cmp(heap, a, b),
        Tag::Uniqlet => heap.as_uniqlet(a).unwrap().cmp(&heap.as_uniqlet(b).unwrap()),
        Tag::List => list_cmp(heap, a, b),
        Tag::Map => map_cmp(heap, a, b),
        Tag::SymbolTable => symbol_table_cmp(heap, a, b),
        Tag::Record => record_cmp(heap, a, b),
        Tag::Class => represents(a).cmp(&represents(b)),
        // No natural order beyond identity for these classes: fall
        // back to allocation id.
        Tag::Generic | Tag::Function | Tag::Box => a.identity_id().cmp(&b.identity_id()),
    }
}

pub(crate) fn symbol_cmp(heap: &Heap, a: ZRef, b: ZRef) -> Ordering {
    let sa = heap.as_symbol(a).unwrap();
    let sb = heap.as_symbol(b).unwrap();
    match (sa.interned_index(), sb.interned_index()) {
        (Some(ia), Some(ib)) => ia.cmp(&ib),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => sa
            .name()
            .cmp(sb.name())
            .then(sa.unlisted_id().cmp(&sb.unlisted_id())),
    }
}

fn list_cmp(heap: &Heap, a: ZRef, b: ZRef) -> Ordering {
    let la = heap.as_list(a).unwrap();
    let lb = heap.as_list(b).unwrap();
    for (x, y) in la.items().iter().zip(lb.items().iter()) {
        let c = total_cmp(heap, *x, *y);
        if c != Ordering::Equal {
            return c;
        }
    }
    la.len().cmp(&lb.len())
}

fn map_cmp(heap: &Heap, a: ZRef, b: ZRef) -> Ordering {
    let ma = heap.as_map(a).unwrap();
    let mb = heap.as_map(b).unwrap();
    for ((ka, va), (kb, vb)) in ma.pairs().iter().zip(mb.pairs().iter()) {
        let c = total_cmp(heap, *ka, *kb);
        if c != Ordering::Equal {
            return c;
        }
        let c = total_cmp(heap, *va, *vb);
        if c != Ordering::Equal {
            return c;
        }
    }
    ma.len().cmp(&mb.len())
}

fn symbol_table_cmp(heap: &Heap, a: ZRef, b: ZRef) -> Ordering {
    let ta = heap.as_symbol_table(a).unwrap();
    let tb = heap.as_symbol_table(b).unwrap();
    for ((ka, va), (kb, vb)) in ta.pairs().iter().zip(tb.pairs().iter()) {
        let c = symbol_cmp(heap, ka.zref(), kb.zref());
        if c != Ordering::Equal {
            return c;
        }
        let c = total_cmp(heap, *va, *vb);
        if c != Ordering::Equal {
            return c;
        }
    }
    ta.len().cmp(&tb.len())
}

fn record_cmp(heap: &Heap, a: ZRef, b: ZRef) -> Ordering {
    let ra = heap.as_record(a).unwrap();
    let rb = heap.as_record(b).unwrap();
    ra.class()
        .cmp(&rb.class())
        .then_with(|| total_cmp(heap, ra.data(), rb.data()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_order_by_value() {
        let heap = Heap::new();
        let a = heap.new_int(1);
        let b = heap.new_int(2);
        assert_eq!(total_cmp(&heap, a, b), Ordering::Less);
    }

    #[test]
    fn different_classes_order_by_class_name() {
        let heap = Heap::new();
        let i = heap.new_int(1);
        let s = heap.new_string_from_utf8(b"x").unwrap();
        let expected = "Int".cmp("String");
        assert_eq!(total_cmp(&heap, i, s), expected);
    }

    #[test]
    fn same_pointer_is_equal_without_inspection() {
        let heap = Heap::new();
        let a = heap.new_int(1);
        assert!(total_eq(&heap, a, a));
    }
}
