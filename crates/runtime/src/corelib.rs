//! Core-library bindings: the standard generics every built-in class
//! answers to, loaded once at init as `(class, generic-name, native-fn)`
//! triples, wiring the same handful of generics onto every primitive
//! class before any user code runs.
//!
//! `install` both seals each generic into `Heap::register_generic_for_symbol`
//! (the fast symbol-indexed dispatch path) and returns a `SymbolTable`
//! mapping each generic's name to itself, ready to pass as the `env`
//! argument to `Evaluator::eval_top` — the evaluator's own `call`/`apply`
//! dispatch never consults the fast path directly; it just treats
//! whatever a `varRef` resolves to as callable, generic or Function
//! alike, so binding into the seed environment is what actually makes
//! these names callable from evaluated code.

use sam_core::class::{
    ClassSeq, CLASS_BOX, CLASS_CLASS, CLASS_FUNCTION, CLASS_GENERIC, CLASS_INT, CLASS_LIST, CLASS_MAP,
    CLASS_RECORD, CLASS_STRING, CLASS_SYMBOL, CLASS_SYMBOL_TABLE, CLASS_UNIQLET,
};
use sam_core::error::SamError;
use sam_core::heap::Heap;
use sam_core::zref::ZRef;
use std::cell::Cell;

const DEBUG_STRING_RECURSION_LIMIT: u32 = 64;

thread_local! {
    static DEBUG_STRING_DEPTH: Cell<u32> = const { Cell::new(0) };
}

fn with_debug_string_guard<R>(f: impl FnOnce() -> R) -> R {
    let depth = DEBUG_STRING_DEPTH.with(|d| {
        let v = d.get() + 1;
        d.set(v);
        v
    });
    if depth > DEBUG_STRING_RECURSION_LIMIT {
        sam_core::error::fatal(SamError::invariant("debugString recursion limit exceeded"));
    }
    let result = f();
    DEBUG_STRING_DEPTH.with(|d| d.set(d.get() - 1));
    result
}

fn new_str(heap: &Heap, s: &str) -> ZRef {
    heap.new_string_from_utf8(s.as_bytes()).expect("ASCII/UTF-8 literal is always valid")
}

fn require<T>(opt: Option<T>, what: &str) -> T {
    opt.unwrap_or_else(|| sam_core::error::fatal(SamError::type_error(what)))
}

fn native_get(heap: &Heap, args: &[ZRef]) -> ZRef {
    let container = args[0];
    match container.class() {
        c if c == CLASS_MAP => {
            let m = require(heap.as_map(container), "get: not a Map");
            heap.map_get(m, args[1]).unwrap_or_else(|| heap.void())
        }
        c if c == CLASS_SYMBOL_TABLE => {
            let t = require(heap.as_symbol_table(container), "get: not a SymbolTable");
            let key = require(heap.as_symbol(args[1]), "get: SymbolTable key must be a Symbol");
            heap.symbol_table_get(t, key).unwrap_or_else(|| heap.void())
        }
        c if c == CLASS_RECORD => {
            let r = require(heap.as_record(container), "get: not a Record");
            let key = require(heap.as_symbol(args[1]), "get: Record key must be a Symbol");
            heap.record_get(r, key).unwrap_or_else(|| heap.void())
        }
        _ => sam_core::error::fatal(SamError::type_error("get: unsupported container class")),
    }
}

fn native_nth(heap: &Heap, args: &[ZRef]) -> ZRef {
    let index = require(heap.as_int(args[1]), "nth: index must be an Int").value();
    if index < 0 {
        return heap.void();
    }
    let index = index as usize;
    match args[0].class() {
        c if c == CLASS_LIST => {
            let l = require(heap.as_list(args[0]), "nth: not a List");
            l.nth(index).unwrap_or_else(|| heap.void())
        }
        c if c == CLASS_STRING => {
            let s = require(heap.as_string(args[0]), "nth: not a String");
            match s.nth(index) {
                Some(cp) => heap.new_string_from_codepoints(&[cp]),
                None => heap.void(),
            }
        }
        c if c == CLASS_MAP => {
            let m = require(heap.as_map(args[0]), "nth: not a Map");
            heap.map_nth(m, index).unwrap_or_else(|| heap.void())
        }
        _ => sam_core::error::fatal(SamError::type_error("nth: unsupported container class")),
    }
}

fn native_get_size(heap: &Heap, args: &[ZRef]) -> ZRef {
    let size = match args[0].class() {
        c if c == CLASS_LIST => require(heap.as_list(args[0]), "getSize: not a List").len(),
        c if c == CLASS_MAP => require(heap.as_map(args[0]), "getSize: not a Map").len(),
        c if c == CLASS_SYMBOL_TABLE => require(heap.as_symbol_table(args[0]), "getSize: not a SymbolTable").len(),
        c if c == CLASS_STRING => require(heap.as_string(args[0]), "getSize: not a String").len(),
        _ => sam_core::error::fatal(SamError::type_error("getSize: unsupported container class")),
    };
    heap.new_int(size as i64)
}

fn native_cat(heap: &Heap, args: &[ZRef]) -> ZRef {
    match args[0].class() {
        c if c == CLASS_LIST => {
            let a = require(heap.as_list(args[0]), "cat: not a List");
            let b = require(heap.as_list(args[1]), "cat: both operands must be Lists");
            heap.list_cat(a, b)
        }
        c if c == CLASS_MAP => {
            let a = require(heap.as_map(args[0]), "cat: not a Map");
            let b = require(heap.as_map(args[1]), "cat: both operands must be Maps");
            heap.map_cat(&[a, b])
        }
        c if c == CLASS_STRING => {
            let a = require(heap.as_string(args[0]), "cat: not a String");
            let b = require(heap.as_string(args[1]), "cat: both operands must be Strings");
            heap.string_cat(a, b)
        }
        _ => sam_core::error::fatal(SamError::type_error("cat: unsupported container class")),
    }
}

fn native_del(heap: &Heap, args: &[ZRef]) -> ZRef {
    match args[0].class() {
        c if c == CLASS_MAP => {
            let m = require(heap.as_map(args[0]), "del: not a Map");
            heap.map_del(m, args[1])
        }
        c if c == CLASS_LIST => {
            let l = require(heap.as_list(args[0]), "del: not a List");
            let idx = require(heap.as_int(args[1]), "del: List index must be an Int").value();
            heap.list_del_nth(l, idx.max(0) as usize)
        }
        _ => sam_core::error::fatal(SamError::type_error("del: unsupported container class")),
    }
}

fn native_put(heap: &Heap, args: &[ZRef]) -> ZRef {
    match args[0].class() {
        c if c == CLASS_MAP => {
            let m = require(heap.as_map(args[0]), "put: not a Map");
            heap.map_put(m, args[1], args[2])
        }
        c if c == CLASS_LIST => {
            let l = require(heap.as_list(args[0]), "put: not a List");
            let idx = require(heap.as_int(args[1]), "put: List index must be an Int").value();
            heap.list_put(l, idx.max(0) as usize, args[2])
        }
        _ => sam_core::error::fatal(SamError::type_error("put: unsupported container class")),
    }
}

fn native_fetch(heap: &Heap, args: &[ZRef]) -> ZRef {
    let b = require(heap.as_box(args[0]), "fetch: not a Box");
    b.fetch(heap).unwrap_or_else(|| heap.void())
}

fn native_store(heap: &Heap, args: &[ZRef]) -> ZRef {
    let b = require(heap.as_box(args[0]), "store: not a Box");
    b.store(args.get(1).copied()).unwrap_or_else(|| heap.void())
}

fn debug_string_of(heap: &Heap, v: ZRef) -> String {
    with_debug_string_guard(|| match v.class() {
        c if c == CLASS_INT => heap.as_int(v).unwrap().value().to_string(),
        c if c == CLASS_STRING => {
            let s = heap.as_string(v).unwrap();
            format!("{:?}", String::from_utf8_lossy(&s.to_utf8()))
        }
        c if c == CLASS_SYMBOL => format!("#{}", heap.as_symbol(v).unwrap().name()),
        c if c == CLASS_UNIQLET => "uniqlet".to_string(),
        c if c == CLASS_LIST => {
            let l = heap.as_list(v).unwrap();
            let parts: Vec<String> = l.items().iter().map(|x| debug_string_of(heap, *x)).collect();
            format!("[{}]", parts.join(", "))
        }
        c if c == CLASS_MAP => {
            let m = heap.as_map(v).unwrap();
            let parts: Vec<String> = m
                .pairs()
                .iter()
                .map(|(k, val)| format!("{}: {}", debug_string_of(heap, *k), debug_string_of(heap, *val)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        c if c == CLASS_SYMBOL_TABLE => {
            let t = heap.as_symbol_table(v).unwrap();
            let parts: Vec<String> = t
                .pairs()
                .iter()
                .map(|(k, val)| format!("{}: {}", k.name(), debug_string_of(heap, *val)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        c if c == CLASS_RECORD => {
            let r = heap.as_record(v).unwrap();
            let name = heap.class_name(r.class());
            format!("{}{}", name.name(), debug_string_of(heap, r.data()))
        }
        c if c == CLASS_BOX => "box".to_string(),
        c if c == CLASS_FUNCTION => "function".to_string(),
        c if c == CLASS_GENERIC => "generic".to_string(),
        c if c == CLASS_CLASS => "class".to_string(),
        other => format!("<{:?}>", other),
    })
}

fn native_debug_string(heap: &Heap, args: &[ZRef]) -> ZRef {
    new_str(heap, &debug_string_of(heap, args[0]))
}

fn native_total_order(heap: &Heap, args: &[ZRef]) -> ZRef {
    use std::cmp::Ordering;
    let ord = sam_core::order::total_cmp(heap, args[0], args[1]);
    heap.new_int(match ord {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn native_total_eq(heap: &Heap, args: &[ZRef]) -> ZRef {
    if sam_core::order::total_eq(heap, args[0], args[1]) {
        heap.new_int(1)
    } else {
        heap.void()
    }
}

/// One step of the iteration protocol over a List: given `(list,
/// index)`, returns a 2-element List `[hasMore, valueOrVoid]`. Not a
/// general lazy-sequence protocol — just enough surface to drive a
/// `while`-style consumer over an already-materialized List.
fn native_next_value(heap: &Heap, args: &[ZRef]) -> ZRef {
    let l = require(heap.as_list(args[0]), "nextValue: not a List");
    let idx = require(heap.as_int(args[1]), "nextValue: index must be an Int").value();
    match l.nth(idx.max(0) as usize) {
        Some(v) => heap.new_list(&[heap.new_int(1), v]),
        None => heap.new_list(&[heap.new_int(0), heap.void()]),
    }
}

/// Flattens a List-of-Lists into a single List, in order.
fn native_collect(heap: &Heap, args: &[ZRef]) -> ZRef {
    let outer = require(heap.as_list(args[0]), "collect: not a List");
    let mut out = Vec::new();
    for item in outer.items() {
        let inner = require(heap.as_list(*item), "collect: elements must be Lists");
        out.extend_from_slice(inner.items());
    }
    heap.new_list(&out)
}

/// No-op: the collector's own `mark_value` (`crates/core/src/gc.rs`)
/// already walks every structural value directly by `Tag`. This
/// binding exists so every standard generic has a real per-class entry,
/// without duplicating the collector's traversal logic here.
fn native_gc_mark_noop(heap: &Heap, _args: &[ZRef]) -> ZRef {
    heap.void()
}

fn native_add_int(heap: &Heap, args: &[ZRef]) -> ZRef {
    let a = require(heap.as_int(args[0]), "+: not an Int").value();
    let b = require(heap.as_int(args[1]), "+: not an Int").value();
    heap.new_int(a + b)
}

fn bind_each(heap: &Heap, generic: sam_core::generic::Generic, classes: &[ClassSeq], native: sam_core::function::NativeFn, min: u32, max: Option<u32>) {
    for &class in classes {
        generic.bind(class, heap.new_native_function(min, max, native));
    }
}

const SIZED_CLASSES: [ClassSeq; 4] = [CLASS_LIST, CLASS_MAP, CLASS_SYMBOL_TABLE, CLASS_STRING];
const ORDERABLE_CLASSES: [ClassSeq; 9] = [
    CLASS_INT,
    CLASS_STRING,
    CLASS_SYMBOL,
    CLASS_UNIQLET,
    CLASS_LIST,
    CLASS_MAP,
    CLASS_SYMBOL_TABLE,
    CLASS_RECORD,
    CLASS_CLASS,
];
const ALL_CLASSES: [ClassSeq; 12] = [
    CLASS_CLASS,
    CLASS_INT,
    CLASS_STRING,
    CLASS_SYMBOL,
    CLASS_UNIQLET,
    CLASS_LIST,
    CLASS_MAP,
    CLASS_SYMBOL_TABLE,
    CLASS_RECORD,
    CLASS_BOX,
    CLASS_FUNCTION,
    CLASS_GENERIC,
];

/// Installs every standard generic and returns a `SymbolTable` mapping
/// each one's name to itself — feed this straight to
/// `Evaluator::eval_top` as the seed environment.
pub fn install(heap: &Heap) -> ZRef {
    let mut env: Vec<(sam_core::symbol::Symbol, ZRef)> = Vec::new();

    macro_rules! generic {
        ($name:literal, $min:expr, $max:expr, $same_class:expr, $classes:expr, $native:expr) => {{
            let g = heap.as_generic(heap.new_generic($min, $max, $same_class)).unwrap();
            bind_each(heap, g, &$classes, $native, $min, $max);
            g.seal();
            let sym = heap.intern($name);
            heap.register_generic_for_symbol(sym, g.zref());
            env.push((sym, g.zref()));
        }};
    }

    generic!("get", 2, Some(2), false, [CLASS_MAP, CLASS_SYMBOL_TABLE, CLASS_RECORD], native_get);
    generic!("nth", 2, Some(2), false, [CLASS_LIST, CLASS_STRING, CLASS_MAP], native_nth);
    generic!("getSize", 1, Some(1), false, SIZED_CLASSES, native_get_size);
    generic!("cat", 2, Some(2), true, [CLASS_LIST, CLASS_MAP, CLASS_STRING], native_cat);
    generic!("del", 2, Some(2), false, [CLASS_MAP, CLASS_LIST], native_del);
    generic!("put", 3, Some(3), false, [CLASS_MAP, CLASS_LIST], native_put);
    generic!("fetch", 1, Some(1), false, [CLASS_BOX], native_fetch);
    generic!("store", 1, Some(2), false, [CLASS_BOX], native_store);
    generic!("debugString", 1, Some(1), false, ALL_CLASSES, native_debug_string);
    generic!("totalOrder", 2, Some(2), true, ORDERABLE_CLASSES, native_total_order);
    generic!("totalEq", 2, Some(2), false, ORDERABLE_CLASSES, native_total_eq);
    generic!("nextValue", 2, Some(2), false, [CLASS_LIST], native_next_value);
    generic!("collect", 1, Some(1), false, [CLASS_LIST], native_collect);
    generic!("gcMark", 1, Some(1), false, ALL_CLASSES, native_gc_mark_noop);
    generic!("+", 2, Some(2), true, [CLASS_INT], native_add_int);

    heap.new_symbol_table(&env)
}
