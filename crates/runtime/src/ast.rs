//! AST node-tag constants and constructor helpers.
//!
//! An AST node is an ordinary `sam_core::record::SamRecord` whose class
//! is a derived-data class created (idempotently) from the node's tag
//! name: a Record is `(tag: interned Symbol, data: SymbolTable or
//! null)`, and this crate's `Record` class slot *is* that tag, per the
//! `DerivedData`-vs-`Record` resolution in `DESIGN.md`.
//!
//! The constructors below (`make_literal`, `make_var_ref`, `make_call`,
//! ...) are thin sugar over `Heap::new_record_of_class`, not a parser —
//! nothing here builds an AST from source text.

use sam_core::class::ClassSeq;
use sam_core::heap::Heap;
use sam_core::symbol::Symbol;
use sam_core::zref::ZRef;

/// The fixed vocabulary of node tags an evaluator must dispatch on.
/// Interned once per `Evaluator` so dispatch is a handful of pointer
/// comparisons rather than string matches.
pub struct Tags {
    pub literal: Symbol,
    pub var_ref: Symbol,
    pub var_def: Symbol,
    pub var_def_mutable: Symbol,
    pub var_bind: Symbol,
    pub call: Symbol,
    pub apply: Symbol,
    pub closure: Symbol,
    pub fn_: Symbol,
    pub return_: Symbol,
    pub yield_: Symbol,
    pub maybe: Symbol,
    pub no_yield: Symbol,
    pub nonlocal_exit: Symbol,
    pub fetch: Symbol,
    pub store: Symbol,
    pub mapping: Symbol,
    pub map_expression: Symbol,
    pub module: Symbol,
    pub import_module: Symbol,
    pub import_module_selection: Symbol,
    pub import_resource: Symbol,
    pub export: Symbol,
    pub export_selection: Symbol,
    pub directive: Symbol,
    pub external: Symbol,
    pub internal: Symbol,
    pub int: Symbol,
    pub string: Symbol,
    pub identifier: Symbol,
}

impl Tags {
    pub fn new(heap: &Heap) -> Self {
        Tags {
            literal: heap.intern("literal"),
            var_ref: heap.intern("varRef"),
            var_def: heap.intern("varDef"),
            var_def_mutable: heap.intern("varDefMutable"),
            var_bind: heap.intern("varBind"),
            call: heap.intern("call"),
            apply: heap.intern("apply"),
            closure: heap.intern("closure"),
            fn_: heap.intern("fn"),
            return_: heap.intern("return"),
            yield_: heap.intern("yield"),
            maybe: heap.intern("maybe"),
            no_yield: heap.intern("noYield"),
            nonlocal_exit: heap.intern("nonlocalExit"),
            fetch: heap.intern("fetch"),
            store: heap.intern("store"),
            mapping: heap.intern("mapping"),
            map_expression: heap.intern("mapExpression"),
            module: heap.intern("module"),
            import_module: heap.intern("importModule"),
            import_module_selection: heap.intern("importModuleSelection"),
            import_resource: heap.intern("importResource"),
            export: heap.intern("export"),
            export_selection: heap.intern("exportSelection"),
            directive: heap.intern("directive"),
            external: heap.intern("external"),
            internal: heap.intern("internal"),
            int: heap.intern("int"),
            string: heap.intern("string"),
            identifier: heap.intern("identifier"),
        }
    }
}

fn node_class(heap: &Heap, tag: Symbol) -> ClassSeq {
    heap.create_derived_class(tag, None)
}

/// Builds a node: a `Record` of class `tag`, with `data` built from the
/// given field-name/value pairs.
pub fn record(heap: &Heap, tag: Symbol, fields: &[(&str, ZRef)]) -> ZRef {
    let class = node_class(heap, tag);
    let pairs: Vec<(Symbol, ZRef)> = fields.iter().map(|(k, v)| (heap.intern(k), *v)).collect();
    let data = heap.as_symbol_table(heap.new_symbol_table(&pairs)).unwrap();
    heap.new_record_of_class(class, data)
}

pub fn make_literal(heap: &Heap, tags: &Tags, value: ZRef) -> ZRef {
    record(heap, tags.literal, &[("value", value)])
}

pub fn make_var_ref(heap: &Heap, tags: &Tags, name: Symbol) -> ZRef {
    record(heap, tags.var_ref, &[("name", name.zref())])
}

pub fn make_var_def(heap: &Heap, tags: &Tags, name: Symbol, value: ZRef) -> ZRef {
    record(heap, tags.var_def, &[("name", name.zref()), ("value", value)])
}

pub fn make_var_def_mutable(heap: &Heap, tags: &Tags, name: Symbol, value: ZRef) -> ZRef {
    record(heap, tags.var_def_mutable, &[("name", name.zref()), ("value", value)])
}

/// Unlike `varDef`, `value` here must evaluate directly to a Box —
/// used to bind an already-constructed box (e.g. a Promise handed in
/// from native code) under a name, rather than wrapping a fresh value.
pub fn make_var_bind(heap: &Heap, tags: &Tags, name: Symbol, value: ZRef) -> ZRef {
    record(heap, tags.var_bind, &[("name", name.zref()), ("value", value)])
}

pub fn make_store(heap: &Heap, tags: &Tags, name: Symbol, value: ZRef) -> ZRef {
    record(heap, tags.store, &[("name", name.zref()), ("value", value)])
}

pub fn make_fetch(heap: &Heap, tags: &Tags, target: ZRef) -> ZRef {
    record(heap, tags.fetch, &[("target", target)])
}

pub fn make_call(heap: &Heap, tags: &Tags, target: ZRef, values: ZRef) -> ZRef {
    record(heap, tags.call, &[("target", target), ("values", values)])
}

pub fn make_apply(heap: &Heap, tags: &Tags, target: ZRef, values: ZRef) -> ZRef {
    record(heap, tags.apply, &[("target", target), ("values", values)])
}

/// `formals` must be a List of `formal` records built by
/// [`make_formal`]; `statements` a List of statement nodes.
pub fn make_closure(
    heap: &Heap,
    tags: &Tags,
    formals: ZRef,
    yield_def: Option<Symbol>,
    name: Option<Symbol>,
    statements: ZRef,
) -> ZRef {
    let mut fields = vec![("formals", formals), ("statements", statements)];
    if let Some(y) = yield_def {
        fields.push(("yieldDef", y.zref()));
    }
    if let Some(n) = name {
        fields.push(("name", n.zref()));
    }
    record(heap, tags.closure, &fields)
}

pub fn make_return(heap: &Heap, tags: &Tags, value: Option<ZRef>) -> ZRef {
    match value {
        Some(v) => record(heap, tags.return_, &[("value", v)]),
        None => record(heap, tags.return_, &[]),
    }
}

pub fn make_yield(heap: &Heap, tags: &Tags, value: Option<ZRef>) -> ZRef {
    match value {
        Some(v) => record(heap, tags.yield_, &[("value", v)]),
        None => record(heap, tags.yield_, &[]),
    }
}

pub fn make_nonlocal_exit(heap: &Heap, tags: &Tags, function: ZRef, value: Option<ZRef>) -> ZRef {
    match value {
        Some(v) => record(heap, tags.nonlocal_exit, &[("function", function), ("value", v)]),
        None => record(heap, tags.nonlocal_exit, &[("function", function)]),
    }
}

pub fn make_no_yield(heap: &Heap, tags: &Tags, message: Option<ZRef>) -> ZRef {
    match message {
        Some(m) => record(heap, tags.no_yield, &[("message", m)]),
        None => record(heap, tags.no_yield, &[]),
    }
}

pub fn make_maybe(heap: &Heap, tags: &Tags, value: ZRef) -> ZRef {
    record(heap, tags.maybe, &[("value", value)])
}

pub fn make_mapping(heap: &Heap, tags: &Tags, key: ZRef, value: ZRef) -> ZRef {
    record(heap, tags.mapping, &[("key", key), ("value", value)])
}

pub fn make_map_expression(heap: &Heap, tags: &Tags, mappings: ZRef) -> ZRef {
    record(heap, tags.map_expression, &[("mappings", mappings)])
}

/// A `formal` is not itself an AST node tag (it never gets evaluated)
/// but is shaped the same way for uniformity: `{name, repeat?}` where
/// `repeat` is one of the Symbols `"?"`, `"*"`, `"+"` when present.
pub fn make_formal(heap: &Heap, name: Symbol, repeat: Option<&str>) -> ZRef {
    let mut fields = vec![("name", name.zref())];
    let repeat_sym;
    if let Some(r) = repeat {
        repeat_sym = heap.intern(r);
        fields.push(("repeat", repeat_sym.zref()));
    }
    let data: Vec<(Symbol, ZRef)> = fields.iter().map(|(k, v)| (heap.intern(k), *v)).collect();
    let table = heap.as_symbol_table(heap.new_symbol_table(&data)).unwrap();
    // Formals are plain data, not dispatched by tag, so they live under
    // the builtin Record class rather than a derived one.
    heap.new_record(table)
}
