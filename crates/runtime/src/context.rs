//! Execution context: a linked chain of lexical frames, each holding a
//! Symbol→Box bindings table.
//!
//! A context is itself an ordinary heap `Record` — not a side Rust
//! structure — specifically so that a closure's captured context
//! (`sam_core::function::FunctionBody::Interpreted`'s `captured` field)
//! is a plain `ZRef` the collector already knows how to trace (via
//! `Record`'s existing mark rule) with zero extra GC plumbing. The
//! frame's *bindings* live behind a Cell [`sam_core::zbox::SamBox`] so
//! that later statements in the same block can keep adding names to a
//! context a closure already captured, exactly as a live lexical scope
//! should behave.

use sam_core::class::ClassSeq;
use sam_core::heap::Heap;
use sam_core::record::SamRecord;
use sam_core::symbol::Symbol;
use sam_core::symbol_table::SamSymbolTable;
use sam_core::zbox::SamBox;
use sam_core::zref::ZRef;

fn context_class(heap: &Heap) -> ClassSeq {
    // Not a user-visible AST tag, so it lives under its own reserved
    // name rather than anything in `crate::ast::Tags`.
    heap.create_derived_class(heap.intern("$evaluatorContext"), None)
}

/// A lexical frame handle. Cheap to copy — it's a `ZRef` underneath.
#[derive(Clone, Copy)]
pub struct Context(ZRef);

impl Context {
    pub fn root(heap: &Heap) -> Self {
        Self::new(heap, None)
    }

    /// A fresh child frame whose parent is `self`.
    pub fn child(&self, heap: &Heap) -> Self {
        Self::new(heap, Some(*self))
    }

    fn new(heap: &Heap, parent: Option<Context>) -> Self {
        let bindings_box = heap.new_cell_box(Some(heap.new_symbol_table(&[])));
        let parent_field = parent.map(|p| p.0).unwrap_or_else(|| heap.void());
        let data = heap.as_symbol_table(heap.new_symbol_table(&[
            (heap.intern("bindings"), bindings_box),
            (heap.intern("parent"), parent_field),
        ]))
        .unwrap();
        let class = context_class(heap);
        Context(heap.new_record_of_class(class, data))
    }

    pub fn zref(&self) -> ZRef {
        self.0
    }

    /// Reconstructs a `Context` handle over a `captured` value produced
    /// by `Context::zref`. Fatal if `zref` isn't actually a context
    /// (a defensive check against a malformed `Function` payload).
    pub fn from_zref(zref: ZRef) -> Self {
        Context(zref)
    }

    /// A pointer-derived id stable for the context's lifetime, used as
    /// the nonlocal-exit target. Records don't carry an identity id
    /// (only identity-bearing classes do), so the
    /// backing allocation's address stands in — it cannot move and
    /// stays unique as long as the context is reachable, which the
    /// exit mechanism itself guarantees for the span it matters.
    pub fn id(&self) -> u64 {
        self.0.ptr_id()
    }

    fn record(&self, heap: &Heap) -> SamRecord {
        heap.as_record(self.0).expect("context handle is always a Record")
    }

    fn bindings_box(&self, heap: &Heap) -> SamBox {
        let v = heap
            .record_get(self.record(heap), heap.intern("bindings"))
            .expect("context always has a bindings field");
        heap.as_box(v).expect("context bindings field is always a Box")
    }

    fn bindings(&self, heap: &Heap) -> SamSymbolTable {
        let v = self
            .bindings_box(heap)
            .fetch(heap)
            .expect("context bindings box is never void");
        heap.as_symbol_table(v).expect("context bindings is always a SymbolTable")
    }

    pub fn parent(&self, heap: &Heap) -> Option<Context> {
        let v = heap
            .record_get(self.record(heap), heap.intern("parent"))
            .expect("context always has a parent field");
        if heap.is_void(v) {
            None
        } else {
            Some(Context(v))
        }
    }

    /// Binds `name` to `box_zref` in *this* frame only. Fatal if `name`
    /// is already bound here — a second binding of the same name in
    /// the same frame is fatal — enforced for free by
    /// `Heap::symbol_table_bind`'s own duplicate-key panic.
    pub fn define(&self, heap: &Heap, name: Symbol, box_zref: ZRef) {
        let current = self.bindings(heap);
        let updated = heap.symbol_table_bind(current, name, box_zref);
        self.bindings_box(heap).store(Some(updated));
    }

    /// Walks from this frame up through ancestors looking for `name`,
    /// returning the bound Box (not its fetched value — callers decide
    /// whether to `fetch` or `store` through it).
    pub fn lookup_box(&self, heap: &Heap, name: Symbol) -> Option<SamBox> {
        let mut frame = Some(*self);
        while let Some(ctx) = frame {
            if let Some(v) = heap.symbol_table_get(ctx.bindings(heap), name) {
                return heap.as_box(v);
            }
            frame = ctx.parent(heap);
        }
        None
    }
}
