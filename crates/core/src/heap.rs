//! The managed heap: allocation, the intrusive live-set list, and all
//! of the process-wide (here: per-`Heap`) singleton tables that must
//! be immortalized at init (interned symbols, small-int cache,
//! empty-container singletons, class registry).
//!
//! A real embedder constructs exactly one `Heap` and threads `&Heap`
//! through everything, rather than reaching for `static`/
//! `thread_local!` globals the way `error.rs` does; it also makes the
//! collector testable in isolation, which a hidden global would not.

use crate::class::{ClassRegistry, ClassSeq, NUM_BUILTIN_CLASSES};
use crate::frame::{FrameStack, SavedStack};
use crate::header::{Header, Tag, MAGIC};
use crate::limits::{ALLOCATIONS_PER_GC, MAX_IMMORTALS, SMALL_INT_MAX, SMALL_INT_MIN};
use crate::map_cache::MapCache;
use crate::symbol::Symbol;
use crate::zref::ZRef;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ptr::NonNull;

pub struct Heap {
    head: Cell<Option<NonNull<Header>>>,
    live_count: Cell<usize>,
    alloc_since_gc: Cell<usize>,
    gc_threshold: usize,
    next_id: Cell<u64>,
    pub(crate) immortals: RefCell<Vec<ZRef>>,
    pub(crate) classes: RefCell<ClassRegistry>,
    pub(crate) symbol_intern_table: RefCell<HashMap<String, ZRef>>,
    pub(crate) small_int_cache: RefCell<Vec<Option<ZRef>>>,
    pub(crate) ascii_char_cache: RefCell<Vec<Option<ZRef>>>,
    pub(crate) empty_list: Cell<Option<ZRef>>,
    pub(crate) empty_map: Cell<Option<ZRef>>,
    pub(crate) empty_symbol_table: Cell<Option<ZRef>>,
    /// Immortal sentinel standing in for "void" wherever an API must
    /// return a bare `ZRef` but the logical result is absent — void is
    /// the absence of a value, not a value itself, and this is the one
    /// place that distinction has to be bridged back into a concrete
    /// pointer, at the `Heap::call` FFI-shaped boundary. Every other
    /// API in this crate uses `Option<ZRef>` directly.
    pub(crate) void: Cell<Option<ZRef>>,
    pub(crate) map_cache: RefCell<MapCache>,
    pub(crate) frames: RefCell<FrameStack>,
    /// Dense symbol-index -> bound Generic lookup: the interned
    /// symbol's index is used as a table key for method dispatch.
    pub(crate) generics_by_symbol: RefCell<Vec<Option<ZRef>>>,
    gc_cycles: Cell<u64>,
    /// Evaluator callback for interpreted `Function` bodies, set once by
    /// `sam-runtime` at startup. `sam-core` only knows how to invoke
    /// `Native` functions directly; interpreted bodies are opaque data
    /// (an AST node plus captured values) until this hook runs them.
    interpreter: RefCell<Option<crate::function::InterpretHook>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_gc_threshold(ALLOCATIONS_PER_GC)
    }

    pub fn with_gc_threshold(gc_threshold: usize) -> Self {
        let small_int_count = (SMALL_INT_MAX - SMALL_INT_MIN + 1) as usize;
        let heap = Heap {
            head: Cell::new(None),
            live_count: Cell::new(0),
            alloc_since_gc: Cell::new(0),
            gc_threshold,
            next_id: Cell::new(1),
            immortals: RefCell::new(Vec::new()),
            classes: RefCell::new(ClassRegistry::new()),
            symbol_intern_table: RefCell::new(HashMap::new()),
            small_int_cache: RefCell::new(vec![None; small_int_count]),
            ascii_char_cache: RefCell::new(vec![None; 128]),
            empty_list: Cell::new(None),
            empty_map: Cell::new(None),
            empty_symbol_table: Cell::new(None),
            void: Cell::new(None),
            map_cache: RefCell::new(MapCache::new()),
            frames: RefCell::new(FrameStack::new()),
            generics_by_symbol: RefCell::new(vec![None; crate::limits::MAX_SYMBOLS]),
            gc_cycles: Cell::new(0),
            interpreter: RefCell::new(None),
        };
        heap.bootstrap();
        heap
    }

    fn bootstrap(&self) {
        const NAMES: [&str; NUM_BUILTIN_CLASSES as usize] = [
            "Class",
            "Int",
            "String",
            "Symbol",
            "Uniqlet",
            "List",
            "Map",
            "SymbolTable",
            "Record",
            "Box",
            "Function",
            "Generic",
        ];
        let symbols: Vec<Symbol> = NAMES.iter().map(|n| self.intern(n)).collect();
        let symbols: [Symbol; NUM_BUILTIN_CLASSES as usize] =
            symbols.try_into().unwrap_or_else(|_| unreachable!());
        self.classes.borrow_mut().bootstrap(symbols);

        // Immortalize the bootstrap tables.
        for s in symbols {
            self.immortalize(s.zref());
        }

        let empty_list = crate::list::alloc_empty_list(self);
        self.empty_list.set(Some(empty_list));
        self.immortalize(empty_list);

        let empty_map = crate::map::alloc_empty_map(self);
        self.empty_map.set(Some(empty_map));
        self.immortalize(empty_map);

        let empty_symbol_table = crate::symbol_table::alloc_empty_symbol_table(self);
        self.empty_symbol_table.set(Some(empty_symbol_table));
        self.immortalize(empty_symbol_table);

        let void = self.new_uniqlet();
        self.void.set(Some(void));
        self.immortalize(void);
    }

    /// The sentinel `ZRef` standing in for void. See the `void` field
    /// doc comment.
    pub fn void(&self) -> ZRef {
        self.void.get().expect("heap not bootstrapped")
    }

    pub fn is_void(&self, v: ZRef) -> bool {
        v.is_same(&self.void())
    }

    /// Registers `generic` as the dispatch target for method calls
    /// named `symbol` (each interned symbol has a dense nonnegative
    /// index used as a table key for method dispatch). Called once per
    /// standard generic at core-library init.
    pub fn register_generic_for_symbol(&self, symbol: Symbol, generic: ZRef) {
        let index = symbol
            .interned_index()
            .expect("only interned symbols name generics") as usize;
        let mut table = self.generics_by_symbol.borrow_mut();
        if table.len() <= index {
            table.resize(index + 1, None);
        }
        table[index] = Some(generic);
    }

    /// Fast symbol-indexed lookup of a standard generic by name,
    /// bypassing an environment `SymbolTable` traversal.
    pub fn generic_for_symbol(&self, symbol: Symbol) -> Option<ZRef> {
        let index = symbol.interned_index()? as usize;
        self.generics_by_symbol.borrow().get(index).copied().flatten()
    }

    /// Registers (or finds, idempotently by name) a derived-data class.
    /// Exposed at the `Heap` boundary so
    /// `sam-runtime` can register AST node-tag classes and user
    /// `classDef` classes without reaching into `ClassRegistry`
    /// directly.
    pub fn create_derived_class(&self, name: Symbol, parent: Option<ClassSeq>) -> ClassSeq {
        self.classes.borrow_mut().create_derived(name, parent)
    }

    pub fn class_name(&self, seq: ClassSeq) -> Symbol {
        self.classes.borrow().name(seq)
    }

    pub fn class_parent(&self, seq: ClassSeq) -> Option<ClassSeq> {
        self.classes.borrow().parent(seq)
    }

    pub fn find_class_by_name(&self, name: Symbol) -> Option<ClassSeq> {
        self.classes.borrow().find_by_name(name)
    }

    pub(crate) fn next_identity_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Allocates a payload of type `T` whose first field must be
    /// `header: Header` (enforced by convention, not the type system —
    /// matching every concrete payload struct in this crate). Pushes
    /// the new value onto the current frame before returning so it
    /// cannot be collected before the caller roots it further.
    pub(crate) fn alloc_value<T>(
        &self,
        tag: Tag,
        class: ClassSeq,
        identified: bool,
        build: impl FnOnce(Header) -> T,
    ) -> ZRef {
        self.maybe_trigger_gc();

        let id = if identified { self.next_identity_id() } else { 0 };
        let header = Header::new(tag, class, id);
        let boxed = Box::new(build(header));
        let raw = Box::into_raw(boxed) as *mut Header;
        let ptr = NonNull::new(raw).expect("fatal: allocation failure");

        // Safety: `ptr` was just initialized above with a valid magic.
        unsafe {
            debug_assert_eq!((*ptr.as_ptr()).magic, MAGIC);
            (*ptr.as_ptr()).next.set(self.head.get());
        }
        self.head.set(Some(ptr));
        self.live_count.set(self.live_count.get() + 1);
        self.alloc_since_gc.set(self.alloc_since_gc.get() + 1);

        let zref = unsafe { ZRef::from_header(ptr) };
        self.frames.borrow_mut().add(zref);
        zref
    }

    fn maybe_trigger_gc(&self) {
        if self.alloc_since_gc.get() >= self.gc_threshold {
            self.gc();
        }
    }

    /// Adds `v` to the immortal root set. Bounded by `MAX_IMMORTALS`.
    pub fn immortalize(&self, v: ZRef) {
        let mut immortals = self.immortals.borrow_mut();
        if immortals.len() >= MAX_IMMORTALS {
            panic!("fatal: immortal-value table overflow (max {})", MAX_IMMORTALS);
        }
        immortals.push(v);
    }

    pub fn frame_start(&self) -> SavedStack {
        self.frames.borrow().start()
    }

    pub fn frame_add(&self, v: ZRef) {
        self.frames.borrow_mut().add(v);
    }

    pub fn frame_return(&self, saved: SavedStack, opt_return: Option<ZRef>) {
        self.frames.borrow_mut().return_(saved, opt_return);
    }

    pub fn frame_reset(&self, saved: SavedStack, opt_kept: Option<ZRef>) {
        self.frames.borrow_mut().reset(saved, opt_kept);
    }

    pub fn live_count(&self) -> usize {
        self.live_count.get()
    }

    pub fn gc_cycles(&self) -> u64 {
        self.gc_cycles.get()
    }

    /// Forces a full mark-sweep cycle. Also invocable implicitly by
    /// allocation once the threshold is exceeded.
    pub fn gc(&self) {
        crate::gc::collect(self);
        self.alloc_since_gc.set(0);
        self.gc_cycles.set(self.gc_cycles.get() + 1);
    }

    pub(crate) fn head(&self) -> Option<NonNull<Header>> {
        self.head.get()
    }

    pub(crate) fn set_head(&self, h: Option<NonNull<Header>>) {
        self.head.set(h);
    }

    pub(crate) fn set_live_count(&self, n: usize) {
        self.live_count.set(n);
    }

    /// Installs the evaluator's interpreted-call hook. Must be called
    /// at most once; `sam-runtime`'s `Evaluator::new` does this before
    /// any interpreted `Function` value can be invoked.
    pub fn set_interpreter(&self, hook: crate::function::InterpretHook) {
        *self.interpreter.borrow_mut() = Some(hook);
    }

    /// Invokes `f` (a `Tag::Function` value) with `args`. Natives run
    /// directly; interpreted bodies are handed to whatever hook
    /// `set_interpreter` installed.
    pub fn call(&self, f: ZRef, args: &[ZRef]) -> ZRef {
        use crate::function::FunctionBody;
        let func = crate::function::Function::from_zref(f)
            .unwrap_or_else(|| panic!("fatal: call target is not a Function"));
        func.check_arity(args.len());
        match func.body() {
            FunctionBody::Native(native) => native(self, args),
            FunctionBody::Interpreted { node, captured } => {
                let hook = self.interpreter.borrow();
                match hook.as_ref() {
                    Some(hook) => hook(self, node, captured, args),
                    None => panic!("fatal: no evaluator installed for interpreted function call"),
                }
            }
            FunctionBody::ExitTrampoline(_) => panic!(
                "fatal: a non-local exit function was invoked through the generic call path; \
                 it must be invoked directly from a `call`/`nonlocalExit` AST node"
            ),
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        // Free every remaining live allocation. Safe because nothing
        // outside this `Heap` can still hold a `ZRef` into it once the
        // `Heap` itself is being dropped (all `ZRef`s borrow the
        // heap's lifetime conceptually, even though the type doesn't
        // encode it).
        let mut cur = self.head.get();
        while let Some(ptr) = cur {
            let next = unsafe { (*ptr.as_ptr()).next.get() };
            drop_allocation(ptr);
            cur = next;
        }
    }
}

/// Frees one allocation given only its `Header` pointer, by consulting
/// `tag` to reconstruct the original `Box<Concrete>` before dropping.
///
/// # Safety
/// `ptr` must point at a still-live allocation produced by
/// `Heap::alloc_value`.
pub(crate) unsafe fn drop_allocation(ptr: NonNull<Header>) {
    let tag = unsafe { (*ptr.as_ptr()).tag };
    macro_rules! drop_as {
        ($t:ty) => {
            drop(unsafe { Box::from_raw(ptr.as_ptr() as *mut $t) })
        };
    }
    match tag {
        Tag::Int => drop_as!(crate::int::IntPayload),
        Tag::String => drop_as!(crate::string::StringPayload),
        Tag::Symbol => drop_as!(crate::symbol::SymbolPayload),
        Tag::Uniqlet => drop_as!(crate::uniqlet::UniqletPayload),
        Tag::List => drop_as!(crate::list::ListPayload),
        Tag::Map => drop_as!(crate::map::MapPayload),
        Tag::SymbolTable => drop_as!(crate::symbol_table::SymbolTablePayload),
        Tag::Record => drop_as!(crate::record::RecordPayload),
        Tag::Class => drop_as!(crate::class::ClassPayload),
        Tag::Generic => drop_as!(crate::generic::GenericPayload),
        Tag::Function => drop_as!(crate::function::FunctionPayload),
        Tag::Box => drop_as!(crate::zbox::BoxPayload),
    }
}
