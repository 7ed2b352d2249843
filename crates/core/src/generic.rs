//! Generic: single-dispatch generic functions, dispatching on the
//! class of the first argument via a dense, `ClassSeq`-indexed table.
//!
//! A generic can be bound incrementally (one `Function` per class) and
//! then sealed, after which no further binding is allowed. The
//! same-class requirement and sealed flag are plain Rust fields on the
//! payload rather than a bitmask, since nothing else in this crate
//! reads flags as raw bits.

use crate::class::{ClassSeq, CLASS_GENERIC};
use crate::header::Tag;
use crate::heap::Heap;
use crate::zref::ZRef;
use std::cell::{Cell, RefCell};

#[repr(C)]
pub struct GenericPayload {
    pub(crate) header: crate::header::Header,
    pub(crate) min_args: u32,
    pub(crate) max_args: Option<u32>,
    /// When set, every call argument must share the dispatch class of
    /// the first argument (e.g. binary arithmetic and `totalOrder`).
    pub(crate) same_class_required: bool,
    pub(crate) sealed: Cell<bool>,
    pub(crate) default_fn: Cell<Option<ZRef>>,
    /// Dense, `ClassSeq`-indexed dispatch table.
    pub(crate) table: RefCell<Vec<Option<ZRef>>>,
}

#[derive(Clone, Copy, Debug)]
pub struct Generic(pub(crate) ZRef);

impl Generic {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &GenericPayload {
        unsafe { self.0.payload::<GenericPayload>() }
    }

    pub fn is_sealed(&self) -> bool {
        self.payload().sealed.get()
    }

    pub fn min_args(&self) -> u32 {
        self.payload().min_args
    }

    pub fn max_args(&self) -> Option<u32> {
        self.payload().max_args
    }

    /// Binds `f` as the method for `class`. Fatal if already sealed or
    /// if `class` already has a binding — rebinding an already-bound
    /// class is a structural error.
    pub fn bind(&self, class: ClassSeq, f: ZRef) {
        if self.is_sealed() {
            panic!("fatal: cannot bind a sealed generic function");
        }
        let mut table = self.payload().table.borrow_mut();
        if table.len() <= class.index() {
            table.resize(class.index() + 1, None);
        }
        if table[class.index()].is_some() {
            panic!("fatal: class {:?} is already bound on this generic", class);
        }
        table[class.index()] = Some(f);
    }

    pub fn bind_default(&self, f: ZRef) {
        if self.is_sealed() {
            panic!("fatal: cannot bind a sealed generic function");
        }
        self.payload().default_fn.set(Some(f));
    }

    pub fn seal(&self) {
        self.payload().sealed.set(true);
    }

    /// Walks from `class` up through its parent chain looking for a
    /// binding, falling back to the default method.
    pub fn find(&self, heap: &Heap, class: ClassSeq) -> Option<ZRef> {
        let table = self.payload().table.borrow();
        let mut current = Some(class);
        while let Some(c) = current {
            if let Some(Some(f)) = table.get(c.index()) {
                return Some(*f);
            }
            current = heap.classes.borrow().parent(c);
        }
        drop(table);
        self.payload().default_fn.get()
    }
}

impl Heap {
    pub fn new_generic(&self, min_args: u32, max_args: Option<u32>, same_class_required: bool) -> ZRef {
        self.alloc_value(Tag::Generic, CLASS_GENERIC, true, |header| GenericPayload {
            header,
            min_args,
            max_args,
            same_class_required,
            sealed: Cell::new(false),
            default_fn: Cell::new(None),
            table: RefCell::new(Vec::new()),
        })
    }

    pub fn as_generic(&self, zref: ZRef) -> Option<Generic> {
        if zref.tag() == Tag::Generic {
            Some(Generic(zref))
        } else {
            None
        }
    }

    /// Dispatches `args` on `generic` by the class of `args[0]`, then
    /// invokes the resolved `Function`.
    pub fn call_generic(&self, generic: Generic, args: &[ZRef]) -> ZRef {
        let argc = args.len() as u32;
        if argc < generic.min_args() {
            panic!("fatal: too few arguments to generic function: got {}", argc);
        }
        if let Some(max) = generic.max_args() {
            if argc > max {
                panic!("fatal: too many arguments to generic function: got {}", argc);
            }
        }
        let Some(first) = args.first() else {
            panic!("fatal: cannot dispatch a generic function with no arguments");
        };
        let dispatch_class = first.class();
        if generic.payload().same_class_required {
            for a in &args[1..] {
                if a.class() != dispatch_class {
                    panic!(
                        "fatal: same-class generic called with mixed argument classes ({:?} vs {:?})",
                        dispatch_class,
                        a.class()
                    );
                }
            }
        }
        match generic.find(self, dispatch_class) {
            Some(f) => self.call(f, args),
            None => panic!(
                "fatal: no applicable method on class {:?} (and no default)",
                dispatch_class
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::CLASS_INT;

    fn echo_first(_heap: &Heap, args: &[ZRef]) -> ZRef {
        args[0]
    }

    #[test]
    fn dispatch_finds_bound_method() {
        let heap = Heap::new();
        let generic = heap.as_generic(heap.new_generic(1, None, false)).unwrap();
        let f = heap.new_native_function(1, None, echo_first);
        generic.bind(CLASS_INT, f);
        let arg = heap.new_int(42);
        let result = heap.call_generic(generic, &[arg]);
        assert!(result.is_same(&arg));
    }

    #[test]
    #[should_panic(expected = "no applicable method")]
    fn dispatch_without_binding_or_default_is_fatal() {
        let heap = Heap::new();
        let generic = heap.as_generic(heap.new_generic(1, None, false)).unwrap();
        let arg = heap.new_int(1);
        heap.call_generic(generic, &[arg]);
    }

    #[test]
    #[should_panic(expected = "sealed")]
    fn binding_after_seal_is_fatal() {
        let heap = Heap::new();
        let generic = heap.as_generic(heap.new_generic(1, None, false)).unwrap();
        generic.seal();
        let f = heap.new_native_function(1, None, echo_first);
        generic.bind(CLASS_INT, f);
    }

    #[test]
    #[should_panic(expected = "mixed argument classes")]
    fn same_class_mismatch_is_fatal() {
        let heap = Heap::new();
        let generic = heap.as_generic(heap.new_generic(2, None, true)).unwrap();
        let f = heap.new_native_function(2, None, echo_first);
        generic.bind(CLASS_INT, f);
        let a = heap.new_int(1);
        let b = heap.new_string_from_utf8(b"x").unwrap();
        heap.call_generic(generic, &[a, b]);
    }
}
