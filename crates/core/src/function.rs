//! Function: the callable value bound into `Generic` dispatch tables
//! and returned by closure literals.
//!
//! A `Function` is either a `Native` (a plain Rust `fn` pointer — no
//! captured state, so nothing for the collector to trace) or
//! `Interpreted` (an opaque AST node plus an explicit captured-values
//! list, both heap values the collector traces like any other field —
//! a closure's captured environment must stay alive exactly as long as
//! the closure itself is live).
//!
//! `sam-core` can invoke `Native` functions on its own; invoking an
//! `Interpreted` one requires the evaluator hook installed via
//! `Heap::set_interpreter` (see `heap.rs`), since tree-walking is
//! `sam-runtime`'s job, not `sam-core`'s.

use crate::class::CLASS_FUNCTION;
use crate::header::Tag;
use crate::heap::Heap;
use crate::limits::MAX_FORMALS;
use crate::zref::ZRef;

/// A native, directly-callable primitive. Takes the full argument
/// list; arity has already been checked by `Heap::call`.
pub type NativeFn = fn(&Heap, &[ZRef]) -> ZRef;

/// The evaluator's callback for interpreted call bodies: `(heap, node,
/// captured, args) -> result`.
pub type InterpretHook = Box<dyn Fn(&Heap, ZRef, ZRef, &[ZRef]) -> ZRef>;

#[derive(Clone, Copy)]
pub enum FunctionBody {
    Native(NativeFn),
    Interpreted { node: ZRef, captured: ZRef },
    /// A closure's non-local exit function: calling it never reaches
    /// `Heap::call`'s dispatch —
    /// `sam-runtime`'s evaluator recognizes this variant directly at
    /// the `call`/`nonlocalExit` AST node and performs the jump itself,
    /// since the target (a specific still-on-the-Rust-call-stack
    /// evaluator frame) is identified by an id `sam-core` knows nothing
    /// about.
    ExitTrampoline(u64),
}

#[repr(C)]
pub struct FunctionPayload {
    pub(crate) header: crate::header::Header,
    pub(crate) min_args: u32,
    /// `None` means variadic (no upper bound).
    pub(crate) max_args: Option<u32>,
    pub(crate) body: FunctionBody,
    /// Optional display name, e.g. a named closure's `fn` keyword name,
    /// surfaced in diagnostics by `sam-runtime`'s giblet stack.
    pub(crate) name: Option<Box<str>>,
}

#[derive(Clone, Copy, Debug)]
pub struct Function(pub(crate) ZRef);

impl Function {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    pub fn from_zref(zref: ZRef) -> Option<Self> {
        if zref.tag() == Tag::Function {
            Some(Function(zref))
        } else {
            None
        }
    }

    fn payload(&self) -> &FunctionPayload {
        unsafe { self.0.payload::<FunctionPayload>() }
    }

    pub fn min_args(&self) -> u32 {
        self.payload().min_args
    }

    pub fn max_args(&self) -> Option<u32> {
        self.payload().max_args
    }

    pub fn name(&self) -> Option<&str> {
        self.payload().name.as_deref()
    }

    pub fn body(&self) -> FunctionBody {
        self.payload().body
    }

    /// Fatal if `argc` falls outside `[min_args, max_args]`.
    pub fn check_arity(&self, argc: usize) {
        let argc = argc as u32;
        if argc < self.min_args() {
            panic!(
                "fatal: too few arguments: got {}, need at least {}",
                argc,
                self.min_args()
            );
        }
        if let Some(max) = self.max_args() {
            if argc > max {
                panic!("fatal: too many arguments: got {}, max {}", argc, max);
            }
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.0.is_same(&other.0)
    }
}
impl Eq for Function {}

impl Heap {
    pub fn new_native_function(&self, min_args: u32, max_args: Option<u32>, native: NativeFn) -> ZRef {
        if let Some(max) = max_args {
            assert!(max <= MAX_FORMALS as u32, "native arity exceeds MAX_FORMALS");
        }
        self.alloc_value(Tag::Function, CLASS_FUNCTION, true, |header| FunctionPayload {
            header,
            min_args,
            max_args,
            body: FunctionBody::Native(native),
            name: None,
        })
    }

    pub fn new_interpreted_function(
        &self,
        min_args: u32,
        max_args: Option<u32>,
        node: ZRef,
        captured: ZRef,
        name: Option<&str>,
    ) -> ZRef {
        self.alloc_value(Tag::Function, CLASS_FUNCTION, true, |header| FunctionPayload {
            header,
            min_args,
            max_args,
            body: FunctionBody::Interpreted { node, captured },
            name: name.map(|n| n.into()),
        })
    }

    pub fn as_function(&self, zref: ZRef) -> Option<Function> {
        Function::from_zref(zref)
    }

    /// Constructs a non-local exit function bound to evaluator frame
    /// `target_call_id`. Always 0 or 1 argument.
    pub fn new_exit_trampoline(&self, target_call_id: u64) -> ZRef {
        self.alloc_value(Tag::Function, CLASS_FUNCTION, true, |header| FunctionPayload {
            header,
            min_args: 0,
            max_args: Some(1),
            body: FunctionBody::ExitTrampoline(target_call_id),
            name: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(_heap: &Heap, args: &[ZRef]) -> ZRef {
        args[0]
    }

    #[test]
    fn native_arity_is_enforced() {
        let heap = Heap::new();
        let f = heap.as_function(heap.new_native_function(1, Some(1), double)).unwrap();
        let a = heap.new_int(9);
        let r = heap.call(f.zref(), &[a]);
        assert!(r.is_same(&a));
    }

    #[test]
    #[should_panic(expected = "too few arguments")]
    fn calling_with_too_few_args_is_fatal() {
        let heap = Heap::new();
        let f = heap.new_native_function(1, Some(1), double);
        heap.call(f, &[]);
    }
}
