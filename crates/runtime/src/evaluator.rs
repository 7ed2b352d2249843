//! The tree-walking evaluator: dispatches on an AST node's tag (its
//! Record class name, per `crate::ast`) and produces either a value or
//! void.
//!
//! Nonlocal exits (`return`/`yield`/`nonlocalExit`) are cooperative
//! rather than `std::panic`-based: a single `Cell<Option<PendingExit>>`
//! records "unwind to frame N with this value", and every dispatch arm
//! that evaluates a sub-expression checks it immediately afterward and
//! stops early if it's set. That returns straight to the target frame,
//! discarding intermediate values, without requiring
//! `FunctionBody::Interpreted`'s closure-returning-a-closure shape to
//! survive a Rust unwind.

use crate::ast::Tags;
use crate::context::Context;
use crate::diagnostics::GibletStack;
use sam_core::error::SamError;
use sam_core::heap::Heap;
use sam_core::list::SamList;
use sam_core::record::SamRecord;
use sam_core::symbol::Symbol;
use sam_core::symbol_table::SamSymbolTable;
use sam_core::zref::ZRef;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Copy)]
struct PendingExit {
    target: u64,
    value: Option<ZRef>,
}

/// Owns the evaluator-wide dispatch state. One `Evaluator` per `Heap`;
/// construct it with [`Evaluator::new`], which also installs it as the
/// heap's interpreted-call hook.
pub struct Evaluator {
    tags: Tags,
    pending_exit: Cell<Option<PendingExit>>,
    giblets: GibletStack,
}

enum Repeat {
    One,
    Optional,
    Star,
    Plus,
}

impl Evaluator {
    pub fn new(heap: &Heap) -> Rc<Evaluator> {
        let evaluator = Rc::new(Evaluator {
            tags: Tags::new(heap),
            pending_exit: Cell::new(None),
            giblets: GibletStack::new(),
        });
        let hook_evaluator = evaluator.clone();
        heap.set_interpreter(Box::new(move |heap, node, captured, args| {
            hook_evaluator.invoke_interpreted(heap, node, captured, args)
        }));
        evaluator
    }

    fn is_exiting(&self) -> bool {
        self.pending_exit.get().is_some()
    }

    fn fatal(&self, err: SamError) -> ! {
        let context = self.giblets.format_context();
        if !context.is_empty() {
            tracing::error!("{}", context);
        }
        sam_core::error::fatal(err)
    }

    /// Evaluates `code` against the bindings in `env`. `env`'s values
    /// are wrapped in fresh Result boxes to seed the root frame — the
    /// caller hands over plain values, not boxes.
    pub fn eval_top(&self, heap: &Heap, env: SamSymbolTable, code: ZRef) -> Option<ZRef> {
        let saved = heap.frame_start();
        let root = Context::root(heap);
        for (name, value) in env.pairs() {
            root.define(heap, *name, heap.new_result_box(Some(*value)));
        }
        let result = self.eval(heap, &root, code);
        heap.frame_return(saved, result);
        result
    }

    fn field(&self, heap: &Heap, record: SamRecord, key: &str) -> Option<ZRef> {
        heap.record_get(record, heap.intern(key))
    }

    fn field_symbol(&self, heap: &Heap, record: SamRecord, key: &str) -> Symbol {
        let v = self
            .field(heap, record, key)
            .unwrap_or_else(|| self.fatal(SamError::structural(format!("node is missing field {:?}", key))));
        heap.as_symbol(v)
            .unwrap_or_else(|| self.fatal(SamError::type_error(format!("field {:?} is not a Symbol", key))))
    }

    /// Evaluates `node`, treating a legitimately-void result as fatal:
    /// every operand position demands a value. Returns `None` only
    /// when propagating a nonlocal exit in flight.
    fn eval_required(&self, heap: &Heap, ctx: &Context, node: ZRef, what: &str) -> Option<ZRef> {
        match self.eval(heap, ctx, node) {
            Some(v) => Some(v),
            None => {
                if self.is_exiting() {
                    return None;
                }
                self.fatal(SamError::type_error(format!("{} evaluated to void", what)));
            }
        }
    }

    pub fn eval(&self, heap: &Heap, ctx: &Context, node: ZRef) -> Option<ZRef> {
        if self.is_exiting() {
            return None;
        }
        let record = heap
            .as_record(node)
            .unwrap_or_else(|| self.fatal(SamError::type_error("an AST node must be a Record")));
        let tag = heap.class_name(record.class());
        let t = &self.tags;

        if tag == t.literal || tag == t.int || tag == t.string {
            let v = self
                .field(heap, record, "value")
                .unwrap_or_else(|| self.fatal(SamError::structural("literal node is missing its value field")));
            Some(v)
        } else if tag == t.var_ref || tag == t.identifier {
            let name = self.field_symbol(heap, record, "name");
            let b = ctx
                .lookup_box(heap, name)
                .unwrap_or_else(|| self.fatal(SamError::structural(format!("unbound variable: {}", name.name()))));
            b.fetch(heap)
        } else if tag == t.var_def || tag == t.var_def_mutable {
            let name = self.field_symbol(heap, record, "name");
            let value_node = self
                .field(heap, record, "value")
                .unwrap_or_else(|| self.fatal(SamError::structural("varDef node is missing its value field")));
            let value = self.eval_required(heap, ctx, value_node, "varDef initializer")?;
            let boxed = if tag == t.var_def_mutable {
                heap.new_cell_box(Some(value))
            } else {
                heap.new_result_box(Some(value))
            };
            ctx.define(heap, name, boxed);
            Some(value)
        } else if tag == t.var_bind {
            // A pre-boxed binding: `value` is evaluated directly as the
            // Box to bind, rather than wrapping a plain value.
            let name = self.field_symbol(heap, record, "name");
            let value_node = self
                .field(heap, record, "value")
                .unwrap_or_else(|| self.fatal(SamError::structural("varBind node is missing its value field")));
            let boxed = self.eval_required(heap, ctx, value_node, "varBind box expression")?;
            heap.as_box(boxed)
                .unwrap_or_else(|| self.fatal(SamError::type_error("varBind value must evaluate to a Box")));
            ctx.define(heap, name, boxed);
            None
        } else if tag == t.store {
            let name = self.field_symbol(heap, record, "name");
            let value_node = self
                .field(heap, record, "value")
                .unwrap_or_else(|| self.fatal(SamError::structural("store node is missing its value field")));
            let value = self.eval(heap, ctx, value_node);
            if self.is_exiting() {
                return None;
            }
            let b = ctx
                .lookup_box(heap, name)
                .unwrap_or_else(|| self.fatal(SamError::structural(format!("unbound variable: {}", name.name()))));
            b.store(value)
        } else if tag == t.fetch {
            let target_node = self
                .field(heap, record, "target")
                .unwrap_or_else(|| self.fatal(SamError::structural("fetch node is missing its target field")));
            let target = self.eval_required(heap, ctx, target_node, "fetch target")?;
            let b = heap
                .as_box(target)
                .unwrap_or_else(|| self.fatal(SamError::type_error("fetch target is not a Box")));
            b.fetch(heap)
        } else if tag == t.call {
            let target_node = self
                .field(heap, record, "target")
                .unwrap_or_else(|| self.fatal(SamError::structural("call node is missing its target field")));
            let target = self.eval_required(heap, ctx, target_node, "call target")?;
            let values = self
                .field(heap, record, "values")
                .unwrap_or_else(|| self.fatal(SamError::structural("call node is missing its values field")));
            let values_list = heap
                .as_list(values)
                .unwrap_or_else(|| self.fatal(SamError::type_error("call values must be a List of argument nodes")));
            let mut args = Vec::with_capacity(values_list.len());
            for item_node in values_list.items() {
                let v = self.eval_required(heap, ctx, *item_node, "call argument")?;
                args.push(v);
            }
            self.invoke(heap, target, &args)
        } else if tag == t.apply {
            let target_node = self
                .field(heap, record, "target")
                .unwrap_or_else(|| self.fatal(SamError::structural("apply node is missing its target field")));
            let target = self.eval_required(heap, ctx, target_node, "apply target")?;
            let values_node = self
                .field(heap, record, "values")
                .unwrap_or_else(|| self.fatal(SamError::structural("apply node is missing its values field")));
            let values_val = self.eval_required(heap, ctx, values_node, "apply values")?;
            let list = heap
                .as_list(values_val)
                .unwrap_or_else(|| self.fatal(SamError::type_error("apply values must evaluate to a List")));
            self.invoke(heap, target, list.items())
        } else if tag == t.closure || tag == t.fn_ {
            let formals = self
                .field(heap, record, "formals")
                .unwrap_or_else(|| self.fatal(SamError::structural("closure node is missing its formals field")));
            let formals_list = heap
                .as_list(formals)
                .unwrap_or_else(|| self.fatal(SamError::type_error("closure formals must be a List")));
            let (min_args, max_args) = formals_arity(self, heap, formals_list);
            let name = self.field(heap, record, "name").map(|z| {
                heap.as_symbol(z)
                    .unwrap_or_else(|| self.fatal(SamError::type_error("closure name must be a Symbol")))
            });
            let f = heap.new_interpreted_function(min_args, max_args, node, ctx.zref(), name.map(|s| s.name()));
            Some(f)
        } else if tag == t.return_ || tag == t.yield_ {
            let value = match self.field(heap, record, "value") {
                Some(value_node) => self.eval(heap, ctx, value_node),
                None => None,
            };
            if self.is_exiting() {
                return None;
            }
            self.pending_exit.set(Some(PendingExit { target: ctx.id(), value }));
            None
        } else if tag == t.nonlocal_exit {
            let function_node = self
                .field(heap, record, "function")
                .unwrap_or_else(|| self.fatal(SamError::structural("nonlocalExit node is missing its function field")));
            let function = self.eval_required(heap, ctx, function_node, "nonlocalExit function")?;
            let value = match self.field(heap, record, "value") {
                Some(value_node) => self.eval(heap, ctx, value_node),
                None => None,
            };
            if self.is_exiting() {
                return None;
            }
            let args: Vec<ZRef> = value.into_iter().collect();
            self.invoke(heap, function, &args)
        } else if tag == t.no_yield {
            let message = self
                .field(heap, record, "message")
                .and_then(|z| heap.as_string(z))
                .map(|s| String::from_utf8_lossy(&s.to_utf8()).into_owned());
            self.fatal(SamError::structural(
                message.unwrap_or_else(|| "evaluation reached a noYield node".to_string()),
            ));
        } else if tag == t.maybe {
            let value_node = self
                .field(heap, record, "value")
                .unwrap_or_else(|| self.fatal(SamError::structural("maybe node is missing its value field")));
            let value = self.eval(heap, ctx, value_node);
            if self.is_exiting() {
                return None;
            }
            let list = match value {
                Some(v) => heap.new_list(&[v]),
                None => heap.new_list(&[]),
            };
            Some(list)
        } else if tag == t.mapping {
            let key_node = self
                .field(heap, record, "key")
                .unwrap_or_else(|| self.fatal(SamError::structural("mapping node is missing its key field")));
            let value_node = self
                .field(heap, record, "value")
                .unwrap_or_else(|| self.fatal(SamError::structural("mapping node is missing its value field")));
            let key = self.eval_required(heap, ctx, key_node, "mapping key")?;
            let value = self.eval_required(heap, ctx, value_node, "mapping value")?;
            Some(heap.new_map(&[(key, value)]))
        } else if tag == t.map_expression {
            let mappings = self
                .field(heap, record, "mappings")
                .unwrap_or_else(|| self.fatal(SamError::structural("mapExpression node is missing its mappings field")));
            let mappings_list = heap
                .as_list(mappings)
                .unwrap_or_else(|| self.fatal(SamError::type_error("mapExpression mappings must be a List")));
            let mut maps = Vec::with_capacity(mappings_list.len());
            for m in mappings_list.items() {
                let mapping_result = self.eval_required(heap, ctx, *m, "map expression mapping")?;
                let one = heap
                    .as_map(mapping_result)
                    .unwrap_or_else(|| self.fatal(SamError::type_error("mapping must evaluate to a one-entry Map")));
                maps.push(one);
            }
            Some(heap.map_cat(&maps))
        } else if tag == t.module {
            let statements = self
                .field(heap, record, "statements")
                .unwrap_or_else(|| self.fatal(SamError::structural("module node is missing its statements field")));
            let statements_list = heap
                .as_list(statements)
                .unwrap_or_else(|| self.fatal(SamError::type_error("module statements must be a List")));
            let module_ctx = ctx.child(heap);
            for stmt in statements_list.items() {
                self.eval(heap, &module_ctx, *stmt);
                if self.is_exiting() {
                    return None;
                }
            }
            // The module's bindings, not unwrapped — `export`/
            // `exportSelection` are the documented way to narrow this
            // (see `DESIGN.md`'s module-system resolution).
            Some(module_ctx.zref())
        } else if tag == t.import_module || tag == t.import_module_selection || tag == t.import_resource {
            self.fatal(SamError::structural(
                "module imports require an external loader, which this evaluator does not provide",
            ));
        } else if tag == t.export || tag == t.export_selection || tag == t.directive || tag == t.external || tag == t.internal {
            // Bookkeeping for the (absent) module loader; evaluating one
            // directly is a no-op.
            None
        } else {
            self.fatal(SamError::type_error(format!("unrecognized AST node tag: {}", tag.name())));
        }
    }

    fn invoke(&self, heap: &Heap, target: ZRef, args: &[ZRef]) -> Option<ZRef> {
        use sam_core::function::FunctionBody;
        if let Some(f) = heap.as_function(target) {
            if let FunctionBody::ExitTrampoline(exit_target) = f.body() {
                if args.len() > 1 {
                    self.fatal(SamError::arity("a non-local exit function takes 0 or 1 argument"));
                }
                self.pending_exit.set(Some(PendingExit {
                    target: exit_target,
                    value: args.first().copied(),
                }));
                return None;
            }
            let result = heap.call(target, args);
            return if heap.is_void(result) { None } else { Some(result) };
        }
        if let Some(g) = heap.as_generic(target) {
            let result = heap.call_generic(g, args);
            return if heap.is_void(result) { None } else { Some(result) };
        }
        self.fatal(SamError::type_error("call target is not callable (not a Function or Generic)"));
    }

    fn invoke_interpreted(&self, heap: &Heap, node: ZRef, captured: ZRef, args: &[ZRef]) -> ZRef {
        let saved = heap.frame_start();
        let closure = heap
            .as_record(node)
            .unwrap_or_else(|| self.fatal(SamError::invariant("closure function body is not a Record")));
        let formals_list = heap
            .as_list(self.field(heap, closure, "formals").expect("closure always carries formals"))
            .expect("closure formals is always a List");
        let statements_list = heap
            .as_list(self.field(heap, closure, "statements").expect("closure always carries statements"))
            .expect("closure statements is always a List");
        let yield_def = self
            .field(heap, closure, "yieldDef")
            .map(|z| heap.as_symbol(z).expect("yieldDef is always a Symbol"));
        let name = self.field(heap, closure, "name").map(|z| {
            heap.as_symbol(z).expect("closure name is always a Symbol")
        });

        let defining_ctx = Context::from_zref(captured);
        let call_ctx = defining_ctx.child(heap);
        self.bind_formals(heap, &call_ctx, formals_list.items(), args);

        if let Some(y) = yield_def {
            let trampoline = heap.new_exit_trampoline(call_ctx.id());
            call_ctx.define(heap, y, heap.new_result_box(Some(trampoline)));
        }

        let _guard = self
            .giblets
            .push(name.map(|s| s.name().to_string()).unwrap_or_else(|| "<anonymous>".to_string()));

        let mut result = None;
        for stmt in statements_list.items() {
            result = self.eval(heap, &call_ctx, *stmt);
            if self.is_exiting() {
                break;
            }
        }
        if let Some(exit) = self.pending_exit.get() {
            if exit.target == call_ctx.id() {
                self.pending_exit.set(None);
                result = exit.value;
            }
        }

        let out = result.unwrap_or_else(|| heap.void());
        heap.frame_return(saved, Some(out));
        out
    }

    fn bind_formals(&self, heap: &Heap, ctx: &Context, formals: &[ZRef], args: &[ZRef]) {
        let reps: Vec<Repeat> = formals.iter().map(|f| formal_repeat(self, heap, *f)).collect();
        let mins: Vec<usize> = reps
            .iter()
            .map(|r| match r {
                Repeat::One | Repeat::Plus => 1,
                Repeat::Optional | Repeat::Star => 0,
            })
            .collect();
        let mut suffix_min = vec![0usize; reps.len() + 1];
        for i in (0..reps.len()).rev() {
            suffix_min[i] = suffix_min[i + 1] + mins[i];
        }

        let mut cursor = 0usize;
        for (i, formal) in formals.iter().enumerate() {
            let formal_record = heap
                .as_record(*formal)
                .unwrap_or_else(|| self.fatal(SamError::invariant("a formal must be a Record")));
            let name = self.field_symbol(heap, formal_record, "name");
            let remaining_after = suffix_min[i + 1];
            let available = args.len().saturating_sub(cursor);
            let max_take = available.saturating_sub(remaining_after);
            match reps[i] {
                Repeat::One => {
                    let v = args[cursor];
                    cursor += 1;
                    ctx.define(heap, name, heap.new_result_box(Some(v)));
                }
                Repeat::Optional => {
                    let take = max_take.min(1);
                    let items = &args[cursor..cursor + take];
                    let list = heap.new_list(items);
                    cursor += take;
                    ctx.define(heap, name, heap.new_result_box(Some(list)));
                }
                Repeat::Star | Repeat::Plus => {
                    let take = max_take;
                    let items = &args[cursor..cursor + take];
                    let list = heap.new_list(items);
                    cursor += take;
                    ctx.define(heap, name, heap.new_result_box(Some(list)));
                }
            }
        }
    }
}

fn formal_repeat(evaluator: &Evaluator, heap: &Heap, formal: ZRef) -> Repeat {
    let record = heap
        .as_record(formal)
        .unwrap_or_else(|| evaluator.fatal(SamError::invariant("a formal must be a Record")));
    match heap.record_get(record, heap.intern("repeat")) {
        None => Repeat::One,
        Some(z) => {
            let sym = heap
                .as_symbol(z)
                .unwrap_or_else(|| evaluator.fatal(SamError::type_error("formal repeat marker must be a Symbol")));
            match sym.name() {
                "?" => Repeat::Optional,
                "*" => Repeat::Star,
                "+" => Repeat::Plus,
                other => evaluator.fatal(SamError::structural(format!("unknown formal repeat marker {:?}", other))),
            }
        }
    }
}

fn formals_arity(evaluator: &Evaluator, heap: &Heap, formals: SamList) -> (u32, Option<u32>) {
    let mut min: u32 = 0;
    let mut max: Option<u32> = Some(0);
    for f in formals.items() {
        match formal_repeat(evaluator, heap, *f) {
            Repeat::One => {
                min += 1;
                max = max.map(|m| m + 1);
            }
            Repeat::Optional => {
                max = max.map(|m| m + 1);
            }
            Repeat::Plus => {
                min += 1;
                max = None;
            }
            Repeat::Star => {
                max = None;
            }
        }
    }
    (min, max)
}
