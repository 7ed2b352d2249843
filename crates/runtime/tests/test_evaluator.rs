//! End-to-end evaluator tests: build a small AST with `sam_runtime::ast`'s
//! constructor helpers, run it through `Evaluator::eval_top`, and check
//! the resulting heap value.

use sam_core::heap::Heap;
use sam_runtime::ast::{self, Tags};
use sam_runtime::{corelib, Evaluator};

fn setup() -> (Heap, std::rc::Rc<Evaluator>, sam_core::symbol_table::SamSymbolTable, Tags) {
    let heap = Heap::new();
    let evaluator = Evaluator::new(&heap);
    let env = heap.as_symbol_table(corelib::install(&heap)).unwrap();
    let tags = Tags::new(&heap);
    (heap, evaluator, env, tags)
}

#[test]
fn literal_evaluates_to_itself() {
    let (heap, evaluator, env, tags) = setup();
    let node = ast::make_literal(&heap, &tags, heap.new_int(42));
    let result = evaluator.eval_top(&heap, env, node).unwrap();
    assert_eq!(heap.as_int(result).unwrap().value(), 42);
}

#[test]
fn var_def_then_var_ref_roundtrips() {
    let (heap, evaluator, env, tags) = setup();
    let x = heap.intern("x");
    let def = ast::make_var_def(&heap, &tags, x, ast::make_literal(&heap, &tags, heap.new_int(7)));
    let read = ast::make_var_ref(&heap, &tags, x);
    let module = ast::make_closure(
        &heap,
        &tags,
        heap.new_list(&[]),
        None,
        None,
        heap.new_list(&[def, read]),
    );
    // Drive the two statements directly through a module context rather
    // than a closure call, since a zero-arg closure still needs invoking.
    let call = ast::make_call(&heap, &tags, module, heap.new_list(&[]));
    let result = evaluator.eval_top(&heap, env, call).unwrap();
    assert_eq!(heap.as_int(result).unwrap().value(), 7);
}

#[test]
#[should_panic(expected = "duplicate binding")]
fn redefining_a_name_in_the_same_frame_is_fatal() {
    let (heap, evaluator, env, tags) = setup();
    let x = heap.intern("x");
    let def1 = ast::make_var_def(&heap, &tags, x, ast::make_literal(&heap, &tags, heap.new_int(1)));
    let def2 = ast::make_var_def(&heap, &tags, x, ast::make_literal(&heap, &tags, heap.new_int(2)));
    let module = ast::make_closure(&heap, &tags, heap.new_list(&[]), None, None, heap.new_list(&[def1, def2]));
    let call = ast::make_call(&heap, &tags, module, heap.new_list(&[]));
    evaluator.eval_top(&heap, env, call);
}

#[test]
fn closure_call_adds_two_arguments_via_the_plus_generic() {
    let (heap, evaluator, env, tags) = setup();
    let a = heap.intern("a");
    let b = heap.intern("b");
    let formals = heap.new_list(&[ast::make_formal(&heap, a, None), ast::make_formal(&heap, b, None)]);
    let plus = heap.intern("+");
    let body = ast::make_call(
        &heap,
        &tags,
        ast::make_var_ref(&heap, &tags, plus),
        heap.new_list(&[ast::make_var_ref(&heap, &tags, a), ast::make_var_ref(&heap, &tags, b)]),
    );
    let closure = ast::make_closure(&heap, &tags, formals, None, None, heap.new_list(&[body]));
    let call = ast::make_call(
        &heap,
        &tags,
        closure,
        heap.new_list(&[
            ast::make_literal(&heap, &tags, heap.new_int(3)),
            ast::make_literal(&heap, &tags, heap.new_int(4)),
        ]),
    );
    let result = evaluator.eval_top(&heap, env, call).unwrap();
    assert_eq!(heap.as_int(result).unwrap().value(), 7);
}

#[test]
fn map_construction_via_sequential_puts_keeps_last_value_for_duplicate_keys() {
    let (heap, evaluator, env, tags) = setup();
    let put = heap.intern("put");
    let empty_map = ast::make_literal(&heap, &tags, heap.new_map(&[]));
    let k = heap.intern("k");
    let step1 = ast::make_call(
        &heap,
        &tags,
        ast::make_var_ref(&heap, &tags, put),
        heap.new_list(&[
            empty_map,
            ast::make_literal(&heap, &tags, k.zref()),
            ast::make_literal(&heap, &tags, heap.new_int(1)),
        ]),
    );
    let step1_def = ast::make_var_def(&heap, &tags, heap.intern("m1"), step1);
    let step2 = ast::make_call(
        &heap,
        &tags,
        ast::make_var_ref(&heap, &tags, put),
        heap.new_list(&[
            ast::make_var_ref(&heap, &tags, heap.intern("m1")),
            ast::make_literal(&heap, &tags, k.zref()),
            ast::make_literal(&heap, &tags, heap.new_int(2)),
        ]),
    );
    let module = ast::make_closure(
        &heap,
        &tags,
        heap.new_list(&[]),
        None,
        None,
        heap.new_list(&[step1_def, step2]),
    );
    let call = ast::make_call(&heap, &tags, module, heap.new_list(&[]));
    let result = evaluator.eval_top(&heap, env, call).unwrap();
    let map = heap.as_map(result).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(heap.map_get(map, k.zref()).unwrap(), heap.new_int(2));
}

#[test]
fn promise_store_then_fetch_then_restore_is_fatal() {
    let (heap, evaluator, env, tags) = setup();
    let promise = heap.new_promise_box();
    let x = heap.intern("p");
    let bind = ast::make_var_bind(&heap, &tags, x, ast::make_literal(&heap, &tags, promise));
    let read = ast::make_fetch(&heap, &tags, ast::make_var_ref(&heap, &tags, x));
    let module = ast::make_closure(&heap, &tags, heap.new_list(&[]), None, None, heap.new_list(&[bind, read]));
    let call = ast::make_call(&heap, &tags, module, heap.new_list(&[]));

    let b = heap.as_box(promise).unwrap();
    b.store(Some(heap.new_int(10)));
    let result = evaluator.eval_top(&heap, env, call).unwrap();
    assert_eq!(heap.as_int(result).unwrap().value(), 10);
}

#[test]
#[should_panic(expected = "cannot be stored to")]
fn restoring_an_already_set_promise_is_fatal() {
    let heap = Heap::new();
    let promise = heap.as_box(heap.new_promise_box()).unwrap();
    promise.store(Some(heap.new_int(1)));
    promise.store(Some(heap.new_int(2)));
}

#[test]
fn uniqlet_keyed_map_lookup_uses_identity() {
    let heap = Heap::new();
    let key1 = heap.new_uniqlet();
    let key2 = heap.new_uniqlet();
    let map = heap.as_map(heap.new_map(&[(key1, heap.new_int(1))])).unwrap();
    assert_eq!(heap.map_get(map, key1), Some(heap.new_int(1)));
    assert_eq!(heap.map_get(map, key2), None);
}
