//! Tree-walking evaluator and standard-generic bindings for Samizdat
//! Layer 0: sits on top of `sam-core`'s value model and drives it from
//! an AST built with `ast`'s constructor helpers.
//!
//! A typical embedding:
//!
//! ```ignore
//! let heap = sam_core::heap::Heap::new();
//! let evaluator = sam_runtime::Evaluator::new(&heap);
//! let env = heap.as_symbol_table(sam_runtime::corelib::install(&heap)).unwrap();
//! let program = /* built with sam_runtime::ast::make_* */;
//! let result = evaluator.eval_top(&heap, env, program);
//! ```

pub mod ast;
pub mod context;
pub mod corelib;
pub mod diagnostics;
pub mod evaluator;

pub use ast::Tags;
pub use context::Context;
pub use evaluator::Evaluator;
