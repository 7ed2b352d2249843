//! Samizdat Layer 0 core runtime: the uniform value header and
//! allocator, a mark-sweep garbage collector, the frame stack that
//! roots live references during native code, the primitive value
//! types (Int, String, Symbol, Uniqlet), the persistent containers
//! built on them (List, Map, SymbolTable, Record), the class registry
//! and generic-function dispatch mechanism, and the Box mutable cell.
//!
//! The tree-walking evaluator that interprets AST `Record`s against
//! this model, and the core-library generic bindings, live in the
//! sibling `sam-runtime` crate — this crate only provides the value
//! model and dispatch mechanism those consume.
//!
//! # Modules
//!
//! - [`header`] / [`heap`]: the uniform object header and the managed
//!   heap that allocates, roots, and collects every value.
//! - [`gc`]: the mark-sweep collector itself.
//! - [`frame`]: the shadow stack of live references.
//! - [`limits`]: tunable implementation limits.
//! - [`int`] / [`string`] / [`symbol`] / [`uniqlet`]: primitive types.
//! - [`list`] / [`map`] / [`map_cache`] / [`symbol_table`] / [`record`]:
//!   persistent containers.
//! - [`class`] / [`generic`] / [`order`]: the class registry, generic
//!   dispatch, and the total order used throughout.
//! - [`function`]: the callable value bound into generic dispatch
//!   tables and produced by closures.
//! - [`zbox`]: the Cell/Promise/Result mutable container.
//! - [`zref`]: the opaque handle every value is referenced through.
//! - [`error`]: the fatal-error taxonomy shared by this crate and
//!   `sam-runtime`.

pub mod class;
pub mod error;
pub mod frame;
pub mod function;
pub mod gc;
pub mod generic;
pub mod header;
pub mod heap;
pub mod int;
pub mod limits;
pub mod list;
pub mod map;
pub mod map_cache;
pub mod order;
pub mod record;
pub mod string;
pub mod symbol;
pub mod symbol_table;
pub mod uniqlet;
pub mod zbox;
pub mod zref;

pub use error::{ErrorKind, SamError};
pub use header::Tag;
pub use heap::Heap;
pub use zref::ZRef;
