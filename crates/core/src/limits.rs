//! Tunable implementation limits, overridable only at `Heap`
//! construction — there is no runtime config surface beyond this.

/// Number of allocations between each forced GC cycle.
pub const ALLOCATIONS_PER_GC: usize = 500_000;

/// Number of entries in the map lookup cache. Kept prime for a better
/// spread of cache slots.
pub const MAP_CACHE_SIZE: usize = 70_001;

/// Largest code point for which a single-character string is interned.
pub const MAX_CACHED_CHAR: u32 = 127;

/// Maximum number of immortal values allowed.
pub const MAX_IMMORTALS: usize = 4_000;

/// Maximum number of references on the frame stack.
pub const MAX_STACK: usize = 100_000;

/// Maximum number of classes allowed.
pub const MAX_CLASSES: usize = 2_500;

/// Maximum number of interned method/symbol names allowed.
pub const MAX_SYMBOLS: usize = 500;

/// Maximum (highest) small-int constant kept in the interned cache.
pub const SMALL_INT_MAX: i64 = 700;

/// Minimum (lowest) small-int constant kept in the interned cache.
pub const SMALL_INT_MIN: i64 = -300;

/// Maximum magnitude of an `Int` payload (bounded to ~32 active bits).
pub const INT_BIT_LIMIT: i64 = 1 << 32;

/// Maximum number of active evaluator call frames (distinct from the
/// frame *stack* of C3 — this bounds evaluator recursion depth).
pub const MAX_CALL_STACK_DEPTH: usize = 4_000;

/// Maximum number of formal parameters to a closure.
pub const MAX_FORMALS: usize = 10;
