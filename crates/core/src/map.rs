//! Map: a finite, persistent, immutable association from arbitrary
//! values to arbitrary values, keyed by the total order in
//! [`crate::order`].
//!
//! Entries are stored sorted by key in a flat array, so lookup is
//! binary search and "modifying" operations allocate a fresh array —
//! same cost model as [`crate::list`]. A last-lookup cache
//! ([`crate::map_cache::MapCache`]) sits in front of the binary
//! search, since tight loops frequently re-probe the same key.

use crate::class::CLASS_MAP;
use crate::header::Tag;
use crate::heap::Heap;
use crate::order::{total_cmp, total_eq};
use crate::zref::ZRef;

#[repr(C)]
pub struct MapPayload {
    pub(crate) header: crate::header::Header,
    pub(crate) pairs: Box<[(ZRef, ZRef)]>,
}

#[derive(Clone, Copy, Debug)]
pub struct SamMap(pub(crate) ZRef);

impl SamMap {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &MapPayload {
        unsafe { self.0.payload::<MapPayload>() }
    }

    pub fn len(&self) -> usize {
        self.payload().pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pairs(&self) -> &[(ZRef, ZRef)] {
        &self.payload().pairs
    }
}

pub(crate) fn alloc_empty_map(heap: &Heap) -> ZRef {
    heap.new_map(&[])
}

/// Sorts and deduplicates `pairs` by key, keeping the *last* value for
/// any duplicate key: constructing a Map from a list of pairs with a
/// repeated key keeps the last occurrence.
fn normalize(heap: &Heap, pairs: &[(ZRef, ZRef)]) -> Vec<(ZRef, ZRef)> {
    let mut sorted: Vec<(ZRef, ZRef)> = pairs.to_vec();
    sorted.sort_by(|a, b| total_cmp(heap, a.0, b.0));
    let mut out: Vec<(ZRef, ZRef)> = Vec::with_capacity(sorted.len());
    for (k, v) in sorted {
        match out.last_mut() {
            Some(last) if total_eq(heap, last.0, k) => *last = (k, v),
            _ => out.push((k, v)),
        }
    }
    out
}

fn find(heap: &Heap, map: SamMap, key: ZRef) -> Result<usize, usize> {
    if let Some(idx) = heap.map_cache.borrow().get(map.zref(), key) {
        if idx < map.len() && total_eq(heap, map.pairs()[idx].0, key) {
            return Ok(idx);
        }
    }
    let result = map.pairs().binary_search_by(|(k, _)| total_cmp(heap, *k, key));
    if let Ok(idx) = result {
        heap.map_cache.borrow_mut().put(map.zref(), key, idx);
    }
    result
}

impl Heap {
    /// Builds a map from an arbitrary (unsorted, possibly
    /// duplicate-keyed) slice of pairs.
    pub fn new_map(&self, pairs: &[(ZRef, ZRef)]) -> ZRef {
        if pairs.is_empty() {
            if let Some(e) = self.empty_map.get() {
                return e;
            }
        }
        let normalized = normalize(self, pairs);
        self.alloc_value(Tag::Map, CLASS_MAP, false, |header| MapPayload {
            header,
            pairs: normalized.into_boxed_slice(),
        })
    }

    pub fn as_map(&self, zref: ZRef) -> Option<SamMap> {
        if zref.tag() == Tag::Map {
            Some(SamMap(zref))
        } else {
            None
        }
    }

    pub fn map_get(&self, map: SamMap, key: ZRef) -> Option<ZRef> {
        find(self, map, key).ok().map(|idx| map.pairs()[idx].1)
    }

    /// Returns a new map with `key` bound to `value`, overwriting any
    /// existing binding for `key`.
    pub fn map_put(&self, map: SamMap, key: ZRef, value: ZRef) -> ZRef {
        let mut pairs = map.pairs().to_vec();
        match find(self, map, key) {
            Ok(idx) => pairs[idx] = (key, value),
            Err(idx) => pairs.insert(idx, (key, value)),
        }
        self.alloc_value(Tag::Map, CLASS_MAP, false, |header| MapPayload {
            header,
            pairs: pairs.into_boxed_slice(),
        })
    }

    /// Returns a new map with `key` removed, or the same map
    /// (pointer-identical) if `key` was absent.
    pub fn map_del(&self, map: SamMap, key: ZRef) -> ZRef {
        match find(self, map, key) {
            Ok(idx) => {
                let mut pairs = map.pairs().to_vec();
                pairs.remove(idx);
                self.new_map_sorted(pairs)
            }
            Err(_) => map.zref(),
        }
    }

    fn new_map_sorted(&self, pairs: Vec<(ZRef, ZRef)>) -> ZRef {
        if pairs.is_empty() {
            return self.new_map(&[]);
        }
        self.alloc_value(Tag::Map, CLASS_MAP, false, |header| MapPayload {
            header,
            pairs: pairs.into_boxed_slice(),
        })
    }

    /// Concatenates any number of maps left-to-right, rightmost
    /// binding winning on key collision.
    pub fn map_cat(&self, maps: &[SamMap]) -> ZRef {
        let mut pairs: Vec<(ZRef, ZRef)> = Vec::new();
        for m in maps {
            pairs.extend_from_slice(m.pairs());
        }
        self.new_map(&pairs)
    }

    /// A single-mapping map for the `i`-th entry in sorted order, or
    /// `None` if `i` is out of range.
    pub fn map_nth(&self, map: SamMap, i: usize) -> Option<ZRef> {
        let (k, v) = *map.pairs().get(i)?;
        Some(self.new_map(&[(k, v)]))
    }

    /// `mappingKey`/`mappingValue` on a one-mapping map. Fatal if
    /// `map` doesn't hold exactly one mapping.
    pub fn mapping_key(&self, map: SamMap) -> ZRef {
        if map.len() != 1 {
            panic!("fatal: mappingKey requires a one-mapping map, got {} mappings", map.len());
        }
        map.pairs()[0].0
    }

    pub fn mapping_value(&self, map: SamMap) -> ZRef {
        if map.len() != 1 {
            panic!("fatal: mappingValue requires a one-mapping map, got {} mappings", map.len());
        }
        map.pairs()[0].1
    }

    pub fn map_eq(&self, a: SamMap, b: SamMap) -> bool {
        a.len() == b.len()
            && a.pairs().iter().zip(b.pairs().iter()).all(|((ka, va), (kb, vb))| {
                total_eq(self, *ka, *kb) && total_eq(self, *va, *vb)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_keeps_last_value() {
        let heap = Heap::new();
        let k = heap.new_string_from_utf8(b"x").unwrap();
        let v1 = heap.new_int(1);
        let v2 = heap.new_int(2);
        let map = heap.as_map(heap.new_map(&[(k, v1), (k, v2)])).unwrap();
        assert_eq!(map.len(), 1);
        let got = heap.map_get(map, k).unwrap();
        assert!(got.is_same(&v2));
    }

    #[test]
    fn put_then_get_roundtrips() {
        let heap = Heap::new();
        let map = heap.as_map(heap.new_map(&[])).unwrap();
        let k = heap.new_int(7);
        let v = heap.new_string_from_utf8(b"hi").unwrap();
        let map2 = heap.as_map(heap.map_put(map, k, v)).unwrap();
        assert_eq!(heap.map_get(map2, k), Some(v));
        assert_eq!(heap.map_get(map, k), None);
    }

    #[test]
    fn del_missing_key_returns_same_map() {
        let heap = Heap::new();
        let map = heap.as_map(heap.new_map(&[])).unwrap();
        let k = heap.new_int(1);
        let result = heap.map_del(map, k);
        assert!(result.is_same(&map.zref()));
    }

    #[test]
    fn cat_rightmost_wins() {
        let heap = Heap::new();
        let k = heap.new_int(1);
        let a = heap.as_map(heap.new_map(&[(k, heap.new_int(10))])).unwrap();
        let b = heap.as_map(heap.new_map(&[(k, heap.new_int(20))])).unwrap();
        let cat = heap.as_map(heap.map_cat(&[a, b])).unwrap();
        assert_eq!(heap.map_get(cat, k), Some(heap.new_int(20)));
    }

    #[test]
    fn mapping_key_and_value_roundtrip() {
        let heap = Heap::new();
        let k = heap.new_int(1);
        let v = heap.new_int(2);
        let one = heap.as_map(heap.new_map(&[(k, v)])).unwrap();
        assert!(heap.mapping_key(one).is_same(&k));
        assert!(heap.mapping_value(one).is_same(&v));
    }
}
