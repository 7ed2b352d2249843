//! Uniqlet: a value whose sole significant property is its identity —
//! every construction yields a value unequal to every prior one.

use crate::class::CLASS_UNIQLET;
use crate::header::Tag;
use crate::heap::Heap;
use crate::zref::ZRef;

#[repr(C)]
pub struct UniqletPayload {
    pub(crate) header: crate::header::Header,
}

#[derive(Clone, Copy, Debug)]
pub struct Uniqlet(pub(crate) ZRef);

impl Uniqlet {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    pub fn id(&self) -> u64 {
        self.0.identity_id()
    }
}

impl PartialEq for Uniqlet {
    fn eq(&self, other: &Self) -> bool {
        self.0.is_same(&other.0)
    }
}
impl Eq for Uniqlet {}

impl PartialOrd for Uniqlet {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Uniqlet {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id().cmp(&other.id())
    }
}

impl Heap {
    pub fn new_uniqlet(&self) -> ZRef {
        self.alloc_value(Tag::Uniqlet, CLASS_UNIQLET, true, |header| UniqletPayload { header })
    }

    pub fn as_uniqlet(&self, zref: ZRef) -> Option<Uniqlet> {
        if zref.tag() == Tag::Uniqlet {
            Some(Uniqlet(zref))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_uniqlet_is_distinct() {
        let heap = Heap::new();
        let a = heap.as_uniqlet(heap.new_uniqlet()).unwrap();
        let b = heap.as_uniqlet(heap.new_uniqlet()).unwrap();
        assert_ne!(a, b);
        assert!(a.id() < b.id());
    }
}
