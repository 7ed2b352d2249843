//! String: a finite ordered sequence of Unicode scalar values, with a
//! strict UTF-8 boundary codec.

use crate::class::CLASS_STRING;
use crate::header::Tag;
use crate::heap::Heap;
use crate::limits::MAX_CACHED_CHAR;
use crate::zref::ZRef;
use std::cmp::Ordering;

#[repr(C)]
pub struct StringPayload {
    pub(crate) header: crate::header::Header,
    pub(crate) codepoints: Box<[u32]>,
}

#[derive(Clone, Copy, Debug)]
pub struct SamString(pub(crate) ZRef);

/// Strict UTF-8 decode error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Error {
    Truncated,
    Overlong,
    Surrogate,
    NonCharacter,
    OutOfRange,
    InvalidByte,
}

impl std::fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Utf8Error::Truncated => "truncated UTF-8 sequence",
            Utf8Error::Overlong => "overlong UTF-8 encoding",
            Utf8Error::Surrogate => "surrogate code point in UTF-8",
            Utf8Error::NonCharacter => "reserved non-character code point",
            Utf8Error::OutOfRange => "code point beyond U+10FFFF",
            Utf8Error::InvalidByte => "invalid UTF-8 lead/continuation byte",
        };
        f.write_str(msg)
    }
}
impl std::error::Error for Utf8Error {}

/// Decodes `bytes` into a strict sequence of codepoints: rejects
/// overlong encodings, surrogates, the `U+FFFE`/`U+FFFF` non-characters,
/// and anything at or beyond `U+110000`.
pub fn decode_strict_utf8(bytes: &[u8]) -> Result<Vec<u32>, Utf8Error> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        let (len, min, mut cp) = if b0 & 0x80 == 0 {
            (1, 0u32, b0 as u32)
        } else if b0 & 0xE0 == 0xC0 {
            (2, 0x80u32, (b0 & 0x1F) as u32)
        } else if b0 & 0xF0 == 0xE0 {
            (3, 0x800u32, (b0 & 0x0F) as u32)
        } else if b0 & 0xF8 == 0xF0 {
            (4, 0x10000u32, (b0 & 0x07) as u32)
        } else {
            return Err(Utf8Error::InvalidByte);
        };
        if i + len > bytes.len() {
            return Err(Utf8Error::Truncated);
        }
        for k in 1..len {
            let b = bytes[i + k];
            if b & 0xC0 != 0x80 {
                return Err(Utf8Error::InvalidByte);
            }
            cp = (cp << 6) | (b & 0x3F) as u32;
        }
        if cp < min {
            return Err(Utf8Error::Overlong);
        }
        if (0xD800..=0xDFFF).contains(&cp) {
            return Err(Utf8Error::Surrogate);
        }
        if cp == 0xFFFE || cp == 0xFFFF {
            return Err(Utf8Error::NonCharacter);
        }
        if cp >= 0x110000 {
            return Err(Utf8Error::OutOfRange);
        }
        out.push(cp);
        i += len;
    }
    Ok(out)
}

/// Encodes codepoints to UTF-8 bytes (the inverse of
/// [`decode_strict_utf8`]; round-trips byte-for-byte).
pub fn encode_utf8(codepoints: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codepoints.len());
    for &cp in codepoints {
        match char::from_u32(cp) {
            Some(c) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            None => unreachable!("invalid codepoint escaped validation: {}", cp),
        }
    }
    out
}

impl SamString {
    pub fn zref(&self) -> ZRef {
        self.0
    }

    fn payload(&self) -> &StringPayload {
        unsafe { self.0.payload::<StringPayload>() }
    }

    pub fn len(&self) -> usize {
        self.payload().codepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nth(&self, i: usize) -> Option<u32> {
        self.payload().codepoints.get(i).copied()
    }

    pub fn codepoints(&self) -> &[u32] {
        &self.payload().codepoints
    }

    pub fn to_utf8(&self) -> Vec<u8> {
        encode_utf8(self.codepoints())
    }
}

impl PartialEq for SamString {
    fn eq(&self, other: &Self) -> bool {
        self.codepoints() == other.codepoints()
    }
}
impl Eq for SamString {}

impl PartialOrd for SamString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SamString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.codepoints().cmp(other.codepoints())
    }
}

impl Heap {
    pub fn new_string_from_codepoints(&self, codepoints: &[u32]) -> ZRef {
        if codepoints.len() == 1 && codepoints[0] <= MAX_CACHED_CHAR {
            let cp = codepoints[0];
            if let Some(cached) = self.ascii_char_cache.borrow()[cp as usize] {
                return cached;
            }
            let zref = self.alloc_value(Tag::String, CLASS_STRING, false, |header| StringPayload {
                header,
                codepoints: codepoints.into(),
            });
            self.ascii_char_cache.borrow_mut()[cp as usize] = Some(zref);
            return zref;
        }
        self.alloc_value(Tag::String, CLASS_STRING, false, |header| StringPayload {
            header,
            codepoints: codepoints.into(),
        })
    }

    pub fn new_string_from_utf8(&self, bytes: &[u8]) -> Result<ZRef, Utf8Error> {
        let codepoints = decode_strict_utf8(bytes)?;
        Ok(self.new_string_from_codepoints(&codepoints))
    }

    pub fn string_cat(&self, a: SamString, b: SamString) -> ZRef {
        let mut combined = Vec::with_capacity(a.len() + b.len());
        combined.extend_from_slice(a.codepoints());
        combined.extend_from_slice(b.codepoints());
        self.new_string_from_codepoints(&combined)
    }

    pub fn string_slice(&self, s: SamString, start: usize, end: usize) -> ZRef {
        if start > end || end > s.len() {
            panic!(
                "fatal: string slice [{}, {}) out of range for length {}",
                start,
                end,
                s.len()
            );
        }
        self.new_string_from_codepoints(&s.codepoints()[start..end])
    }

    pub fn as_string(&self, zref: ZRef) -> Option<SamString> {
        if zref.tag() == Tag::String {
            Some(SamString(zref))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_single_chars_are_interned() {
        let heap = Heap::new();
        let a = heap.new_string_from_codepoints(&[b'x' as u32]);
        let b = heap.new_string_from_codepoints(&[b'x' as u32]);
        assert!(a.is_same(&b));
    }

    #[test]
    fn utf8_roundtrip() {
        let bytes = "héllo, wörld — 💚".as_bytes();
        let cps = decode_strict_utf8(bytes).unwrap();
        assert_eq!(encode_utf8(&cps), bytes);
    }

    #[test]
    fn rejects_surrogate() {
        let bytes = [0xED, 0xA0, 0x80]; // U+D800 encoded (illegally) in UTF-8 shape
        assert_eq!(decode_strict_utf8(&bytes), Err(Utf8Error::Surrogate));
    }

    #[test]
    fn rejects_overlong() {
        let bytes = [0xC0, 0x80]; // overlong encoding of NUL
        assert_eq!(decode_strict_utf8(&bytes), Err(Utf8Error::Overlong));
    }

    #[test]
    fn rejects_out_of_range() {
        let bytes = [0xF4, 0x90, 0x80, 0x80]; // U+110000
        assert_eq!(decode_strict_utf8(&bytes), Err(Utf8Error::OutOfRange));
    }

    #[test]
    fn rejects_noncharacter() {
        let bytes = [0xEF, 0xBF, 0xBE]; // U+FFFE
        assert_eq!(decode_strict_utf8(&bytes), Err(Utf8Error::NonCharacter));
    }

    #[test]
    fn slice_bounds() {
        let heap = Heap::new();
        let s = heap.as_string(heap.new_string_from_utf8(b"hello").unwrap()).unwrap();
        let full = heap.as_string(heap.string_slice(s, 0, s.len())).unwrap();
        assert_eq!(full, s);
        let sub = heap.as_string(heap.string_slice(s, 1, 3)).unwrap();
        assert_eq!(sub.len(), 2);
    }
}
