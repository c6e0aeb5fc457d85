//! The single hash primitive every other fingerprinting concern builds on:
//! a fixed, cross-implementation-stable 64-bit content hash. Every caller
//! that needs a content-addressed identifier — package content hashes,
//! task fingerprints, the global hash — goes through [`TurboHash::hash`] so
//! that the function is a one-place wire-level commitment, per spec §4.5.

use xxhash_rust::xxh64::xxh64;

/// Types that can produce a stable byte representation to be hashed.
/// Implemented directly for the primitive buffer types the rest of the
/// workspace hashes (raw bytes, strings); composite inputs are expected to
/// build a canonical byte buffer (see [`CanonicalInput`]) rather than
/// implementing this by hand.
pub trait TurboHash {
    fn turbo_hash(&self) -> u64;

    /// Hex-encodes the hash without any heap allocation.
    fn turbo_hash_hex(&self) -> String {
        hex_encode_u64(self.turbo_hash())
    }
}

impl TurboHash for [u8] {
    fn turbo_hash(&self) -> u64 {
        xxh64(self, 0)
    }
}

impl TurboHash for str {
    fn turbo_hash(&self) -> u64 {
        xxh64(self.as_bytes(), 0)
    }
}

impl<T: TurboHash + ?Sized> TurboHash for &T {
    fn turbo_hash(&self) -> u64 {
        (**self).turbo_hash()
    }
}

/// Hex-encodes a `u64` into a fixed 16-character lowercase string using a
/// stack buffer, avoiding the heap allocation `format!("{:016x}", n)` would
/// otherwise incur on every fingerprint computed.
pub fn hex_encode_u64(value: u64) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut buf = [0u8; 16];
    for (i, byte) in value.to_be_bytes().iter().enumerate() {
        buf[i * 2] = HEX[(byte >> 4) as usize];
        buf[i * 2 + 1] = HEX[(byte & 0x0f) as usize];
    }
    // Safety net for correctness rather than performance: the buffer is
    // built entirely from the `HEX` ASCII table above.
    String::from_utf8(buf.to_vec()).expect("hex buffer is always valid utf8")
}

/// Builds a canonical byte buffer from an ordered sequence of fields,
/// length-prefixing each one so that e.g. `["ab", "c"]` and `["a", "bc"]`
/// never collide to the same hash input.
#[derive(Default)]
pub struct CanonicalInput {
    buf: Vec<u8>,
}

impl CanonicalInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        self.buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn fields<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let items: Vec<S> = items.into_iter().collect();
        self.buf
            .extend_from_slice(&(items.len() as u64).to_le_bytes());
        for item in items {
            self = self.field(item);
        }
        self
    }

    pub fn finish(self) -> u64 {
        self.buf.turbo_hash()
    }

    pub fn finish_hex(self) -> String {
        hex_encode_u64(self.finish())
    }
}
