//! Deterministic serialization feeding the block digest.
//!
//! Every value that contributes to a block's hash is encoded through this
//! module so that the same payload produces the same bytes on every run:
//! integers are little-endian and fixed-width, strings and sequences carry
//! an 8-byte length prefix, and struct fields are written in a fixed
//! order. Nothing is ever decoded back - encoding exists solely to hash.

/// Sink for writing encoded bytes.
///
/// Implemented by byte buffers and by the hash builder, so values can be
/// hashed directly without an intermediate allocation.
pub trait EncodeSink {
    /// Writes the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Trait for types with a canonical binary representation.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Serializes to a new byte buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Encode for u32 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.to_le_bytes());
    }
}

impl Encode for u64 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.to_le_bytes());
    }
}

impl Encode for str {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (self.len() as u64).encode(out);
        out.write(self.as_bytes());
    }
}

impl Encode for String {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.as_str().encode(out);
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (self.len() as u64).encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.as_slice().encode(out);
    }
}
