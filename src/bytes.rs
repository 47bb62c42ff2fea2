use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeTuple, Serializer};

/// Fixed-size byte field, serialized as a bare tuple so bincode writes it
/// without a length prefix. serde only covers arrays up to 32 elements.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct ByteArray<const N: usize>(pub [u8; N]);

impl<const N: usize> ByteArray<N> {
    /// Copies `src` to the front of a zeroed array. `src` must fit.
    pub fn padded(src: &[u8]) -> Self {
        let mut buf = [0u8; N];
        buf[..src.len()].copy_from_slice(src);
        Self(buf)
    }
}

impl<const N: usize> fmt::Debug for ByteArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteArray<{}>(..)", N)
    }
}

impl<const N: usize> Serialize for ByteArray<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(N)?;
        for b in &self.0 {
            tup.serialize_element(b)?;
        }
        tup.end()
    }
}

struct ByteArrayVisitor<const N: usize>(PhantomData<[u8; N]>);

impl<'de, const N: usize> Visitor<'de> for ByteArrayVisitor<N> {
    type Value = ByteArray<N>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an array of {} bytes", N)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut buf = [0u8; N];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(ByteArray(buf))
    }
}

impl<'de, const N: usize> Deserialize<'de> for ByteArray<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(N, ByteArrayVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_length_prefix() {
        let arr = ByteArray::<40>::padded(b"abc");
        let bytes = bincode::serialize(&arr).unwrap();
        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[..3], b"abc");
        assert!(bytes[3..].iter().all(|&b| b == 0));

        let back: ByteArray<40> = bincode::deserialize(&bytes).unwrap();
        assert!(back == arr);
    }

    #[test]
    fn short_input_is_rejected() {
        let res: Result<ByteArray<64>, _> = bincode::deserialize(&[0u8; 10]);
        assert!(res.is_err());
    }
}
