//! The random body shared by all writes of a run.

use std::fmt;

use bytes::Bytes;
use rand::RngCore;

/// Immutable random bytes, generated once and sent unmodified with every write.
///
/// Cloning is cheap and shares the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Bytes);

impl Payload {
    /// Fills a buffer of `size` bytes from the thread-local CSPRNG.
    pub fn random(size: usize) -> Self {
        let mut buf = vec![0; size];
        rand::rng().fill_bytes(&mut buf);
        Self(Bytes::from(buf))
    }

    /// The number of bytes in the payload.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a handle to the shared bytes.
    pub fn bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").field("len", &self.len()).finish()
    }
}
