//! Endpoint selection
//!
//! Decides which registered endpoint serves a request.

use super::Endpoint;

/// How a request picks one of the registered endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Always the first registered endpoint
    #[default]
    First,

    /// Hash the encoded key (RFC 1071 checksum) over the endpoint list, so
    /// every client sharing a registration order sends a key to the same
    /// server
    KeyHash,
}

impl SelectionPolicy {
    /// Pick an endpoint from a snapshot of the registry
    pub fn select<'a>(&self, endpoints: &'a [Endpoint], key: &[u8]) -> Option<&'a Endpoint> {
        if endpoints.is_empty() {
            return None;
        }

        match self {
            SelectionPolicy::First => endpoints.first(),
            SelectionPolicy::KeyHash => {
                let index = checksum(key) as usize % endpoints.len();
                endpoints.get(index)
            }
        }
    }
}

/// Internet checksum (RFC 1071) of `buf`, little-endian 16-bit words
pub fn checksum(buf: &[u8]) -> u32 {
    let mut sum: u32 = 0;

    let mut words = buf.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(u16::from_le_bytes([word[0], word[1]])));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last));
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !sum & 0xffff
}
