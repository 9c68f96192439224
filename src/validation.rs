//! Label and domain validation, plus deterministic key derivation.
//!
//! Every participant replaying the same sequence of calls must arrive at the
//! same table keys, so all hashing here is pure BLAKE3 truncated to 64 bits.
//! No cryptographic strength is claimed for the derived keys; the registry
//! only needs determinism and a usable spread across table slots.

use crate::types::{limits, Domain, FixedName};

// ============================================================================
// Label validation
// ============================================================================

impl<const CAP: usize> FixedName<CAP> {
    /// True when every byte of the buffer is zero.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Check the label invariant for a required (non-empty) position.
    ///
    /// A valid label has its first zero byte at index `MIN_NAME_LENGTH` or
    /// later, only zero bytes after it, and only alphanumeric ASCII before it.
    /// A buffer whose first byte is zero fails, as does a buffer with no zero
    /// byte at all (no room was left for the terminator).
    pub fn validate(&self) -> bool {
        if CAP > limits::MAX_NAME_LENGTH || CAP < limits::MIN_NAME_LENGTH {
            return false;
        }

        let Some(terminator) = self.0.iter().position(|&b| b == 0) else {
            return false;
        };
        if terminator < limits::MIN_NAME_LENGTH {
            return false;
        }

        if self.0[terminator..].iter().any(|&b| b != 0) {
            return false;
        }

        self.0[..terminator].iter().all(|&b| b.is_ascii_alphanumeric())
    }
}

impl Domain {
    /// A domain is valid when the root and TLD labels each satisfy the label
    /// invariant and the subdomain is either empty or satisfies it too.
    pub fn validate(&self) -> bool {
        if !self.sub.is_empty() && !self.sub.validate() {
            return false;
        }
        self.root.validate() && self.tld.validate()
    }
}

// ============================================================================
// Key derivation
// ============================================================================

/// Hash a fixed-width label, padding included, to a 64-bit value.
pub fn label_hash<const CAP: usize>(label: &FixedName<CAP>) -> u64 {
    fold_bytes(label.as_bytes())
}

/// Fold a 64-bit accumulator back through the hash to decorrelate it from the
/// plain sum of its inputs.
fn fold_u64(value: u64) -> u64 {
    fold_bytes(&value.to_le_bytes())
}

fn fold_bytes(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(out)
}

impl Domain {
    /// Partition key shared by every domain with the same root and TLD,
    /// regardless of subdomain.
    pub fn root_key(&self) -> u64 {
        fold_u64(label_hash(&self.root).wrapping_add(label_hash(&self.tld)))
    }

    /// Key of the full name. An empty subdomain hashes like any other buffer,
    /// so a subdomain-less domain still gets a full key distinct from its
    /// root key.
    pub fn full_key(&self) -> u64 {
        fold_u64(
            label_hash(&self.sub)
                .wrapping_add(label_hash(&self.root))
                .wrapping_add(label_hash(&self.tld)),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
