//! Core value types for the QNS registry.
//!
//! Defines the fixed-width label buffers, the domain triple, the registry and
//! resolution records, and the protocol constants. All persistent types derive
//! serde so a full state instance can be snapshotted and restored byte-stable.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Identity
// ============================================================================

/// 32-byte opaque identity of a caller or resolution target.
pub type Identity = [u8; 32];

/// Sentinel for an uninitialized owner or resolution address.
pub const NULL_IDENTITY: Identity = [0u8; 32];

// ============================================================================
// Protocol limits
// ============================================================================

pub mod limits {
    /// Maximum number of root domains the registry can hold.
    pub const MAX_NUMBER_OF_DOMAINS: usize = 524_288;

    /// Maximum number of resolution entries per root domain.
    pub const MAX_NUMBER_OF_SUBDOMAINS: usize = 16;

    /// Fixed width of a name or subdomain label buffer.
    pub const MAX_NAME_LENGTH: usize = 32;

    /// Minimum number of characters in a non-empty label.
    pub const MIN_NAME_LENGTH: usize = 1;

    /// Fixed width of a top-level-domain label buffer.
    pub const MAX_TLD_LENGTH: usize = 8;

    /// Accounting periods per registration year.
    pub const EPOCHS_IN_YEAR: u16 = 52;
}

pub mod fees {
    /// Registration and renewal fee, per year.
    pub const REGISTER_FEE_PER_YEAR: u64 = 2_000_000;

    /// Flat fee for transferring ownership of a domain.
    pub const TRANSFER_DOMAIN_FEE: u64 = 100;
}

// ============================================================================
// Fixed-width labels
// ============================================================================

/// Fixed-capacity ASCII label buffer.
///
/// A label is either entirely zero (empty) or a run of alphanumeric bytes
/// followed by zero padding; the final byte is always reserved for the
/// terminator, so at most `CAP - 1` characters fit. Equality is byte-wise over
/// the full width. Labels of different capacities are different types and can
/// never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedName<const CAP: usize>(pub(crate) [u8; CAP]);

/// Label type used for root domains, subdomains, and resolution text.
pub type NameLabel = FixedName<{ limits::MAX_NAME_LENGTH }>;

/// Label type used for top-level domains.
pub type TldLabel = FixedName<{ limits::MAX_TLD_LENGTH }>;

impl<const CAP: usize> FixedName<CAP> {
    /// The empty (all-zero) label.
    pub const fn empty() -> Self {
        Self([0u8; CAP])
    }

    /// Build a label from a byte-string literal, checked at compile time when
    /// used in const context.
    pub const fn literal(text: &[u8]) -> Self {
        assert!(text.len() < CAP, "label literal does not fit its buffer");
        let mut buf = [0u8; CAP];
        let mut i = 0;
        while i < text.len() {
            buf[i] = text[i];
            i += 1;
        }
        Self(buf)
    }

    /// Copy `text` into a fresh buffer, zero-padding the remainder. Returns
    /// `None` when the text cannot fit together with its terminator.
    pub fn encode(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() >= CAP {
            return None;
        }
        let mut buf = [0u8; CAP];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self(buf))
    }

    /// Fixed width of the buffer.
    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Raw fixed-width bytes, padding included.
    pub const fn as_bytes(&self) -> &[u8; CAP] {
        &self.0
    }

    /// The character run before the terminator, as a string when it is valid
    /// ASCII. Intended for display and logging.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(CAP);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl<const CAP: usize> Default for FixedName<CAP> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const CAP: usize> fmt::Display for FixedName<CAP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// serde cannot derive over const-generic byte arrays, so the buffer is
// serialized as a plain byte sequence of exactly CAP bytes.
impl<const CAP: usize> Serialize for FixedName<CAP> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

struct FixedNameVisitor<const CAP: usize>;

impl<'de, const CAP: usize> Visitor<'de> for FixedNameVisitor<CAP> {
    type Value = FixedName<CAP>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a byte buffer of length {CAP}")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        if v.len() != CAP {
            return Err(E::invalid_length(v.len(), &self));
        }
        let mut buf = [0u8; CAP];
        buf.copy_from_slice(v);
        Ok(FixedName(buf))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut buf = [0u8; CAP];
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(CAP + 1, &self));
        }
        Ok(FixedName(buf))
    }
}

impl<'de, const CAP: usize> Deserialize<'de> for FixedName<CAP> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(FixedNameVisitor::<CAP>)
    }
}

// ============================================================================
// Domain
// ============================================================================

/// A hierarchical name: optional subdomain label, root label, TLD label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Domain {
    /// Optional subdomain label; empty means the domain has no subdomain.
    pub sub: NameLabel,
    /// Root domain label; must always be non-empty and valid.
    pub root: NameLabel,
    /// Top-level-domain label; must always be non-empty and valid.
    pub tld: TldLabel,
}

impl Domain {
    /// Domain with no subdomain.
    pub fn root_only(root: NameLabel, tld: TldLabel) -> Self {
        Self { sub: NameLabel::empty(), root, tld }
    }

    pub fn with_sub(sub: NameLabel, root: NameLabel, tld: TldLabel) -> Self {
        Self { sub, root, tld }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub.as_str().is_empty() {
            write!(f, "{}.{}", self.root, self.tld)
        } else {
            write!(f, "{}.{}.{}", self.sub, self.root, self.tld)
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Registration state of one root domain.
///
/// A record exists in the registry exactly while its root domain is registered
/// and unexpired. The registration window is relative: the record expires once
/// `register_epoch + registration_years * EPOCHS_IN_YEAR` falls strictly
/// before the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Current owner. Only the owner may renew, transfer, or attach
    /// resolution data.
    pub owner: Identity,
    /// Packed calendar date supplied by the host at registration time.
    pub register_date: u32,
    /// Epoch in which the registration was made.
    pub register_epoch: u16,
    /// Total purchased registration span, in years. Extended by renewal.
    pub registration_years: u16,
}

impl RegistryRecord {
    /// First epoch at which the record counts as expired.
    pub fn expiry_epoch(&self) -> u32 {
        self.register_epoch as u32
            + self.registration_years as u32 * limits::EPOCHS_IN_YEAR as u32
    }
}

impl Default for RegistryRecord {
    fn default() -> Self {
        Self {
            owner: NULL_IDENTITY,
            register_date: 0,
            register_epoch: 0,
            registration_years: 0,
        }
    }
}

/// Resolution payload attached to a full domain name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveData {
    /// Resolution target address.
    pub address: Identity,
    /// Free-form text record.
    pub text: NameLabel,
}

impl Default for ResolveData {
    fn default() -> Self {
        Self { address: NULL_IDENTITY, text: NameLabel::empty() }
    }
}

// ============================================================================
// Tests
// ============================================================================
