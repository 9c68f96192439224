//! QNS: deterministic name registry and resolution engine.
//!
//! Registers hierarchical names (a root domain under a small fixed set of
//! top-level domains, plus optional subdomains) for a bounded number of
//! accounting periods, attaches resolution data to full names, and garbage-
//! collects expired registrations at period boundaries.
//!
//! # Architecture
//!
//! - [`types`]: fixed-width labels, domains, records, protocol constants
//! - [`validation`]: label/domain invariants and deterministic key derivation
//! - [`collections`]: the bounded hash table backing both stores
//! - [`core`]: the owned state, root-key coupling, and the epoch sweep
//! - [`operations`]: lifecycle operations with fee and ownership gates
//! - [`dispatch`]: numbered entry-point routing for the host
//!
//! # Determinism
//!
//! Every node replaying the same call sequence must reach an identical state.
//! Key derivation is pure BLAKE3 and table slot placement carries no
//! per-process seed. Time enters only through the host-supplied epoch and
//! date in [`operations::CallContext`]; nothing reads the wall clock.
//!
//! # Execution model
//!
//! Single-threaded and cooperative. The host serializes calls and the epoch
//! sweep against the one state instance; operations take `&mut QnsState` and
//! run to completion synchronously.

pub mod collections;
pub mod core;
pub mod dispatch;
pub mod operations;
pub mod types;
pub mod validation;

pub use crate::core::{QnsState, SUPPORTED_TLDS};
pub use crate::dispatch::{dispatch, Call, CallOutput};
pub use crate::operations::{CallContext, Funds, QnsError, SUCCESS_CODE};
pub use crate::types::{
    fees, limits, Domain, FixedName, Identity, NameLabel, RegistryRecord, ResolveData, TldLabel,
    NULL_IDENTITY,
};
