//! Thin entry-point router.
//!
//! The hosting environment addresses operations by number: read-only
//! functions and state-mutating procedures live in separate id spaces. This
//! module only routes; all gating and semantics live in `operations`.

use serde::{Deserialize, Serialize};

use crate::core::QnsState;
use crate::operations::{self, CallContext, Funds};
use crate::types::{Domain, Identity, NameLabel, ResolveData};

// Read-only function ids.
pub const FN_GET_REGISTRY_RECORD: u16 = 10;
pub const FN_GET_RESOLVE_ADDRESS: u16 = 12;
pub const FN_GET_RESOLVE_TEXT: u16 = 13;
pub const FN_GET_RESOLVE_DATA: u16 = 14;

// Mutating procedure ids.
pub const PROC_REGISTER_DOMAIN: u16 = 8;
pub const PROC_SET_RESOLVE_ADDRESS: u16 = 9;
pub const PROC_SET_RESOLVE_TEXT: u16 = 10;
pub const PROC_TRANSFER_DOMAIN: u16 = 11;
pub const PROC_RENEW_DOMAIN: u16 = 13;
pub const PROC_SET_RESOLVE_DATA: u16 = 14;

/// One decoded invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    RegisterDomain { domain: Domain, years: u16 },
    RenewDomain { domain: Domain, years: u16 },
    TransferDomain { domain: Domain, new_owner: Identity },
    SetResolveData { domain: Domain, data: ResolveData },
    SetResolveAddress { domain: Domain, address: Identity },
    SetResolveText { domain: Domain, text: NameLabel },
    GetRegistryRecord { domain: Domain },
    GetResolveData { domain: Domain },
    GetResolveAddress { domain: Domain },
    GetResolveText { domain: Domain },
}

impl Call {
    /// Whether the call may mutate state (and therefore carries a payment).
    pub fn is_procedure(&self) -> bool {
        matches!(
            self,
            Call::RegisterDomain { .. }
                | Call::RenewDomain { .. }
                | Call::TransferDomain { .. }
                | Call::SetResolveData { .. }
                | Call::SetResolveAddress { .. }
                | Call::SetResolveText { .. }
        )
    }
}

/// Output envelope returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutput {
    Procedure(operations::ProcedureOutput),
    RegistryRecord(operations::GetRegistryRecordOutput),
    ResolveData(operations::GetResolveDataOutput),
    ResolveAddress(operations::GetResolveAddressOutput),
    ResolveText(operations::GetResolveTextOutput),
}

impl CallOutput {
    /// The numeric result code, regardless of call shape.
    pub fn result(&self) -> u8 {
        match self {
            CallOutput::Procedure(out) => out.result,
            CallOutput::RegistryRecord(out) => out.result,
            CallOutput::ResolveData(out) => out.result,
            CallOutput::ResolveAddress(out) => out.result,
            CallOutput::ResolveText(out) => out.result,
        }
    }
}

/// Route one call to its handler.
pub fn dispatch<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    call: Call,
) -> CallOutput {
    match call {
        Call::RegisterDomain { domain, years } => CallOutput::Procedure(
            operations::register_domain(state, ctx, funds, &domain, years),
        ),
        Call::RenewDomain { domain, years } => CallOutput::Procedure(
            operations::renew_domain(state, ctx, funds, &domain, years),
        ),
        Call::TransferDomain { domain, new_owner } => CallOutput::Procedure(
            operations::transfer_domain(state, ctx, funds, &domain, new_owner),
        ),
        Call::SetResolveData { domain, data } => CallOutput::Procedure(
            operations::set_resolve_data(state, ctx, funds, &domain, data),
        ),
        Call::SetResolveAddress { domain, address } => CallOutput::Procedure(
            operations::set_resolve_address(state, ctx, funds, &domain, address),
        ),
        Call::SetResolveText { domain, text } => CallOutput::Procedure(
            operations::set_resolve_text(state, ctx, funds, &domain, text),
        ),
        Call::GetRegistryRecord { domain } => {
            CallOutput::RegistryRecord(operations::get_registry_record(state, &domain))
        }
        Call::GetResolveData { domain } => {
            CallOutput::ResolveData(operations::get_resolve_data(state, &domain))
        }
        Call::GetResolveAddress { domain } => {
            CallOutput::ResolveAddress(operations::get_resolve_address(state, &domain))
        }
        Call::GetResolveText { domain } => {
            CallOutput::ResolveText(operations::get_resolve_text(state, &domain))
        }
    }
}
