//! Registration lifecycle operations.
//!
//! Every mutating operation runs its gate checks in a fixed order before any
//! state is touched; the first failing check wins. A rejected call refunds the
//! full attached payment through the host's transfer primitive and leaves the
//! state exactly as it was. A successful call retains the full attachment,
//! overpayment included.
//!
//! Read-only operations never touch funds and are callable by anyone.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::core::QnsState;
use crate::types::{fees, Domain, Identity, NameLabel, RegistryRecord, ResolveData};

/// Result code of a successful call.
pub const SUCCESS_CODE: u8 = 0;

// ============================================================================
// Error taxonomy
// ============================================================================

/// Stable error taxonomy. Each variant maps to a fixed numeric code carried in
/// every output's `result` field; the numbers never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum QnsError {
    #[error("domain name failed validation")]
    InvalidName,
    #[error("top-level domain is not supported")]
    InvalidTld,
    #[error("subdomain label failed validation")]
    InvalidSubdomain,
    #[error("name not found")]
    NameNotFound,
    #[error("name has no resolve data")]
    NoResolveData,
    #[error("name is not registered")]
    NotRegistered,
    #[error("name is already registered")]
    AlreadyRegistered,
    #[error("date is invalid")]
    InvalidDate,
    #[error("caller is not the owner")]
    NotTheOwner,
    #[error("attached funds below required fee")]
    InvalidFund,
    #[error("registry capacity exhausted")]
    RegistryFull,
}

impl QnsError {
    /// Numeric code reported at the call boundary.
    pub const fn code(self) -> u8 {
        match self {
            QnsError::InvalidName => 1,
            QnsError::InvalidTld => 2,
            QnsError::InvalidSubdomain => 3,
            QnsError::NameNotFound => 4,
            QnsError::NoResolveData => 5,
            QnsError::NotRegistered => 6,
            QnsError::AlreadyRegistered => 7,
            QnsError::InvalidDate => 8,
            QnsError::NotTheOwner => 9,
            QnsError::InvalidFund => 10,
            QnsError::RegistryFull => 11,
        }
    }
}

// ============================================================================
// Invocation boundary
// ============================================================================

/// Per-call context supplied by the hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Identity invoking the call.
    pub caller: Identity,
    /// Funds attached to the call, already debited from the caller.
    pub payment: u64,
    /// Current accounting period.
    pub epoch: u16,
    /// Packed calendar date of the call.
    pub date: u32,
}

/// Host transfer primitive. Operations move funds only through this seam,
/// which keeps balances out of the deterministic state entirely.
pub trait Funds {
    fn transfer(&mut self, to: Identity, amount: u64);
}

fn reject<F: Funds>(ctx: &CallContext, funds: &mut F, err: QnsError) -> u8 {
    if ctx.payment > 0 {
        funds.transfer(ctx.caller, ctx.payment);
    }
    err.code()
}

// ============================================================================
// Outputs
// ============================================================================

/// Output of every mutating procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureOutput {
    pub result: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRegistryRecordOutput {
    pub result: u8,
    pub record: Option<RegistryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResolveDataOutput {
    pub result: u8,
    pub data: Option<ResolveData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResolveAddressOutput {
    pub result: u8,
    pub address: Option<Identity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResolveTextOutput {
    pub result: u8,
    pub text: Option<NameLabel>,
}

// ============================================================================
// Mutating procedures
// ============================================================================

/// Register a root domain for `years` registration years.
///
/// Gate order: name validity, not already registered, supported TLD,
/// sufficient payment, registry capacity.
pub fn register_domain<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    domain: &Domain,
    years: u16,
) -> ProcedureOutput {
    let result = match try_register(state, ctx, domain, years) {
        Ok(()) => SUCCESS_CODE,
        Err(err) => reject(ctx, funds, err),
    };
    ProcedureOutput { result }
}

fn try_register(
    state: &mut QnsState,
    ctx: &CallContext,
    domain: &Domain,
    years: u16,
) -> Result<(), QnsError> {
    if !domain.validate() {
        return Err(QnsError::InvalidName);
    }
    let root_key = domain.root_key();
    if state.record(root_key).is_some() {
        return Err(QnsError::AlreadyRegistered);
    }
    if !state.is_tld_supported(&domain.tld) {
        return Err(QnsError::InvalidTld);
    }
    if ctx.payment < years as u64 * fees::REGISTER_FEE_PER_YEAR {
        return Err(QnsError::InvalidFund);
    }

    let record = RegistryRecord {
        owner: ctx.caller,
        register_date: ctx.date,
        register_epoch: ctx.epoch,
        registration_years: years,
    };
    if !state.create_root(root_key, record) {
        return Err(QnsError::RegistryFull);
    }
    info!(
        domain = %domain,
        root_key = %hex::encode(root_key.to_be_bytes()),
        years,
        epoch = ctx.epoch,
        "domain registered"
    );
    Ok(())
}

/// Extend an existing registration by `years`.
pub fn renew_domain<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    domain: &Domain,
    years: u16,
) -> ProcedureOutput {
    let result = match try_renew(state, ctx, domain, years) {
        Ok(()) => SUCCESS_CODE,
        Err(err) => reject(ctx, funds, err),
    };
    ProcedureOutput { result }
}

fn try_renew(
    state: &mut QnsState,
    ctx: &CallContext,
    domain: &Domain,
    years: u16,
) -> Result<(), QnsError> {
    let root_key = domain.root_key();
    let record = state.record(root_key).ok_or(QnsError::NotRegistered)?;
    if record.owner != ctx.caller {
        return Err(QnsError::NotTheOwner);
    }
    if ctx.payment < years as u64 * fees::REGISTER_FEE_PER_YEAR {
        return Err(QnsError::InvalidFund);
    }

    let record = state.record_mut(root_key).ok_or(QnsError::NotRegistered)?;
    record.registration_years = record.registration_years.saturating_add(years);
    info!(domain = %domain, years, "registration renewed");
    Ok(())
}

/// Hand ownership of a registered domain to `new_owner`.
///
/// The flat transfer fee is checked before existence and ownership.
pub fn transfer_domain<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    domain: &Domain,
    new_owner: Identity,
) -> ProcedureOutput {
    let result = match try_transfer(state, ctx, domain, new_owner) {
        Ok(()) => SUCCESS_CODE,
        Err(err) => reject(ctx, funds, err),
    };
    ProcedureOutput { result }
}

fn try_transfer(
    state: &mut QnsState,
    ctx: &CallContext,
    domain: &Domain,
    new_owner: Identity,
) -> Result<(), QnsError> {
    if ctx.payment < fees::TRANSFER_DOMAIN_FEE {
        return Err(QnsError::InvalidFund);
    }
    let root_key = domain.root_key();
    let record = state.record_mut(root_key).ok_or(QnsError::NotRegistered)?;
    if record.owner != ctx.caller {
        return Err(QnsError::NotTheOwner);
    }

    record.owner = new_owner;
    info!(
        domain = %domain,
        new_owner = %hex::encode(&new_owner[..8]),
        "domain transferred"
    );
    Ok(())
}

/// Replace the resolution entry of the full domain name.
pub fn set_resolve_data<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    domain: &Domain,
    data: ResolveData,
) -> ProcedureOutput {
    let result = match try_upsert_resolve(state, ctx, domain, |entry| *entry = data) {
        Ok(()) => SUCCESS_CODE,
        Err(err) => reject(ctx, funds, err),
    };
    ProcedureOutput { result }
}

/// Set only the address field of the resolution entry, creating the entry if
/// the full domain name has none yet.
pub fn set_resolve_address<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    domain: &Domain,
    address: Identity,
) -> ProcedureOutput {
    let result = match try_upsert_resolve(state, ctx, domain, |entry| entry.address = address) {
        Ok(()) => SUCCESS_CODE,
        Err(err) => reject(ctx, funds, err),
    };
    ProcedureOutput { result }
}

/// Set only the text field of the resolution entry, creating the entry if the
/// full domain name has none yet.
pub fn set_resolve_text<F: Funds>(
    state: &mut QnsState,
    ctx: &CallContext,
    funds: &mut F,
    domain: &Domain,
    text: NameLabel,
) -> ProcedureOutput {
    let result = match try_upsert_resolve(state, ctx, domain, |entry| entry.text = text) {
        Ok(()) => SUCCESS_CODE,
        Err(err) => reject(ctx, funds, err),
    };
    ProcedureOutput { result }
}

fn try_upsert_resolve(
    state: &mut QnsState,
    ctx: &CallContext,
    domain: &Domain,
    apply: impl FnOnce(&mut ResolveData),
) -> Result<(), QnsError> {
    let root_key = domain.root_key();
    let record = state.record(root_key).ok_or(QnsError::NotRegistered)?;
    if record.owner != ctx.caller {
        return Err(QnsError::NotTheOwner);
    }

    let full_key = domain.full_key();
    let map = state
        .resolve_map_mut(root_key)
        .ok_or(QnsError::NotRegistered)?;
    match map.get_mut(&full_key) {
        Some(entry) => apply(entry),
        None => {
            let mut entry = ResolveData::default();
            apply(&mut entry);
            if !map.insert(full_key, entry) {
                return Err(QnsError::RegistryFull);
            }
        }
    }
    info!(domain = %domain, "resolve data updated");
    Ok(())
}

// ============================================================================
// Read-only functions
// ============================================================================

/// Look up the registration record of the domain's root.
pub fn get_registry_record(state: &QnsState, domain: &Domain) -> GetRegistryRecordOutput {
    match state.record(domain.root_key()) {
        Some(record) => GetRegistryRecordOutput { result: SUCCESS_CODE, record: Some(*record) },
        None => GetRegistryRecordOutput {
            result: QnsError::NotRegistered.code(),
            record: None,
        },
    }
}

/// Look up the full resolution entry of the domain.
pub fn get_resolve_data(state: &QnsState, domain: &Domain) -> GetResolveDataOutput {
    match lookup_resolve(state, domain) {
        Ok(data) => GetResolveDataOutput { result: SUCCESS_CODE, data: Some(*data) },
        Err(err) => GetResolveDataOutput { result: err.code(), data: None },
    }
}

/// Look up only the resolution address of the domain.
pub fn get_resolve_address(state: &QnsState, domain: &Domain) -> GetResolveAddressOutput {
    match lookup_resolve(state, domain) {
        Ok(data) => GetResolveAddressOutput { result: SUCCESS_CODE, address: Some(data.address) },
        Err(err) => GetResolveAddressOutput { result: err.code(), address: None },
    }
}

/// Look up only the resolution text of the domain.
pub fn get_resolve_text(state: &QnsState, domain: &Domain) -> GetResolveTextOutput {
    match lookup_resolve(state, domain) {
        Ok(data) => GetResolveTextOutput { result: SUCCESS_CODE, text: Some(data.text) },
        Err(err) => GetResolveTextOutput { result: err.code(), text: None },
    }
}

fn lookup_resolve<'a>(state: &'a QnsState, domain: &Domain) -> Result<&'a ResolveData, QnsError> {
    let root_key = domain.root_key();
    if state.record(root_key).is_none() {
        return Err(QnsError::NotRegistered);
    }
    state
        .resolve_entry(root_key, domain.full_key())
        .ok_or(QnsError::NoResolveData)
}
