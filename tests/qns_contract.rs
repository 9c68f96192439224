//! End-to-end lifecycle scenarios driven through the dispatch boundary with a
//! mock balance ledger, so fee and refund invariants are checked against real
//! account balances.

use std::collections::HashMap;

use lib_qns::operations::{
    get_registry_record, get_resolve_address, get_resolve_data, get_resolve_text,
    register_domain, renew_domain, set_resolve_address, set_resolve_data, set_resolve_text,
    transfer_domain,
};
use lib_qns::{
    fees, limits, Call, CallContext, Domain, Funds, Identity, NameLabel, QnsError, QnsState,
    ResolveData, TldLabel, SUCCESS_CODE,
};

const BASE_MONEY: u64 = 1_000_000_000;

fn identity(tag: u8) -> Identity {
    [tag; 32]
}

fn name(text: &str) -> NameLabel {
    NameLabel::encode(text).unwrap()
}

fn domain(sub: &str, root: &str, tld: &str) -> Domain {
    Domain {
        sub: if sub.is_empty() { NameLabel::empty() } else { name(sub) },
        root: if root.is_empty() { NameLabel::empty() } else { name(root) },
        tld: if tld.is_empty() {
            TldLabel::empty()
        } else {
            TldLabel::encode(tld).unwrap()
        },
    }
}

/// Balance ledger standing in for the host's funds: the harness debits the
/// attached payment before a call, operations credit refunds back through
/// `Funds::transfer`.
#[derive(Default)]
struct Ledger {
    balances: HashMap<Identity, u64>,
}

impl Funds for Ledger {
    fn transfer(&mut self, to: Identity, amount: u64) {
        *self.balances.entry(to).or_insert(0) += amount;
    }
}

struct Harness {
    state: QnsState,
    ledger: Ledger,
    epoch: u16,
    date: u32,
}

impl Harness {
    fn new() -> Self {
        Self::with_capacity(64, 4)
    }

    fn with_capacity(domains: usize, subdomains: usize) -> Self {
        Self {
            state: QnsState::with_capacity(domains, subdomains),
            ledger: Ledger::default(),
            epoch: 1,
            date: 0,
        }
    }

    fn fund(&mut self, who: Identity, amount: u64) {
        *self.ledger.balances.entry(who).or_insert(0) += amount;
    }

    fn balance(&self, who: Identity) -> u64 {
        self.ledger.balances.get(&who).copied().unwrap_or(0)
    }

    /// Debit the payment and build the call context, the way the host hands
    /// an invocation to the contract.
    fn ctx(&mut self, caller: Identity, payment: u64) -> CallContext {
        let balance = self.ledger.balances.entry(caller).or_insert(0);
        assert!(*balance >= payment, "caller cannot attach more than it holds");
        *balance -= payment;
        CallContext { caller, payment, epoch: self.epoch, date: self.date }
    }

    fn register(&mut self, caller: Identity, d: &Domain, years: u16, payment: u64) -> u8 {
        let ctx = self.ctx(caller, payment);
        register_domain(&mut self.state, &ctx, &mut self.ledger, d, years).result
    }

    fn renew(&mut self, caller: Identity, d: &Domain, years: u16, payment: u64) -> u8 {
        let ctx = self.ctx(caller, payment);
        renew_domain(&mut self.state, &ctx, &mut self.ledger, d, years).result
    }

    fn transfer(&mut self, caller: Identity, d: &Domain, new_owner: Identity, payment: u64) -> u8 {
        let ctx = self.ctx(caller, payment);
        transfer_domain(&mut self.state, &ctx, &mut self.ledger, d, new_owner).result
    }

    fn set_address(&mut self, caller: Identity, d: &Domain, address: Identity) -> u8 {
        let ctx = self.ctx(caller, 0);
        set_resolve_address(&mut self.state, &ctx, &mut self.ledger, d, address).result
    }

    fn set_text(&mut self, caller: Identity, d: &Domain, text: NameLabel) -> u8 {
        let ctx = self.ctx(caller, 0);
        set_resolve_text(&mut self.state, &ctx, &mut self.ledger, d, text).result
    }

    fn set_data(&mut self, caller: Identity, d: &Domain, data: ResolveData) -> u8 {
        let ctx = self.ctx(caller, 0);
        set_resolve_data(&mut self.state, &ctx, &mut self.ledger, d, data).result
    }
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn register_lifecycle_with_fees_and_refunds() {
    let user = identity(1);
    let mut h = Harness::new();
    h.epoch = 77;
    h.date = 7_070_707;
    h.fund(user, BASE_MONEY);

    let valid = domain("", "example", "qns");
    let bad_tld = domain("", "example", "com");
    let empty_root = domain("", "", "qns");
    let year_fee = fees::REGISTER_FEE_PER_YEAR;

    // Underpaying is rejected and fully refunded.
    assert_eq!(h.register(user, &valid, 1, 1), QnsError::InvalidFund.code());
    assert_eq!(h.balance(user), BASE_MONEY);

    // A successful registration keeps the full payment.
    assert_eq!(h.register(user, &valid, 1, year_fee), SUCCESS_CODE);
    assert_eq!(h.balance(user), BASE_MONEY - year_fee);

    // Rejections after a success still refund in full.
    assert_eq!(h.register(user, &bad_tld, 1, year_fee), QnsError::InvalidTld.code());
    assert_eq!(h.register(user, &empty_root, 1, year_fee), QnsError::InvalidName.code());
    assert_eq!(h.balance(user), BASE_MONEY - year_fee);

    // The stored record reflects the call context.
    let out = get_registry_record(&h.state, &valid);
    assert_eq!(out.result, SUCCESS_CODE);
    let record = out.record.unwrap();
    assert_eq!(record.owner, user);
    assert_eq!(record.register_epoch, 77);
    assert_eq!(record.register_date, 7_070_707);
    assert_eq!(record.registration_years, 1);

    // Unregistered domains report as such.
    let out = get_registry_record(&h.state, &bad_tld);
    assert_eq!(out.result, QnsError::NotRegistered.code());
    assert!(out.record.is_none());
}

#[test]
fn duplicate_registration_rejected_and_first_owner_kept() {
    let first = identity(1);
    let second = identity(2);
    let mut h = Harness::new();
    h.fund(first, BASE_MONEY);
    h.fund(second, BASE_MONEY);

    let d = domain("", "example", "qns");
    let fee = fees::REGISTER_FEE_PER_YEAR;
    assert_eq!(h.register(first, &d, 1, fee), SUCCESS_CODE);

    let state_before = h.state.clone();
    assert_eq!(h.register(second, &d, 1, fee), QnsError::AlreadyRegistered.code());
    assert_eq!(h.balance(second), BASE_MONEY);
    assert_eq!(h.state, state_before);

    // Same root under a different subdomain is still the same registration.
    let sub = domain("www", "example", "qns");
    assert_eq!(h.register(second, &sub, 1, fee), QnsError::AlreadyRegistered.code());
    assert_eq!(
        get_registry_record(&h.state, &d).record.unwrap().owner,
        first
    );
}

#[test]
fn overpayment_is_kept_on_success() {
    let user = identity(1);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);

    let d = domain("", "example", "qns");
    let payment = 3 * fees::REGISTER_FEE_PER_YEAR;
    assert_eq!(h.register(user, &d, 1, payment), SUCCESS_CODE);
    assert_eq!(h.balance(user), BASE_MONEY - payment);
}

#[test]
fn registry_capacity_exhaustion_refunds() {
    let user = identity(1);
    let mut h = Harness::with_capacity(2, 2);
    h.fund(user, BASE_MONEY);
    let fee = fees::REGISTER_FEE_PER_YEAR;

    assert_eq!(h.register(user, &domain("", "first", "qns"), 1, fee), SUCCESS_CODE);
    assert_eq!(h.register(user, &domain("", "second", "qns"), 1, fee), SUCCESS_CODE);

    let balance_before = h.balance(user);
    let state_before = h.state.clone();
    assert_eq!(
        h.register(user, &domain("", "third", "qns"), 1, fee),
        QnsError::RegistryFull.code()
    );
    assert_eq!(h.balance(user), balance_before);
    assert_eq!(h.state, state_before);
}

// ============================================================================
// Transfer and renewal
// ============================================================================

#[test]
fn transfer_checks_fee_then_ownership() {
    let user = identity(1);
    let other = identity(2);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);
    h.fund(other, BASE_MONEY);

    let d = domain("", "example", "qns");
    assert_eq!(h.register(user, &d, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);

    // A non-owner paying the full fee fails on ownership, refunded.
    assert_eq!(
        h.transfer(other, &d, other, fees::TRANSFER_DOMAIN_FEE),
        QnsError::NotTheOwner.code()
    );
    assert_eq!(h.balance(other), BASE_MONEY);

    // The owner underpaying fails on the fee, before anything else.
    assert_eq!(h.transfer(user, &d, other, 1), QnsError::InvalidFund.code());

    // Transferring an unregistered name fails after the fee gate.
    let missing = domain("", "missing", "qns");
    assert_eq!(
        h.transfer(user, &missing, other, fees::TRANSFER_DOMAIN_FEE),
        QnsError::NotRegistered.code()
    );

    assert_eq!(
        h.transfer(user, &d, other, fees::TRANSFER_DOMAIN_FEE),
        SUCCESS_CODE
    );
    assert_eq!(get_registry_record(&h.state, &d).record.unwrap().owner, other);
}

#[test]
fn renew_extends_registration_for_owner_only() {
    let user = identity(1);
    let other = identity(2);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);
    h.fund(other, BASE_MONEY);

    let d = domain("", "example", "qns");
    let fee = fees::REGISTER_FEE_PER_YEAR;
    assert_eq!(h.register(user, &d, 1, fee), SUCCESS_CODE);

    assert_eq!(h.renew(other, &d, 1, fee), QnsError::NotTheOwner.code());
    assert_eq!(h.balance(other), BASE_MONEY);
    assert_eq!(h.renew(user, &d, 1, 1), QnsError::InvalidFund.code());
    assert_eq!(
        h.renew(user, &domain("", "missing", "qns"), 1, fee),
        QnsError::NotRegistered.code()
    );

    assert_eq!(h.renew(user, &d, 2, 2 * fee), SUCCESS_CODE);
    assert_eq!(
        get_registry_record(&h.state, &d).record.unwrap().registration_years,
        3
    );
}

// ============================================================================
// Resolution data
// ============================================================================

#[test]
fn set_and_get_resolve_data_round_trip() {
    let user = identity(1);
    let target = identity(9);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);

    let d = domain("", "example", "qns");
    assert_eq!(h.register(user, &d, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);

    let text = name("textdata");
    assert_eq!(h.set_address(user, &d, target), SUCCESS_CODE);
    assert_eq!(h.set_text(user, &d, text), SUCCESS_CODE);

    // Field-level writes land in one entry.
    let out = get_resolve_data(&h.state, &d);
    assert_eq!(out.result, SUCCESS_CODE);
    assert_eq!(out.data.unwrap(), ResolveData { address: target, text });

    assert_eq!(get_resolve_address(&h.state, &d).address.unwrap(), target);
    assert_eq!(get_resolve_text(&h.state, &d).text.unwrap(), text);

    // Whole-entry upsert replaces both fields.
    let replacement = ResolveData { address: identity(8), text: name("other") };
    assert_eq!(h.set_data(user, &d, replacement), SUCCESS_CODE);
    assert_eq!(get_resolve_data(&h.state, &d).data.unwrap(), replacement);
}

#[test]
fn resolve_lookups_report_missing_layers() {
    let user = identity(1);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);

    let registered = domain("", "example", "qns");
    let unregistered = domain("", "invalid", "qns");
    assert_eq!(
        h.register(user, &registered, 1, fees::REGISTER_FEE_PER_YEAR),
        SUCCESS_CODE
    );

    // Unregistered root fails first.
    assert_eq!(
        get_resolve_text(&h.state, &unregistered).result,
        QnsError::NotRegistered.code()
    );
    assert_eq!(
        get_resolve_address(&h.state, &unregistered).result,
        QnsError::NotRegistered.code()
    );

    // Registered root without an entry for the full name.
    assert_eq!(
        get_resolve_data(&h.state, &registered).result,
        QnsError::NoResolveData.code()
    );
    let sub = domain("www", "example", "qns");
    assert_eq!(
        get_resolve_data(&h.state, &sub).result,
        QnsError::NoResolveData.code()
    );
}

#[test]
fn resolve_mutation_requires_owner_and_registration() {
    let user = identity(1);
    let intruder = identity(2);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);
    h.fund(intruder, BASE_MONEY);

    let d = domain("", "example", "qns");
    assert_eq!(h.register(user, &d, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);

    let state_before = h.state.clone();
    assert_eq!(h.set_address(intruder, &d, intruder), QnsError::NotTheOwner.code());
    assert_eq!(h.set_text(intruder, &d, name("hijack")), QnsError::NotTheOwner.code());
    assert_eq!(h.state, state_before);

    let missing = domain("", "missing", "qns");
    assert_eq!(h.set_address(user, &missing, user), QnsError::NotRegistered.code());
}

#[test]
fn subdomains_share_a_record_but_resolve_separately() {
    let user = identity(1);
    let mut h = Harness::new();
    h.fund(user, BASE_MONEY);

    let root = domain("", "example", "qns");
    let a = domain("a", "example", "qns");
    let b = domain("b", "example", "qns");
    assert_eq!(h.register(user, &root, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);

    assert_eq!(h.set_address(user, &a, identity(10)), SUCCESS_CODE);
    assert_eq!(h.set_address(user, &b, identity(11)), SUCCESS_CODE);

    // One registration record serves every subdomain of the root.
    assert_eq!(get_registry_record(&h.state, &a).record.unwrap().owner, user);
    assert_eq!(get_registry_record(&h.state, &b).record.unwrap().owner, user);

    // Resolution entries stay distinct per full name.
    assert_eq!(get_resolve_address(&h.state, &a).address.unwrap(), identity(10));
    assert_eq!(get_resolve_address(&h.state, &b).address.unwrap(), identity(11));
    assert_eq!(
        get_resolve_data(&h.state, &root).result,
        QnsError::NoResolveData.code()
    );
}

#[test]
fn subdomain_capacity_exhaustion_rejects_new_entries() {
    let user = identity(1);
    let mut h = Harness::with_capacity(4, 2);
    h.fund(user, BASE_MONEY);

    let root = domain("", "example", "qns");
    assert_eq!(h.register(user, &root, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);

    assert_eq!(h.set_address(user, &domain("a", "example", "qns"), identity(10)), SUCCESS_CODE);
    assert_eq!(h.set_address(user, &domain("b", "example", "qns"), identity(11)), SUCCESS_CODE);
    assert_eq!(
        h.set_address(user, &domain("c", "example", "qns"), identity(12)),
        QnsError::RegistryFull.code()
    );

    // Updating an existing entry still works at capacity.
    assert_eq!(h.set_address(user, &domain("a", "example", "qns"), identity(13)), SUCCESS_CODE);
}

// ============================================================================
// Expiry
// ============================================================================

#[test]
fn registration_survives_until_window_elapses() {
    let user = identity(1);
    let mut h = Harness::new();
    h.epoch = 77;
    h.fund(user, BASE_MONEY);

    let d = domain("", "example", "qns");
    assert_eq!(h.register(user, &d, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);
    assert_eq!(h.set_address(user, &d, identity(9)), SUCCESS_CODE);

    // Still alive through the last epoch of the purchased window.
    h.state.begin_epoch(77 + limits::EPOCHS_IN_YEAR);
    assert_eq!(get_registry_record(&h.state, &d).result, SUCCESS_CODE);
    assert_eq!(get_resolve_address(&h.state, &d).result, SUCCESS_CODE);

    // One epoch later the sweep evicts record and resolution data together.
    h.state.begin_epoch(77 + limits::EPOCHS_IN_YEAR + 1);
    assert_eq!(
        get_registry_record(&h.state, &d).result,
        QnsError::NotRegistered.code()
    );
    assert_eq!(
        get_resolve_address(&h.state, &d).result,
        QnsError::NotRegistered.code()
    );

    // The name is registrable again afterwards.
    assert_eq!(h.register(user, &d, 1, fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);
}

#[test]
fn renewal_defers_expiry() {
    let user = identity(1);
    let mut h = Harness::new();
    h.epoch = 10;
    h.fund(user, BASE_MONEY);

    let d = domain("", "example", "qns");
    let fee = fees::REGISTER_FEE_PER_YEAR;
    assert_eq!(h.register(user, &d, 1, fee), SUCCESS_CODE);
    assert_eq!(h.renew(user, &d, 1, fee), SUCCESS_CODE);

    // Two purchased years now; one year in, the record must survive.
    h.state.begin_epoch(10 + limits::EPOCHS_IN_YEAR + 1);
    assert_eq!(get_registry_record(&h.state, &d).result, SUCCESS_CODE);
    h.state.begin_epoch(10 + 2 * limits::EPOCHS_IN_YEAR + 1);
    assert_eq!(
        get_registry_record(&h.state, &d).result,
        QnsError::NotRegistered.code()
    );
}

// ============================================================================
// Dispatch boundary
// ============================================================================

#[test]
fn dispatch_routes_procedures_and_functions() {
    let user = identity(1);
    let mut h = Harness::new();
    h.epoch = 5;
    h.fund(user, BASE_MONEY);

    let d = domain("", "example", "qns");
    let ctx = h.ctx(user, fees::REGISTER_FEE_PER_YEAR);
    let out = lib_qns::dispatch(
        &mut h.state,
        &ctx,
        &mut h.ledger,
        Call::RegisterDomain { domain: d, years: 1 },
    );
    assert_eq!(out.result(), SUCCESS_CODE);
    assert!(Call::RegisterDomain { domain: d, years: 1 }.is_procedure());

    let ctx = h.ctx(user, 0);
    let out = lib_qns::dispatch(
        &mut h.state,
        &ctx,
        &mut h.ledger,
        Call::GetRegistryRecord { domain: d },
    );
    assert!(!Call::GetRegistryRecord { domain: d }.is_procedure());
    match out {
        lib_qns::CallOutput::RegistryRecord(got) => {
            assert_eq!(got.result, SUCCESS_CODE);
            assert_eq!(got.record.unwrap().owner, user);
        }
        other => panic!("unexpected output shape: {other:?}"),
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn populated_state_snapshot_round_trips() {
    let user = identity(1);
    let mut h = Harness::new();
    h.epoch = 42;
    h.fund(user, BASE_MONEY);

    let d = domain("", "example", "qns");
    assert_eq!(h.register(user, &d, 2, 2 * fees::REGISTER_FEE_PER_YEAR), SUCCESS_CODE);
    assert_eq!(h.set_address(user, &d, identity(9)), SUCCESS_CODE);
    assert_eq!(h.set_text(user, &d, name("payload")), SUCCESS_CODE);

    let snapshot = serde_json::to_string(&h.state).unwrap();
    let restored: QnsState = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(restored, h.state);

    // The restored state answers queries identically.
    assert_eq!(
        get_resolve_data(&restored, &d).data,
        get_resolve_data(&h.state, &d).data
    );
}
