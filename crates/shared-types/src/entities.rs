//! # Core Domain Entities
//!
//! Identifiers, transactions and verdicts shared by the scheduler (12) and the
//! contract runtime (11).
//!
//! ## Identifier layout
//!
//! Identifiers are opaque fixed-width integers. A [`ChunkId`] packs the owning
//! application, the account and a local slot into one 128-bit key:
//!
//! ```text
//! | app: u32 (bits 80..112) | account: u64 (bits 16..80) | slot: u16 (bits 0..16) |
//! ```

use crate::errors::ParseIdError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier, unique within one scheduling batch.
pub type TxId = u64;

/// Invocation sequence number, monotonically increasing within one execution attempt.
pub type InvocationId = u64;

/// Gas budget supplied by the caller.
pub type Gas = u64;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Application (contract) identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(pub u32);

/// Account identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app#{}", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct#{}", self.0)
    }
}

/// Composite identifier of one heap chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    /// Owning application.
    pub app: AppId,
    /// Account the chunk belongs to.
    pub account: AccountId,
    /// Local slot within the (app, account) region.
    pub slot: u16,
}

impl ChunkId {
    pub fn new(app: AppId, account: AccountId, slot: u16) -> Self {
        Self { app, account, slot }
    }

    /// The memory region this chunk lives in.
    pub fn region(&self) -> MemoryRegion {
        MemoryRegion::new(self.app, self.account)
    }

    /// Pack into the 128-bit storage key.
    pub fn to_key(&self) -> u128 {
        (u128::from(self.app.0) << 80) | (u128::from(self.account.0) << 16) | u128::from(self.slot)
    }

    /// Unpack a 128-bit storage key. Bits above 112 must be zero.
    pub fn from_key(key: u128) -> Result<Self, ParseIdError> {
        if key >> 112 != 0 {
            return Err(ParseIdError::KeyOutOfRange(key));
        }
        Ok(Self {
            app: AppId((key >> 80) as u32),
            account: AccountId((key >> 16) as u64),
            slot: key as u16,
        })
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.app.0, self.account.0, self.slot)
    }
}

impl FromStr for ChunkId {
    type Err = ParseIdError;

    /// Parses the `app:account:slot` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(app), Some(account), Some(slot), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseIdError::Malformed(s.to_string()));
        };
        let bad = |_| ParseIdError::Malformed(s.to_string());
        Ok(Self {
            app: AppId(app.parse().map_err(bad)?),
            account: AccountId(account.parse().map_err(bad)?),
            slot: slot.parse().map_err(bad)?,
        })
    }
}

/// A region of ledger state: every slot of one (application, account) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub app: AppId,
    pub account: AccountId,
}

impl MemoryRegion {
    pub fn new(app: AppId, account: AccountId) -> Self {
        Self { app, account }
    }

    pub fn contains(&self, chunk: &ChunkId) -> bool {
        chunk.app == self.app && chunk.account == self.account
    }
}

/// Entry of a transaction's access list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessKey {
    App(AppId),
    Account(AccountId),
}

// =============================================================================
// TRANSACTION
// =============================================================================

/// A transaction as handed to the scheduler.
///
/// Both access lists are produced by static analysis upstream and are never
/// computed here. Immutable once scheduled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier, unique per batch.
    pub id: TxId,
    /// Target application.
    pub app: AppId,
    /// Request text passed to the application's dispatcher.
    pub request: String,
    /// Gas limit of the root invocation.
    pub gas_limit: Gas,
    /// Applications and accounts this transaction may touch.
    pub access_list: BTreeSet<AccessKey>,
    /// Memory regions this transaction may load.
    pub memory_access: BTreeSet<MemoryRegion>,
}

impl Transaction {
    pub fn new(id: TxId, app: AppId, request: impl Into<String>, gas_limit: Gas) -> Self {
        let mut access_list = BTreeSet::new();
        access_list.insert(AccessKey::App(app));
        Self {
            id,
            app,
            request: request.into(),
            gas_limit,
            access_list,
            memory_access: BTreeSet::new(),
        }
    }

    pub fn with_access(mut self, keys: impl IntoIterator<Item = AccessKey>) -> Self {
        self.access_list.extend(keys);
        self
    }

    pub fn with_memory(mut self, regions: impl IntoIterator<Item = MemoryRegion>) -> Self {
        self.memory_access.extend(regions);
        self
    }

    /// Whether the memory access list covers `chunk`.
    pub fn may_load(&self, chunk: &ChunkId) -> bool {
        self.memory_access.contains(&chunk.region())
    }
}

// =============================================================================
// STATUS & VERDICTS
// =============================================================================

/// Status code returned by a dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// Explicit application rejection via `revert`.
    pub const REVERTED: StatusCode = StatusCode(409);

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an invocation or transaction failed. Reported out-of-band, never as a
/// status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    TimeExhausted,
    StackExhausted,
    CallDepthExceeded,
    IllegalMemoryAccess,
    ArithmeticTrap,
    ResponseOverflow,
    /// A fault arrived while a critical area was open.
    FaultInCriticalArea,
    /// Unmatched critical-area enter/exit.
    ProtocolViolation,
    ContractPanic,
}

impl FailureKind {
    /// Short label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TimeExhausted => "time_exhausted",
            FailureKind::StackExhausted => "stack_exhausted",
            FailureKind::CallDepthExceeded => "call_depth_exceeded",
            FailureKind::IllegalMemoryAccess => "illegal_memory_access",
            FailureKind::ArithmeticTrap => "arithmetic_trap",
            FailureKind::ResponseOverflow => "response_overflow",
            FailureKind::FaultInCriticalArea => "fault_in_critical_area",
            FailureKind::ProtocolViolation => "protocol_violation",
            FailureKind::ContractPanic => "contract_panic",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::TimeExhausted => "CPU time exceeded",
            FailureKind::StackExhausted => "stack exhausted",
            FailureKind::CallDepthExceeded => "call depth exceeded",
            FailureKind::IllegalMemoryAccess => "illegal memory access",
            FailureKind::ArithmeticTrap => "arithmetic trap",
            FailureKind::ResponseOverflow => "response buffer overflow",
            FailureKind::FaultInCriticalArea => "fault inside critical area",
            FailureKind::ProtocolViolation => "critical area protocol violation",
            FailureKind::ContractPanic => "contract panicked",
        };
        f.write_str(text)
    }
}

/// Final outcome of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The root dispatcher returned a status code.
    Completed(StatusCode),
    /// The root invocation failed.
    Failed(FailureKind),
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Completed(status) if status.is_ok())
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Completed(status) => write!(f, "completed: {status}"),
            Verdict::Failed(kind) => write!(f, "failed: {kind}"),
        }
    }
}

// =============================================================================
// FAILURE RECORD
// =============================================================================

/// Timing-dependent failure reasons that need deterministic replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    StackExhausted,
    TimeExhausted,
}

impl From<FailureReason> for FailureKind {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::StackExhausted => FailureKind::StackExhausted,
            FailureReason::TimeExhausted => FailureKind::TimeExhausted,
        }
    }
}

/// Which invocations of one transaction are destined to fail, and why.
///
/// Built by a failed attempt and consumed by the next one. Travels with the
/// verdict so other replicas can replay the same way.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    failures: BTreeMap<InvocationId, FailureReason>,
}

impl FailureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, invocation: InvocationId) -> Option<FailureReason> {
        self.failures.get(&invocation).copied()
    }

    /// Returns `false` if the invocation was already flagged.
    pub fn insert(&mut self, invocation: InvocationId, reason: FailureReason) -> bool {
        self.failures.insert(invocation, reason).is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InvocationId, FailureReason)> + '_ {
        self.failures.iter().map(|(id, reason)| (*id, *reason))
    }
}

/// One verdict per transaction, submitted back to the scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub tx_id: TxId,
    pub verdict: Verdict,
    /// Response text of the root invocation (or the failure description).
    pub response: String,
    /// Number of execution attempts, replays included.
    pub attempts: u32,
    /// Record the final attempt ran under, plus any fault it observed.
    pub failure_record: FailureRecord,
}

impl TransactionResult {
    pub fn new(tx_id: TxId, verdict: Verdict, response: impl Into<String>) -> Self {
        Self {
            tx_id,
            verdict,
            response: response.into(),
            attempts: 1,
            failure_record: FailureRecord::default(),
        }
    }
}
