//! # Fixture Applications
//!
//! Small contracts exercising every host primitive, plus transaction
//! builders with matching access lists.
//!
//! | App | Id | Requests |
//! |-----|----|----------|
//! | Token | 1 | `mint <acct> <amount>`, `transfer <from> <to> <amount>`, `balance <acct>` |
//! | Vault | 2 | `deposit`, `lock`, `lock_unchecked`, `divide`, `unbalanced`, `stray_exit` |
//! | Ledger | 3 | `record <amount>`, `count` (called deferred by Token) |
//! | Fib | 4 | `fib <levels> <n>` |
//! | Guard | 5 | `call <vault request>`, `panic` |
//! | Notify | 6 | `notify <n>` |

use qc_11_contract_runtime::numeric::checked_div;
use qc_11_contract_runtime::prelude::*;
use std::sync::Arc;

pub const TOKEN: AppId = AppId(1);
pub const VAULT: AppId = AppId(2);
pub const LEDGER: AppId = AppId(3);
pub const FIB: AppId = AppId(4);
pub const GUARD: AppId = AppId(5);
pub const NOTIFY: AppId = AppId(6);

/// Account owning application-wide chunks.
pub const GLOBAL: AccountId = AccountId(0);

/// Gas forwarded to nested and deferred calls.
pub const FORWARDED_GAS: u64 = 100;

pub fn balance_chunk(account: u64) -> ChunkId {
    ChunkId::new(TOKEN, AccountId(account), 0)
}

pub fn vault_chunk(account: u64) -> ChunkId {
    ChunkId::new(VAULT, AccountId(account), 0)
}

pub fn ledger_chunk() -> ChunkId {
    ChunkId::new(LEDGER, GLOBAL, 0)
}

pub fn notify_chunk() -> ChunkId {
    ChunkId::new(NOTIFY, GLOBAL, 0)
}

/// Registry with every fixture application.
pub fn registry() -> ContractRegistry {
    let mut registry = ContractRegistry::new();
    registry.register_fn(TOKEN, token);
    registry.register_fn(VAULT, vault);
    registry.register_fn(LEDGER, ledger);
    registry.register_fn(FIB, fib);
    registry.register_fn(GUARD, guard);
    registry.register_fn(NOTIFY, notify);
    registry
}

pub fn executor(storage: Arc<InMemoryHeap>) -> Executor<InMemoryHeap> {
    Executor::new(Arc::new(registry()), storage, RuntimeConfig::default())
}

/// Seed a token balance directly into storage.
pub fn seed_balance(storage: &InMemoryHeap, account: u64, amount: i64) {
    storage.insert(balance_chunk(account), amount.to_le_bytes().to_vec());
}

pub fn read_i64(storage: &InMemoryHeap, id: ChunkId, offset: usize) -> Option<i64> {
    let bytes = storage.get(id)?;
    let field = bytes.get(offset..offset + 8)?;
    Some(i64::from_le_bytes(field.try_into().ok()?))
}

// =============================================================================
// TRANSACTION BUILDERS
// =============================================================================

pub fn transfer_tx(id: u64, from: u64, to: u64, amount: i64) -> Transaction {
    Transaction::new(id, TOKEN, format!("transfer {from} {to} {amount}"), 1_000)
        .with_access([
            AccessKey::Account(AccountId(from)),
            AccessKey::Account(AccountId(to)),
            AccessKey::App(LEDGER),
        ])
        .with_memory([
            MemoryRegion::new(TOKEN, AccountId(from)),
            MemoryRegion::new(TOKEN, AccountId(to)),
            MemoryRegion::new(LEDGER, GLOBAL),
        ])
}

pub fn mint_tx(id: u64, account: u64, amount: i64) -> Transaction {
    Transaction::new(id, TOKEN, format!("mint {account} {amount}"), 1_000)
        .with_access([AccessKey::Account(AccountId(account))])
        .with_memory([MemoryRegion::new(TOKEN, AccountId(account))])
}

pub fn vault_tx(id: u64, account: u64, request: &str) -> Transaction {
    Transaction::new(id, VAULT, request, 1_000)
        .with_access([AccessKey::Account(AccountId(account))])
        .with_memory([MemoryRegion::new(VAULT, AccountId(account))])
}

pub fn guard_tx(id: u64, account: u64, vault_request: &str) -> Transaction {
    Transaction::new(id, GUARD, format!("call {vault_request}"), 1_000)
        .with_access([AccessKey::App(VAULT), AccessKey::Account(AccountId(account))])
        .with_memory([MemoryRegion::new(VAULT, AccountId(account))])
}

pub fn fib_tx(id: u64, gas: u64, levels: u32, n: u32) -> Transaction {
    Transaction::new(id, FIB, format!("fib {levels} {n}"), gas)
}

pub fn notify_tx(id: u64, count: u32) -> Transaction {
    Transaction::new(id, NOTIFY, format!("notify {count}"), 1_000)
        .with_memory([MemoryRegion::new(NOTIFY, GLOBAL)])
}

// =============================================================================
// APPLICATIONS
// =============================================================================

fn parse(request: &str) -> (&str, Vec<i64>) {
    let mut parts = request.split_whitespace();
    let op = parts.next().unwrap_or("");
    (op, parts.filter_map(|part| part.parse().ok()).collect())
}

fn bad_request(response: &mut ResponseBuffer, message: &str) -> Result<StatusCode, Trap> {
    response.write(message)?;
    Ok(StatusCode::BAD_REQUEST)
}

/// Load a chunk, creating it zero-filled at `size` if absent.
fn open(session: &mut Session<'_>, id: ChunkId, size: usize) -> Result<(), Fault> {
    session.load_chunk(id)?;
    if !session.chunk_exists()? {
        session.resize_chunk(size)?;
    }
    Ok(())
}

fn account(raw: i64) -> u64 {
    raw.unsigned_abs()
}

fn token(
    session: &mut Session<'_>,
    request: &str,
    response: &mut ResponseBuffer,
) -> Result<StatusCode, Trap> {
    match parse(request) {
        ("mint", args) if args.len() == 2 => {
            open(session, balance_chunk(account(args[0])), 8)?;
            session.add_int64_to(0, args[1])?;
            Ok(StatusCode::OK)
        }
        ("balance", args) if args.len() == 1 => {
            session.load_chunk(balance_chunk(account(args[0])))?;
            let balance = if session.invalid(0, 8) {
                0
            } else {
                session.load_int64(0)?
            };
            response.write(&balance.to_string())?;
            Ok(StatusCode::OK)
        }
        ("transfer", args) if args.len() == 3 => {
            let (from, to, amount) = (account(args[0]), account(args[1]), args[2]);
            if amount <= 0 {
                return bad_request(response, "amount must be positive");
            }
            session.load_chunk(balance_chunk(from))?;
            if session.invalid(0, 8) {
                return Err(session.revert("unknown account"));
            }
            let balance = session.load_int64(0)?;
            if balance < amount {
                return Err(session.revert("insufficient funds"));
            }
            session.store_int64(0, balance - amount)?;

            open(session, balance_chunk(to), 8)?;
            session.add_int64_to(0, amount)?;

            session.invoke_deferred(LEDGER, format!("record {amount}"), FORWARDED_GAS)?;
            response.write("ok")?;
            Ok(StatusCode::OK)
        }
        _ => bad_request(response, "unknown request"),
    }
}

/// Ledger layout: `[transfers: i64][volume: i64]`.
fn ledger(
    session: &mut Session<'_>,
    request: &str,
    response: &mut ResponseBuffer,
) -> Result<StatusCode, Trap> {
    open(session, ledger_chunk(), 16)?;
    match parse(request) {
        ("record", args) if args.len() == 1 => {
            session.add_int64_to(0, 1)?;
            session.add_int64_to(8, args[0])?;
            Ok(StatusCode::OK)
        }
        ("count", _) => {
            response.write(&session.load_int64(0)?.to_string())?;
            Ok(StatusCode::OK)
        }
        _ => bad_request(response, "unknown request"),
    }
}

/// Vault layout: `[locked: i64][available: i64]`.
fn vault(
    session: &mut Session<'_>,
    request: &str,
    response: &mut ResponseBuffer,
) -> Result<StatusCode, Trap> {
    let (op, args) = parse(request);
    let Some(&owner) = args.first() else {
        if op == "stray_exit" {
            session.exit_area()?;
            return Ok(StatusCode::OK);
        }
        return bad_request(response, "missing account");
    };
    open(session, vault_chunk(account(owner)), 16)?;

    match (op, args.get(1).copied()) {
        ("deposit", Some(amount)) => {
            session.add_int64_to(8, amount)?;
            Ok(StatusCode::OK)
        }
        ("lock", Some(amount)) => {
            session.enter_area()?;
            let available = session.load_int64(8)?;
            if available < amount {
                session.exit_area()?;
                return Err(session.revert("nothing to lock"));
            }
            session.store_int64(8, available - amount)?;
            session.add_int64_to(0, amount)?;
            session.exit_area()?;
            response.write(&(available - amount).to_string())?;
            Ok(StatusCode::OK)
        }
        ("lock_unchecked", Some(amount)) => {
            session.enter_area()?;
            session.add_int64_to(0, amount)?;
            // Past the end of the chunk
            session.store_int64(16, amount)?;
            session.exit_area()?;
            Ok(StatusCode::OK)
        }
        ("divide", Some(divisor)) => {
            let available = session.load_int64(8)?;
            session.store_int64(8, checked_div(available, divisor)?)?;
            Ok(StatusCode::OK)
        }
        ("unbalanced", _) => {
            session.enter_area()?;
            Ok(StatusCode::OK)
        }
        ("stray_exit", _) => {
            session.exit_area()?;
            Ok(StatusCode::OK)
        }
        _ => bad_request(response, "unknown request"),
    }
}

/// Recurse `levels` deep, then compute `fib(n)` on the way back up.
fn fib(
    session: &mut Session<'_>,
    request: &str,
    response: &mut ResponseBuffer,
) -> Result<StatusCode, Trap> {
    let (levels, n) = match parse(request) {
        ("fib", args) if args.len() == 2 => (args[0], args[1]),
        _ => return bad_request(response, "unknown request"),
    };

    if levels > 1 {
        let inner = format!("fib {} {n}", levels - 1);
        let gas = session.tx().gas_limit;
        session.invoke(FIB, &inner, gas)?.into_response()?;
    }

    let value = fib_value(session, n.unsigned_abs())?;
    response.write(&value.to_string())?;
    Ok(StatusCode::OK)
}

fn fib_value(session: &mut Session<'_>, n: u64) -> Result<u64, Fault> {
    session.poll()?;
    if n < 2 {
        return Ok(n);
    }
    Ok(fib_value(session, n - 1)?.wrapping_add(fib_value(session, n - 2)?))
}

/// Forwards a request to the vault and reports how it ended.
fn guard(
    session: &mut Session<'_>,
    request: &str,
    response: &mut ResponseBuffer,
) -> Result<StatusCode, Trap> {
    if request == "panic" {
        panic!("guard fixture asked to panic");
    }
    let Some(inner) = request.strip_prefix("call ") else {
        return bad_request(response, "unknown request");
    };

    let result = session.invoke(VAULT, inner, FORWARDED_GAS)?;
    let text = match (result.status(), result.failure()) {
        (Some(status), _) => format!("nested {status}: {}", result.response()),
        (None, Some(kind)) => format!("nested failed: {kind}"),
        (None, None) => "nested rejected".to_string(),
    };
    response.write(&text)?;
    Ok(StatusCode::OK)
}

/// Counts itself, then defers itself with `n - 1`.
fn notify(
    session: &mut Session<'_>,
    request: &str,
    response: &mut ResponseBuffer,
) -> Result<StatusCode, Trap> {
    let remaining = match parse(request) {
        ("notify", args) if args.len() == 1 => args[0],
        _ => return bad_request(response, "unknown request"),
    };

    open(session, notify_chunk(), 8)?;
    session.add_int64_to(0, 1)?;
    if remaining > 0 {
        session.invoke_deferred(NOTIFY, format!("notify {}", remaining - 1), FORWARDED_GAS)?;
    }
    response.write(&session.depth().to_string())?;
    Ok(StatusCode::OK)
}
