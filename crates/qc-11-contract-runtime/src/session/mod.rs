//! # Execution Session
//!
//! One session runs one attempt of one transaction. It owns the heap
//! overlay, the stack of running invocations, and the critical-area stack,
//! and it is the only way contract code reaches host primitives.
//!
//! ## Fault Containment
//!
//! | Exit of an invocation           | Effects    | Caller sees                 |
//! |---------------------------------|------------|-----------------------------|
//! | Status code                     | kept       | `Completed { status, .. }`  |
//! | `Trap::Revert`                  | rolled back| `Completed { REVERTED, .. }`|
//! | Contained fault / `Trap::Nested`| rolled back| `Failed(kind)`              |
//! | Fatal fault                     | kept       | `Err(fault)` at every level |
//!
//! A fault is delivered to the innermost invocation and stays attached to
//! it: whatever the dispatcher returns afterwards, the invocation unwinds
//! with that fault. Faults raised while any critical area is open become
//! fatal.

pub mod frame;
pub mod response;

pub use frame::{DeferredCall, Watchdog};
pub use response::ResponseBuffer;

use crate::config::RuntimeConfig;
use crate::domain::entities::{CallResult, SessionState};
use crate::errors::{Fault, Trap};
use crate::failure::FailureManager;
use crate::heap::{FixedWidth, HeapChunk, HeapOverlay, PublicKey};
use crate::ports::outbound::HeapStorage;
use crate::registry::ContractRegistry;
use frame::Frame;
use qc_telemetry::metrics::record_fault;
use shared_types::{
    AppId, ChunkId, FailureKind, FailureReason, FailureRecord, Gas, InvocationId, StatusCode,
    Transaction,
};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// How an invocation ended, before its frame is popped.
enum Exit {
    Returned(StatusCode),
    Reverted(String),
    Failed(FailureKind),
    Fault(Fault),
}

/// Execution context of one transaction attempt.
pub struct Session<'a> {
    tx: &'a Transaction,
    registry: &'a ContractRegistry,
    storage: &'a dyn HeapStorage,
    config: &'a RuntimeConfig,
    failures: FailureManager,
    heap: HeapOverlay,
    active: Option<ChunkId>,
    frames: Vec<Frame>,
    /// Owner invocation of every open critical area, innermost last.
    areas: Vec<InvocationId>,
    state: SessionState,
    fatal: Option<Fault>,
}

impl<'a> Session<'a> {
    /// Prepare an attempt of `tx` under `record`.
    pub(crate) fn new(
        tx: &'a Transaction,
        registry: &'a ContractRegistry,
        storage: &'a dyn HeapStorage,
        config: &'a RuntimeConfig,
        record: FailureRecord,
    ) -> Self {
        Self {
            tx,
            registry,
            storage,
            config,
            failures: FailureManager::new(record, config),
            heap: HeapOverlay::new(),
            active: None,
            frames: Vec::new(),
            areas: Vec::new(),
            state: SessionState::Idle,
            fatal: None,
        }
    }

    /// Run the root invocation.
    ///
    /// # Errors
    ///
    /// Returns the fatal fault that ended the session.
    pub(crate) fn run(&mut self) -> Result<CallResult, Fault> {
        let tx = self.tx;
        let result = self.invoke(tx.app, &tx.request, tx.gas_limit);
        self.state = match result {
            Ok(_) => SessionState::Completed,
            Err(_) => SessionState::Faulted,
        };
        result
    }

    /// Failure bookkeeping and buffered heap of the finished attempt.
    pub(crate) fn into_parts(self) -> (FailureManager, HeapOverlay) {
        (self.failures, self.heap)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Transaction being executed.
    #[must_use]
    pub fn tx(&self) -> &Transaction {
        self.tx
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Nesting depth of the running invocation (root = 1).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.failures.depth()
    }

    /// Id of the running invocation.
    #[must_use]
    pub fn invocation_id(&self) -> Option<InvocationId> {
        self.frames.last().map(|frame| frame.id)
    }

    /// Application of the running invocation.
    #[must_use]
    pub fn current_app(&self) -> Option<AppId> {
        self.frames.last().map(|frame| frame.app)
    }

    /// Chunk that offset-based primitives operate on.
    #[must_use]
    pub fn active_chunk(&self) -> Option<ChunkId> {
        self.active
    }

    /// Returns true while any critical area is open.
    #[must_use]
    pub fn in_critical_area(&self) -> bool {
        !self.areas.is_empty()
    }

    // =========================================================================
    // FAULT DELIVERY
    // =========================================================================

    /// Deliver a fault to the running invocation and return what it unwinds
    /// with.
    fn raise(&mut self, fault: Fault) -> Fault {
        if let Some(fatal) = &self.fatal {
            return fatal.clone();
        }
        let Some(frame) = self.frames.last_mut() else {
            return fault;
        };
        if let Some(pending) = &frame.fault {
            return pending.clone();
        }

        if let Some(reason) = fault.failure_reason() {
            self.failures.record_failure(frame.id, reason);
        }

        let fault = if !fault.is_fatal() && !self.areas.is_empty() {
            Fault::InCriticalArea(Box::new(fault))
        } else {
            fault
        };

        if fault.is_fatal() {
            warn!(
                tx_id = self.tx.id,
                invocation = frame.id,
                app = %frame.app,
                error = %fault,
                "Fatal fault"
            );
            self.fatal = Some(fault.clone());
            self.state = SessionState::Faulted;
        } else {
            debug!(
                tx_id = self.tx.id,
                invocation = frame.id,
                error = %fault,
                "Fault raised"
            );
        }
        frame.fault = Some(fault.clone());
        fault
    }

    /// Polling point. Every host primitive starts here.
    ///
    /// # Errors
    ///
    /// The pending fault of the running invocation, or `TimeExhausted` once
    /// its budget has run out.
    pub fn poll(&mut self) -> Result<(), Fault> {
        if let Some(fatal) = &self.fatal {
            return Err(fatal.clone());
        }
        let Some(frame) = self.frames.last() else {
            return Err(Fault::ProtocolViolation("no running invocation".to_string()));
        };
        if let Some(pending) = &frame.fault {
            return Err(pending.clone());
        }
        if frame.watchdog.expired() {
            return Err(self.raise(Fault::TimeExhausted));
        }
        Ok(())
    }

    fn check<T>(&mut self, result: Result<T, Fault>) -> Result<T, Fault> {
        result.map_err(|fault| self.raise(fault))
    }

    // =========================================================================
    // INVOCATIONS
    // =========================================================================

    /// Call `app` synchronously with `gas` forwarded.
    ///
    /// Contained failures come back as a [`CallResult`]; the caller decides
    /// whether to pass them up with [`CallResult::into_response`].
    ///
    /// # Errors
    ///
    /// Only fatal faults, which must be propagated.
    pub fn invoke(&mut self, app: AppId, request: &str, gas: Gas) -> Result<CallResult, Fault> {
        if !self.frames.is_empty() {
            self.poll()?;
        }

        let id = match self.failures.next_invocation() {
            Ok(id) => id,
            Err(fault) => {
                debug!(tx_id = self.tx.id, %app, error = %fault, "Invocation rejected");
                record_fault(FailureKind::CallDepthExceeded.as_str());
                return Ok(CallResult::failed(None, FailureKind::CallDepthExceeded));
            }
        };

        let Some(contract) = self.registry.get(app) else {
            self.failures.complete_invocation();
            return Ok(CallResult::completed(
                Some(id),
                StatusCode::NOT_FOUND,
                format!("unknown application {app}"),
            ));
        };

        let depth = self.failures.depth();
        self.frames.push(Frame {
            id,
            app,
            depth,
            watchdog: Watchdog::start(self.failures.get_exec_time(id, gas)),
            stack_limit: self.failures.get_stack_size(id),
            stack_used: 0,
            journal_mark: self.heap.mark(),
            area_mark: self.areas.len(),
            active_on_entry: self.active,
            deferred: VecDeque::new(),
            fault: None,
        });
        self.state = SessionState::Running { depth };
        debug!(tx_id = self.tx.id, invocation = id, %app, depth, gas, "Invocation started");

        let mut response = ResponseBuffer::new(self.config.response_capacity);
        let returned = contract.dispatch(self, request, &mut response);
        let exit = self.exit_of(returned, &response);

        let Some(frame) = self.frames.pop() else {
            return Err(Fault::ProtocolViolation("invocation frame lost".to_string()));
        };
        self.active = frame.active_on_entry;

        let result = match exit {
            Exit::Returned(status) => {
                CallResult::completed(Some(id), status, response.into_string())
            }
            Exit::Reverted(message) => {
                self.unwind(&frame);
                CallResult::completed(Some(id), StatusCode::REVERTED, message)
            }
            Exit::Failed(kind) => {
                self.unwind(&frame);
                CallResult::failed(Some(id), kind)
            }
            Exit::Fault(fault) => match fault.kind() {
                Some(kind) if !fault.is_fatal() => {
                    self.unwind(&frame);
                    record_fault(kind.as_str());
                    CallResult::failed(Some(id), kind)
                }
                kind => {
                    record_fault(kind.map_or("worker_fatal", |kind| kind.as_str()));
                    self.failures.complete_invocation();
                    return Err(fault);
                }
            },
        };

        self.failures.complete_invocation();
        if !self.frames.is_empty() {
            self.state = SessionState::Running {
                depth: self.failures.depth(),
            };
        }
        debug!(
            tx_id = self.tx.id,
            invocation = id,
            status = ?result.status(),
            failure = ?result.failure(),
            "Invocation finished"
        );

        if result.failure().is_none() && result.status() != Some(StatusCode::REVERTED) {
            for call in frame.deferred {
                let deferred = self.invoke(call.app, &call.request, call.gas)?;
                debug!(
                    tx_id = self.tx.id,
                    app = %call.app,
                    invocation = ?deferred.invocation,
                    ok = deferred.is_ok(),
                    "Deferred call finished"
                );
            }
        }

        Ok(result)
    }

    /// Decide how the running invocation ends. Must be called before its
    /// frame is popped.
    fn exit_of(&mut self, returned: Result<StatusCode, Trap>, response: &ResponseBuffer) -> Exit {
        if let Some(fatal) = &self.fatal {
            return Exit::Fault(fatal.clone());
        }
        let Some(frame) = self.frames.last() else {
            return Exit::Fault(Fault::ProtocolViolation("invocation frame lost".to_string()));
        };
        if let Some(pending) = &frame.fault {
            return Exit::Fault(pending.clone());
        }
        let (id, area_mark, watchdog) = (frame.id, frame.area_mark, frame.watchdog);
        let available = frame.stack_limit.saturating_sub(frame.stack_used);

        // A flagged invocation fails the way it did before, however it
        // returned this time.
        if let Some(reason) = self.failures.flagged(id) {
            let recorded = match reason {
                FailureReason::TimeExhausted => Fault::TimeExhausted,
                FailureReason::StackExhausted => Fault::StackExhausted {
                    requested: 0,
                    available,
                },
            };
            return Exit::Fault(self.raise(recorded));
        }

        let returned = match returned {
            Err(Trap::Fault(fault)) => return Exit::Fault(self.raise(fault)),
            other => other,
        };

        // Any other exit with an area still open is a protocol violation.
        if self.areas.len() != area_mark {
            let fault = Fault::ProtocolViolation("critical area left open".to_string());
            return Exit::Fault(self.raise(fault));
        }

        let status = match returned {
            Ok(status) => status,
            Err(Trap::Revert(message)) if message.len() > response.capacity() => {
                let fault = Fault::ResponseOverflow {
                    capacity: response.capacity(),
                };
                return Exit::Fault(self.raise(fault));
            }
            Err(Trap::Revert(message)) => return Exit::Reverted(message),
            Err(Trap::Nested(kind)) => return Exit::Failed(kind),
            Err(Trap::Fault(fault)) => return Exit::Fault(self.raise(fault)),
        };

        let fault = if response.overflowed() {
            Fault::ResponseOverflow {
                capacity: response.capacity(),
            }
        } else if watchdog.expired() {
            Fault::TimeExhausted
        } else {
            return Exit::Returned(status);
        };
        Exit::Fault(self.raise(fault))
    }

    /// Discard the effects of a popped frame.
    fn unwind(&mut self, frame: &Frame) {
        self.heap.rollback_to(frame.journal_mark);
        self.areas.truncate(frame.area_mark);
    }

    /// Queue a call to run after the current invocation completes.
    ///
    /// Deferred calls run in queue order at the current invocation's level,
    /// after it has returned, so they may re-enter its application. They
    /// are dropped if it reverts or fails.
    ///
    /// # Errors
    ///
    /// The pending fault, if any.
    pub fn invoke_deferred(
        &mut self,
        app: AppId,
        request: impl Into<String>,
        gas: Gas,
    ) -> Result<(), Fault> {
        self.poll()?;
        if let Some(frame) = self.frames.last_mut() {
            frame.deferred.push_back(DeferredCall {
                app,
                request: request.into(),
                gas,
            });
        }
        Ok(())
    }

    /// Reject the request. Return the trap from the dispatcher.
    #[must_use]
    pub fn revert(&self, message: impl Into<String>) -> Trap {
        Trap::Revert(message.into())
    }

    // =========================================================================
    // CRITICAL AREAS
    // =========================================================================

    /// Open a critical area owned by the running invocation.
    ///
    /// # Errors
    ///
    /// The pending fault, if any.
    pub fn enter_area(&mut self) -> Result<(), Fault> {
        self.poll()?;
        if let Some(frame) = self.frames.last() {
            self.areas.push(frame.id);
        }
        Ok(())
    }

    /// Close the innermost critical area.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` if the innermost area was not opened by the
    /// running invocation.
    pub fn exit_area(&mut self) -> Result<(), Fault> {
        self.poll()?;
        let owned = match (self.frames.last(), self.areas.last()) {
            (Some(frame), Some(&owner)) => {
                owner == frame.id && self.areas.len() > frame.area_mark
            }
            _ => false,
        };
        if !owned {
            return Err(self.raise(Fault::ProtocolViolation(
                "critical area exit without matching enter".to_string(),
            )));
        }
        self.areas.pop();
        Ok(())
    }

    // =========================================================================
    // HEAP
    // =========================================================================

    /// Load a chunk and make it the active one.
    ///
    /// # Errors
    ///
    /// `ChunkOutOfRange` if the chunk is outside the transaction's memory
    /// access list or outside provisioned storage.
    pub fn load_chunk(&mut self, id: ChunkId) -> Result<(), Fault> {
        self.poll()?;
        if !self.tx.may_load(&id) {
            return Err(self.raise(Fault::ChunkOutOfRange(id)));
        }
        let storage = self.storage;
        let loaded = self.heap.load(id, storage).map(|_| ());
        self.check(loaded)?;
        self.active = Some(id);
        Ok(())
    }

    fn active(&self) -> Result<&HeapChunk, Fault> {
        self.active
            .and_then(|id| self.heap.get(id))
            .ok_or(Fault::NoActiveChunk)
    }

    /// Whether `[offset, offset + size)` is outside the active chunk.
    /// Also true when no chunk is active or the active chunk is absent.
    #[must_use]
    pub fn invalid(&self, offset: usize, size: usize) -> bool {
        self.active()
            .map_or(true, |chunk| !chunk.is_valid(offset, size))
    }

    /// Whether the active chunk has been created.
    ///
    /// # Errors
    ///
    /// `NoActiveChunk` if nothing is loaded.
    pub fn chunk_exists(&mut self) -> Result<bool, Fault> {
        self.poll()?;
        let exists = self.active().map(HeapChunk::exists);
        self.check(exists)
    }

    /// Length of the active chunk; zero when absent.
    ///
    /// # Errors
    ///
    /// `NoActiveChunk` if nothing is loaded.
    pub fn chunk_len(&mut self) -> Result<usize, Fault> {
        self.poll()?;
        let len = self.active().map(HeapChunk::len);
        self.check(len)
    }

    /// Read a fixed-width value from the active chunk.
    ///
    /// # Errors
    ///
    /// `NoActiveChunk`, `AbsentChunk` or `IllegalAccess`.
    pub fn load<T: FixedWidth>(&mut self, offset: usize) -> Result<T, Fault> {
        self.poll()?;
        let value = self.active().and_then(|chunk| chunk.load::<T>(offset));
        self.check(value)
    }

    /// Write a fixed-width value into the active chunk.
    ///
    /// # Errors
    ///
    /// `NoActiveChunk`, `AbsentChunk` or `IllegalAccess`.
    pub fn store<T: FixedWidth>(&mut self, offset: usize, value: T) -> Result<(), Fault> {
        self.poll()?;
        let stored = match self.active {
            Some(id) => self.heap.store(id, offset, value),
            None => Err(Fault::NoActiveChunk),
        };
        self.check(stored)
    }

    /// Read an `i64`.
    ///
    /// # Errors
    ///
    /// See [`Session::load`].
    pub fn load_int64(&mut self, offset: usize) -> Result<i64, Fault> {
        self.load(offset)
    }

    /// Write an `i64`.
    ///
    /// # Errors
    ///
    /// See [`Session::store`].
    pub fn store_int64(&mut self, offset: usize, value: i64) -> Result<(), Fault> {
        self.store(offset, value)
    }

    /// Read an `i16`.
    ///
    /// # Errors
    ///
    /// See [`Session::load`].
    pub fn load_int16(&mut self, offset: usize) -> Result<i16, Fault> {
        self.load(offset)
    }

    /// Write an `i16`.
    ///
    /// # Errors
    ///
    /// See [`Session::store`].
    pub fn store_int16(&mut self, offset: usize, value: i16) -> Result<(), Fault> {
        self.store(offset, value)
    }

    /// Read a public key.
    ///
    /// # Errors
    ///
    /// See [`Session::load`].
    pub fn load_pk(&mut self, offset: usize) -> Result<PublicKey, Fault> {
        self.load(offset)
    }

    /// Write a public key.
    ///
    /// # Errors
    ///
    /// See [`Session::store`].
    pub fn store_pk(&mut self, offset: usize, key: PublicKey) -> Result<(), Fault> {
        self.store(offset, key)
    }

    /// Add to the `i64` at `offset` without reading it into contract code.
    ///
    /// # Errors
    ///
    /// `ArithmeticOverflow`, plus the faults of [`Session::load`].
    pub fn add_int64_to(&mut self, offset: usize, amount: i64) -> Result<(), Fault> {
        self.poll()?;
        let added = match self.active {
            Some(id) => self.heap.add_in_place(id, offset, amount),
            None => Err(Fault::NoActiveChunk),
        };
        self.check(added)
    }

    /// Resize the active chunk. Zero deletes it; growing an absent chunk
    /// creates it zero-filled.
    ///
    /// # Errors
    ///
    /// `NoActiveChunk`, or `IllegalAccess` above the size ceiling.
    pub fn resize_chunk(&mut self, size: usize) -> Result<(), Fault> {
        self.poll()?;
        let resized = match self.active {
            Some(id) => self.heap.resize(id, size),
            None => Err(Fault::NoActiveChunk),
        };
        self.check(resized)
    }

    // =========================================================================
    // STACK
    // =========================================================================

    /// Reserve stack bytes for a local buffer or recursion step.
    ///
    /// # Errors
    ///
    /// `StackExhausted` past the invocation's budget.
    pub fn reserve_stack(&mut self, bytes: usize) -> Result<(), Fault> {
        self.poll()?;
        let reserved = match self.frames.last_mut() {
            Some(frame) => frame.reserve_stack(bytes),
            None => Ok(()),
        };
        self.check(reserved)
    }

    /// Return stack bytes reserved earlier.
    pub fn release_stack(&mut self, bytes: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.release_stack(bytes);
        }
    }
}
