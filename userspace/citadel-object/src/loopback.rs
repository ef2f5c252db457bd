// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: In-process transports for host-based testing
//! OWNERS: @runtime
//!
//! PUBLIC API:
//!   - EchoTransport: accepts every call, echoes capacities, mints contexts
//!   - FaultTransport: injects scratch denial, transport or callee failure
//!   - LoopbackDomain: scriptable secure-domain stand-in with an object table
//!   - ScratchLedger: token issue/return bookkeeping shared by the doubles
//!
//! None of these cross a real privilege boundary; they exist so the
//! dispatcher, marshaling and lifecycle paths can be exercised without a
//! secure domain. All of them keep ledgers (outstanding scratch, invocation
//! and retire counts) that tests assert on.

use std::sync::atomic::{AtomicU64, Ordering};

use citadel_abi::{code, RemoteContext};
use parking_lot::Mutex;

use crate::bootstrap;
use crate::transport::{CallToken, ScratchExhausted, Transport, TransportArg, TransportError};

/// Method id registered client objects answer with a `pong` payload.
pub const METHOD_PING: u32 = 1;

const PONG: &[u8] = b"pong";

/// Issues call tokens and tracks how many are outstanding.
#[derive(Default)]
pub struct ScratchLedger {
    next: AtomicU64,
    active: AtomicU64,
}

impl ScratchLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token and counts it as outstanding.
    pub fn begin(&self) -> CallToken {
        self.active.fetch_add(1, Ordering::AcqRel);
        CallToken::new(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns a token to the ledger.
    pub fn end(&self, call: CallToken) {
        let _ = call;
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    /// Number of tokens issued and not yet returned.
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Acquire)
    }
}

/// Transport double that accepts every call: each output buffer reports its
/// full capacity as the filled length and every output-object slot receives
/// a freshly minted context.
#[derive(Default)]
pub struct EchoTransport {
    scratch: ScratchLedger,
    next_context: AtomicU64,
    invocations: AtomicU64,
    retired: Mutex<Vec<RemoteContext>>,
}

impl EchoTransport {
    /// Creates an echo transport; minted contexts start after the root.
    pub fn new() -> Self {
        Self { next_context: AtomicU64::new(1), ..Self::default() }
    }

    /// Number of calls carried so far.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Contexts retired so far, in retire order.
    pub fn retired(&self) -> Vec<RemoteContext> {
        self.retired.lock().clone()
    }

    /// Scratch tokens issued and not yet returned; zero between calls.
    pub fn outstanding_scratch(&self) -> u64 {
        self.scratch.active()
    }
}

impl Transport for EchoTransport {
    fn begin(&self) -> core::result::Result<CallToken, ScratchExhausted> {
        Ok(self.scratch.begin())
    }

    fn invoke(
        &self,
        _call: &CallToken,
        _target: RemoteContext,
        _method: u32,
        args: &mut [TransportArg<'_>],
    ) -> core::result::Result<i32, TransportError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        for slot in args.iter_mut() {
            match slot {
                TransportArg::BufferOut { data, filled } => *filled = data.len(),
                TransportArg::ObjectOut(context) => {
                    *context = Some(RemoteContext::new(
                        self.next_context.fetch_add(1, Ordering::Relaxed),
                    ));
                }
                _ => {}
            }
        }
        Ok(code::OK)
    }

    fn end(&self, call: CallToken) {
        self.scratch.end(call);
    }

    fn retire(&self, target: RemoteContext) {
        self.retired.lock().push(target);
    }
}

/// Failure a [`FaultTransport`] injects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Deny per-call bookkeeping acquisition.
    Scratch,
    /// Fail at the transport level after accepting the bookkeeping.
    Unavailable,
    /// Carry the call but answer with a fixed callee failure code.
    Remote(i32),
}

/// Transport double that fails in one configured way.
pub struct FaultTransport {
    fault: Fault,
    scratch: ScratchLedger,
    invocations: AtomicU64,
    retires: AtomicU64,
}

impl FaultTransport {
    /// Creates a transport that injects `fault` on every call.
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            scratch: ScratchLedger::new(),
            invocations: AtomicU64::new(0),
            retires: AtomicU64::new(0),
        }
    }

    /// Number of calls that reached `invoke`.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Number of retired contexts.
    pub fn retires(&self) -> u64 {
        self.retires.load(Ordering::Relaxed)
    }

    /// Scratch tokens issued and not yet returned; zero between calls.
    pub fn outstanding_scratch(&self) -> u64 {
        self.scratch.active()
    }
}

impl Transport for FaultTransport {
    fn begin(&self) -> core::result::Result<CallToken, ScratchExhausted> {
        if self.fault == Fault::Scratch {
            return Err(ScratchExhausted);
        }
        Ok(self.scratch.begin())
    }

    fn invoke(
        &self,
        _call: &CallToken,
        _target: RemoteContext,
        _method: u32,
        _args: &mut [TransportArg<'_>],
    ) -> core::result::Result<i32, TransportError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        match self.fault {
            Fault::Unavailable => Err(TransportError("injected transport fault")),
            Fault::Remote(result) => Ok(result),
            Fault::Scratch => Ok(code::OK),
        }
    }

    fn end(&self, call: CallToken) {
        self.scratch.end(call);
    }

    fn retire(&self, _target: RemoteContext) {
        self.retires.fetch_add(1, Ordering::Relaxed);
    }
}

struct DomainObject {
    credential_len: usize,
}

/// In-process stand-in for a secure domain.
///
/// The root context answers register-with-credentials by allocating an
/// entry in an object table and returning its context; registered objects
/// answer [`METHOD_PING`]. Unknown contexts and methods yield the
/// conventional failure codes, and `retire` removes table entries, so
/// lifecycle tests can observe exactly when an object dies.
#[derive(Default)]
pub struct LoopbackDomain {
    scratch: ScratchLedger,
    scratch_capacity: Option<u64>,
    objects: Mutex<Vec<Option<DomainObject>>>,
    retired: AtomicU64,
}

impl LoopbackDomain {
    /// Creates a domain with unbounded scratch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a domain that denies bookkeeping beyond `limit` concurrent
    /// calls, for exhaustion tests.
    pub fn with_scratch_capacity(limit: u64) -> Self {
        Self { scratch_capacity: Some(limit), ..Self::default() }
    }

    /// Number of live objects in the table.
    pub fn live_objects(&self) -> usize {
        self.objects.lock().iter().filter(|entry| entry.is_some()).count()
    }

    /// Number of objects retired so far.
    pub fn retired(&self) -> u64 {
        self.retired.load(Ordering::Relaxed)
    }

    /// Scratch tokens issued and not yet returned; zero between calls.
    pub fn outstanding_scratch(&self) -> u64 {
        self.scratch.active()
    }

    /// Credential length recorded when `context` registered, if it is live.
    pub fn credential_len(&self, context: RemoteContext) -> Option<usize> {
        let index = (context.raw() as usize).checked_sub(1)?;
        self.objects
            .lock()
            .get(index)
            .and_then(|entry| entry.as_ref().map(|object| object.credential_len))
    }

    fn contains(&self, context: RemoteContext) -> bool {
        let Some(index) = (context.raw() as usize).checked_sub(1) else {
            return false;
        };
        self.objects.lock().get(index).is_some_and(Option::is_some)
    }

    fn allocate(&self, object: DomainObject) -> RemoteContext {
        let mut objects = self.objects.lock();
        if let Some(index) = objects.iter().position(Option::is_none) {
            objects[index] = Some(object);
            return RemoteContext::new(index as u64 + 1);
        }
        objects.push(Some(object));
        RemoteContext::new(objects.len() as u64)
    }

    /// Register expects exactly one input buffer (the credential blob) and
    /// one output-object slot.
    fn register(&self, args: &mut [TransportArg<'_>]) -> i32 {
        let payload_len = args.len() - 1;
        match &mut args[..payload_len] {
            [TransportArg::BufferIn(credentials), TransportArg::ObjectOut(slot)] => {
                let context = self.allocate(DomainObject { credential_len: credentials.len() });
                *slot = Some(context);
                code::OK
            }
            _ => code::INVALID,
        }
    }

    fn ping(&self, args: &mut [TransportArg<'_>]) -> i32 {
        for slot in args.iter_mut() {
            if let TransportArg::BufferOut { data, filled } = slot {
                let len = PONG.len().min(data.len());
                data[..len].copy_from_slice(&PONG[..len]);
                *filled = len;
            }
        }
        code::OK
    }
}

impl Transport for LoopbackDomain {
    fn begin(&self) -> core::result::Result<CallToken, ScratchExhausted> {
        if let Some(limit) = self.scratch_capacity {
            if self.scratch.active() >= limit {
                return Err(ScratchExhausted);
            }
        }
        Ok(self.scratch.begin())
    }

    fn invoke(
        &self,
        _call: &CallToken,
        target: RemoteContext,
        method: u32,
        args: &mut [TransportArg<'_>],
    ) -> core::result::Result<i32, TransportError> {
        if !matches!(args.last(), Some(TransportArg::End)) {
            return Err(TransportError("argument array missing its end sentinel"));
        }
        if target == RemoteContext::ROOT {
            let register = bootstrap::OP_REGISTER_WITH_CREDENTIALS.method();
            return Ok(if method == register {
                self.register(args)
            } else {
                code::METHOD_UNSUPPORTED
            });
        }
        if !self.contains(target) {
            return Ok(code::BAD_OBJECT);
        }
        Ok(match method {
            METHOD_PING => self.ping(args),
            _ => code::METHOD_UNSUPPORTED,
        })
    }

    fn end(&self, call: CallToken) {
        self.scratch.end(call);
    }

    fn retire(&self, target: RemoteContext) {
        if target == RemoteContext::ROOT {
            return;
        }
        let Some(index) = (target.raw() as usize).checked_sub(1) else {
            return;
        };
        let mut objects = self.objects.lock();
        if let Some(entry) = objects.get_mut(index) {
            if entry.take().is_some() {
                self.retired.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
