// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boundary contract between the invocation core and a concrete transport.
//!
//! A transport carries one marshaled call into the secure domain and reports
//! two distinct outcomes: whether the call was carried at all (transport
//! status), and what the callee answered (an opaque result code). The core
//! never interprets the result code beyond testing it against zero.

use citadel_abi::RemoteContext;
use thiserror::Error;

/// Opaque per-call bookkeeping token issued by [`Transport::begin`].
///
/// Tokens are deliberately neither `Copy` nor `Clone`: ownership moves back
/// through [`Transport::end`] exactly once, on every exit path.
pub struct CallToken(u64);

impl CallToken {
    /// Mints a token; only transports construct these.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw token value for the issuing transport's bookkeeping.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One slot of the generic transport argument array.
///
/// Slots mirror the caller's argument list one-to-one and in the same
/// canonical group order, followed by a single [`End`] sentinel; the array a
/// transport receives therefore always holds `total + 1` slots.
///
/// [`End`]: TransportArg::End
pub enum TransportArg<'call> {
    /// Read-only caller bytes.
    BufferIn(&'call [u8]),
    /// Writable caller bytes; the transport records the filled length.
    BufferOut {
        /// The caller's buffer, shared with the callee for the call.
        data: &'call mut [u8],
        /// Actual length the callee produced, set by the transport.
        filled: usize,
    },
    /// Context of a borrowed object.
    ObjectIn(RemoteContext),
    /// Slot the transport fills with a callee-produced context on success.
    ObjectOut(Option<RemoteContext>),
    /// Sentinel terminating the array.
    End,
}

/// Transport-level failure.
///
/// Callers never see this directly; the dispatcher logs it and collapses it
/// into a single unavailable-service error.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(
    /// Short description of the failure, for the dispatch-site log.
    pub &'static str,
);

/// Per-call bookkeeping could not be acquired.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("transport scratch exhausted")]
pub struct ScratchExhausted;

/// Mechanism that carries marshaled calls across the trust boundary.
///
/// Implementations are invoked synchronously by arbitrary concurrent
/// callers; `invoke` blocks the calling thread until the secure domain
/// completes the operation or the transport reports failure.
pub trait Transport: Send + Sync {
    /// Acquires per-call bookkeeping ahead of a remote call.
    fn begin(&self) -> core::result::Result<CallToken, ScratchExhausted>;

    /// Carries one call to `target`. `Ok` means the transport accepted the
    /// call and holds the callee's verbatim result code; `Err` means the
    /// transport itself failed and no output slot may have been written.
    fn invoke(
        &self,
        call: &CallToken,
        target: RemoteContext,
        method: u32,
        args: &mut [TransportArg<'_>],
    ) -> core::result::Result<i32, TransportError>;

    /// Returns bookkeeping acquired by [`begin`]. Called exactly once per
    /// token, on every exit path of the invocation.
    ///
    /// [`begin`]: Transport::begin
    fn end(&self, call: CallToken);

    /// Drops the remote reference backing a handle whose count reached zero.
    fn retire(&self, target: RemoteContext);
}
