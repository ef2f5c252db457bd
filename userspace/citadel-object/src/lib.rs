// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Capability object-invocation core for the secure domain boundary
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//!
//! PUBLIC API:
//!   - ObjectHandle: reference-counted, invocable capability
//!   - Argument/OutBuffer/ObjectSlot: tagged call arguments
//!   - Transport trait: boundary-crossing mechanism consumed by the core
//!   - bootstrap: root singleton and client-environment registration
//!   - loopback: in-process transports for host-based testing
//!
//! The core marshals a grouped argument list into the transport's generic
//! argument array, dispatches local lifecycle opcodes without touching the
//! transport, and releases per-call scratch state on every exit path of a
//! boundary crossing. Callers never learn where a callee lives; a handle
//! produced by a remote call invokes through the same mechanism that
//! produced it.

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]

use thiserror::Error;

pub mod args;
pub mod bootstrap;
pub mod loopback;
pub mod transport;

mod context;
mod handle;
mod marshal;

pub use args::{Argument, ObjectSlot, OutBuffer};
pub use handle::ObjectHandle;
pub use transport::{CallToken, ScratchExhausted, Transport, TransportArg, TransportError};

/// Result type returned by invocation operations.
pub type Result<T> = core::result::Result<T, InvokeError>;

/// Errors surfaced by object invocation.
///
/// These are the stable, caller-visible exit codes of the dispatcher. A
/// transport-level failure is always collapsed into [`TransportUnavailable`]
/// so callers cannot depend on why the transport failed, only that it did.
///
/// [`TransportUnavailable`]: InvokeError::TransportUnavailable
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// A local-flagged opcode other than retain/release was requested.
    #[error("local dispatch does not recognise this method")]
    LocalDispatchUnsupported,
    /// Per-call scratch state or the argument array could not be allocated.
    #[error("out of invocation resources")]
    ResourceExhausted,
    /// The transport failed to carry the call across the boundary.
    #[error("transport unavailable")]
    TransportUnavailable,
    /// The callee finished the call with a non-success result code. The code
    /// is opaque to this layer and passed through verbatim.
    #[error("callee returned {0}")]
    Remote(i32),
}
