// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Capability handles and the invocation dispatcher.
//!
//! `ObjectHandle::invoke` is the only dispatch point: local lifecycle
//! opcodes (retain/release) are settled here without transport traffic,
//! everything else crosses the boundary. The dispatcher is re-entered for
//! every call, including calls made through handles it produced.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use citadel_abi::{code, ArgCounts, Opcode, RemoteContext};
use log::{debug, error};

use crate::args::Argument;
use crate::context::InvokeContext;
use crate::marshal;
use crate::transport::Transport;
use crate::{InvokeError, Result};

struct ObjectCore {
    context: RemoteContext,
    transport: Arc<dyn Transport>,
    /// `None` for the root singleton, which is not reference-counted.
    refs: Option<AtomicU64>,
}

/// A capability: an opaque context bound to the transport that produced it,
/// with a single polymorphic invoke entry point.
///
/// Handles are reference-counted through the retain/release pseudo-methods
/// and must be passed between holders already-retained; the count is only
/// ever mutated atomically. When it reaches zero the backing remote
/// reference is retired exactly once and the handle is dead.
pub struct ObjectHandle {
    core: Arc<ObjectCore>,
}

impl ObjectHandle {
    /// Wraps a transport-produced context into a live handle (count 1).
    pub(crate) fn from_remote(transport: Arc<dyn Transport>, context: RemoteContext) -> Self {
        Self {
            core: Arc::new(ObjectCore {
                context,
                transport,
                refs: Some(AtomicU64::new(1)),
            }),
        }
    }

    /// The well-known root handle for a transport; not reference-counted.
    pub(crate) fn root(transport: Arc<dyn Transport>) -> Self {
        Self {
            core: Arc::new(ObjectCore {
                context: RemoteContext::ROOT,
                transport,
                refs: None,
            }),
        }
    }

    /// Opaque context this handle stands for.
    pub fn context(&self) -> RemoteContext {
        self.core.context
    }

    /// Current reference count; `None` for the uncounted root singleton.
    /// Diagnostic only: the value may be stale by the time it is observed.
    pub fn ref_count(&self) -> Option<u64> {
        self.core.refs.as_ref().map(|refs| refs.load(Ordering::Acquire))
    }

    /// Invokes `op` on this object with a grouped argument list.
    ///
    /// Local-flagged opcodes are settled without touching the transport.
    /// For remote opcodes the call blocks until the secure domain answers;
    /// on any failure every output slot is left exactly as passed in.
    ///
    /// The argument list must follow the canonical group order (input
    /// buffers, output buffers, input objects, output objects); a misordered
    /// list is a caller contract violation, not a runtime error.
    pub fn invoke(&self, op: Opcode, args: &mut [Argument<'_>]) -> Result<()> {
        if op.is_local() {
            return match op {
                Opcode::RETAIN => {
                    self.retain();
                    Ok(())
                }
                Opcode::RELEASE => {
                    self.release();
                    Ok(())
                }
                _ => Err(InvokeError::LocalDispatchUnsupported),
            };
        }

        let counts = ArgCounts::from_flags(args.iter().map(Argument::flags));
        debug_assert!(counts.is_ok(), "arguments must follow the canonical group order");
        if let Ok(counts) = counts {
            debug!(
                "{self} invocation with {} arguments ({:#06x}) and op {:#x}",
                counts.total(),
                counts.packed(),
                op.raw(),
            );
        }

        let call = InvokeContext::begin(self.core.transport.as_ref())?;
        let mut array = marshal::marshal_in(&mut *args)?;

        let result = call
            .invoke(self.core.context, op.method(), array.slots_mut())
            .map_err(|err| {
                error!("{self} invocation failed: {err}");
                InvokeError::TransportUnavailable
            })?;

        if result != code::OK {
            debug!("{self} invocation returned with {result}");
            return Err(InvokeError::Remote(result));
        }

        let outputs = marshal::harvest(array);
        marshal::marshal_out(args, outputs, &self.core.transport);
        debug!("{self} invocation returned with {}", code::OK);
        Ok(())
    }

    /// Retain has no failure mode; on the uncounted root it is a no-op.
    fn retain(&self) {
        if let Some(refs) = &self.core.refs {
            refs.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Release has no failure mode. The thread that observes the 1 -> 0
    /// transition retires the backing remote reference; the count is clamped
    /// at zero so a misbehaving caller can never drive it negative.
    fn release(&self) {
        let Some(refs) = &self.core.refs else { return };
        match refs.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            count.checked_sub(1)
        }) {
            Ok(1) => self.core.transport.retire(self.core.context),
            Ok(_) => {}
            Err(_) => error!("{self} released with no references held"),
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.core.refs.is_none() {
            write!(f, "root object")
        } else {
            write!(f, "object@{}", self.core.context)
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("context", &self.core.context)
            .field("refs", &self.ref_count())
            .finish()
    }
}
