// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Translation between caller arguments and the generic transport array.
//!
//! Marshal-in is a structural adapter: it tags and mirrors views and
//! contexts, it never converts or copies payload bytes. Marshal-out runs
//! only after a transport-accepted, callee-successful call; failed calls
//! leave every caller output slot untouched.

use std::sync::Arc;

use citadel_abi::RemoteContext;

use crate::args::Argument;
use crate::handle::ObjectHandle;
use crate::transport::{Transport, TransportArg};
use crate::{InvokeError, Result};

/// The per-call transport argument array, borrowing the caller's arguments
/// for the duration of the boundary crossing.
pub(crate) struct ArgArray<'call> {
    slots: Vec<TransportArg<'call>>,
}

impl<'call> ArgArray<'call> {
    pub(crate) fn slots_mut(&mut self) -> &mut [TransportArg<'call>] {
        &mut self.slots
    }
}

/// Builds the transport array: one mirrored slot per caller argument, in
/// caller order, plus the end sentinel.
///
/// The array allocation is the second fallible acquisition of an invocation;
/// exhaustion is reported before any transport traffic.
pub(crate) fn marshal_in<'call>(args: &'call mut [Argument<'_>]) -> Result<ArgArray<'call>> {
    let mut slots: Vec<TransportArg<'call>> = Vec::new();
    slots
        .try_reserve_exact(args.len() + 1)
        .map_err(|_| InvokeError::ResourceExhausted)?;
    for arg in args.iter_mut() {
        slots.push(match arg {
            Argument::BufferIn(data) => TransportArg::BufferIn(data),
            Argument::BufferOut(out) => {
                TransportArg::BufferOut { data: out.borrow_data(), filled: 0 }
            }
            // No temporary retain; the borrow keeps the object alive for the
            // duration of the call.
            Argument::ObjectIn(handle) => TransportArg::ObjectIn(handle.context()),
            Argument::ObjectOut(_) => TransportArg::ObjectOut(None),
        });
    }
    slots.push(TransportArg::End);
    Ok(ArgArray { slots })
}

/// Output values lifted out of the transport array, in slot order.
pub(crate) enum OutValue {
    BufferLen(usize),
    Object(Option<RemoteContext>),
}

/// Consumes the transport array, ending its borrows of the caller arguments
/// and keeping only the values marshal-out writes back.
pub(crate) fn harvest(array: ArgArray<'_>) -> Vec<OutValue> {
    array
        .slots
        .into_iter()
        .filter_map(|slot| match slot {
            TransportArg::BufferOut { filled, .. } => Some(OutValue::BufferLen(filled)),
            TransportArg::ObjectOut(context) => Some(OutValue::Object(context)),
            _ => None,
        })
        .collect()
}

/// Writes harvested outputs back into the caller's slots: reported lengths
/// into output buffers, produced contexts wrapped as fresh handles bound to
/// the same transport that carried the call.
pub(crate) fn marshal_out(
    args: &mut [Argument<'_>],
    outputs: Vec<OutValue>,
    transport: &Arc<dyn Transport>,
) {
    let mut outputs = outputs.into_iter();
    for arg in args.iter_mut() {
        match arg {
            Argument::BufferOut(out) => {
                if let Some(OutValue::BufferLen(filled)) = outputs.next() {
                    out.set_filled(filled);
                }
            }
            Argument::ObjectOut(slot) => {
                if let Some(OutValue::Object(Some(context))) = outputs.next() {
                    slot.fill(ObjectHandle::from_remote(Arc::clone(transport), context));
                }
            }
            _ => {}
        }
    }
}
