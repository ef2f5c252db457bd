// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tagged caller-side call arguments.
//!
//! An argument list is a flat sequence in canonical group order: input
//! buffers, then output buffers, then input objects, then output objects.
//! Each element self-describes its kind, so the packed counts descriptor of
//! narrow transports is derivable rather than caller-supplied.

use citadel_abi::ArgFlags;

use crate::handle::ObjectHandle;

/// One argument of an invocation.
pub enum Argument<'a> {
    /// Read-only view owned by the caller for the call's duration.
    BufferIn(&'a [u8]),
    /// Writable view the callee fills up to its capacity.
    BufferOut(OutBuffer<'a>),
    /// Borrowed capability. The borrow keeps the object alive for the call;
    /// no temporary retain is performed on its count.
    ObjectIn(&'a ObjectHandle),
    /// Empty slot a successful call fills with a fresh capability.
    ObjectOut(ObjectSlot),
}

impl Argument<'_> {
    /// Direction/kind tag of this argument.
    pub fn flags(&self) -> ArgFlags {
        match self {
            Self::BufferIn(_) => ArgFlags::BUFFER_IN,
            Self::BufferOut(_) => ArgFlags::BUFFER_OUT,
            Self::ObjectIn(_) => ArgFlags::OBJECT_IN,
            Self::ObjectOut(_) => ArgFlags::OBJECT_OUT,
        }
    }

    /// Takes the produced handle out of an output-object slot.
    ///
    /// Returns `None` for other kinds or when the slot is still empty.
    pub fn take_object(&mut self) -> Option<ObjectHandle> {
        match self {
            Self::ObjectOut(slot) => slot.take(),
            _ => None,
        }
    }
}

/// Caller-owned output buffer plus the callee-reported filled length.
pub struct OutBuffer<'a> {
    data: &'a mut [u8],
    filled: usize,
}

impl<'a> OutBuffer<'a> {
    /// Wraps a writable caller buffer; the filled length starts at zero.
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, filled: 0 }
    }

    /// Capacity the callee may fill up to.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Length the callee reported on the last successful call.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// The filled prefix of the buffer.
    pub fn as_filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    pub(crate) fn borrow_data(&mut self) -> &mut [u8] {
        self.data
    }

    pub(crate) fn set_filled(&mut self, filled: usize) {
        self.filled = filled.min(self.data.len());
    }
}

/// Slot that receives a callee-produced capability on success.
#[derive(Default)]
pub struct ObjectSlot(Option<ObjectHandle>);

impl ObjectSlot {
    /// Creates an empty slot.
    pub fn empty() -> Self {
        Self(None)
    }

    /// True once a successful call has filled the slot.
    pub fn is_filled(&self) -> bool {
        self.0.is_some()
    }

    /// Transfers the produced handle to the caller.
    pub fn take(&mut self) -> Option<ObjectHandle> {
        self.0.take()
    }

    pub(crate) fn fill(&mut self, handle: ObjectHandle) {
        self.0 = Some(handle);
    }
}
