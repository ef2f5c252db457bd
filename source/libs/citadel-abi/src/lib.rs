// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]

//! CONTEXT: Shared ABI definitions for the object-invocation transport
//! OWNERS: @runtime
//! PUBLIC API: RemoteContext, Opcode, ArgFlags, ArgCounts, code
//! DEPENDS_ON: no_std, bitflags
//! INVARIANTS: Argument group order is fixed (input buffers, output buffers,
//! input objects, output objects); local-flagged opcodes never cross a
//! transport; a packed counts descriptor is 4 nibbles, one per group.

use core::fmt;

use bitflags::bitflags;

/// Callee result codes carried back verbatim through the transport.
///
/// Only `OK` has meaning to the invocation core; every non-zero value is
/// opaque and passed through to the caller unchanged. The named codes below
/// are the conventions in-tree secure domains answer with.
pub mod code {
    /// The callee completed the method successfully.
    pub const OK: i32 = 0;
    /// Generic callee failure.
    pub const FAILURE: i32 = 1;
    /// The argument list did not match the method's shape.
    pub const INVALID: i32 = 2;
    /// The target context does not name a live object.
    pub const BAD_OBJECT: i32 = 3;
    /// The object does not implement the requested method.
    pub const METHOD_UNSUPPORTED: i32 = 4;
}

/// Opaque value naming an object inside the secure domain.
///
/// This is a back-reference across the trust boundary, never a pointer; the
/// local side owns only the wrapper built around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RemoteContext(u64);

impl RemoteContext {
    /// The well-known root object every domain exposes.
    pub const ROOT: Self = Self(0);

    /// Wraps a raw context value issued by a transport.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw context value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RemoteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Method selector for an invocation.
///
/// Bit 31 marks local pseudo-methods (retain/release) that are handled
/// entirely on the caller's side; the low 16 bits carry the method id that a
/// remote callee dispatches on. Local-flagged opcodes never reach a transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Opcode(u32);

impl Opcode {
    /// Mask selecting the method id bits.
    pub const METHOD_MASK: u32 = 0x0000_ffff;
    const LOCAL: u32 = 1 << 31;

    /// Local pseudo-method: increment the handle's reference count.
    pub const RETAIN: Self = Self::local(1);
    /// Local pseudo-method: decrement the handle's reference count.
    pub const RELEASE: Self = Self::local(2);

    /// Builds an application opcode dispatched to the remote callee.
    pub const fn remote(method: u32) -> Self {
        Self(method & Self::METHOD_MASK)
    }

    /// Builds a local-flagged opcode.
    pub const fn local(method: u32) -> Self {
        Self(Self::LOCAL | (method & Self::METHOD_MASK))
    }

    /// Returns true when the opcode is handled locally.
    pub const fn is_local(self) -> bool {
        self.0 & Self::LOCAL != 0
    }

    /// Returns the method id without the local flag.
    pub const fn method(self) -> u32 {
        self.0 & Self::METHOD_MASK
    }

    /// Returns the full encoded opcode value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

bitflags! {
    /// Direction/kind tag attached to every transport argument slot.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ArgFlags: u8 {
        /// Value flows from the caller to the callee.
        const INPUT = 1 << 0;
        /// Value flows from the callee to the caller.
        const OUTPUT = 1 << 1;
        /// The slot describes a memory view.
        const BUFFER = 1 << 2;
        /// The slot describes an object reference.
        const OBJECT = 1 << 3;

        /// Read-only caller buffer.
        const BUFFER_IN = Self::INPUT.bits() | Self::BUFFER.bits();
        /// Writable caller buffer.
        const BUFFER_OUT = Self::OUTPUT.bits() | Self::BUFFER.bits();
        /// Borrowed object reference.
        const OBJECT_IN = Self::INPUT.bits() | Self::OBJECT.bits();
        /// Slot for a callee-produced object reference.
        const OBJECT_OUT = Self::OUTPUT.bits() | Self::OBJECT.bits();
    }
}

impl ArgFlags {
    /// Canonical position of this kind in the flat argument list, or `None`
    /// when the combination is not one of the four legal kinds.
    pub const fn group(self) -> Option<usize> {
        match self.bits() {
            b if b == Self::BUFFER_IN.bits() => Some(0),
            b if b == Self::BUFFER_OUT.bits() => Some(1),
            b if b == Self::OBJECT_IN.bits() => Some(2),
            b if b == Self::OBJECT_OUT.bits() => Some(3),
            _ => None,
        }
    }
}

/// Errors produced while deriving a counts descriptor from an argument list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountsError {
    /// A slot carried a tag that is not one of the four argument kinds.
    UnknownKind,
    /// The list does not follow the canonical group order.
    OutOfOrder,
    /// A group exceeded the 15-entry limit of the packed encoding.
    GroupOverflow,
}

impl fmt::Display for CountsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind => write!(f, "unknown argument kind"),
            Self::OutOfOrder => write!(f, "arguments out of canonical group order"),
            Self::GroupOverflow => write!(f, "argument group exceeds 15 entries"),
        }
    }
}

/// Per-kind argument counts plus their compact nibble-packed encoding.
///
/// The packed form is a historical convention of narrow transports: one
/// nibble per group, in canonical order, so the four group sizes always sum
/// to the total argument count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArgCounts {
    /// Number of read-only caller buffers.
    pub buffers_in: u8,
    /// Number of writable caller buffers.
    pub buffers_out: u8,
    /// Number of borrowed object references.
    pub objects_in: u8,
    /// Number of callee-produced object slots.
    pub objects_out: u8,
}

impl ArgCounts {
    /// Largest per-group count the packed encoding can carry.
    pub const MAX_PER_GROUP: u8 = 15;

    /// Total number of arguments across the four groups.
    pub const fn total(self) -> usize {
        self.buffers_in as usize
            + self.buffers_out as usize
            + self.objects_in as usize
            + self.objects_out as usize
    }

    /// Nibble-packed descriptor (input buffers in the low nibble).
    pub const fn packed(self) -> u16 {
        self.buffers_in as u16
            | (self.buffers_out as u16) << 4
            | (self.objects_in as u16) << 8
            | (self.objects_out as u16) << 12
    }

    /// Decodes a nibble-packed descriptor.
    pub const fn from_packed(packed: u16) -> Self {
        Self {
            buffers_in: (packed & 0xf) as u8,
            buffers_out: ((packed >> 4) & 0xf) as u8,
            objects_in: ((packed >> 8) & 0xf) as u8,
            objects_out: ((packed >> 12) & 0xf) as u8,
        }
    }

    /// Derives counts from a tagged argument list, validating the canonical
    /// group order and the per-group limit.
    pub fn from_flags<I>(flags: I) -> Result<Self, CountsError>
    where
        I: IntoIterator<Item = ArgFlags>,
    {
        let mut counts = Self::default();
        let mut current = 0;
        for flag in flags {
            let group = flag.group().ok_or(CountsError::UnknownKind)?;
            if group < current {
                return Err(CountsError::OutOfOrder);
            }
            current = group;
            let slot = match group {
                0 => &mut counts.buffers_in,
                1 => &mut counts.buffers_out,
                2 => &mut counts.objects_in,
                _ => &mut counts.objects_out,
            };
            if *slot == Self::MAX_PER_GROUP {
                return Err(CountsError::GroupOverflow);
            }
            *slot += 1;
        }
        Ok(counts)
    }
}
