// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Root object bootstrap and client environment acquisition.
//!
//! The root is the well-known entry capability of a transport. It exists
//! before any call has been made, so it is minted locally rather than
//! received from the secure domain, and it is the only handle that is not
//! reference-counted. Everything else a client holds descends from it.

use std::sync::{Arc, OnceLock};

use citadel_abi::Opcode;
use log::error;

use crate::args::{Argument, ObjectSlot};
use crate::handle::ObjectHandle;
use crate::transport::Transport;
use crate::{InvokeError, Result};

/// Root operation: exchange a credential blob for a client environment
/// object scoped to those credentials.
pub const OP_REGISTER_WITH_CREDENTIALS: Opcode = Opcode::remote(2);

static ROOT: OnceLock<ObjectHandle> = OnceLock::new();

/// Mints a root handle bound to `transport`, without touching the process
/// singleton. Hosts and tests use this to run several transports side by
/// side.
pub fn root_for(transport: Arc<dyn Transport>) -> ObjectHandle {
    ObjectHandle::root(transport)
}

/// Binds the process-wide root singleton to `transport` and returns it.
///
/// The first caller wins; later calls return the already-bound root and
/// ignore their argument.
pub fn init_root(transport: Arc<dyn Transport>) -> &'static ObjectHandle {
    ROOT.get_or_init(|| ObjectHandle::root(transport))
}

/// The process-wide root, if [`init_root`] has run.
pub fn root() -> Option<&'static ObjectHandle> {
    ROOT.get()
}

/// Asks the root for a client environment object scoped to `credentials`.
///
/// The returned handle is live with one reference; the caller owns its
/// release.
pub fn client_env(root: &ObjectHandle, credentials: &[u8]) -> Result<ObjectHandle> {
    let mut args = [
        Argument::BufferIn(credentials),
        Argument::ObjectOut(ObjectSlot::empty()),
    ];
    root.invoke(OP_REGISTER_WITH_CREDENTIALS, &mut args)?;
    match args[1].take_object() {
        Some(env) => Ok(env),
        None => {
            error!("{root} accepted registration but produced no environment");
            Err(InvokeError::TransportUnavailable)
        }
    }
}
