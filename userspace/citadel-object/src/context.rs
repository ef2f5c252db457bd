// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scoped acquisition of per-call transport bookkeeping.
//!
//! Cleanup is not left to call sites: the guard's `Drop` returns the token on
//! every exit path, whether the call succeeded, the callee failed, the
//! transport failed, or a later allocation failed.

use citadel_abi::RemoteContext;

use crate::transport::{CallToken, Transport, TransportArg, TransportError};
use crate::{InvokeError, Result};

pub(crate) struct InvokeContext<'t> {
    transport: &'t dyn Transport,
    token: Option<CallToken>,
}

impl<'t> InvokeContext<'t> {
    /// Acquires transport bookkeeping, mapping exhaustion to the caller's
    /// stable resource error.
    pub(crate) fn begin(transport: &'t dyn Transport) -> Result<Self> {
        let token = transport.begin().map_err(|_| InvokeError::ResourceExhausted)?;
        Ok(Self { transport, token: Some(token) })
    }

    /// Carries the call under this context's token.
    pub(crate) fn invoke(
        &self,
        target: RemoteContext,
        method: u32,
        args: &mut [TransportArg<'_>],
    ) -> core::result::Result<i32, TransportError> {
        match &self.token {
            Some(token) => self.transport.invoke(token, target, method, args),
            None => Err(TransportError("invocation already finished")),
        }
    }
}

impl core::fmt::Debug for InvokeContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InvokeContext").field("token_held", &self.token.is_some()).finish_non_exhaustive()
    }
}

impl Drop for InvokeContext<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.transport.end(token);
        }
    }
}
