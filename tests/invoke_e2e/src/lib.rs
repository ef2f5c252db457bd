//! CONTEXT: Object-invocation end-to-end test harness library
//! INTENT: Exercise bootstrap, dispatch, marshaling and lifecycle against a
//!         scriptable in-process secure-domain stand-in
//! DEPS: citadel-object (invocation core), citadel-abi (wire-level types)
//! TESTS: Root bootstrap, client environment registration, ping roundtrip,
//!        lifecycle retire, failure cleanup
// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
