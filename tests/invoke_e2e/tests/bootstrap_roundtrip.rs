// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end flows against the loopback secure-domain stand-in: bootstrap
//! the root, register a client environment, call through it, and walk the
//! produced handles through their whole lifecycle.

use std::sync::Arc;
use std::thread;

use citadel_abi::{code, Opcode, RemoteContext};
use citadel_object::loopback::{LoopbackDomain, METHOD_PING};
use citadel_object::{bootstrap, Argument, InvokeError, ObjectSlot, OutBuffer, Transport};

fn domain_root(domain: &Arc<LoopbackDomain>) -> citadel_object::ObjectHandle {
    bootstrap::root_for(Arc::clone(domain) as Arc<dyn Transport>)
}

#[test]
fn process_root_singleton_binds_once() {
    let first = Arc::new(LoopbackDomain::new());
    let second = Arc::new(LoopbackDomain::new());

    let bound = bootstrap::init_root(Arc::clone(&first) as Arc<dyn Transport>);
    let again = bootstrap::init_root(Arc::clone(&second) as Arc<dyn Transport>);
    assert_eq!(bound.context(), again.context());
    assert_eq!(bootstrap::root().expect("bound").context(), RemoteContext::ROOT);

    // The second transport was ignored; registration lands on the first.
    let env = bootstrap::client_env(bound, b"singleton").expect("registration succeeds");
    assert_eq!(first.live_objects(), 1);
    assert_eq!(second.live_objects(), 0);
    drop(env);
}

#[test]
fn registration_scopes_an_environment_to_the_credentials() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);

    let env = bootstrap::client_env(&root, &[0x5au8; 32]).expect("registration succeeds");
    assert_eq!(env.ref_count(), Some(1));
    assert_eq!(domain.live_objects(), 1);
    assert_eq!(domain.credential_len(env.context()), Some(32));
    assert_eq!(domain.outstanding_scratch(), 0);
}

#[test]
fn environment_answers_ping_through_the_generic_dispatcher() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);
    let env = bootstrap::client_env(&root, b"ping-client").expect("registration succeeds");

    let mut backing = [0u8; 32];
    let mut args = [Argument::BufferOut(OutBuffer::new(&mut backing))];
    env.invoke(Opcode::remote(METHOD_PING), &mut args).expect("ping succeeds");

    match &args[0] {
        Argument::BufferOut(out) => {
            assert_eq!(out.filled(), 4);
            assert_eq!(out.as_filled(), b"pong");
        }
        _ => unreachable!(),
    }
    assert_eq!(domain.outstanding_scratch(), 0);
}

#[test]
fn unknown_method_surfaces_the_callee_code_verbatim() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);
    let env = bootstrap::client_env(&root, b"client").expect("registration succeeds");

    let err = env.invoke(Opcode::remote(999), &mut []).expect_err("unknown method");
    assert_eq!(err, InvokeError::Remote(code::METHOD_UNSUPPORTED));
    assert_eq!(domain.outstanding_scratch(), 0);
}

#[test]
fn release_of_the_last_reference_retires_the_environment() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);
    let env = bootstrap::client_env(&root, b"short-lived").expect("registration succeeds");
    assert_eq!(domain.live_objects(), 1);

    env.invoke(Opcode::RELEASE, &mut []).expect("release never fails");
    assert_eq!(env.ref_count(), Some(0));
    assert_eq!(domain.live_objects(), 0);
    assert_eq!(domain.retired(), 1);

    // The handle is dead: the domain answers further calls with a bad-object
    // code rather than reaching a live entry.
    let err = env
        .invoke(Opcode::remote(METHOD_PING), &mut [])
        .expect_err("dead object");
    assert_eq!(err, InvokeError::Remote(code::BAD_OBJECT));
}

#[test]
fn retained_environment_survives_all_but_the_last_release() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);
    let env = bootstrap::client_env(&root, b"shared").expect("registration succeeds");

    env.invoke(Opcode::RETAIN, &mut []).expect("retain never fails");
    env.invoke(Opcode::RETAIN, &mut []).expect("retain never fails");
    assert_eq!(env.ref_count(), Some(3));

    env.invoke(Opcode::RELEASE, &mut []).expect("release");
    env.invoke(Opcode::RELEASE, &mut []).expect("release");
    assert_eq!(domain.live_objects(), 1, "two references still held");

    env.invoke(Opcode::RELEASE, &mut []).expect("final release");
    assert_eq!(domain.live_objects(), 0);
    assert_eq!(domain.retired(), 1);
}

#[test]
fn concurrent_releases_retire_the_environment_exactly_once() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);
    let env = bootstrap::client_env(&root, b"contended").expect("registration succeeds");

    let holders = 8;
    for _ in 1..holders {
        env.invoke(Opcode::RETAIN, &mut []).expect("retain");
    }
    let env = Arc::new(env);
    let threads: Vec<_> = (0..holders)
        .map(|_| {
            let env = Arc::clone(&env);
            thread::spawn(move || {
                env.invoke(Opcode::RELEASE, &mut []).expect("release");
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("release thread");
    }

    assert_eq!(domain.live_objects(), 0);
    assert_eq!(domain.retired(), 1);
}

#[test]
fn exhausted_scratch_fails_cleanly_before_any_traffic() {
    let domain = Arc::new(LoopbackDomain::with_scratch_capacity(0));
    let root = domain_root(&domain);

    let err = bootstrap::client_env(&root, b"never").expect_err("no scratch");
    assert_eq!(err, InvokeError::ResourceExhausted);
    assert_eq!(domain.live_objects(), 0);
    assert_eq!(domain.outstanding_scratch(), 0);
}

#[test]
fn failed_registration_leaves_the_output_slot_empty() {
    let domain = Arc::new(LoopbackDomain::new());
    let root = domain_root(&domain);

    // Wrong shape for register: the domain rejects it with an invalid code
    // and the dispatcher skips marshal-out entirely.
    let mut args = [Argument::ObjectOut(ObjectSlot::empty())];
    let err = root
        .invoke(bootstrap::OP_REGISTER_WITH_CREDENTIALS, &mut args)
        .expect_err("shape rejected");
    assert_eq!(err, InvokeError::Remote(code::INVALID));
    assert!(args[0].take_object().is_none());
    assert_eq!(domain.live_objects(), 0);
    assert_eq!(domain.outstanding_scratch(), 0);
}
