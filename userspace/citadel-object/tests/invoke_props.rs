// Copyright 2026 Citadel Project Contributors
// SPDX-License-Identifier: Apache-2.0

//! Property coverage for the dispatch and marshaling paths.
//!
//! Every case runs against the echo transport, whose contract is simple
//! enough to predict exactly: each output buffer reports its capacity as the
//! filled length and each output-object slot receives a distinct fresh
//! context. The properties pin the caller-visible consequences of that
//! contract across arbitrary argument shapes.

use std::collections::HashSet;
use std::sync::Arc;

use citadel_abi::Opcode;
use citadel_object::loopback::EchoTransport;
use citadel_object::{Argument, ObjectHandle, ObjectSlot, OutBuffer, Transport};
use proptest::collection::vec;
use proptest::prelude::*;

fn mint(transport: &Arc<EchoTransport>) -> ObjectHandle {
    let root = citadel_object::bootstrap::root_for(Arc::clone(transport) as Arc<dyn Transport>);
    let mut args = [Argument::ObjectOut(ObjectSlot::empty())];
    root.invoke(Opcode::remote(1), &mut args).expect("mint succeeds");
    args[0].take_object().expect("slot filled")
}

proptest! {
    #[test]
    fn output_buffers_report_their_capacities(
        inputs in vec(vec(any::<u8>(), 0..48), 0..4),
        capacities in vec(0usize..48, 0..4),
    ) {
        let transport = Arc::new(EchoTransport::new());
        let target = mint(&transport);

        let mut backings: Vec<Vec<u8>> = capacities.iter().map(|&cap| vec![0u8; cap]).collect();
        let mut args: Vec<Argument<'_>> = Vec::new();
        for input in &inputs {
            args.push(Argument::BufferIn(input));
        }
        for backing in &mut backings {
            args.push(Argument::BufferOut(OutBuffer::new(backing)));
        }
        target.invoke(Opcode::remote(7), &mut args).expect("echo accepts every call");

        for (arg, &cap) in args[inputs.len()..].iter().zip(&capacities) {
            match arg {
                Argument::BufferOut(out) => prop_assert_eq!(out.filled(), cap),
                _ => prop_assert!(false, "non-buffer slot in the output range"),
            }
        }
        prop_assert_eq!(transport.outstanding_scratch(), 0);
    }

    #[test]
    fn every_out_object_slot_yields_a_distinct_live_handle(slots in 1usize..8) {
        let transport = Arc::new(EchoTransport::new());
        let target = mint(&transport);

        let mut args: Vec<Argument<'_>> =
            (0..slots).map(|_| Argument::ObjectOut(ObjectSlot::empty())).collect();
        target.invoke(Opcode::remote(7), &mut args).expect("echo accepts every call");

        let mut contexts = HashSet::new();
        contexts.insert(target.context());
        for arg in &mut args {
            let handle = arg.take_object();
            prop_assert!(handle.is_some(), "successful call must fill every slot");
            let handle = handle.unwrap();
            prop_assert_eq!(handle.ref_count(), Some(1));
            prop_assert!(contexts.insert(handle.context()), "contexts must be distinct");
        }
        prop_assert_eq!(transport.outstanding_scratch(), 0);
    }

    #[test]
    fn input_buffers_survive_the_call_unchanged(
        payloads in vec(vec(any::<u8>(), 0..64), 1..4),
    ) {
        let transport = Arc::new(EchoTransport::new());
        let target = mint(&transport);

        let before = payloads.clone();
        let mut args: Vec<Argument<'_>> =
            payloads.iter().map(|payload| Argument::BufferIn(payload)).collect();
        target.invoke(Opcode::remote(7), &mut args).expect("echo accepts every call");
        drop(args);

        prop_assert_eq!(payloads, before);
    }

    #[test]
    fn borrowed_input_objects_keep_their_counts(holders in 1u64..5) {
        let transport = Arc::new(EchoTransport::new());
        let target = mint(&transport);
        let lent = mint(&transport);
        for _ in 1..holders {
            lent.invoke(Opcode::RETAIN, &mut []).expect("retain never fails");
        }

        let mut args = [Argument::ObjectIn(&lent)];
        target.invoke(Opcode::remote(7), &mut args).expect("echo accepts every call");
        drop(args);

        prop_assert_eq!(lent.ref_count(), Some(holders));
        prop_assert!(transport.retired().is_empty());
    }
}
