//! Fuzz target: `InboundQueue::push` / `pop`
//!
//! Splits the input into (topic, payload) pairs of arbitrary length and
//! checks that the bounded queue never holds more than its capacity,
//! never hands back an oversize message, and accounts for every drop.
//!
//! cargo fuzz run fuzz_inbound_queue

#![no_main]

use libfuzzer_sys::fuzz_target;
use warnbadge::adapters::mqtt::{InboundQueue, INBOUND_CAPACITY, MAX_INBOUND_LEN};

fuzz_target!(|data: &[u8]| {
    let mut queue = InboundQueue::default();
    let mut pushed = 0u32;
    let mut accepted = 0u32;

    let mut rest = data;
    while rest.len() >= 2 {
        let topic_len = usize::from(rest[0]).min(rest.len() - 1);
        let payload_len = usize::from(rest[1]) * 4;
        rest = &rest[2..];

        let (topic, tail) = rest.split_at(topic_len.min(rest.len()));
        let (payload, tail) = tail.split_at(payload_len.min(tail.len()));
        rest = tail;

        let topic = String::from_utf8_lossy(topic);
        pushed += 1;
        if queue.push(&topic, payload) {
            accepted += 1;
        }
        assert!(queue.len() <= INBOUND_CAPACITY);

        // Drain every fourth push so both full and partial queues are hit.
        if pushed % 4 == 0 {
            if let Some(msg) = queue.pop() {
                assert!(msg.payload.len() <= MAX_INBOUND_LEN);
            }
        }
    }

    assert_eq!(pushed - accepted, queue.dropped());
});
