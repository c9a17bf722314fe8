#![no_main]

use libfuzzer_sys::fuzz_target;
use quic_sniff::{Direction, FlowSession};

fuzz_target!(|data: &[u8]| {
	// Treat the input as a run of datagrams, each prefixed by a 16-bit length.
	let mut flow = FlowSession::new();
	let mut rest = data;
	while rest.len() >= 2 {
		let len = usize::from(u16::from_be_bytes([rest[0], rest[1]])).min(rest.len() - 2);
		let (datagram, tail) = rest[2..].split_at(len);
		rest = tail;

		let before = flow.invalid_count();
		let result = flow.feed(Direction::Client, datagram);
		assert!(flow.invalid_count() >= before);
		assert!(flow.buffer().retained() <= flow.buffer().capacity());
		if result.done {
			break;
		}
	}
});
