#![no_main]

use libfuzzer_sys::fuzz_target;
use quic_sniff::ReassemblyBuffer;

fuzz_target!(|data: &[u8]| {
	// Walk arbitrary plaintext and push whatever CRYPTO frames come out into
	// a small buffer.
	let walk = quic_sniff::walk_frames(data);
	let mut buf = ReassemblyBuffer::new(4096);
	for frame in &walk.frames {
		let _ = buf.insert(frame.offset, &frame.data);
		assert!(buf.retained() <= buf.capacity());
	}
	let _ = quic_sniff::parse_client_hello(buf.contiguous_prefix());
});
