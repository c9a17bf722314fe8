#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
	// Must return Ok or Err on any input, never panic.
	if let Ok(hello) = quic_sniff::parse_client_hello(data) {
		let _ = hello.server_name();
		let _ = hello.alpn_protocols();
		assert!(hello.session_id().len() <= 32);
		assert!(!hello.cipher_suites().is_empty());
	}
});
