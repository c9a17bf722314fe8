/* tests/common/mod.rs */

#![allow(dead_code)]

pub fn hex_decode(s: &str) -> Vec<u8> {
	(0..s.len())
		.step_by(2)
		.map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("valid hex"))
		.collect()
}

/// Encode a value as a QUIC varint and append to buf.
pub fn push_varint(buf: &mut Vec<u8>, val: u64) {
	if val < 64 {
		buf.push(val as u8);
	} else if val < 16384 {
		buf.push(0x40 | (val >> 8) as u8);
		buf.push(val as u8);
	} else if val < 1_073_741_824 {
		let bytes = (val as u32).to_be_bytes();
		buf.push(0x80 | bytes[0]);
		buf.extend_from_slice(&bytes[1..]);
	} else {
		let bytes = val.to_be_bytes();
		buf.push(0xc0 | bytes[0]);
		buf.extend_from_slice(&bytes[1..]);
	}
}

pub fn push_u16(buf: &mut Vec<u8>, val: u16) {
	buf.extend_from_slice(&val.to_be_bytes());
}

/// RFC 9001 Appendix A.2: client Initial packet (1200 bytes),
/// DCID = 0x8394c8f03e515708, packet number 2.
pub fn rfc9001_client_initial() -> Vec<u8> {
	hex_decode(concat!(
		"c000000001088394c8f03e515708",
		"0000449e",
		"7b9aec34d1b1c98dd7689fb8ec11",
		"d242b123dc9bd8bab936b47d92ec356c",
		"0bab7df5976d27cd449f63300099f399",
		"1c260ec4c60d17b31f8429157bb35a12",
		"82a643a8d2262cad67500cadb8e7378c",
		"8eb7539ec4d4905fed1bee1fc8aafba1",
		"7c750e2c7ace01e6005f80fcb7df6212",
		"30c83711b39343fa028cea7f7fb5ff89",
		"eac2308249a02252155e2347b63d58c5",
		"457afd84d05dfffdb20392844ae81215",
		"4682e9cf012f9021a6f0be17ddd0c208",
		"4dce25ff9b06cde535d0f920a2db1bf3",
		"62c23e596dee38f5a6cf3948838a3aec",
		"4e15daf8500a6ef69ec4e3feb6b1d98e",
		"610ac8b7ec3faf6ad760b7bad1db4ba3",
		"485e8a94dc250ae3fdb41ed15fb6a8e5",
		"eba0fc3dd60bc8e30c5c4287e53805db",
		"059ae0648db2f64264ed5e39be2e20d8",
		"2df566da8dd5998ccabdae053060ae6c",
		"7b4378e846d29f37ed7b4ea9ec5d82e7",
		"961b7f25a9323851f681d582363aa5f8",
		"9937f5a67258bf63ad6f1a0b1d96dbd4",
		"faddfcefc5266ba6611722395c906556",
		"be52afe3f565636ad1b17d508b73d874",
		"3eeb524be22b3dcbc2c7468d54119c74",
		"68449a13d8e3b95811a198f3491de3e7",
		"fe942b330407abf82a4ed7c1b311663a",
		"c69890f4157015853d91e923037c227a",
		"33cdd5ec281ca3f79c44546b9d90ca00",
		"f064c99e3dd97911d39fe9c5d0b23a22",
		"9a234cb36186c4819e8b9c592772663229",
		"1d6a418211cc2962e20fe47feb3edf33",
		"0f2c603a9d48c0fcb5699dbfe5896425",
		"c5bac4aee82e57a85aaf4e2513e4f057",
		"96b07ba2ee47d80506f8d2c25e50fd14",
		"de71e6c418559302f939b0e1abd576f2",
		"79c4b2e0feb85c1f28ff18f58891ffef",
		"132eef2fa09346aee33c28eb130ff28f",
		"5b766953334113211996d20011a198e3",
		"fc433f9f2541010ae17c1bf202580f60",
		"47472fb36857fe843b19f5984009ddc3",
		"24044e847a4f4a0ab34f719595de3725",
		"2d6235365e9b84392b061085349d7320",
		"3a4a13e96f5432ec0fd4a1ee65accdd5",
		"e3904df54c1da510b0ff20dcc0c77fcb",
		"2c0e0eb605cb0504db87632cf3d8b4da",
		"e6e705769d1de354270123cb11450efc",
		"60ac47683d7b8d0f811365565fd98c4c",
		"8eb936bcab8d069fc33bd801b03adea2",
		"e1fbc5aa463d08ca19896d2bf59a071b",
		"851e6c239052172f296bfb5e72404790",
		"a2181014f3b94a4e97d117b438130368",
		"cc39dbb2d198065ae3986547926cd216",
		"2f40a29f0c3c8745c0f50fba3852e566",
		"d44575c29d39a03f0cda721984b6f440",
		"591f355e12d439ff150aab7613499dbd",
		"49adabc8676eef023b15b65bfc5ca069",
		"48109f23f350db82123535eb8a7433bd",
		"abcb909271a6ecbcb58b936a88cd4e8f",
		"2e6ff5800175f113253d8fa9ca8885c2",
		"f552e657dc603f252e1a8e308f76f0be",
		"79e2fb8f5d5fbbe2e30ecadd220723c8",
		"c0aea8078cdfcb3868263ff8f0940054",
		"da48781893a7e49ad5aff4af300cd804",
		"a6b6279ab3ff3afb64491c85194aab76",
		"0d58a606654f9f4400e8b38591356fbf",
		"6425aca26dc85244259ff2b19c41b9f9",
		"6f3ca9ec1dde434da7d2d392b905ddf3",
		"d1f9af93d1af5950bd493f5aa731b405",
		"6df31bd267b6b90a079831aaf579be0a",
		"39013137aac6d404f518cfd46840647e",
		"78bfe706ca4cf5e9c5453e9f7cfd2b8b",
		"4c8d169a44e55c88d4a9a7f947424110",
		"92abbdf8b889e5c199d096e3f24788",
	))
}

/// The ClientHello carried in the RFC 9001 Appendix A.2 CRYPTO frame
/// (handshake header included, 241 bytes). The published vector carries the
/// transport parameters under the draft codepoint 0xffa5, not 0x0039.
pub fn rfc9001_client_hello() -> Vec<u8> {
	hex_decode(concat!(
		"010000ed0303ebf8fa56f12939b9584a",
		"3896472ec40bb863cfd3e86804fe3a47",
		"f06a2b69484c00000413011302010000",
		"c000000010000e00000b6578616d706c",
		"652e636f6dff01000100000a00080006",
		"001d0017001800100007000504616c70",
		"6e000500050100000000003300260024",
		"001d00209370b2c9caa47fbabaf4559f",
		"edba753de171fa71f50f1ce15d43e994",
		"ec74d748002b0003020304000d001000",
		"0e040305030603020308040805080600",
		"2d00020101001c00024001ffa5003204",
		"08ffffffffffffffff05048000ffff07",
		"048000ffff0801100104800075300901",
		"100f088394c8f03e51570806048000ff",
		"ff",
	))
}

pub const RFC9001_DCID: [u8; 8] = [0x83, 0x94, 0xc8, 0xf0, 0x3e, 0x51, 0x57, 0x08];

/// A CRYPTO frame carrying `data` at stream `offset`.
pub fn crypto_frame(offset: u64, data: &[u8]) -> Vec<u8> {
	let mut frame = vec![0x06];
	push_varint(&mut frame, offset);
	push_varint(&mut frame, data.len() as u64);
	frame.extend_from_slice(data);
	frame
}

/// Build a handshake message of type ClientHello around `body`.
pub fn handshake(body: &[u8]) -> Vec<u8> {
	let len = body.len() as u32;
	let mut msg = vec![0x01];
	msg.extend_from_slice(&len.to_be_bytes()[1..]);
	msg.extend_from_slice(body);
	msg
}

/// A minimal ClientHello body followed by the given extension block entries.
pub fn client_hello_with(extensions: &[(u16, Vec<u8>)]) -> Vec<u8> {
	let mut body = Vec::new();
	body.extend_from_slice(&[0x03, 0x03]);
	body.extend_from_slice(&[0x11; 32]);
	body.push(0x00);
	body.extend_from_slice(&[0x00, 0x02, 0x13, 0x01]);
	body.extend_from_slice(&[0x01, 0x00]);

	let mut exts = Vec::new();
	for (ext_type, data) in extensions {
		push_u16(&mut exts, *ext_type);
		push_u16(&mut exts, data.len() as u16);
		exts.extend_from_slice(data);
	}
	push_u16(&mut body, exts.len() as u16);
	body.extend_from_slice(&exts);
	handshake(&body)
}

/// Body of a `server_name` extension with one `host_name` entry.
pub fn sni_ext(host: &str) -> Vec<u8> {
	let mut data = Vec::new();
	push_u16(&mut data, (3 + host.len()) as u16);
	data.push(0x00);
	push_u16(&mut data, host.len() as u16);
	data.extend_from_slice(host.as_bytes());
	data
}

/// Body of an ALPN extension.
pub fn alpn_ext(protocols: &[&str]) -> Vec<u8> {
	let mut list = Vec::new();
	for p in protocols {
		list.push(p.len() as u8);
		list.extend_from_slice(p.as_bytes());
	}
	let mut data = Vec::new();
	push_u16(&mut data, list.len() as u16);
	data.extend_from_slice(&list);
	data
}

/// Protect `plaintext` frames as a client Initial packet, the way a QUIC
/// client would: 2-byte packet number, AES-128-GCM payload protection, then
/// AES-ECB header protection.
#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
pub fn protect_initial(version: u32, dcid: &[u8], packet_number: u64, plaintext: &[u8]) -> Vec<u8> {
	#[cfg(feature = "aws-lc-rs")]
	use aws_lc_rs::aead;
	#[cfg(feature = "ring")]
	use ring::aead;

	const PN_LEN: usize = 2;

	let keys = quic_sniff::InitialKeys::derive(version, dcid).expect("known version");

	// The header-protection sample needs 20 bytes after the packet number start.
	let mut plaintext = plaintext.to_vec();
	if plaintext.len() < 4 {
		plaintext.resize(4, 0x00);
	}

	let first = 0xc0 | (quic_sniff::initial_type_bits(version) << 4) | (PN_LEN as u8 - 1);
	let mut pkt = vec![first];
	pkt.extend_from_slice(&version.to_be_bytes());
	pkt.push(dcid.len() as u8);
	pkt.extend_from_slice(dcid);
	pkt.push(0x00); // SCID length
	pkt.push(0x00); // token length

	let length = (PN_LEN + plaintext.len() + 16) as u16;
	assert!(length < 16384);
	pkt.push(0x40 | (length >> 8) as u8);
	pkt.push(length as u8);

	let pn_offset = pkt.len();
	pkt.extend_from_slice(&packet_number.to_be_bytes()[8 - PN_LEN..]);

	let sealing_key = aead::LessSafeKey::new(
		aead::UnboundKey::new(&aead::AES_128_GCM, &keys.key).expect("valid key"),
	);
	let nonce = aead::Nonce::assume_unique_for_key(keys.nonce(packet_number));
	let aad = pkt.clone();
	sealing_key
		.seal_in_place_append_tag(nonce, aead::Aad::from(&aad), &mut plaintext)
		.expect("seal");
	pkt.extend_from_slice(&plaintext);

	let mask = keys
		.header_protection_mask(&pkt[pn_offset + 4..pn_offset + 20])
		.expect("sample present");
	pkt[0] ^= mask[0] & 0x0f;
	for i in 0..PN_LEN {
		pkt[pn_offset + i] ^= mask[1 + i];
	}
	pkt
}
