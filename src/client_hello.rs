/* src/client_hello.rs */

use crate::error::Error;
use crate::reader::Reader;

/// TLS handshake message type of ClientHello.
pub const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;

/// Smallest possible ClientHello: legacy version (2) + random (32) + empty
/// session ID (1) + one cipher suite (4) + one compression method (2), with
/// no extensions.
pub const MIN_CLIENT_HELLO_LEN: usize = 41;

const HANDSHAKE_HEADER_LEN: usize = 4;
const MAX_SESSION_ID_LEN: usize = 32;

/// Extension type codes decoded into typed fields.
pub mod ext {
	/// `server_name` (RFC 6066).
	pub const SERVER_NAME: u16 = 0x0000;
	/// `supported_groups` (RFC 8446).
	pub const SUPPORTED_GROUPS: u16 = 0x000a;
	/// `ec_point_formats` (RFC 8422).
	pub const EC_POINT_FORMATS: u16 = 0x000b;
	/// `signature_algorithms` (RFC 8446).
	pub const SIGNATURE_ALGORITHMS: u16 = 0x000d;
	/// `application_layer_protocol_negotiation` (RFC 7301).
	pub const ALPN: u16 = 0x0010;
	/// `supported_versions` (RFC 8446).
	pub const SUPPORTED_VERSIONS: u16 = 0x002b;
	/// `psk_key_exchange_modes` (RFC 8446).
	pub const PSK_KEY_EXCHANGE_MODES: u16 = 0x002d;
	/// `key_share` (RFC 8446).
	pub const KEY_SHARE: u16 = 0x0033;
	/// `quic_transport_parameters` (RFC 9001).
	pub const QUIC_TRANSPORT_PARAMETERS: u16 = 0x0039;
}

const TLS13: u16 = 0x0304;
const NAME_TYPE_HOST_NAME: u8 = 0x00;

/// One extension as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Extension {
	/// Extension type code.
	pub ext_type: u16,
	/// Extension body, without the type and length fields.
	pub data: Vec<u8>,
}

/// One `KeyShareEntry` of the `key_share` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct KeyShareEntry {
	/// Named group code.
	pub group: u16,
	/// Public key material.
	pub key_exchange: Vec<u8>,
}

/// A parsed TLS ClientHello.
///
/// Extensions are kept in wire order. When an extension type repeats, the
/// first occurrence is kept and later ones are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClientHello {
	legacy_version: u16,
	random: [u8; 32],
	session_id: Vec<u8>,
	cipher_suites: Vec<u16>,
	compression_methods: Vec<u8>,
	extensions: Vec<Extension>,
	server_name: Option<String>,
	alpn_protocols: Vec<String>,
	supported_versions: Vec<u16>,
	key_shares: Vec<KeyShareEntry>,
	supported_groups: Vec<u16>,
	signature_algorithms: Vec<u16>,
	psk_key_exchange_modes: Vec<u8>,
	ec_point_formats: Vec<u8>,
}

impl ClientHello {
	/// `legacy_version`, `0x0303` for TLS 1.3 clients.
	#[must_use]
	pub fn legacy_version(&self) -> u16 {
		self.legacy_version
	}

	/// The 32-byte client random.
	#[must_use]
	pub fn random(&self) -> &[u8; 32] {
		&self.random
	}

	/// `legacy_session_id`, at most 32 bytes.
	#[must_use]
	pub fn session_id(&self) -> &[u8] {
		&self.session_id
	}

	/// Offered cipher suites in preference order.
	#[must_use]
	pub fn cipher_suites(&self) -> &[u16] {
		&self.cipher_suites
	}

	/// Offered compression methods.
	#[must_use]
	pub fn compression_methods(&self) -> &[u8] {
		&self.compression_methods
	}

	/// All extensions in wire order, duplicates removed.
	#[must_use]
	pub fn extensions(&self) -> &[Extension] {
		&self.extensions
	}

	/// Raw body of the extension with type `ext_type`.
	#[must_use]
	pub fn extension(&self, ext_type: u16) -> Option<&[u8]> {
		self
			.extensions
			.iter()
			.find(|e| e.ext_type == ext_type)
			.map(|e| e.data.as_slice())
	}

	/// Whether an extension with type `ext_type` is present.
	#[must_use]
	pub fn has_extension(&self, ext_type: u16) -> bool {
		self.extension(ext_type).is_some()
	}

	/// First `host_name` entry of the SNI extension.
	#[must_use]
	pub fn server_name(&self) -> Option<&str> {
		self.server_name.as_deref()
	}

	/// ALPN protocol names in preference order.
	#[must_use]
	pub fn alpn_protocols(&self) -> &[String] {
		&self.alpn_protocols
	}

	/// Versions from `supported_versions`.
	#[must_use]
	pub fn supported_versions(&self) -> &[u16] {
		&self.supported_versions
	}

	/// Entries of `key_share`.
	#[must_use]
	pub fn key_shares(&self) -> &[KeyShareEntry] {
		&self.key_shares
	}

	/// Named groups from `supported_groups`.
	#[must_use]
	pub fn supported_groups(&self) -> &[u16] {
		&self.supported_groups
	}

	/// Signature schemes from `signature_algorithms`.
	#[must_use]
	pub fn signature_algorithms(&self) -> &[u16] {
		&self.signature_algorithms
	}

	/// Modes from `psk_key_exchange_modes`.
	#[must_use]
	pub fn psk_key_exchange_modes(&self) -> &[u8] {
		&self.psk_key_exchange_modes
	}

	/// Formats from `ec_point_formats`.
	#[must_use]
	pub fn ec_point_formats(&self) -> &[u8] {
		&self.ec_point_formats
	}

	/// Whether the client offers TLS 1.3.
	#[must_use]
	pub fn is_tls13(&self) -> bool {
		self.supported_versions.contains(&TLS13)
	}
}

/// Parse a TLS handshake message that should be a ClientHello.
///
/// `data` starts at the handshake header (type and 24-bit length); bytes
/// after the declared message length are ignored.
///
/// # Errors
///
/// Returns [`Error::Incomplete`] while fewer than [`MIN_CLIENT_HELLO_LEN`]
/// bytes, or fewer bytes than the header declares, are available.
/// Returns [`Error::NotClientHello`] for other handshake types, and
/// [`Error::MalformedClientHello`] for any structural violation.
pub fn parse_client_hello(data: &[u8]) -> Result<ClientHello, Error> {
	if data.len() < MIN_CLIENT_HELLO_LEN {
		return Err(Error::Incomplete {
			need: MIN_CLIENT_HELLO_LEN,
			have: data.len(),
		});
	}

	let mut r = Reader::new(data);
	let (Some(msg_type), Some(len)) = (r.u8(), r.u24()) else {
		return Err(Error::Internal("handshake header shorter than minimum"));
	};
	if msg_type != HANDSHAKE_CLIENT_HELLO {
		return Err(Error::NotClientHello(msg_type));
	}

	let len = len as usize;
	if len < MIN_CLIENT_HELLO_LEN {
		return Err(Error::MalformedClientHello("declared length below minimum"));
	}

	let body = r.bytes(len).ok_or(Error::Incomplete {
		need: HANDSHAKE_HEADER_LEN + len,
		have: data.len(),
	})?;
	parse_body(body)
}

fn parse_body(body: &[u8]) -> Result<ClientHello, Error> {
	let mut r = Reader::new(body);

	let legacy_version = r.u16().ok_or(malformed("truncated legacy_version"))?;
	let random: [u8; 32] = r
		.bytes(32)
		.and_then(|b| b.try_into().ok())
		.ok_or(malformed("truncated random"))?;

	let session_id = r.u8_prefixed().ok_or(malformed("truncated session_id"))?;
	if session_id.len() > MAX_SESSION_ID_LEN {
		return Err(malformed("session_id longer than 32 bytes"));
	}

	let suites = r.u16_prefixed().ok_or(malformed("truncated cipher_suites"))?;
	if suites.is_empty() {
		return Err(malformed("empty cipher_suites"));
	}
	let cipher_suites = u16_items(suites).ok_or(malformed("odd cipher_suites length"))?;

	let compression = r
		.u8_prefixed()
		.ok_or(malformed("truncated compression_methods"))?;
	if compression.is_empty() {
		return Err(malformed("empty compression_methods"));
	}

	let mut hello = ClientHello {
		legacy_version,
		random,
		session_id: session_id.to_vec(),
		cipher_suites,
		compression_methods: compression.to_vec(),
		extensions: Vec::new(),
		server_name: None,
		alpn_protocols: Vec::new(),
		supported_versions: Vec::new(),
		key_shares: Vec::new(),
		supported_groups: Vec::new(),
		signature_algorithms: Vec::new(),
		psk_key_exchange_modes: Vec::new(),
		ec_point_formats: Vec::new(),
	};

	// A hello without an extension block is still well formed.
	if r.is_empty() {
		return Ok(hello);
	}

	let block = r.u16_prefixed().ok_or(malformed("truncated extensions"))?;
	if !r.is_empty() {
		return Err(malformed("trailing bytes after extensions"));
	}

	let mut r = Reader::new(block);
	while !r.is_empty() {
		let ext_type = r.u16().ok_or(malformed("truncated extension header"))?;
		let data = r.u16_prefixed().ok_or(malformed("truncated extension body"))?;

		if hello.has_extension(ext_type) {
			tracing::trace!(ext_type, "duplicate extension dropped");
			continue;
		}
		decode_extension(&mut hello, ext_type, data)?;
		hello.extensions.push(Extension {
			ext_type,
			data: data.to_vec(),
		});
	}

	Ok(hello)
}

fn decode_extension(hello: &mut ClientHello, ext_type: u16, data: &[u8]) -> Result<(), Error> {
	match ext_type {
		ext::SERVER_NAME => hello.server_name = decode_server_name(data)?,
		ext::ALPN => hello.alpn_protocols = decode_alpn(data)?,
		ext::SUPPORTED_VERSIONS => {
			hello.supported_versions = exact(data, |r| r.u8_prefixed().and_then(u16_items))
				.ok_or(malformed("bad supported_versions"))?;
		}
		ext::KEY_SHARE => hello.key_shares = decode_key_share(data)?,
		ext::SUPPORTED_GROUPS => {
			hello.supported_groups = exact(data, |r| r.u16_prefixed().and_then(u16_items))
				.ok_or(malformed("bad supported_groups"))?;
		}
		ext::SIGNATURE_ALGORITHMS => {
			hello.signature_algorithms = exact(data, |r| r.u16_prefixed().and_then(u16_items))
				.ok_or(malformed("bad signature_algorithms"))?;
		}
		ext::PSK_KEY_EXCHANGE_MODES => {
			hello.psk_key_exchange_modes = exact(data, |r| r.u8_prefixed().map(<[u8]>::to_vec))
				.ok_or(malformed("bad psk_key_exchange_modes"))?;
		}
		ext::EC_POINT_FORMATS => {
			hello.ec_point_formats = exact(data, |r| r.u8_prefixed().map(<[u8]>::to_vec))
				.ok_or(malformed("bad ec_point_formats"))?;
		}
		_ => {}
	}
	Ok(())
}

/// `ServerNameList`; the first `host_name` entry wins. An empty body is
/// accepted and carries no name.
fn decode_server_name(data: &[u8]) -> Result<Option<String>, Error> {
	if data.is_empty() {
		return Ok(None);
	}

	let list = exact(data, Reader::u16_prefixed).ok_or(malformed("bad server_name list"))?;
	let mut r = Reader::new(list);
	let mut host_name = None;
	while !r.is_empty() {
		let name_type = r.u8().ok_or(malformed("truncated server_name entry"))?;
		let name = r
			.u16_prefixed()
			.ok_or(malformed("truncated server_name entry"))?;
		if name_type == NAME_TYPE_HOST_NAME && host_name.is_none() {
			host_name = Some(String::from_utf8_lossy(name).into_owned());
		}
	}
	Ok(host_name)
}

fn decode_alpn(data: &[u8]) -> Result<Vec<String>, Error> {
	let list = exact(data, Reader::u16_prefixed).ok_or(malformed("bad ALPN list"))?;
	let mut r = Reader::new(list);
	let mut protocols = Vec::new();
	while !r.is_empty() {
		let proto = r.u8_prefixed().ok_or(malformed("truncated ALPN protocol"))?;
		if proto.is_empty() {
			return Err(malformed("empty ALPN protocol"));
		}
		protocols.push(String::from_utf8_lossy(proto).into_owned());
	}
	Ok(protocols)
}

fn decode_key_share(data: &[u8]) -> Result<Vec<KeyShareEntry>, Error> {
	let list = exact(data, Reader::u16_prefixed).ok_or(malformed("bad key_share list"))?;
	let mut r = Reader::new(list);
	let mut entries = Vec::new();
	while !r.is_empty() {
		let (Some(group), Some(key)) = (r.u16(), r.u16_prefixed()) else {
			return Err(malformed("truncated key_share entry"));
		};
		entries.push(KeyShareEntry {
			group,
			key_exchange: key.to_vec(),
		});
	}
	Ok(entries)
}

/// Run `f` over `data` and require it to consume every byte.
fn exact<'a, T>(data: &'a [u8], f: impl FnOnce(&mut Reader<'a>) -> Option<T>) -> Option<T> {
	let mut r = Reader::new(data);
	let out = f(&mut r)?;
	r.is_empty().then_some(out)
}

fn u16_items(data: &[u8]) -> Option<Vec<u16>> {
	if data.len() % 2 != 0 {
		return None;
	}
	Some(
		data
			.chunks_exact(2)
			.map(|c| u16::from_be_bytes([c[0], c[1]]))
			.collect(),
	)
}

fn malformed(reason: &'static str) -> Error {
	Error::MalformedClientHello(reason)
}
