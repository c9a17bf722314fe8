/* src/header.rs */

use crate::error::Error;
use crate::reader::Reader;

/// QUIC version 1 (RFC 9000).
pub const QUIC_V1: u32 = 0x0000_0001;
/// QUIC version 2 (RFC 9369).
pub const QUIC_V2: u32 = 0x6b33_43cf;

const MAX_CID_LEN: u8 = 20;

/// Parsed QUIC Initial packet header with zero-copy references into the
/// original datagram.
///
/// The packet number is still under header protection at this point, so its
/// length is not known yet; see [`crate::DecodedInitial`].
#[derive(Debug, Clone, PartialEq)]
pub struct InitialHeader<'a> {
	/// QUIC version field (e.g. `0x00000001` for v1, `0x6b3343cf` for v2).
	pub version: u32,
	/// Destination Connection ID bytes.
	pub dcid: &'a [u8],
	/// Source Connection ID bytes.
	pub scid: &'a [u8],
	/// Token bytes. An empty slice indicates no token was present.
	pub token: &'a [u8],
	/// Value of the Length field: protected packet number plus payload.
	pub declared_len: usize,
	/// Encrypted payload including the protected packet number.
	pub payload: &'a [u8],
	/// Raw header bytes from the first byte up to (but not including) the
	/// payload. Required when constructing the AEAD additional authenticated
	/// data during decryption.
	pub header_bytes: &'a [u8],
	/// The first byte of the packet, still under header protection.
	pub first_byte: u8,
}

/// Long header packet type bits that denote an Initial packet for `version`.
///
/// QUIC v2 remaps the type field so that Initial is `0b01`; every other
/// version is read with the v1 layout.
#[must_use]
pub fn initial_type_bits(version: u32) -> u8 {
	match version {
		QUIC_V2 => 0b01,
		_ => 0b00,
	}
}

/// Parse a QUIC Long Header Initial packet from the start of a datagram.
///
/// Only the header fields are extracted; no decryption is performed. Bytes
/// after the declared length (coalesced packets) are not part of the result.
///
/// # Errors
///
/// Returns a [`crate::ErrorKind::MalformedHeader`] error when the packet is
/// truncated, is not a long header, lacks the fixed bit or carries a
/// connection ID longer than 20 bytes. Returns [`Error::NotInitialPacket`]
/// for other long header packet types.
pub fn parse_initial(packet: &[u8]) -> Result<InitialHeader<'_>, Error> {
	if packet.len() < 7 {
		return Err(Error::BufferTooShort {
			need: 7,
			have: packet.len(),
		});
	}

	let mut r = Reader::new(packet);
	let first_byte = r.u8().ok_or_else(|| too_short(&r, packet))?;

	if (first_byte & 0x80) == 0 {
		return Err(Error::NotLongHeader);
	}

	if (first_byte & 0x40) == 0 {
		return Err(Error::InvalidFixedBit);
	}

	let version = r.u32().ok_or_else(|| too_short(&r, packet))?;

	let packet_type = (first_byte & 0x30) >> 4;
	if packet_type != initial_type_bits(version) {
		return Err(Error::NotInitialPacket(packet_type));
	}

	let dcid = read_cid(&mut r, packet)?;
	let scid = read_cid(&mut r, packet)?;
	let token = r.varint_prefixed().ok_or_else(|| too_short(&r, packet))?;

	let declared_len = r
		.varint()
		.and_then(|len| usize::try_from(len).ok())
		.ok_or_else(|| too_short(&r, packet))?;

	let header_len = r.position();
	let payload = r.bytes(declared_len).ok_or(Error::BufferTooShort {
		need: header_len.saturating_add(declared_len),
		have: packet.len(),
	})?;

	Ok(InitialHeader {
		version,
		dcid,
		scid,
		token,
		declared_len,
		payload,
		header_bytes: &packet[..header_len],
		first_byte,
	})
}

fn read_cid<'a>(r: &mut Reader<'a>, packet: &[u8]) -> Result<&'a [u8], Error> {
	let cid_len = r.u8().ok_or_else(|| too_short(r, packet))?;
	if cid_len > MAX_CID_LEN {
		return Err(Error::InvalidCidLength(cid_len));
	}
	r.bytes(usize::from(cid_len)).ok_or(Error::BufferTooShort {
		need: r.position() + usize::from(cid_len),
		have: packet.len(),
	})
}

fn too_short(r: &Reader<'_>, packet: &[u8]) -> Error {
	Error::BufferTooShort {
		need: r.position() + 1,
		have: packet.len(),
	}
}
