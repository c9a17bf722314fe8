/* src/packet.rs */

use crate::crypto::{HP_SAMPLE_LEN, InitialKeys};
use crate::error::Error;
use crate::header::{InitialHeader, parse_initial};

/// Offset of the header-protection sample, counted from the start of the
/// packet number field (RFC 9001 Section 5.4.2).
const SAMPLE_OFFSET: usize = 4;

/// A client Initial packet with protection removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInitial {
	/// QUIC version of the packet.
	pub version: u32,
	/// Destination Connection ID the keys were derived from.
	pub dcid: Vec<u8>,
	/// Source Connection ID.
	pub scid: Vec<u8>,
	/// Value of the long header Length field.
	pub declared_len: usize,
	/// Truncated packet number as sent on the wire.
	pub packet_number: u64,
	/// Encoded packet number length in bytes (1 to 4).
	pub packet_number_len: usize,
	/// Decrypted frames (PADDING, CRYPTO, ACK, ...).
	pub payload: Vec<u8>,
}

/// Decode the first packet of a client datagram: parse the long header,
/// derive the Initial keys, remove header protection and open the payload.
///
/// Coalesced packets following the first one are ignored.
///
/// # Errors
///
/// Header errors from [`parse_initial`], [`Error::UnsupportedVersion`] for
/// versions without Initial salts, and [`Error::DecryptionFailed`] when the
/// payload does not authenticate. Non-QUIC UDP traffic almost always ends in
/// one of the last two.
pub fn decode_initial(datagram: &[u8]) -> Result<DecodedInitial, Error> {
	let header = parse_initial(datagram)?;
	let keys = InitialKeys::derive(header.version, header.dcid)?;
	let (packet_number, packet_number_len, payload) = decrypt_initial(&header, &keys)?;

	tracing::trace!(
		version = header.version,
		dcid_len = header.dcid.len(),
		packet_number,
		payload_len = payload.len(),
		"decrypted QUIC Initial packet"
	);

	Ok(DecodedInitial {
		version: header.version,
		dcid: header.dcid.to_vec(),
		scid: header.scid.to_vec(),
		declared_len: header.declared_len,
		packet_number,
		packet_number_len,
		payload,
	})
}

/// Remove header protection and decrypt the payload of `header` with `keys`.
///
/// Returns the packet number, its encoded length and the plaintext frames.
///
/// # Errors
///
/// Returns [`Error::BufferTooShort`] if the payload is too short to hold a
/// packet number and the header-protection sample, and
/// [`Error::DecryptionFailed`] if the AEAD tag does not verify.
pub fn decrypt_initial(
	header: &InitialHeader<'_>,
	keys: &InitialKeys,
) -> Result<(u64, usize, Vec<u8>), Error> {
	let (packet_number, pn_len, unprotected_first) = remove_header_protection(header, keys)?;

	let mut aad = Vec::with_capacity(header.header_bytes.len() + pn_len);
	aad.push(unprotected_first);
	aad.extend_from_slice(&header.header_bytes[1..]);
	aad.extend_from_slice(&packet_number.to_be_bytes()[8 - pn_len..]);

	let payload = keys.open(packet_number, &aad, &header.payload[pn_len..])?;
	Ok((packet_number, pn_len, payload))
}

fn remove_header_protection(
	header: &InitialHeader<'_>,
	keys: &InitialKeys,
) -> Result<(u64, usize, u8), Error> {
	let payload = header.payload;
	let sample = payload
		.get(SAMPLE_OFFSET..SAMPLE_OFFSET + HP_SAMPLE_LEN)
		.ok_or(Error::BufferTooShort {
			need: SAMPLE_OFFSET + HP_SAMPLE_LEN,
			have: payload.len(),
		})?;
	let mask = keys.header_protection_mask(sample)?;

	// Long headers protect the low four bits of the first byte.
	let unprotected_first = header.first_byte ^ (mask[0] & 0x0f);
	let pn_len = usize::from((unprotected_first & 0x03) + 1);

	let packet_number = payload[..pn_len]
		.iter()
		.zip(&mask[1..])
		.fold(0u64, |pn, (&b, &m)| (pn << 8) | u64::from(b ^ m));

	Ok((packet_number, pn_len, unprotected_first))
}
