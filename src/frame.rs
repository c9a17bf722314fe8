/* src/frame.rs */

use crate::error::Error;
use crate::reader::Reader;

const FRAME_CRYPTO: u64 = 0x06;

/// A single CRYPTO frame extracted from decrypted QUIC payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoFrame {
	/// Byte offset within the crypto stream where this fragment begins.
	pub offset: u64,
	/// The raw data carried by this frame.
	pub data: Vec<u8>,
}

/// Result of walking one packet's frames.
///
/// A walk that hits a malformed or unknown frame stops there, but the CRYPTO
/// frames found before that point are kept in `frames`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameWalk {
	/// CRYPTO frames in packet order.
	pub frames: Vec<CryptoFrame>,
	/// Why the walk stopped early, if it did.
	pub error: Option<Error>,
}

impl FrameWalk {
	/// Convert into a `Result`, discarding the partial frames on error.
	///
	/// # Errors
	///
	/// Returns the error that stopped the walk.
	pub fn into_result(self) -> Result<Vec<CryptoFrame>, Error> {
		match self.error {
			Some(err) => Err(err),
			None => Ok(self.frames),
		}
	}
}

/// Walk all frames of a decrypted Initial packet payload, collecting the
/// CRYPTO frames.
///
/// Every QUIC v1 frame type (0x00 to 0x1e) is understood well enough to skip
/// it; only CRYPTO frames are kept. An unknown frame type or a frame that runs
/// past the end of the payload stops the walk.
#[must_use]
pub fn walk_frames(decrypted: &[u8]) -> FrameWalk {
	let mut r = Reader::new(decrypted);
	let mut walk = FrameWalk::default();

	while !r.is_empty() {
		let start = r.position();
		match next_frame(&mut r) {
			Ok(Some(frame)) => {
				tracing::trace!(offset = frame.offset, len = frame.data.len(), "CRYPTO frame");
				walk.frames.push(frame);
			}
			Ok(None) => {}
			Err(err) => {
				tracing::trace!(at = start, error = %err, "frame walk stopped");
				walk.error = Some(err);
				break;
			}
		}
	}

	walk
}

/// Parse all CRYPTO frames from a decrypted Initial packet payload.
///
/// # Errors
///
/// Returns [`Error::TruncatedFrame`] if a frame extends beyond the available
/// data and [`Error::UnknownFrameType`] for frame types outside QUIC v1.
pub fn parse_crypto_frames(decrypted: &[u8]) -> Result<Vec<CryptoFrame>, Error> {
	walk_frames(decrypted).into_result()
}

fn next_frame(r: &mut Reader<'_>) -> Result<Option<CryptoFrame>, Error> {
	let frame_type = varint(r)?;

	match frame_type {
		// PADDING / PING / HANDSHAKE_DONE
		0x00 | 0x01 | 0x1e => {}
		// ACK (0x02) and ACK_ECN (0x03)
		0x02 | 0x03 => skip_ack_frame(r, frame_type == 0x03)?,
		// RESET_STREAM: stream id, error code, final size
		0x04 => skip_varints(r, 3)?,
		// STOP_SENDING: stream id, error code
		0x05 => skip_varints(r, 2)?,
		FRAME_CRYPTO => {
			let offset = varint(r)?;
			let data = r.varint_prefixed().ok_or_else(|| truncated(r))?;
			return Ok(Some(CryptoFrame {
				offset,
				data: data.to_vec(),
			}));
		}
		// NEW_TOKEN
		0x07 => {
			r.varint_prefixed().ok_or_else(|| truncated(r))?;
		}
		// STREAM: OFF (0x04), LEN (0x02) and FIN (0x01) flag bits
		0x08..=0x0f => {
			varint(r)?;
			if frame_type & 0x04 != 0 {
				varint(r)?;
			}
			if frame_type & 0x02 != 0 {
				r.varint_prefixed().ok_or_else(|| truncated(r))?;
			} else {
				// Data extends to end of packet.
				r.skip(r.remaining()).ok_or_else(|| truncated(r))?;
			}
		}
		// MAX_DATA, MAX_STREAMS, DATA_BLOCKED, STREAMS_BLOCKED, RETIRE_CONNECTION_ID
		0x10 | 0x12 | 0x13 | 0x14 | 0x16 | 0x17 | 0x19 => skip_varints(r, 1)?,
		// MAX_STREAM_DATA, STREAM_DATA_BLOCKED
		0x11 | 0x15 => skip_varints(r, 2)?,
		// NEW_CONNECTION_ID
		0x18 => {
			skip_varints(r, 2)?;
			r.u8_prefixed().ok_or_else(|| truncated(r))?;
			// Stateless reset token
			r.skip(16).ok_or_else(|| truncated(r))?;
		}
		// PATH_CHALLENGE / PATH_RESPONSE
		0x1a | 0x1b => r.skip(8).ok_or_else(|| truncated(r))?,
		// CONNECTION_CLOSE: the transport variant (0x1c) also carries a frame type
		0x1c | 0x1d => {
			skip_varints(r, if frame_type == 0x1c { 2 } else { 1 })?;
			r.varint_prefixed().ok_or_else(|| truncated(r))?;
		}
		_ => return Err(Error::UnknownFrameType(frame_type)),
	}

	Ok(None)
}

/// Skip over an ACK frame by consuming all its varint fields.
///
/// Layout (RFC 9000 Section 19.3):
///   Largest Acknowledged (i), ACK Delay (i), ACK Range Count (i),
///   First ACK Range (i), { Gap (i), ACK Range Length (i) } * count,
///   [ECN Counts: ECT0 (i), ECT1 (i), ECN-CE (i)] for type 0x03 only.
fn skip_ack_frame(r: &mut Reader<'_>, has_ecn: bool) -> Result<(), Error> {
	skip_varints(r, 2)?;
	let range_count = varint(r)?;
	varint(r)?;

	// Each range takes at least two bytes, which bounds the loop by the
	// payload size rather than by the attacker-chosen count.
	for _ in 0..range_count {
		skip_varints(r, 2)?;
	}

	if has_ecn {
		skip_varints(r, 3)?;
	}
	Ok(())
}

fn skip_varints(r: &mut Reader<'_>, count: usize) -> Result<(), Error> {
	for _ in 0..count {
		varint(r)?;
	}
	Ok(())
}

fn varint(r: &mut Reader<'_>) -> Result<u64, Error> {
	r.varint().ok_or_else(|| truncated(r))
}

fn truncated(r: &Reader<'_>) -> Error {
	Error::TruncatedFrame {
		offset: r.position() as u64,
	}
}
