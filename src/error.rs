/* src/error.rs */

/// Errors produced while decoding a QUIC Initial datagram and parsing the
/// ClientHello it carries.
///
/// Every variant belongs to exactly one [`ErrorKind`]; the flow session only
/// looks at the kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// The input buffer is shorter than required.
	#[error("buffer too short: need at least {need} bytes, have {have}")]
	BufferTooShort {
		/// Minimum number of bytes required.
		need: usize,
		/// Actual number of bytes available.
		have: usize,
	},

	/// The packet does not have the long header form bit set.
	#[error("not a QUIC long header packet")]
	NotLongHeader,

	/// The fixed bit (0x40) of the first byte is clear.
	#[error("QUIC fixed bit is not set")]
	InvalidFixedBit,

	/// A connection ID length field exceeds the protocol maximum of 20 bytes.
	#[error("connection ID length {0} exceeds maximum of 20")]
	InvalidCidLength(u8),

	/// The packet is a long header but not an Initial packet.
	#[error("not an Initial packet (type bits: {0:#04x})")]
	NotInitialPacket(u8),

	/// The QUIC version is not one with known Initial salts.
	#[error("unsupported QUIC version for decryption: {0:#010x}")]
	UnsupportedVersion(u32),

	/// AEAD decryption or key derivation failed.
	#[error("decryption failed: {0}")]
	DecryptionFailed(String),

	/// The variable-length integer encoding is malformed.
	#[error("invalid varint encoding")]
	InvalidVarint,

	/// A frame was truncated before its declared length.
	#[error("truncated frame at payload offset {offset}")]
	TruncatedFrame {
		/// The byte offset within the decrypted payload where truncation occurred.
		offset: u64,
	},

	/// A frame type outside the QUIC v1 frame set was encountered.
	#[error("unknown frame type {0:#x}")]
	UnknownFrameType(u64),

	/// A CRYPTO fragment would grow the reassembly buffer past its bound.
	#[error("reassembly buffer overflow: range ends at {end}, capacity is {capacity}")]
	BufferOverflow {
		/// Stream offset one past the last byte of the rejected range.
		end: u64,
		/// Configured capacity of the buffer.
		capacity: usize,
	},

	/// More contiguous handshake bytes are needed before a ClientHello can be
	/// parsed.
	#[error("incomplete ClientHello: need {need} bytes, have {have}")]
	Incomplete {
		/// Bytes required to make progress.
		need: usize,
		/// Contiguous bytes currently available.
		have: usize,
	},

	/// The handshake message is not a ClientHello.
	#[error("not a ClientHello (handshake type {0:#04x})")]
	NotClientHello(u8),

	/// The ClientHello violates the TLS structure.
	#[error("malformed ClientHello: {0}")]
	MalformedClientHello(&'static str),

	/// An internal invariant was violated.
	#[error("internal error: {0}")]
	Internal(&'static str),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The long header is truncated or structurally invalid.
	MalformedHeader,
	/// The packet is a long header packet of another type.
	NotInitialPacket,
	/// No Initial secrets are known for the packet's version.
	UnsupportedVersion,
	/// Payload authentication failed.
	DecryptionError,
	/// The decrypted payload is not a valid frame sequence.
	FrameParseError,
	/// The reassembly buffer refused a fragment.
	BufferOverflow,
	/// Need more data.
	Incomplete,
	/// The reassembled bytes are not a valid ClientHello.
	ParseError,
	/// Invariant violation inside the analyzer.
	Internal,
}

impl Error {
	/// Returns the kind this error is classified under.
	#[must_use]
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::BufferTooShort { .. }
			| Self::NotLongHeader
			| Self::InvalidFixedBit
			| Self::InvalidCidLength(_) => ErrorKind::MalformedHeader,
			Self::NotInitialPacket(_) => ErrorKind::NotInitialPacket,
			Self::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
			Self::DecryptionFailed(_) => ErrorKind::DecryptionError,
			Self::InvalidVarint | Self::TruncatedFrame { .. } | Self::UnknownFrameType(_) => {
				ErrorKind::FrameParseError
			}
			Self::BufferOverflow { .. } => ErrorKind::BufferOverflow,
			Self::Incomplete { .. } => ErrorKind::Incomplete,
			Self::NotClientHello(_) | Self::MalformedClientHello(_) => ErrorKind::ParseError,
			Self::Internal(_) => ErrorKind::Internal,
		}
	}
}

impl ErrorKind {
	/// Whether this kind describes bad input from the network, as opposed to
	/// a fault in the analyzer itself.
	#[must_use]
	pub fn is_invalid_input(self) -> bool {
		self != Self::Internal
	}
}
