/* src/reader.rs */

use crate::error::Error;

/// Decode a QUIC variable-length integer from the start of `buf`.
///
/// Returns the decoded value and the number of bytes consumed (1, 2, 4, or 8).
/// The encoding is defined in RFC 9000 Section 16.
///
/// # Errors
///
/// Returns [`Error::InvalidVarint`] when `buf` is empty or too short for the
/// indicated encoding length.
#[must_use = "returns the decoded value without modifying the buffer"]
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), Error> {
	let &first = buf.first().ok_or(Error::InvalidVarint)?;
	let len = 1usize << (first >> 6);
	let bytes = buf.get(1..len).ok_or(Error::InvalidVarint)?;

	let val = bytes
		.iter()
		.fold(u64::from(first & 0x3f), |acc, &b| (acc << 8) | u64::from(b));
	Ok((val, len))
}

/// Forward-only cursor over a borrowed byte slice.
///
/// Every read is bounds checked. A failed read yields `None` and leaves the
/// position untouched, so callers map truncation onto whichever error suits
/// their layer.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> Reader<'a> {
	pub(crate) fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	pub(crate) fn position(&self) -> usize {
		self.pos
	}

	pub(crate) fn remaining(&self) -> usize {
		self.buf.len() - self.pos
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.remaining() == 0
	}

	/// Everything not yet consumed, without advancing.
	pub(crate) fn rest(&self) -> &'a [u8] {
		&self.buf[self.pos..]
	}

	pub(crate) fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
		let end = self.pos.checked_add(len)?;
		let out = self.buf.get(self.pos..end)?;
		self.pos = end;
		Some(out)
	}

	pub(crate) fn skip(&mut self, len: usize) -> Option<()> {
		self.bytes(len).map(|_| ())
	}

	pub(crate) fn u8(&mut self) -> Option<u8> {
		self.bytes(1).map(|b| b[0])
	}

	pub(crate) fn u16(&mut self) -> Option<u16> {
		self.bytes(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
	}

	pub(crate) fn u24(&mut self) -> Option<u32> {
		self.bytes(3).map(|b| u32::from_be_bytes([0, b[0], b[1], b[2]]))
	}

	pub(crate) fn u32(&mut self) -> Option<u32> {
		self.bytes(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
	}

	pub(crate) fn varint(&mut self) -> Option<u64> {
		let (val, len) = read_varint(self.rest()).ok()?;
		self.pos += len;
		Some(val)
	}

	/// A varint length followed by that many bytes.
	pub(crate) fn varint_prefixed(&mut self) -> Option<&'a [u8]> {
		let start = self.pos;
		let len = self.varint().and_then(|len| usize::try_from(len).ok());
		match len.and_then(|len| self.bytes(len)) {
			Some(out) => Some(out),
			None => {
				self.pos = start;
				None
			}
		}
	}

	/// A one-byte length followed by that many bytes.
	pub(crate) fn u8_prefixed(&mut self) -> Option<&'a [u8]> {
		let start = self.pos;
		let len = self.u8()?;
		self.bytes(usize::from(len)).or_else(|| {
			self.pos = start;
			None
		})
	}

	/// A two-byte length followed by that many bytes.
	pub(crate) fn u16_prefixed(&mut self) -> Option<&'a [u8]> {
		let start = self.pos;
		let len = self.u16()?;
		self.bytes(usize::from(len)).or_else(|| {
			self.pos = start;
			None
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failed_prefixed_read_keeps_position() {
		let mut r = Reader::new(&[0x00, 0x05, 0xaa, 0xbb]);
		assert!(r.u16_prefixed().is_none());
		assert_eq!(r.position(), 0);
		assert_eq!(r.u16(), Some(5));
	}

	#[test]
	fn u24_reads_big_endian() {
		let mut r = Reader::new(&[0x01, 0x02, 0x03, 0xff]);
		assert_eq!(r.u24(), Some(0x0001_0203));
		assert_eq!(r.remaining(), 1);
	}

	#[test]
	fn varint_prefixed_rewinds_on_short_body() {
		let mut r = Reader::new(&[0x04, 0xaa]);
		assert!(r.varint_prefixed().is_none());
		assert_eq!(r.position(), 0);
	}
}
