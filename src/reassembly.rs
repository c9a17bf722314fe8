/* src/reassembly.rs */

use std::collections::BTreeMap;

use crate::error::Error;

/// Default bound on the CRYPTO stream bytes kept per flow.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

/// Orders CRYPTO stream fragments by offset and exposes the contiguous prefix
/// starting at offset zero.
///
/// Stored ranges never overlap and never touch: an insert that meets or
/// overlaps existing ranges is merged with them into one entry. Bytes already
/// stored win over retransmitted bytes for the same offsets.
///
/// No range may end beyond `capacity`, so the retained byte count can never
/// exceed it either.
#[derive(Debug, Clone)]
pub struct ReassemblyBuffer {
	ranges: BTreeMap<u64, Vec<u8>>, // (start_offset, data)
	retained: usize,
	capacity: usize,
}

impl Default for ReassemblyBuffer {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

impl ReassemblyBuffer {
	/// Create an empty buffer holding at most `capacity` stream bytes.
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self {
			ranges: BTreeMap::new(),
			retained: 0,
			capacity,
		}
	}

	/// Configured capacity in bytes.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of stream bytes currently stored.
	#[must_use]
	pub fn retained(&self) -> usize {
		self.retained
	}

	/// Number of disjoint ranges currently stored.
	#[must_use]
	pub fn range_count(&self) -> usize {
		self.ranges.len()
	}

	/// Merge `data` at stream `offset` into the stored ranges.
	///
	/// Empty fragments are accepted and change nothing.
	///
	/// # Errors
	///
	/// Returns [`Error::BufferOverflow`] if the fragment ends past the capacity
	/// bound; the buffer is left unchanged. Returns [`Error::Internal`] if the
	/// stored ranges are found to be inconsistent.
	pub fn insert(&mut self, offset: u64, data: &[u8]) -> Result<(), Error> {
		if data.is_empty() {
			return Ok(());
		}

		let end = offset
			.checked_add(data.len() as u64)
			.filter(|&end| end <= self.capacity as u64)
			.ok_or(Error::BufferOverflow {
				end: offset.saturating_add(data.len() as u64),
				capacity: self.capacity,
			})?;

		// Ranges are disjoint and sorted, so walking back from `end` finds
		// every range that overlaps or touches [offset, end).
		let touching: Vec<u64> = self
			.ranges
			.range(..=end)
			.rev()
			.take_while(|&(&start, bytes)| start + bytes.len() as u64 >= offset)
			.map(|(&start, _)| start)
			.collect();

		let merged_start = touching.last().map_or(offset, |&s| s.min(offset));
		let merged_end = touching.first().map_or(end, |&s| {
			let last_end = s + self.ranges.get(&s).map_or(0, Vec::len) as u64;
			last_end.max(end)
		});

		let merged_len = to_usize(merged_end - merged_start)?;
		let dropped: usize = touching
			.iter()
			.filter_map(|start| self.ranges.get(start))
			.map(Vec::len)
			.sum();
		let retained = (self.retained + merged_len)
			.checked_sub(dropped)
			.ok_or(Error::Internal("reassembly byte count underflow"))?;
		if retained > self.capacity {
			return Err(Error::BufferOverflow {
				end: merged_end,
				capacity: self.capacity,
			});
		}

		let mut merged = vec![0u8; merged_len];
		let at = to_usize(offset - merged_start)?;
		merged[at..at + data.len()].copy_from_slice(data);
		for start in &touching {
			let bytes = self
				.ranges
				.remove(start)
				.ok_or(Error::Internal("reassembly range vanished"))?;
			let at = to_usize(start - merged_start)?;
			merged[at..at + bytes.len()].copy_from_slice(&bytes);
		}

		tracing::trace!(
			offset,
			len = data.len(),
			merged_start,
			merged_end,
			absorbed = touching.len(),
			"CRYPTO fragment buffered"
		);

		self.ranges.insert(merged_start, merged);
		self.retained = retained;
		Ok(())
	}

	/// Bytes from offset zero up to the first gap. Empty until offset zero has
	/// been received.
	#[must_use]
	pub fn contiguous_prefix(&self) -> &[u8] {
		self.ranges.get(&0).map(Vec::as_slice).unwrap_or_default()
	}

	/// Offsets of the stored ranges as half-open `(start, end)` pairs.
	pub fn ranges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
		self
			.ranges
			.iter()
			.map(|(&start, bytes)| (start, start + bytes.len() as u64))
	}
}

fn to_usize(n: u64) -> Result<usize, Error> {
	usize::try_from(n).map_err(|_| Error::Internal("reassembly offset exceeds usize"))
}
