/* src/session.rs */

use tracing::Span;

use crate::analyzer::{
	Direction, FeedResult, PropMap, PropUpdate, PropValue, REQ_PROP_KEY, UdpAnalyzer, UdpInfo,
	UdpStream,
};
use crate::client_hello::{ClientHello, parse_client_hello};
use crate::error::{Error, ErrorKind};
use crate::frame::walk_frames;
use crate::packet::decode_initial;
use crate::reassembly::{DEFAULT_CAPACITY, ReassemblyBuffer};

/// Invalid datagrams tolerated on one flow before it is given up.
pub const DEFAULT_INVALID_THRESHOLD: u32 = 4;

/// Tunables shared by every flow an analyzer creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
	/// The flow is exhausted once this many datagrams were invalid.
	pub invalid_threshold: u32,
	/// Bound on buffered CRYPTO stream bytes per flow.
	pub buffer_capacity: usize,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			invalid_threshold: DEFAULT_INVALID_THRESHOLD,
			buffer_capacity: DEFAULT_CAPACITY,
		}
	}
}

/// Lifecycle of a [`FlowSession`]. Both non-`Active` states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
	/// Still waiting for a complete ClientHello.
	#[default]
	Active,
	/// A ClientHello was extracted and published.
	Completed,
	/// Too many invalid datagrams, or an internal fault.
	Exhausted,
}

impl SessionState {
	/// Whether no further datagram can change the session.
	#[must_use]
	pub fn is_terminal(self) -> bool {
		self != Self::Active
	}
}

/// ClientHello extraction state for one client-to-server QUIC flow.
///
/// Each datagram is decoded on its own; only the CRYPTO stream reassembly
/// carries over between calls. Datagrams must be fed in arrival order and
/// never concurrently.
#[derive(Debug)]
pub struct FlowSession {
	state: SessionState,
	invalid_count: u32,
	invalid_threshold: u32,
	buffer: ReassemblyBuffer,
	span: Span,
}

impl Default for FlowSession {
	fn default() -> Self {
		Self::new()
	}
}

impl FlowSession {
	/// A session with the default configuration and no tracing span.
	#[must_use]
	pub fn new() -> Self {
		Self::with_config(SessionConfig::default(), Span::none())
	}

	/// A session using `config`, recording its diagnostics inside `span`.
	#[must_use]
	pub fn with_config(config: SessionConfig, span: Span) -> Self {
		Self {
			state: SessionState::Active,
			invalid_count: 0,
			invalid_threshold: config.invalid_threshold,
			buffer: ReassemblyBuffer::new(config.buffer_capacity),
			span,
		}
	}

	/// Current lifecycle state.
	#[must_use]
	pub fn state(&self) -> SessionState {
		self.state
	}

	/// Number of datagrams counted as invalid so far.
	#[must_use]
	pub fn invalid_count(&self) -> u32 {
		self.invalid_count
	}

	/// The CRYPTO stream reassembly buffer.
	#[must_use]
	pub fn buffer(&self) -> &ReassemblyBuffer {
		&self.buffer
	}

	/// Feed one datagram of the flow.
	///
	/// Returns an update exactly once, on the datagram that completes the
	/// ClientHello. Once the session is terminal every call is a no-op that
	/// reports `done`.
	pub fn feed(&mut self, direction: Direction, data: &[u8]) -> FeedResult {
		let span = self.span.clone();
		let _entered = span.enter();

		if self.state.is_terminal() {
			return FeedResult {
				update: None,
				done: true,
			};
		}

		if direction == Direction::Server {
			tracing::debug!(len = data.len(), "server-direction datagram is not analyzed");
			return self.count_invalid();
		}

		let outcome = self.process(data);
		self.settle(outcome)
	}

	/// The host is discarding the flow. Partial results are never reported.
	pub fn close(&mut self, limited: bool) -> Option<PropUpdate> {
		let _entered = self.span.enter();
		tracing::debug!(
			limited,
			state = ?self.state,
			invalid_count = self.invalid_count,
			buffered = self.buffer.retained(),
			"flow closed"
		);
		None
	}

	fn process(&mut self, data: &[u8]) -> Result<ClientHello, Error> {
		let packet = decode_initial(data)?;
		let walk = walk_frames(&packet.payload);

		// Fragments found before a bad frame are still buffered, and the first
		// failure is what gets reported if no ClientHello comes out of it.
		let mut first_error = walk.error;
		for frame in &walk.frames {
			if let Err(err) = self.buffer.insert(frame.offset, &frame.data) {
				if err.kind() == ErrorKind::Internal {
					return Err(err);
				}
				tracing::trace!(offset = frame.offset, error = %err, "CRYPTO fragment rejected");
				first_error.get_or_insert(err);
			}
		}

		match parse_client_hello(self.buffer.contiguous_prefix()) {
			Ok(hello) => Ok(hello),
			Err(err) if err.kind() == ErrorKind::Internal => Err(err),
			Err(err) => Err(first_error.unwrap_or(err)),
		}
	}

	fn settle(&mut self, outcome: Result<ClientHello, Error>) -> FeedResult {
		match outcome {
			Ok(hello) => {
				tracing::debug!(
					sni = hello.server_name(),
					alpn = ?hello.alpn_protocols(),
					cipher_suites = hello.cipher_suites().len(),
					"ClientHello extracted"
				);
				self.state = SessionState::Completed;

				let mut props = PropMap::new();
				props.insert(
					REQ_PROP_KEY.to_owned(),
					PropValue::ClientHello(Box::new(hello)),
				);
				FeedResult {
					update: Some(PropUpdate::Merge(props)),
					done: true,
				}
			}
			Err(err) if !err.kind().is_invalid_input() => {
				tracing::error!(error = %err, "internal fault, abandoning flow");
				self.state = SessionState::Exhausted;
				FeedResult {
					update: None,
					done: true,
				}
			}
			Err(err) => {
				tracing::debug!(kind = ?err.kind(), error = %err, "invalid client datagram");
				self.count_invalid()
			}
		}
	}

	fn count_invalid(&mut self) -> FeedResult {
		self.invalid_count = self.invalid_count.saturating_add(1);
		if self.invalid_count >= self.invalid_threshold {
			tracing::debug!(
				invalid_count = self.invalid_count,
				"too many invalid datagrams, giving up on flow"
			);
			self.state = SessionState::Exhausted;
		}
		FeedResult {
			update: None,
			done: self.state.is_terminal(),
		}
	}
}

impl UdpStream for FlowSession {
	fn feed(&mut self, direction: Direction, data: &[u8]) -> FeedResult {
		FlowSession::feed(self, direction, data)
	}

	fn close(&mut self, limited: bool) -> Option<PropUpdate> {
		FlowSession::close(self, limited)
	}
}

/// Extracts the TLS ClientHello from the Initial packets of QUIC flows.
#[derive(Debug, Clone, Default)]
pub struct QuicAnalyzer {
	config: SessionConfig,
}

impl QuicAnalyzer {
	/// An analyzer with the default [`SessionConfig`].
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// An analyzer whose flows use `config`.
	#[must_use]
	pub fn with_config(config: SessionConfig) -> Self {
		Self { config }
	}

	/// Create a concrete [`FlowSession`] for a new flow.
	#[must_use]
	pub fn new_session(&self, info: UdpInfo) -> FlowSession {
		let span = tracing::debug_span!("quic_flow", src = %info.src, dst = %info.dst);
		FlowSession::with_config(self.config, span)
	}
}

impl UdpAnalyzer for QuicAnalyzer {
	fn name(&self) -> &'static str {
		"quic"
	}

	fn limit(&self) -> usize {
		0
	}

	fn new_udp(&self, info: UdpInfo) -> Box<dyn UdpStream> {
		Box::new(self.new_session(info))
	}
}
