/* src/analyzer.rs */

//! Host-facing analyzer interface.
//!
//! A host (flow tracker) owns one [`UdpAnalyzer`] per protocol and asks it
//! for a fresh [`UdpStream`] for every new UDP flow. Datagrams are then fed
//! in arrival order until the stream reports `done`.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::client_hello::ClientHello;

/// Property key under which the extracted ClientHello is published.
pub const REQ_PROP_KEY: &str = "req";

/// Which endpoint sent a datagram, as decided by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
	/// Sent by the endpoint that opened the flow.
	Client,
	/// Sent by the other endpoint.
	Server,
}

/// Addressing of a flow, supplied by the host when the flow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UdpInfo {
	/// Client address.
	pub src: SocketAddr,
	/// Server address.
	pub dst: SocketAddr,
}

/// A value published into the host's property map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
#[non_exhaustive]
pub enum PropValue {
	/// A parsed TLS ClientHello.
	ClientHello(Box<ClientHello>),
}

/// Properties keyed by name.
pub type PropMap = BTreeMap<String, PropValue>;

/// A change to the host's per-connection property map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub enum PropUpdate {
	/// Merge these entries over the existing map.
	Merge(PropMap),
}

impl PropUpdate {
	/// The ClientHello carried under [`REQ_PROP_KEY`], if any.
	#[must_use]
	pub fn client_hello(&self) -> Option<&ClientHello> {
		match self {
			Self::Merge(map) => match map.get(REQ_PROP_KEY) {
				Some(PropValue::ClientHello(hello)) => Some(&**hello),
				None => None,
			},
		}
	}
}

/// Outcome of feeding one datagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedResult {
	/// Property change to apply, if any.
	pub update: Option<PropUpdate>,
	/// The stream wants no more datagrams.
	pub done: bool,
}

/// Per-flow analysis state for one UDP flow.
pub trait UdpStream: Send {
	/// Process one datagram of the flow.
	fn feed(&mut self, direction: Direction, data: &[u8]) -> FeedResult;

	/// The host is discarding the flow. `limited` is set when the close was
	/// forced by a resource limit.
	fn close(&mut self, limited: bool) -> Option<PropUpdate>;
}

/// Factory for [`UdpStream`]s of one protocol.
pub trait UdpAnalyzer: Send + Sync {
	/// Protocol name, used as the namespace for published properties.
	fn name(&self) -> &'static str;

	/// Byte limit the host should apply per flow; zero means no limit.
	fn limit(&self) -> usize;

	/// Create the stream state for a new flow.
	fn new_udp(&self, info: UdpInfo) -> Box<dyn UdpStream>;
}
