/* src/lib.rs */

//! Passive extraction of TLS ClientHello metadata from QUIC Initial packets.
//!
//! An on-path observer can read the ClientHello a QUIC client sends, because
//! Initial packets are protected with keys derived from the public
//! Destination Connection ID. This crate performs that derivation, removes
//! header protection, opens the payload, walks its frames, reassembles the
//! CRYPTO stream across datagrams and parses the ClientHello (server name,
//! ALPN, cipher suites, extensions). It never sends anything.
//!
//! **Parsing** (always available): long header parsing, the frame walker,
//! the CRYPTO [`ReassemblyBuffer`] and the [`parse_client_hello`] parser.
//!
//! **Decryption and flows** (requires the `ring` or `aws-lc-rs` feature):
//! [`InitialKeys`] derivation for QUIC v1 and v2, [`decode_initial`], and the
//! per-flow [`FlowSession`] state machine behind [`QuicAnalyzer`].
//!
//! ```no_run
//! # #[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
//! # fn demo(datagram: &[u8]) {
//! use quic_sniff::{Direction, FlowSession};
//!
//! let mut flow = FlowSession::new();
//! let result = flow.feed(Direction::Client, datagram);
//! if let Some(hello) = result.update.as_ref().and_then(|u| u.client_hello()) {
//! 	println!("SNI: {:?}", hello.server_name());
//! }
//! # }
//! ```

#[cfg(all(feature = "ring", feature = "aws-lc-rs"))]
compile_error!(
	"features `ring` and `aws-lc-rs` are mutually exclusive; enable only one crypto backend"
);

mod analyzer;
mod client_hello;
mod error;
mod frame;
mod header;
mod reader;
mod reassembly;

#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
mod crypto;

#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
mod packet;

#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
mod session;

pub use analyzer::{
	Direction, FeedResult, PropMap, PropUpdate, PropValue, REQ_PROP_KEY, UdpAnalyzer, UdpInfo,
	UdpStream,
};
pub use client_hello::{
	ClientHello, Extension, HANDSHAKE_CLIENT_HELLO, KeyShareEntry, MIN_CLIENT_HELLO_LEN, ext,
	parse_client_hello,
};
pub use error::{Error, ErrorKind};
pub use frame::{CryptoFrame, FrameWalk, parse_crypto_frames, walk_frames};
pub use header::{InitialHeader, QUIC_V1, QUIC_V2, initial_type_bits, parse_initial};
pub use reader::read_varint;
pub use reassembly::{DEFAULT_CAPACITY, ReassemblyBuffer};

#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
pub use crypto::{InitialKeys, is_supported_version};

#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
pub use packet::{DecodedInitial, decode_initial, decrypt_initial};

#[cfg(any(feature = "ring", feature = "aws-lc-rs"))]
pub use session::{
	DEFAULT_INVALID_THRESHOLD, FlowSession, QuicAnalyzer, SessionConfig, SessionState,
};
