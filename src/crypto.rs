/* src/crypto.rs */

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};

use crate::error::Error;
use crate::header::{QUIC_V1, QUIC_V2};

const INITIAL_SALT_V1: [u8; 20] = [
	0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8, 0x0c, 0xad,
	0xcc, 0xbb, 0x7f, 0x0a,
];

const INITIAL_SALT_V2: [u8; 20] = [
	0x0d, 0xed, 0xe3, 0xde, 0xf7, 0x00, 0xa6, 0xdb, 0x81, 0x93, 0x81, 0xbe, 0x6e, 0x26, 0x9d, 0xcb,
	0xf9, 0xbd, 0x2e, 0xd9,
];

/// Length of the sample taken from the protected payload for the
/// header-protection mask.
pub(crate) const HP_SAMPLE_LEN: usize = 16;

struct VersionParams {
	salt: &'static [u8; 20],
	key_label: &'static [u8],
	iv_label: &'static [u8],
	hp_label: &'static [u8],
}

fn version_params(version: u32) -> Result<VersionParams, Error> {
	match version {
		QUIC_V1 => Ok(VersionParams {
			salt: &INITIAL_SALT_V1,
			key_label: b"quic key",
			iv_label: b"quic iv",
			hp_label: b"quic hp",
		}),
		QUIC_V2 => Ok(VersionParams {
			salt: &INITIAL_SALT_V2,
			key_label: b"quicv2 key",
			iv_label: b"quicv2 iv",
			hp_label: b"quicv2 hp",
		}),
		_ => Err(Error::UnsupportedVersion(version)),
	}
}

/// Whether Initial secrets can be derived for `version`.
#[must_use]
pub fn is_supported_version(version: u32) -> bool {
	version_params(version).is_ok()
}

/// Client Initial secrets for one connection, derived from the Destination
/// Connection ID of the client's first Initial packet (RFC 9001 Section 5.2).
///
/// Nothing here is secret from an on-path observer; the keys only bind the
/// packet to the connection ID.
#[derive(Clone, PartialEq, Eq)]
pub struct InitialKeys {
	/// `client_initial_secret`.
	pub secret: [u8; 32],
	/// AES-128-GCM packet-protection key.
	pub key: [u8; 16],
	/// AEAD IV; XOR-ed with the packet number to form the nonce.
	pub iv: [u8; 12],
	/// AES-128 header-protection key.
	pub hp: [u8; 16],
}

impl std::fmt::Debug for InitialKeys {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InitialKeys").finish_non_exhaustive()
	}
}

impl InitialKeys {
	/// Derive the client Initial keys for `version` and `dcid` using
	/// HKDF-SHA256 extract-then-expand.
	///
	/// # Errors
	///
	/// Returns [`Error::UnsupportedVersion`] if the version is not v1 or v2.
	/// Returns [`Error::DecryptionFailed`] if a backend HKDF call fails.
	pub fn derive(version: u32, dcid: &[u8]) -> Result<Self, Error> {
		let params = version_params(version)?;

		let mut secret = [0u8; 32];
		backend::derive_client_initial_secret(params.salt, dcid, &mut secret)?;

		let mut key = [0u8; 16];
		let mut iv = [0u8; 12];
		let mut hp = [0u8; 16];
		backend::hkdf_expand_label(&secret, params.key_label, &mut key)?;
		backend::hkdf_expand_label(&secret, params.iv_label, &mut iv)?;
		backend::hkdf_expand_label(&secret, params.hp_label, &mut hp)?;

		Ok(Self {
			secret,
			key,
			iv,
			hp,
		})
	}

	/// Compute the 5-byte header-protection mask from a payload sample.
	///
	/// # Errors
	///
	/// Returns [`Error::BufferTooShort`] if `sample` has fewer than 16 bytes.
	pub fn header_protection_mask(&self, sample: &[u8]) -> Result<[u8; 5], Error> {
		let sample = sample.get(..HP_SAMPLE_LEN).ok_or(Error::BufferTooShort {
			need: HP_SAMPLE_LEN,
			have: sample.len(),
		})?;

		let cipher = Aes128::new(GenericArray::from_slice(&self.hp));
		let mut block = GenericArray::clone_from_slice(sample);
		cipher.encrypt_block(&mut block);

		let mut mask = [0u8; 5];
		mask.copy_from_slice(&block[..5]);
		Ok(mask)
	}

	/// AEAD nonce for `packet_number`: the IV with the packet number XOR-ed
	/// into its low-order bytes.
	#[must_use]
	pub fn nonce(&self, packet_number: u64) -> [u8; 12] {
		let mut nonce = self.iv;
		for (n, p) in nonce[4..].iter_mut().zip(packet_number.to_be_bytes()) {
			*n ^= p;
		}
		nonce
	}

	/// Open an AES-128-GCM protected payload (ciphertext followed by the
	/// 16-byte tag).
	///
	/// # Errors
	///
	/// Returns [`Error::DecryptionFailed`] on authentication failure.
	pub fn open(&self, packet_number: u64, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
		backend::aead_open(&self.key, &self.nonce(packet_number), aad, ciphertext)
	}
}

fn build_hkdf_label(label: &[u8], context: &[u8], len: usize) -> Result<Vec<u8>, Error> {
	let full_label_len = 6 + label.len();
	let total = 2 + 1 + full_label_len + 1 + context.len();
	let mut out = Vec::with_capacity(total);
	let len_u16 =
		u16::try_from(len).map_err(|_| Error::DecryptionFailed("HKDF output length overflow".into()))?;
	let label_u8 = u8::try_from(full_label_len)
		.map_err(|_| Error::DecryptionFailed("HKDF label length overflow".into()))?;
	let ctx_u8 = u8::try_from(context.len())
		.map_err(|_| Error::DecryptionFailed("HKDF context length overflow".into()))?;
	out.extend_from_slice(&len_u16.to_be_bytes());
	out.push(label_u8);
	out.extend_from_slice(b"tls13 ");
	out.extend_from_slice(label);
	out.push(ctx_u8);
	out.extend_from_slice(context);
	Ok(out)
}

// ring and aws-lc-rs expose the same hkdf/aead API surface, so one body
// serves both backends.
macro_rules! backend_impl {
	($krate:ident) => {
		use crate::error::Error;
		use $krate::{aead, hkdf};

		struct HkdfLen(usize);

		impl hkdf::KeyType for HkdfLen {
			fn len(&self) -> usize {
				self.0
			}
		}

		pub(super) fn derive_client_initial_secret(
			salt: &[u8],
			dcid: &[u8],
			out: &mut [u8],
		) -> Result<(), Error> {
			let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, salt);
			let initial_secret = salt.extract(dcid);
			let label = super::build_hkdf_label(b"client in", &[], out.len())?;
			expand_prk(&initial_secret, &label, out)
		}

		pub(super) fn hkdf_expand_label(secret: &[u8], label: &[u8], out: &mut [u8]) -> Result<(), Error> {
			let prk = hkdf::Prk::new_less_safe(hkdf::HKDF_SHA256, secret);
			let info = super::build_hkdf_label(label, &[], out.len())?;
			expand_prk(&prk, &info, out)
		}

		fn expand_prk(prk: &hkdf::Prk, info: &[u8], out: &mut [u8]) -> Result<(), Error> {
			prk
				.expand(&[info], HkdfLen(out.len()))
				.and_then(|okm| okm.fill(out))
				.map_err(|_| Error::DecryptionFailed("HKDF expand failed".into()))
		}

		pub(super) fn aead_open(
			key: &[u8],
			nonce_bytes: &[u8; 12],
			aad: &[u8],
			ciphertext: &[u8],
		) -> Result<Vec<u8>, Error> {
			let unbound = aead::UnboundKey::new(&aead::AES_128_GCM, key)
				.map_err(|_| Error::DecryptionFailed("invalid AES-GCM key".into()))?;
			let opening_key = aead::LessSafeKey::new(unbound);
			let nonce = aead::Nonce::assume_unique_for_key(*nonce_bytes);
			let mut buf = ciphertext.to_vec();
			let plaintext_len = opening_key
				.open_in_place(nonce, aead::Aad::from(aad), &mut buf)
				.map_err(|_| Error::DecryptionFailed("AEAD decryption failed".into()))?
				.len();
			buf.truncate(plaintext_len);
			Ok(buf)
		}
	};
}

#[cfg(feature = "ring")]
mod backend {
	backend_impl!(ring);
}

#[cfg(feature = "aws-lc-rs")]
mod backend {
	backend_impl!(aws_lc_rs);
}
