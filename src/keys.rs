// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Isis Agora Lovecruft <isis@patternsinthevoid.net>
// - Jeff Burdges <jeff@web3.foundation>

//! Long-term Ristretto key pairs held by clients, servers, VSS dealers,
//! and VSS verifiers.

use core::cmp::Ordering;
use core::fmt::Debug;
use core::hash::{Hash, Hasher};

use arrayref::{array_ref, array_refs};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{DagaError, DagaResult};
use crate::group::{self, POINT_LENGTH, SCALAR_LENGTH};

/// The length of a `PublicKey`, in bytes.
pub const PUBLIC_KEY_LENGTH: usize = POINT_LENGTH;

const SECRET_KEY_KEY_LENGTH: usize = SCALAR_LENGTH;

const SECRET_KEY_NONCE_LENGTH: usize = 32;

/// The length of a `SecretKey`, in bytes.
pub const SECRET_KEY_LENGTH: usize = SECRET_KEY_KEY_LENGTH + SECRET_KEY_NONCE_LENGTH;

/// The length of a `Keypair`, in bytes.
pub const KEYPAIR_LENGTH: usize = SECRET_KEY_LENGTH + PUBLIC_KEY_LENGTH;

/// A secret key: a scalar plus a seed for signing nonces.
///
/// Secret key material is overwritten with zeros when it goes out of scope.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    /// Actual secret key represented as a scalar.
    pub(crate) key: Scalar,
    /// Seed for deriving the nonces used in signing.
    ///
    /// We require this be random and secret or else key compromise attacks will ensue.
    pub(crate) nonce: [u8; SECRET_KEY_NONCE_LENGTH],
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "SecretKey {{ key: .. nonce: .. }}")
    }
}

impl Eq for SecretKey {}
impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).unwrap_u8() == 1u8
    }
}
impl ConstantTimeEq for SecretKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.key.ct_eq(&other.key)
    }
}

impl SecretKey {
    /// Convert this `SecretKey` into an array of 64 bytes, the scalar
    /// followed by the nonce seed.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        let mut bytes: [u8; SECRET_KEY_LENGTH] = [0u8; SECRET_KEY_LENGTH];
        bytes[..SECRET_KEY_KEY_LENGTH].copy_from_slice(self.key.as_bytes());
        bytes[SECRET_KEY_KEY_LENGTH..].copy_from_slice(&self.nonce);
        bytes
    }

    /// Construct a `SecretKey` from a slice of bytes.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<SecretKey> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(DagaError::BytesLength { name: "SecretKey", length: SECRET_KEY_LENGTH });
        }
        let bytes = array_ref![bytes, 0, SECRET_KEY_LENGTH];
        let (key, nonce) = array_refs![bytes, SECRET_KEY_KEY_LENGTH, SECRET_KEY_NONCE_LENGTH];
        let key = group::decode_scalar(key)?;
        Ok(SecretKey { key, nonce: *nonce })
    }

    /// Generate a `SecretKey` from a `csprng`.
    pub fn generate_with<R>(mut csprng: R) -> SecretKey
    where
        R: CryptoRng + RngCore,
    {
        let mut nonce: [u8; SECRET_KEY_NONCE_LENGTH] = [0u8; SECRET_KEY_NONCE_LENGTH];
        csprng.fill_bytes(&mut nonce);
        SecretKey { key: group::random_nonzero_scalar(&mut csprng), nonce }
    }

    /// Generate a `SecretKey` with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn generate() -> SecretKey {
        Self::generate_with(getrandom_or_panic::getrandom_or_panic())
    }

    /// Derive the `PublicKey` corresponding to this `SecretKey`.
    pub fn to_public(&self) -> PublicKey {
        PublicKey::from_point(group::base() * self.key)
    }

    /// The secret scalar.
    pub(crate) fn scalar(&self) -> &Scalar {
        &self.key
    }
}

/// A Ristretto public key, kept both compressed and decompressed.
#[derive(Copy, Clone)]
pub struct PublicKey {
    point: RistrettoPoint,
    compressed: CompressedRistretto,
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "PublicKey( {:?} )", self.compressed)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed
    }
}
impl Eq for PublicKey {}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &PublicKey) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compressed.as_bytes().cmp(other.compressed.as_bytes())
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.compressed.as_bytes().hash(state);
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.compressed.as_bytes()
    }
}

impl PublicKey {
    /// Access the compressed Ristretto form
    pub fn as_compressed(&self) -> &CompressedRistretto {
        &self.compressed
    }

    /// Access the point form
    pub fn as_point(&self) -> &RistrettoPoint {
        &self.point
    }

    /// Decompress into the `PublicKey` format that also retains the
    /// compressed form.
    pub fn from_compressed(compressed: CompressedRistretto) -> DagaResult<PublicKey> {
        let point = compressed.decompress().ok_or(DagaError::InvalidEncoding("PublicKey"))?;
        group::ensure_not_identity(&point, "identity public key")?;
        Ok(PublicKey { point, compressed })
    }

    /// Compress into the `PublicKey` format that also retains the
    /// uncompressed form.
    pub fn from_point(point: RistrettoPoint) -> PublicKey {
        PublicKey { point, compressed: point.compress() }
    }

    /// Convert this public key to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.compressed.to_bytes()
    }

    /// Construct a `PublicKey` from a slice of bytes, rejecting the identity.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<PublicKey> {
        let point = group::decode_point(bytes)?;
        group::ensure_not_identity(&point, "identity public key")?;
        Ok(PublicKey::from_point(point))
    }
}

impl From<&SecretKey> for PublicKey {
    fn from(source: &SecretKey) -> PublicKey {
        source.to_public()
    }
}

/// A secret key together with its public key.
#[derive(Clone, Debug)]
pub struct Keypair {
    /// The secret half of this keypair.
    pub secret: SecretKey,
    /// The public half of this keypair.
    pub public: PublicKey,
}

impl Zeroize for Keypair {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}

impl From<SecretKey> for Keypair {
    fn from(secret: SecretKey) -> Keypair {
        let public = secret.to_public();
        Keypair { secret, public }
    }
}

impl Keypair {
    /// Serialize `Keypair` to bytes: the secret key followed by the public key.
    pub fn to_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        let mut bytes: [u8; KEYPAIR_LENGTH] = [0u8; KEYPAIR_LENGTH];
        bytes[..SECRET_KEY_LENGTH].copy_from_slice(&self.secret.to_bytes());
        bytes[SECRET_KEY_LENGTH..].copy_from_slice(&self.public.to_bytes());
        bytes
    }

    /// Deserialize a `Keypair` from bytes, checking that both halves agree.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<Keypair> {
        if bytes.len() != KEYPAIR_LENGTH {
            return Err(DagaError::BytesLength { name: "Keypair", length: KEYPAIR_LENGTH });
        }
        let secret = SecretKey::from_bytes(&bytes[..SECRET_KEY_LENGTH])?;
        let public = PublicKey::from_bytes(&bytes[SECRET_KEY_LENGTH..])?;
        if secret.to_public() != public {
            return Err(DagaError::InvalidInput("keypair halves disagree"));
        }
        Ok(Keypair { secret, public })
    }

    /// Generate a Ristretto keypair from a `csprng`.
    pub fn generate_with<R>(csprng: R) -> Keypair
    where
        R: CryptoRng + RngCore,
    {
        Keypair::from(SecretKey::generate_with(csprng))
    }

    /// Generate a Ristretto keypair with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn generate() -> Keypair {
        Self::generate_with(getrandom_or_panic::getrandom_or_panic())
    }
}

serde_boilerplate!(SecretKey);
serde_boilerplate!(PublicKey);
serde_boilerplate!(Keypair);

#[cfg(test)]
mod test {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn debug_output_hides_secrets() {
        let keypair = Keypair::generate_with(OsRng);
        assert_eq!(format!("{:?}", keypair.secret), "SecretKey { key: .. nonce: .. }");
        assert!(format!("{:?}", keypair.public).starts_with("PublicKey( "));
        assert_eq!(
            format!("{}", crate::DagaError::DuplicateSignature(3)),
            "Signer 3 appears more than once",
        );
    }

    #[test]
    fn keypair_bytes_check_consistency() {
        let a = Keypair::generate_with(OsRng);
        let b = Keypair::generate_with(OsRng);

        let restored = Keypair::from_bytes(&a.to_bytes()).unwrap();
        assert_eq!(restored.secret, a.secret);
        assert_eq!(restored.public, a.public);

        let mut mixed = a.to_bytes();
        mixed[SECRET_KEY_LENGTH..].copy_from_slice(&b.public.to_bytes());
        assert_eq!(
            Keypair::from_bytes(&mixed).unwrap_err(),
            DagaError::InvalidInput("keypair halves disagree"),
        );
    }

    #[test]
    fn identity_public_key_is_rejected() {
        let identity = group::encode_point(&group::identity());
        assert!(PublicKey::from_bytes(&identity).is_err());
        assert!(PublicKey::from_compressed(CompressedRistretto(identity)).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_bincode_keypair() {
        let keypair = Keypair::generate_with(OsRng);
        let encoded = bincode::serialize(&keypair).unwrap();
        let decoded: Keypair = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded.public, keypair.public);
        assert_eq!(decoded.secret, keypair.secret);

        let json = serde_json::to_string(&keypair.public).unwrap();
        let public: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(public, keypair.public);
    }
}
