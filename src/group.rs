// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

//! Group capability: the Ristretto group, its canonical encodings,
//! and the hash domains the protocols derive scalars and points from.
//!
//! Ristretto has prime order `q`, so no clamping or cofactor handling
//! is needed.  Every scalar derived from a hash is reduced from 64 bytes
//! of SHA-512 output, and every hashed point comes from
//! `RistrettoPoint::from_uniform_bytes`, so nobody knows its discrete
//! logarithm with respect to `B`.

use alloc::vec::Vec;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{Identity, IsIdentity};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};

use crate::errors::{DagaError, DagaResult};

/// The length of a compressed Ristretto point in bytes.
pub const POINT_LENGTH: usize = 32;

/// The length of a canonical scalar in bytes.
pub const SCALAR_LENGTH: usize = 32;

/// Domain of the per-client generators `H_i`.
pub const GENERATOR_DOMAIN: &[u8] = b"daga-generator";
/// Domain of the client/server shared secrets `s_j`.
pub const SHARED_SECRET_DOMAIN: &[u8] = b"daga-shared-secret";
/// Domain of authentication context identifiers.
pub const CONTEXT_ID_DOMAIN: &[u8] = b"daga-context-id";
/// Domain of the second Pedersen base used by VSS.
pub const VSS_BASE_DOMAIN: &[u8] = b"daga-vss-pedersen-base";
/// Domain of VSS session identifiers.
pub const VSS_SESSION_DOMAIN: &[u8] = b"daga-vss-session";

const MAX_ZERO_REHASH: u32 = 8;

/// The group generator `B`.
#[inline(always)]
pub fn base() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// The group identity, which the tag chain uses to signal rejection.
#[inline(always)]
pub fn identity() -> RistrettoPoint {
    RistrettoPoint::identity()
}

/// Sample a uniformly random scalar.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    Scalar::random(rng)
}

/// Sample a uniformly random non-zero scalar.
pub fn random_nonzero_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    loop {
        let s = Scalar::random(rng);
        if s != Scalar::ZERO {
            return s;
        }
    }
}

/// Canonical encoding of a point.
#[inline]
pub fn encode_point(point: &RistrettoPoint) -> [u8; POINT_LENGTH] {
    point.compress().to_bytes()
}

/// Decode a canonical point, failing on malformed or non-canonical bytes.
pub fn decode_point(bytes: &[u8]) -> DagaResult<RistrettoPoint> {
    if bytes.len() != POINT_LENGTH {
        return Err(DagaError::BytesLength { name: "RistrettoPoint", length: POINT_LENGTH });
    }
    let mut buf = [0u8; POINT_LENGTH];
    buf.copy_from_slice(bytes);
    CompressedRistretto(buf)
        .decompress()
        .ok_or(DagaError::InvalidEncoding("Ristretto point"))
}

/// Decode a canonical scalar, rejecting unreduced encodings.
pub fn decode_scalar(bytes: &[u8]) -> DagaResult<Scalar> {
    if bytes.len() != SCALAR_LENGTH {
        return Err(DagaError::BytesLength { name: "Scalar", length: SCALAR_LENGTH });
    }
    let mut buf = [0u8; SCALAR_LENGTH];
    buf.copy_from_slice(bytes);
    Option::<Scalar>::from(Scalar::from_canonical_bytes(buf))
        .ok_or(DagaError::InvalidEncoding("scalar"))
}

/// Reject the identity, which no public key, commitment, or generator
/// may take.
pub fn ensure_not_identity(point: &RistrettoPoint, what: &'static str) -> DagaResult<()> {
    if point.is_identity() {
        return Err(DagaError::InvalidInput(what));
    }
    Ok(())
}

fn domain_hasher(domain: &[u8], parts: &[&[u8]]) -> Sha512 {
    let mut h = Sha512::new();
    h.update((domain.len() as u32).to_be_bytes());
    h.update(domain);
    for part in parts {
        h.update((part.len() as u32).to_be_bytes());
        h.update(part);
    }
    h
}

/// Domain separated SHA-512 returning raw bytes, aka `hash2`.
pub fn hash_bytes(domain: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&domain_hasher(domain, parts).finalize());
    out
}

/// Domain separated hash into the scalar field, reduced mod `q`.
pub fn hash_to_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(&hash_bytes(domain, parts))
}

/// Domain separated hash into the non-zero scalars.
///
/// A zero output is re-hashed with a counter.  Repeated zeros mean the
/// hash is broken, so we panic rather than hand out an unusable secret.
pub fn hash_to_nonzero_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    let mut s = hash_to_scalar(domain, parts);
    let mut counter = 0u32;
    while s == Scalar::ZERO {
        counter += 1;
        if counter > MAX_ZERO_REHASH {
            panic!("SHA-512 produced zero scalars repeatedly");
        }
        let mut h = domain_hasher(domain, parts);
        h.update(counter.to_be_bytes());
        let mut out = [0u8; 64];
        out.copy_from_slice(&h.finalize());
        s = Scalar::from_bytes_mod_order_wide(&out);
    }
    s
}

/// Domain separated hash onto the group with unknown discrete logarithm.
pub fn hash_to_point(domain: &[u8], parts: &[&[u8]]) -> RistrettoPoint {
    RistrettoPoint::from_uniform_bytes(&hash_bytes(domain, parts))
}

/// Encode a slice of points as their fixed-length concatenation.
pub fn encode_points(points: &[RistrettoPoint]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(points.len() * POINT_LENGTH);
    for p in points {
        bytes.extend_from_slice(&encode_point(p));
    }
    bytes
}

/// Cursor over fixed-length wire encodings.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> ByteReader<'a> {
        ByteReader { bytes, cursor: 0 }
    }

    pub(crate) fn take(&mut self, len: usize, name: &'static str) -> DagaResult<&'a [u8]> {
        let end = self.cursor.checked_add(len).ok_or(DagaError::InvalidInput(name))?;
        if end > self.bytes.len() {
            return Err(DagaError::BytesLength { name, length: end });
        }
        let out = &self.bytes[self.cursor..end];
        self.cursor = end;
        Ok(out)
    }

    pub(crate) fn point(&mut self) -> DagaResult<RistrettoPoint> {
        decode_point(self.take(POINT_LENGTH, "RistrettoPoint")?)
    }

    pub(crate) fn points(&mut self, count: usize) -> DagaResult<Vec<RistrettoPoint>> {
        (0..count).map(|_| self.point()).collect()
    }

    pub(crate) fn scalar(&mut self) -> DagaResult<Scalar> {
        decode_scalar(self.take(SCALAR_LENGTH, "Scalar")?)
    }

    pub(crate) fn scalars(&mut self, count: usize) -> DagaResult<Vec<Scalar>> {
        (0..count).map(|_| self.scalar()).collect()
    }

    pub(crate) fn u32(&mut self) -> DagaResult<u32> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u8(&mut self) -> DagaResult<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    /// Fail unless every byte was consumed.
    pub(crate) fn finish(self, name: &'static str) -> DagaResult<()> {
        if self.cursor != self.bytes.len() {
            return Err(DagaError::BytesLength { name, length: self.cursor });
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn point_encoding_rejects_garbage() {
        let p = base() * random_scalar(&mut OsRng);
        assert_eq!(decode_point(&encode_point(&p)).unwrap(), p);

        let mut bad = encode_point(&p);
        bad[31] |= 0x80;
        assert_eq!(decode_point(&bad), Err(DagaError::InvalidEncoding("Ristretto point")));
        assert!(matches!(decode_point(&bad[..31]), Err(DagaError::BytesLength { .. })));
    }

    #[test]
    fn scalar_encoding_rejects_unreduced() {
        assert_eq!(decode_scalar(&[0xffu8; 32]), Err(DagaError::InvalidEncoding("scalar")));
        let s = random_scalar(&mut OsRng);
        assert_eq!(decode_scalar(s.as_bytes()).unwrap(), s);
    }

    #[test]
    fn hash_domains_are_separated() {
        let msg: &[u8] = b"same input";
        assert_ne!(
            hash_to_scalar(GENERATOR_DOMAIN, &[msg]),
            hash_to_scalar(SHARED_SECRET_DOMAIN, &[msg]),
        );
        // Part boundaries are bound too.
        assert_ne!(
            hash_to_scalar(GENERATOR_DOMAIN, &[b"ab", b"c"]),
            hash_to_scalar(GENERATOR_DOMAIN, &[b"a", b"bc"]),
        );
        assert_eq!(
            hash_to_point(VSS_BASE_DOMAIN, &[msg]),
            hash_to_point(VSS_BASE_DOMAIN, &[msg]),
        );
        assert_ne!(hash_to_nonzero_scalar(SHARED_SECRET_DOMAIN, &[msg]), Scalar::ZERO);
    }

    #[test]
    fn reader_tracks_lengths() {
        let p = base();
        let mut bytes = encode_point(&p).to_vec();
        bytes.extend_from_slice(&7u32.to_be_bytes());
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.point().unwrap(), p);
        assert_eq!(r.remaining(), 4);
        assert_eq!(r.u32().unwrap(), 7);
        assert!(r.u8().is_err());
        r.finish("test").unwrap();
    }
}
