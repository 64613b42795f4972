// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

//! ### Schnorr signature creation and verification, including batch verification.
//!
//! Signatures are `(R, s)` with `R = k B`, `e = H(pk, R, msg)`, and
//! `s = k - e x`.  Verifiers check `R == s B + e A`.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::once;

use arrayref::{array_ref, array_refs};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::{IsIdentity, VartimeMultiscalarMul};
use rand_core::{CryptoRng, RngCore};

use crate::errors::{DagaError, DagaResult};
use crate::group::{self, SCALAR_LENGTH};
use crate::keys::{Keypair, PublicKey, SecretKey};
use crate::transcript::{SigningContext, SigningTranscript};

/// The length of a Ristretto Schnorr `Signature`, in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// A Ristretto Schnorr signature "detached" from the signed message.
#[allow(non_snake_case)]
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Signature {
    /// `R` is the commitment to the signer's witness scalar `k`.
    pub(crate) R: CompressedRistretto,
    /// `s = k - e x` where `e` is the transcript challenge.
    pub(crate) s: Scalar,
}

impl Debug for Signature {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "Signature( R: {:?}, s: {:?} )", &self.R, &self.s)
    }
}

impl Signature {
    /// Convert this `Signature` to a byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes: [u8; SIGNATURE_LENGTH] = [0u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(&self.R.as_bytes()[..]);
        bytes[32..].copy_from_slice(&self.s.as_bytes()[..]);
        bytes
    }

    /// Construct a `Signature` from a slice of bytes.
    ///
    /// We only check that `s` is canonical here.  `R` gets decompressed
    /// during verification, where a bad point is merely a bad signature.
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<Signature> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(DagaError::BytesLength { name: "Signature", length: SIGNATURE_LENGTH });
        }
        let bytes = array_ref![bytes, 0, SIGNATURE_LENGTH];
        let (lower, upper) = array_refs![bytes, 32, SCALAR_LENGTH];
        let s = group::decode_scalar(upper)?;
        Ok(Signature { R: CompressedRistretto(*lower), s })
    }
}

serde_boilerplate!(Signature);

// === Implement signing and verification operations on key types === //

impl SecretKey {
    /// Sign a transcript with this `SecretKey`.
    ///
    /// Requires a `SigningTranscript`, normally created from a
    /// `SigningContext` and a message, as well as the public key
    /// corresponding to `self`.
    ///
    /// The nonce mixes fresh randomness with the transcript and our
    /// nonce seed, so neither a failed RNG nor a repeated message
    /// alone leaks the key.
    #[allow(non_snake_case)]
    pub fn sign<T: SigningTranscript>(&self, mut t: T, public_key: &PublicKey) -> Signature {
        t.proto_name(b"Schnorr-sig");
        t.commit_point(b"sign:pk", public_key.as_compressed());

        let mut k = t.witness_scalar(b"signing", &[&self.nonce[..]]);
        let R = (group::base() * k).compress();

        t.commit_point(b"sign:R", &R);

        let e: Scalar = t.challenge_scalar(b"sign:c");
        let s: Scalar = k - e * self.key;

        ::zeroize::Zeroize::zeroize(&mut k);

        Signature { R, s }
    }

    /// Sign a message with this `SecretKey`.
    pub fn sign_simple(&self, ctx: &[u8], msg: &[u8], public_key: &PublicKey) -> Signature {
        let t = SigningContext::new(ctx).bytes(msg);
        self.sign(t, public_key)
    }
}

impl PublicKey {
    /// Verify a signature by this public key on a transcript.
    #[allow(non_snake_case)]
    pub fn verify<T: SigningTranscript>(&self, mut t: T, signature: &Signature) -> DagaResult<()> {
        let A: &RistrettoPoint = self.as_point();

        t.proto_name(b"Schnorr-sig");
        t.commit_point(b"sign:pk", self.as_compressed());
        t.commit_point(b"sign:R", &signature.R);

        let e: Scalar = t.challenge_scalar(b"sign:c");
        let R = RistrettoPoint::vartime_double_scalar_mul_basepoint(&e, A, &signature.s);

        if R.compress() == signature.R {
            Ok(())
        } else {
            Err(DagaError::BadSignature)
        }
    }

    /// Verify a signature by this public key on a message.
    pub fn verify_simple(&self, ctx: &[u8], msg: &[u8], signature: &Signature) -> DagaResult<()> {
        let t = SigningContext::new(ctx).bytes(msg);
        self.verify(t, signature)
    }
}

impl Keypair {
    /// Sign a transcript with this keypair's secret key.
    pub fn sign<T: SigningTranscript>(&self, t: T) -> Signature {
        self.secret.sign(t, &self.public)
    }

    /// Sign a message with this keypair's secret key.
    pub fn sign_simple(&self, ctx: &[u8], msg: &[u8]) -> Signature {
        self.secret.sign_simple(ctx, msg, &self.public)
    }

    /// Verify a signature by this keypair's public key on a transcript.
    pub fn verify<T: SigningTranscript>(&self, t: T, signature: &Signature) -> DagaResult<()> {
        self.public.verify(t, signature)
    }

    /// Verify a signature by this keypair's public key on a message.
    pub fn verify_simple(&self, ctx: &[u8], msg: &[u8], signature: &Signature) -> DagaResult<()> {
        self.public.verify_simple(ctx, msg, signature)
    }
}

/// Verify a batch of `signatures` on `transcripts` with their respective `public_keys`.
///
/// Fails with `InvalidInput` when the three inputs disagree in length
/// and with `BadSignature` when any signature is invalid, without saying
/// which.  Callers who must name the culprit verify one by one afterwards.
#[cfg(feature = "getrandom")]
pub fn verify_batch<T, I>(transcripts: I, signatures: &[Signature], public_keys: &[PublicKey]) -> DagaResult<()>
where
    T: SigningTranscript,
    I: IntoIterator<Item = T>,
{
    verify_batch_rng(transcripts, signatures, public_keys, getrandom_or_panic::getrandom_or_panic())
}

/// Verify a batch of `signatures` on `transcripts` with their respective `public_keys`.
///
/// Inputs and return agree with `verify_batch` except the user supplies their own random number generator.
#[allow(non_snake_case)]
pub fn verify_batch_rng<T, I, R>(
    transcripts: I,
    signatures: &[Signature],
    public_keys: &[PublicKey],
    mut rng: R,
) -> DagaResult<()>
where
    T: SigningTranscript,
    I: IntoIterator<Item = T>,
    R: RngCore + CryptoRng,
{
    if signatures.len() != public_keys.len() {
        return Err(DagaError::InvalidInput("batch lengths differ"));
    }

    // Accumulate public keys and signatures for pseudo-random delinearization scalars
    let mut zs_t = merlin::Transcript::new(b"V-RNG");
    for pk in public_keys {
        zs_t.commit_point(b"", pk.as_compressed());
    }
    for sig in signatures {
        zs_t.append_message(b"", &sig.to_bytes());
    }

    let mut transcripts = transcripts.into_iter();
    // Compute H(A || R || M) for each (signature, public_key, message) triplet
    let mut es: Vec<Scalar> = transcripts
        .by_ref()
        .zip(signatures.iter().zip(public_keys))
        .map(|(mut t, (sig, pk))| {
            t.proto_name(b"Schnorr-sig");
            t.commit_point(b"sign:pk", pk.as_compressed());
            t.commit_point(b"sign:R", &sig.R);
            let e = t.challenge_scalar(b"sign:c");
            zs_t.commit_scalar(b"", &e);
            e
        })
        .collect();
    if transcripts.next().is_some() || es.len() != signatures.len() {
        return Err(DagaError::InvalidInput("batch lengths differ"));
    }

    // Use a random number generator keyed by both the public keys,
    // and the system random number generator
    let mut csprng = zs_t.build_rng().finalize(&mut rng);
    // Select a random 128-bit scalar for each signature.
    let zs: Vec<Scalar> = signatures
        .iter()
        .map(|_| {
            let mut r = [0u8; 16];
            csprng.fill_bytes(&mut r);
            Scalar::from(u128::from_le_bytes(r))
        })
        .collect();

    // Compute the basepoint coefficient, ∑ s[i]z[i] (mod l)
    let B_coefficient: Scalar = signatures.iter().zip(zs.iter()).map(|(sig, z)| z * sig.s).sum();
    for (e, z) in es.iter_mut().zip(zs.iter()) {
        *e *= z;
    }

    let Rs = signatures.iter().map(|sig| sig.R.decompress());
    let As = public_keys.iter().map(|pk| Some(*pk.as_point()));

    // Compute (∑ z[i]s[i]) B - ∑ z[i]R[i] + ∑ z[i]e[i] A[i] = 0
    let ok = RistrettoPoint::optional_multiscalar_mul(
        once(B_coefficient).chain(zs.iter().map(|z| -z)).chain(es),
        once(Some(group::base())).chain(Rs).chain(As),
    )
    .map(|id| id.is_identity())
    .unwrap_or(false);
    // Decompression failures for R are invalid signatures, not encoding errors.

    if ok {
        Ok(())
    } else {
        Err(DagaError::BadSignature)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transcript::signing_context;
    use rand_core::OsRng;

    #[test]
    fn sign_verify() {
        let good: &[u8] = b"test message";
        let bad: &[u8] = b"wrong message";

        let keypair = Keypair::generate_with(OsRng);
        let other = Keypair::generate_with(OsRng);
        let ctx = signing_context(b"good");

        let sig = keypair.sign(ctx.bytes(good));
        assert!(keypair.verify(ctx.bytes(good), &sig).is_ok());
        assert_eq!(keypair.verify(ctx.bytes(bad), &sig), Err(DagaError::BadSignature));
        assert_eq!(other.verify(ctx.bytes(good), &sig), Err(DagaError::BadSignature));
        assert_eq!(
            keypair.verify(signing_context(b"bad").bytes(good), &sig),
            Err(DagaError::BadSignature),
        );

        let simple = keypair.sign_simple(b"ctx", good);
        assert!(keypair.public.verify_simple(b"ctx", good, &simple).is_ok());
        assert!(keypair.public.verify_simple(b"xtc", good, &simple).is_err());
    }

    #[test]
    fn signature_equation_matches_wire_format() {
        let keypair = Keypair::generate_with(OsRng);
        let msg: &[u8] = b"equation";
        let sig = keypair.sign_simple(b"ctx", msg);

        let mut t = SigningContext::new(b"ctx").bytes(msg);
        t.proto_name(b"Schnorr-sig");
        t.commit_point(b"sign:pk", keypair.public.as_compressed());
        t.commit_point(b"sign:R", &sig.R);
        let e = t.challenge_scalar(b"sign:c");
        let r = group::base() * sig.s + keypair.public.as_point() * e;
        assert_eq!(r.compress(), sig.R);

        let restored = Signature::from_bytes(&sig.to_bytes()).unwrap();
        assert_eq!(restored, sig);
        let mut bytes = sig.to_bytes();
        bytes[63] = 0xff;
        assert!(matches!(Signature::from_bytes(&bytes), Err(DagaError::InvalidEncoding(_))));
    }

    #[test]
    fn verify_batch_seven_signatures() {
        let ctx = signing_context(b"my batch context");

        let messages: [&[u8]; 7] = [
            b"Watch closely everyone, I'm going to show you how to kill a god.",
            b"I'm not a cryptographer I just encrypt a lot.",
            b"Still not a cryptographer.",
            b"This is a test of the tsunami alert system. This is only a test.",
            b"The quick brown fox jumps over the lazy dog.",
            b"Anonymous, but accountable.",
            b"One tag per client per round.",
        ];
        let mut keypairs: Vec<Keypair> = Vec::new();
        let mut signatures: Vec<Signature> = Vec::new();

        for (i, msg) in messages.iter().enumerate() {
            let mut keypair: Keypair = Keypair::generate_with(OsRng);
            if i == 3 || i == 4 {
                keypair = keypairs[0].clone();
            }
            signatures.push(keypair.sign(ctx.bytes(msg)));
            keypairs.push(keypair);
        }
        let public_keys: Vec<PublicKey> = keypairs.iter().map(|key| key.public).collect();

        let transcripts = messages.iter().map(|m| ctx.bytes(m));
        assert!(verify_batch_rng(transcripts, &signatures[..], &public_keys[..], OsRng).is_ok());

        signatures.swap(1, 2);
        let transcripts = messages.iter().map(|m| ctx.bytes(m));
        assert_eq!(
            verify_batch_rng(transcripts, &signatures[..], &public_keys[..], OsRng),
            Err(DagaError::BadSignature),
        );

        let transcripts = messages.iter().take(6).map(|m| ctx.bytes(m));
        assert!(matches!(
            verify_batch_rng(transcripts, &signatures[..], &public_keys[..], OsRng),
            Err(DagaError::InvalidInput(_)),
        ));
    }
}
