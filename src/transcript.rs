// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

//! Fiat-Shamir transcripts shared by signatures, DLEQ proofs,
//! sigma protocols, and the server tag proofs.

use core::borrow::{Borrow, BorrowMut};

use curve25519_dalek::ristretto::CompressedRistretto;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};

/// Schnorr-like proof transcript
///
/// Any signature or proof inside this crate may occur inside a larger
/// protocol, so its transcript may exist before or persist after it.
/// We provide an interface compatible with `merlin::Transcript` and
/// abstract over owned and borrowed transcripts.
pub trait SigningTranscript {
    /// Extend transcript with some bytes, shadowed by `merlin::Transcript`.
    fn commit_bytes(&mut self, label: &'static [u8], bytes: &[u8]);

    /// Extend transcript with a protocol name
    fn proto_name(&mut self, label: &'static [u8]) {
        self.commit_bytes(b"proto-name", label);
    }

    /// Extend the transcript with a compressed Ristretto point
    fn commit_point(&mut self, label: &'static [u8], compressed: &CompressedRistretto) {
        self.commit_bytes(label, compressed.as_bytes());
    }

    /// Extend the transcript with a canonical scalar
    fn commit_scalar(&mut self, label: &'static [u8], scalar: &Scalar) {
        self.commit_bytes(label, scalar.as_bytes());
    }

    /// Extend the transcript with a big endian index
    fn commit_index(&mut self, label: &'static [u8], index: u32) {
        self.commit_bytes(label, &index.to_be_bytes());
    }

    /// Produce some challenge bytes, shadowed by `merlin::Transcript`.
    fn challenge_bytes(&mut self, label: &'static [u8], dest: &mut [u8]);

    /// Produce the public challenge scalar `e`.
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        let mut buf = [0; 64];
        self.challenge_bytes(label, &mut buf);
        Scalar::from_bytes_mod_order_wide(&buf)
    }

    /// Produce a secret witness scalar `k`, aka nonce, from the protocol
    /// transcript and any "nonce seeds" kept with the secret keys.
    fn witness_scalar(&self, label: &'static [u8], nonce_seeds: &[&[u8]]) -> Scalar {
        let mut scalar_bytes = [0u8; 64];
        self.witness_bytes(label, &mut scalar_bytes, nonce_seeds);
        Scalar::from_bytes_mod_order_wide(&scalar_bytes)
    }

    /// Produce secret witness bytes from the protocol transcript
    /// and any "nonce seeds" kept with the secret keys.
    fn witness_bytes(&self, label: &'static [u8], dest: &mut [u8], nonce_seeds: &[&[u8]]) {
        self.witness_bytes_rng(label, dest, nonce_seeds, getrandom_or_panic::getrandom_or_panic())
    }

    /// Produce secret witness bytes from the protocol transcript
    /// and any "nonce seeds" kept with the secret keys.
    fn witness_bytes_rng<R>(&self, label: &'static [u8], dest: &mut [u8], nonce_seeds: &[&[u8]], rng: R)
    where
        R: RngCore + CryptoRng;
}

impl<T> SigningTranscript for T
where
    T: Borrow<Transcript> + BorrowMut<Transcript>,
{
    fn commit_bytes(&mut self, label: &'static [u8], bytes: &[u8]) {
        Transcript::append_message(self.borrow_mut(), label, bytes);
    }

    fn challenge_bytes(&mut self, label: &'static [u8], dest: &mut [u8]) {
        Transcript::challenge_bytes(self.borrow_mut(), label, dest)
    }

    fn witness_bytes_rng<R>(&self, label: &'static [u8], dest: &mut [u8], nonce_seeds: &[&[u8]], mut rng: R)
    where
        R: RngCore + CryptoRng,
    {
        let mut br = Transcript::build_rng(self.borrow());
        for ns in nonce_seeds {
            br = br.rekey_with_witness_bytes(label, ns);
        }
        let mut r = br.finalize(&mut rng);
        r.fill_bytes(dest)
    }
}

/// Schnorr signing context
///
/// We expect users to separate `SigningContext`s for each role that
/// signatures play in their protocol.
///
/// To sign a message, apply the appropriate inherent method to create
/// a signature transcript.
#[derive(Clone)]
pub struct SigningContext(Transcript);

/// Initialize a signing context from a static byte string that
/// identifies the signature's role in the larger protocol.
#[inline(always)]
pub fn signing_context(context: &[u8]) -> SigningContext {
    SigningContext::new(context)
}

impl SigningContext {
    /// Initialize a signing context from a static byte string that
    /// identifies the signature's role in the larger protocol.
    #[inline(always)]
    pub fn new(context: &[u8]) -> SigningContext {
        let mut t = Transcript::new(b"SigningContext");
        t.append_message(b"", context);
        SigningContext(t)
    }

    /// Initialize an owned signing transcript on a message provided as a byte array.
    #[inline(always)]
    pub fn bytes(&self, bytes: &[u8]) -> Transcript {
        let mut t = self.0.clone();
        t.append_message(b"sign-bytes", bytes);
        t
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn challenges_depend_on_every_commitment() {
        let ctx = signing_context(b"test");
        let mut a = ctx.bytes(b"message");
        let mut b = ctx.bytes(b"message");
        let mut c = ctx.bytes(b"massage");
        assert_eq!(a.challenge_scalar(b"e"), b.challenge_scalar(b"e"));
        assert_ne!(a.challenge_scalar(b"e"), c.challenge_scalar(b"e"));

        let mut d = signing_context(b"other").bytes(b"message");
        let mut e = signing_context(b"test").bytes(b"message");
        assert_ne!(d.challenge_scalar(b"e"), e.challenge_scalar(b"e"));
    }

    #[test]
    fn witnesses_are_fresh() {
        let t = signing_context(b"test").bytes(b"message");
        assert_ne!(t.witness_scalar(b"k", &[&b"seed"[..]]), t.witness_scalar(b"k", &[&b"seed"[..]]));
    }
}
