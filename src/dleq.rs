// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeffrey Burdges <jeff@web3.foundation>

//! Non-interactive proofs of discrete logarithm equality.
//!
//! A `DleqProof` shows `log_g(xG) = log_h(xH)` without revealing `x`.
//! The prover picks `v`, publishes `vG = v g` and `vH = v h`, derives
//! `c` from the transcript, and answers `r = v - c x`.  Verifiers check
//! `vG == r g + c xG` and `vH == r h + c xH`.
//!
//! Batches first commit every base pair and the batch size, then fork
//! the transcript once per index.
//! Each member's challenge thus depends upon the whole batch layout,
//! so a rogue prover cannot move a proof to another index, while any
//! single invalid member can still be dropped on its own.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};

use crate::errors::{DagaError, DagaResult};
use crate::group::{self, ByteReader, POINT_LENGTH, SCALAR_LENGTH};
use crate::transcript::SigningTranscript;

/// The length of a serialized `DleqProof`, in bytes.
pub const DLEQ_PROOF_LENGTH: usize = 2 * SCALAR_LENGTH + 2 * POINT_LENGTH;

/// Discrete logarithm equality proof `(c, r, vG, vH)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DleqProof {
    /// Challenge
    pub c: Scalar,
    /// Response `v - c x`
    pub r: Scalar,
    /// Commitment `v g`
    pub vg: RistrettoPoint,
    /// Commitment `v h`
    pub vh: RistrettoPoint,
}

#[allow(clippy::too_many_arguments)]
fn challenge<T: SigningTranscript>(
    t: &mut T,
    g: &RistrettoPoint,
    h: &RistrettoPoint,
    xg: &RistrettoPoint,
    xh: &RistrettoPoint,
    vg: &RistrettoPoint,
    vh: &RistrettoPoint,
) -> Scalar {
    t.proto_name(b"DLEQProof");
    t.commit_point(b"dleq:g", &g.compress());
    t.commit_point(b"dleq:h", &h.compress());
    t.commit_point(b"dleq:xg", &xg.compress());
    t.commit_point(b"dleq:xh", &xh.compress());
    t.commit_point(b"dleq:vg", &vg.compress());
    t.commit_point(b"dleq:vh", &vh.compress());
    t.challenge_scalar(b"dleq:c")
}

impl DleqProof {
    /// Prove `log_g(x g) = log_h(x h)`, returning the proof with `x g` and `x h`.
    pub fn prove_rng<T, R>(
        mut t: T,
        x: &Scalar,
        g: &RistrettoPoint,
        h: &RistrettoPoint,
        mut rng: R,
    ) -> (DleqProof, RistrettoPoint, RistrettoPoint)
    where
        T: SigningTranscript,
        R: RngCore + CryptoRng,
    {
        let xg = g * x;
        let xh = h * x;

        let mut v = {
            let mut bytes = [0u8; 64];
            t.witness_bytes_rng(b"dleq:v", &mut bytes, &[&x.as_bytes()[..]], &mut rng);
            Scalar::from_bytes_mod_order_wide(&bytes)
        };
        let vg = g * v;
        let vh = h * v;

        let c = challenge(&mut t, g, h, &xg, &xh, &vg, &vh);
        let r = v - c * x;
        ::zeroize::Zeroize::zeroize(&mut v);

        (DleqProof { c, r, vg, vh }, xg, xh)
    }

    /// Prove `log_g(x g) = log_h(x h)` with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn prove<T: SigningTranscript>(
        t: T,
        x: &Scalar,
        g: &RistrettoPoint,
        h: &RistrettoPoint,
    ) -> (DleqProof, RistrettoPoint, RistrettoPoint) {
        Self::prove_rng(t, x, g, h, getrandom_or_panic::getrandom_or_panic())
    }

    /// Verify the proof for `log_g(xg) = log_h(xh)`.
    pub fn verify<T: SigningTranscript>(
        &self,
        mut t: T,
        g: &RistrettoPoint,
        h: &RistrettoPoint,
        xg: &RistrettoPoint,
        xh: &RistrettoPoint,
    ) -> DagaResult<()> {
        let c = challenge(&mut t, g, h, xg, xh, &self.vg, &self.vh);
        if c != self.c {
            return Err(DagaError::BadProof);
        }
        let vg = RistrettoPoint::vartime_multiscalar_mul(&[self.r, self.c], &[*g, *xg]);
        let vh = RistrettoPoint::vartime_multiscalar_mul(&[self.r, self.c], &[*h, *xh]);
        if vg == self.vg && vh == self.vh {
            Ok(())
        } else {
            Err(DagaError::BadProof)
        }
    }

    /// Serialize as `c ‖ r ‖ vG ‖ vH`.
    pub fn to_bytes(&self) -> [u8; DLEQ_PROOF_LENGTH] {
        let mut bytes = [0u8; DLEQ_PROOF_LENGTH];
        bytes[..32].copy_from_slice(self.c.as_bytes());
        bytes[32..64].copy_from_slice(self.r.as_bytes());
        bytes[64..96].copy_from_slice(&group::encode_point(&self.vg));
        bytes[96..].copy_from_slice(&group::encode_point(&self.vh));
        bytes
    }

    /// Deserialize from `c ‖ r ‖ vG ‖ vH`.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<DleqProof> {
        if bytes.len() != DLEQ_PROOF_LENGTH {
            return Err(DagaError::BytesLength { name: "DleqProof", length: DLEQ_PROOF_LENGTH });
        }
        let mut reader = ByteReader::new(bytes);
        let c = reader.scalar()?;
        let r = reader.scalar()?;
        let vg = reader.point()?;
        let vh = reader.point()?;
        Ok(DleqProof { c, r, vg, vh })
    }
}

serde_boilerplate!(DleqProof);

/// Transcript shared by every member of a DLEQ batch over bases `gs` and `hs`.
pub fn batch_transcript(label: &'static [u8], gs: &[RistrettoPoint], hs: &[RistrettoPoint]) -> DagaResult<Transcript> {
    if gs.len() != hs.len() {
        return Err(DagaError::InvalidInput("DLEQ batch bases differ in length"));
    }
    let mut t = Transcript::new(b"DLEQBatch");
    t.append_message(b"label", label);
    t.commit_index(b"size", gs.len() as u32);
    for (g, h) in gs.iter().zip(hs) {
        t.commit_point(b"g", &g.compress());
        t.commit_point(b"h", &h.compress());
    }
    Ok(t)
}

/// Fork the batch transcript for member `index`.
pub fn batch_member(batch: &Transcript, index: u32) -> Transcript {
    let mut t = batch.clone();
    t.commit_index(b"index", index);
    t
}

/// Prove `log_{g_i}(x_i g_i) = log_{h_i}(x_i h_i)` for every `i` in one batch.
pub fn prove_batch_rng<R>(
    label: &'static [u8],
    xs: &[Scalar],
    gs: &[RistrettoPoint],
    hs: &[RistrettoPoint],
    mut rng: R,
) -> DagaResult<(Vec<DleqProof>, Vec<RistrettoPoint>, Vec<RistrettoPoint>)>
where
    R: RngCore + CryptoRng,
{
    if xs.len() != gs.len() {
        return Err(DagaError::InvalidInput("DLEQ batch secrets and bases differ in length"));
    }
    let batch = batch_transcript(label, gs, hs)?;

    let mut proofs = Vec::with_capacity(xs.len());
    let mut xgs = Vec::with_capacity(xs.len());
    let mut xhs = Vec::with_capacity(xs.len());
    for (i, ((x, g), h)) in xs.iter().zip(gs).zip(hs).enumerate() {
        let (proof, xg, xh) = DleqProof::prove_rng(batch_member(&batch, i as u32), x, g, h, &mut rng);
        proofs.push(proof);
        xgs.push(xg);
        xhs.push(xh);
    }
    Ok((proofs, xgs, xhs))
}

/// Verify every member of a DLEQ batch, reporting each member separately.
pub fn verify_batch(
    label: &'static [u8],
    gs: &[RistrettoPoint],
    hs: &[RistrettoPoint],
    xgs: &[RistrettoPoint],
    xhs: &[RistrettoPoint],
    proofs: &[DleqProof],
) -> DagaResult<Vec<DagaResult<()>>> {
    if xgs.len() != gs.len() || xhs.len() != gs.len() || proofs.len() != gs.len() {
        return Err(DagaError::InvalidInput("DLEQ batch members differ in length"));
    }
    let batch = batch_transcript(label, gs, hs)?;
    Ok((0..gs.len())
        .map(|i| proofs[i].verify(batch_member(&batch, i as u32), &gs[i], &hs[i], &xgs[i], &xhs[i]))
        .collect())
}
