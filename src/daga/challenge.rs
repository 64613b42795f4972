//! Collective generation of the client's master challenge.
//!
//! Every server commits to a fresh opening `v_j` with a signed
//! `K_j = v_j B`.  Once all commitments are in, the leader reveals its
//! opening first and the others follow, so nobody can pick `v_j` after
//! seeing the rest.  The challenge is `cs = Σ v_j`, signed by every server
//! in round-robin order starting from the leader.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::context::{AuthenticationContext, ContextId};
use crate::errors::{DagaError, DagaResult};
use crate::group::{self, ByteReader, SCALAR_LENGTH};
use crate::keys::{Keypair, PublicKey};
use crate::sigma::Commitments;
use crate::sign::{self, Signature, SIGNATURE_LENGTH};
use crate::transcript::{signing_context, SigningTranscript};

/// Length of an encoded `ServerSignature`.
pub const SERVER_SIGNATURE_LENGTH: usize = 4 + SIGNATURE_LENGTH;

/// Signature by the server at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSignature {
    /// Index of the signer in the context's server list
    pub index: u32,
    /// Schnorr signature under `Y[index]`
    pub signature: Signature,
}

impl ServerSignature {
    /// `index ‖ signature`
    pub fn to_bytes(&self) -> [u8; SERVER_SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SERVER_SIGNATURE_LENGTH];
        bytes[..4].copy_from_slice(&self.index.to_be_bytes());
        bytes[4..].copy_from_slice(&self.signature.to_bytes());
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> DagaResult<ServerSignature> {
        let index = reader.u32()?;
        let signature = Signature::from_bytes(reader.take(SIGNATURE_LENGTH, "Signature")?)?;
        Ok(ServerSignature { index, signature })
    }

    /// Decode `index ‖ signature`.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<ServerSignature> {
        let mut reader = ByteReader::new(bytes);
        let sig = ServerSignature::read(&mut reader)?;
        reader.finish("ServerSignature")?;
        Ok(sig)
    }
}

serde_boilerplate!(ServerSignature);

/// Verify `signatures` by `signers` on `transcripts`.
///
/// Tries one batch first and falls back to checking one by one, so the
/// failure stays precise.
pub(crate) fn verify_signatures(
    transcripts: &[Transcript],
    signatures: &[Signature],
    signers: &[PublicKey],
) -> DagaResult<()> {
    #[cfg(feature = "getrandom")]
    {
        if sign::verify_batch(transcripts.iter().cloned(), signatures, signers).is_ok() {
            return Ok(());
        }
    }
    for ((t, sig), key) in transcripts.iter().zip(signatures).zip(signers) {
        key.verify(t.clone(), sig)?;
    }
    Ok(())
}

/// Fail on a repeated signer, naming it.
pub(crate) fn ensure_distinct(indexes: impl IntoIterator<Item = u32>) -> DagaResult<()> {
    let mut seen = BTreeSet::new();
    for index in indexes {
        if !seen.insert(index) {
            return Err(DagaError::DuplicateSignature(index));
        }
    }
    Ok(())
}

fn client_commitments_bytes(commitments: &Commitments) -> Vec<u8> {
    commitments.to_bytes()
}

fn bundle_transcript(context: &ContextId, commitments: &[u8], cs: &Scalar) -> Transcript {
    let mut t = signing_context(b"daga-challenge").bytes(context);
    t.append_message(b"client commitments", commitments);
    t.commit_scalar(b"cs", cs);
    t
}

fn commitment_transcript(context: &ContextId, commitments: &[u8], index: u32, k: &RistrettoPoint) -> Transcript {
    let mut t = signing_context(b"daga-challenge-commitment").bytes(context);
    t.append_message(b"client commitments", commitments);
    t.commit_index(b"index", index);
    t.commit_point(b"K", &k.compress());
    t
}

/// Master challenge `cs` with the servers' signatures on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeBundle {
    /// Master challenge
    pub cs: Scalar,
    /// Signatures in round-robin order, leader first
    pub sigs: Vec<ServerSignature>,
}

impl ChallengeBundle {
    /// Unsigned bundle for `cs`.
    pub fn new(cs: Scalar) -> ChallengeBundle {
        ChallengeBundle { cs, sigs: Vec::new() }
    }

    /// Check the signatures present so far.
    ///
    /// They must be distinct, visit the servers cyclically starting from
    /// the first signer, and each verify over the context, the client's
    /// commitments and `cs`.
    fn verify_partial(&self, context: &AuthenticationContext, commitments: &Commitments) -> DagaResult<()> {
        let m = context.server_count();
        if self.sigs.len() > m {
            return Err(DagaError::InvalidInput("more challenge signatures than servers"));
        }
        ensure_distinct(self.sigs.iter().map(|s| s.index))?;
        let Some(leader) = self.sigs.first().map(|s| s.index as usize) else {
            return Ok(());
        };
        // A signature claiming a server out of range or out of turn cannot verify.
        if leader >= m || self.sigs.iter().enumerate().any(|(k, sig)| sig.index as usize != (leader + k) % m) {
            return Err(DagaError::BadSignature);
        }

        let bytes = client_commitments_bytes(commitments);
        let t = bundle_transcript(context.id(), &bytes, &self.cs);
        let transcripts = alloc::vec![t; self.sigs.len()];
        let signatures: Vec<Signature> = self.sigs.iter().map(|s| s.signature).collect();
        let signers: Vec<PublicKey> = self.sigs.iter().map(|s| context.servers()[s.index as usize]).collect();
        verify_signatures(&transcripts, &signatures, &signers)
    }

    /// Check a complete bundle: exactly one signature per server.
    pub fn verify(&self, context: &AuthenticationContext, commitments: &Commitments) -> DagaResult<()> {
        if self.sigs.len() != context.server_count() {
            return Err(DagaError::InvalidInput("challenge needs one signature per server"));
        }
        self.verify_partial(context, commitments)
    }

    /// Byte length of a bundle with `m` signatures.
    pub fn encoded_length(m: usize) -> usize {
        SCALAR_LENGTH + 4 + m * SERVER_SIGNATURE_LENGTH
    }

    /// `cs ‖ count ‖ sigs`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::encoded_length(self.sigs.len()));
        bytes.extend_from_slice(self.cs.as_bytes());
        bytes.extend_from_slice(&(self.sigs.len() as u32).to_be_bytes());
        for sig in &self.sigs {
            bytes.extend_from_slice(&sig.to_bytes());
        }
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, m: usize) -> DagaResult<ChallengeBundle> {
        let cs = reader.scalar()?;
        let count = reader.u32()? as usize;
        if count != m {
            return Err(DagaError::InvalidInput("challenge needs one signature per server"));
        }
        let sigs = (0..count).map(|_| ServerSignature::read(reader)).collect::<DagaResult<Vec<_>>>()?;
        Ok(ChallengeBundle { cs, sigs })
    }

    /// Decode a bundle signed by all `m` servers.
    pub fn from_bytes(bytes: &[u8], m: usize) -> DagaResult<ChallengeBundle> {
        let mut reader = ByteReader::new(bytes);
        let bundle = ChallengeBundle::read(&mut reader, m)?;
        reader.finish("ChallengeBundle")?;
        Ok(bundle)
    }
}

/// Signed commitment `K_j = v_j B` to a server's opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeCommitment {
    /// Committing server
    pub index: u32,
    /// `K_j`
    pub commit: RistrettoPoint,
    /// Signature under `Y[index]`
    pub signature: Signature,
}

/// Revealed opening `v_j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeOpening {
    /// Revealing server
    pub index: u32,
    /// `v_j`
    pub opening: Scalar,
}

/// One server's state during a collective challenge generation.
pub struct ChallengeGen<'a> {
    context: &'a AuthenticationContext,
    client_commitments: Commitments,
    index: u32,
    opening: Scalar,
    commitments: Vec<Option<ChallengeCommitment>>,
    openings: Vec<Option<Scalar>>,
}

impl<'a> ChallengeGen<'a> {
    /// Pick our opening and sign its commitment.
    pub(crate) fn start<R>(
        context: &'a AuthenticationContext,
        keypair: &Keypair,
        index: u32,
        client_commitments: Commitments,
        mut rng: R,
    ) -> DagaResult<(ChallengeGen<'a>, ChallengeCommitment)>
    where
        R: RngCore + CryptoRng,
    {
        let m = context.server_count();
        if index as usize >= m {
            return Err(DagaError::InvalidInput("server index out of range"));
        }
        let opening = group::random_scalar(&mut rng);
        let commit = group::base() * opening;
        let bytes = client_commitments_bytes(&client_commitments);
        let signature = keypair.sign(commitment_transcript(context.id(), &bytes, index, &commit));
        let own = ChallengeCommitment { index, commit, signature };

        let mut commitments = alloc::vec![None; m];
        commitments[index as usize] = Some(own);
        let gen = ChallengeGen {
            context,
            client_commitments,
            index,
            opening,
            commitments,
            openings: alloc::vec![None; m],
        };
        Ok((gen, own))
    }

    /// Index of the server running this state.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Accept another server's signed commitment.
    pub fn receive_commitment(&mut self, commitment: &ChallengeCommitment) -> DagaResult<()> {
        let i = commitment.index as usize;
        let slot = self.commitments.get(i).ok_or(DagaError::InvalidInput("server index out of range"))?;
        if slot.is_some() {
            return Err(DagaError::DuplicateSignature(commitment.index));
        }
        let bytes = client_commitments_bytes(&self.client_commitments);
        let t = commitment_transcript(self.context.id(), &bytes, commitment.index, &commitment.commit);
        self.context.servers()[i].verify(t, &commitment.signature)?;
        self.commitments[i] = Some(*commitment);
        Ok(())
    }

    /// Reveal our opening.
    ///
    /// Requires every commitment, and unless we lead, the leader's opening.
    pub fn open(&mut self, leader: u32) -> DagaResult<ChallengeOpening> {
        if self.commitments.iter().any(Option::is_none) {
            return Err(DagaError::InvalidInput("opening before all commitments arrived"));
        }
        if leader != self.index && self.openings.get(leader as usize).copied().flatten().is_none() {
            return Err(DagaError::InvalidInput("opening before the leader's"));
        }
        self.openings[self.index as usize] = Some(self.opening);
        Ok(ChallengeOpening { index: self.index, opening: self.opening })
    }

    /// Accept another server's opening, checking it against its commitment.
    pub fn receive_opening(&mut self, opening: &ChallengeOpening) -> DagaResult<()> {
        let i = opening.index as usize;
        let commitment = self
            .commitments
            .get(i)
            .copied()
            .flatten()
            .ok_or(DagaError::InvalidInput("opening without commitment"))?;
        if self.openings[i].is_some() {
            return Err(DagaError::DuplicateSignature(opening.index));
        }
        if group::base() * opening.opening != commitment.commit {
            return Err(DagaError::Misbehavior(opening.index));
        }
        self.openings[i] = Some(opening.opening);
        Ok(())
    }

    /// `cs = Σ v_j`, once every opening is known.
    pub fn challenge(&self) -> DagaResult<Scalar> {
        self.openings
            .iter()
            .try_fold(Scalar::ZERO, |acc, v| v.map(|v| acc + v))
            .ok_or(DagaError::InvalidInput("challenge before all openings arrived"))
    }

    /// Check the signatures collected so far and append ours.
    pub(crate) fn cosign(&self, keypair: &Keypair, mut bundle: ChallengeBundle) -> DagaResult<ChallengeBundle> {
        let cs = self.challenge()?;
        if bundle.cs != cs {
            return Err(DagaError::InvalidInput("bundle carries a different challenge"));
        }
        bundle.verify_partial(self.context, &self.client_commitments)?;
        let m = self.context.server_count();
        let expected = match bundle.sigs.first() {
            Some(leader) => (leader.index as usize + bundle.sigs.len()) % m,
            None => self.index as usize,
        };
        if bundle.sigs.len() == m || expected != self.index as usize {
            return Err(DagaError::InvalidInput("not our turn to sign the challenge"));
        }
        let bytes = client_commitments_bytes(&self.client_commitments);
        let signature = keypair.sign(bundle_transcript(self.context.id(), &bytes, &cs));
        bundle.sigs.push(ServerSignature { index: self.index, signature });
        Ok(bundle)
    }
}

impl Drop for ChallengeGen<'_> {
    fn drop(&mut self) {
        self.opening.zeroize();
    }
}
