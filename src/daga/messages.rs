//! Wire messages of an authentication and their canonical encodings.
//!
//! Every encoding is a fixed-length concatenation of points, scalars, and
//! big-endian `u32`s whose sizes follow from the context's `n` and `m`.
//! Signatures and Fiat-Shamir challenges always consume these bytes.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;

use super::challenge::{ChallengeBundle, ServerSignature, SERVER_SIGNATURE_LENGTH};
use super::context::{AuthenticationContext, ContextId, CONTEXT_ID_LENGTH};
use crate::errors::{DagaError, DagaResult};
use crate::group::{self, ByteReader, POINT_LENGTH, SCALAR_LENGTH};
use crate::sigma::{Commitments, Responses};
use crate::transcript::signing_context;

/// Client's ephemeral commitments and initial linkage tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialTagAndCommitments {
    /// `[Z, S_0 = B, S_1, .., S_m]`
    pub s_commits: Vec<RistrettoPoint>,
    /// `T0 = (∏ s_j) H_i`
    pub t0: RistrettoPoint,
}

impl InitialTagAndCommitments {
    /// Ephemeral public key `Z`.
    pub fn z(&self) -> Option<&RistrettoPoint> {
        self.s_commits.first()
    }

    /// Byte length for `m` servers.
    pub fn encoded_length(m: usize) -> usize {
        (m + 3) * POINT_LENGTH
    }

    /// `sCommits ‖ T0`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = group::encode_points(&self.s_commits);
        bytes.extend_from_slice(&group::encode_point(&self.t0));
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, m: usize) -> DagaResult<InitialTagAndCommitments> {
        let s_commits = reader.points(m + 2)?;
        let t0 = reader.point()?;
        Ok(InitialTagAndCommitments { s_commits, t0 })
    }
}

/// Client's proof of knowledge, with the signed master challenge it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProof {
    /// Collectively generated master challenge `cs` and its signatures
    pub bundle: ChallengeBundle,
    /// `t[3n]`
    pub commitments: Vec<RistrettoPoint>,
    /// `c[n]`, summing to `cs`
    pub sub_challenges: Vec<Scalar>,
    /// `r[2n]`
    pub responses: Vec<Scalar>,
}

impl ClientProof {
    pub(crate) fn client_commitments(&self) -> Commitments {
        Commitments(self.commitments.clone())
    }

    pub(crate) fn client_responses(&self) -> Responses {
        Responses { challenges: self.sub_challenges.clone(), responses: self.responses.clone() }
    }

    /// Byte length for `n` clients and `m` servers.
    pub fn encoded_length(n: usize, m: usize) -> usize {
        ChallengeBundle::encoded_length(m) + 3 * n * POINT_LENGTH + 3 * n * SCALAR_LENGTH
    }

    /// `bundle ‖ t ‖ c ‖ r`, where `bundle` opens with `cs`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.bundle.to_bytes();
        bytes.extend_from_slice(&group::encode_points(&self.commitments));
        for s in self.sub_challenges.iter().chain(self.responses.iter()) {
            bytes.extend_from_slice(s.as_bytes());
        }
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, n: usize, m: usize) -> DagaResult<ClientProof> {
        let bundle = ChallengeBundle::read(reader, m)?;
        let commitments = reader.points(3 * n)?;
        let sub_challenges = reader.scalars(n)?;
        let responses = reader.scalars(2 * n)?;
        Ok(ClientProof { bundle, commitments, sub_challenges, responses })
    }
}

/// Authentication request a client hands to its entry server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationMessage {
    /// Identifier of the context the client authenticates in
    pub context_id: ContextId,
    /// Ephemeral commitments and `T0`
    pub initial: InitialTagAndCommitments,
    /// `PKclient`
    pub proof: ClientProof,
}

impl AuthenticationMessage {
    /// Byte length for `n` clients and `m` servers.
    pub fn encoded_length(n: usize, m: usize) -> usize {
        CONTEXT_ID_LENGTH + InitialTagAndCommitments::encoded_length(m) + ClientProof::encoded_length(n, m)
    }

    /// `context_id ‖ sCommits ‖ T0 ‖ ClientProof`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(AuthenticationMessage::encoded_length(
            self.proof.sub_challenges.len(),
            self.proof.bundle.sigs.len(),
        ));
        bytes.extend_from_slice(&self.context_id);
        bytes.extend_from_slice(&self.initial.to_bytes());
        bytes.extend_from_slice(&self.proof.to_bytes());
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, n: usize, m: usize) -> DagaResult<AuthenticationMessage> {
        let mut context_id = [0u8; CONTEXT_ID_LENGTH];
        context_id.copy_from_slice(reader.take(CONTEXT_ID_LENGTH, "ContextId")?);
        let initial = InitialTagAndCommitments::read(reader, m)?;
        let proof = ClientProof::read(reader, n, m)?;
        Ok(AuthenticationMessage { context_id, initial, proof })
    }

    /// Decode a request sized for `context`.
    pub fn from_bytes(bytes: &[u8], context: &AuthenticationContext) -> DagaResult<AuthenticationMessage> {
        let mut reader = ByteReader::new(bytes);
        let msg = AuthenticationMessage::read(&mut reader, context.client_count(), context.server_count())?;
        reader.finish("AuthenticationMessage")?;
        Ok(msg)
    }
}

const HONEST_PROOF: u8 = 1;
const MISBEHAVIOR_PROOF: u8 = 0;

/// A server's proof about the tag it appended.
///
/// # Encoding
///
/// A one byte kind comes first, so a decoder can tell the two shapes apart
/// inside a concatenated `ServerMessage`:
///
/// | kind | body | length |
/// |---|---|---|
/// | `1` honest | `t1 ‖ t2 ‖ t3 ‖ c ‖ r1 ‖ r2` | `1 + 3·32 + 3·32` |
/// | `0` misbehavior | `t1 ‖ t2 ‖ t3 ‖ c ‖ r1` | `1 + 3·32 + 2·32` |
///
/// Points are compressed Ristretto, scalars canonical little endian.  Any
/// other kind byte fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTagProof {
    /// `T_new = (r_j / s_j) T_prev`, `R_j = r_j B` and `S_{j+1} = s_j S_j`.
    Honest {
        /// `v1 T_prev - v2 T_new`
        t1: RistrettoPoint,
        /// `v1 B`
        t2: RistrettoPoint,
        /// `v2 S_j`
        t3: RistrettoPoint,
        /// Fiat-Shamir challenge
        c: Scalar,
        /// `v1 - c r_j`
        r1: Scalar,
        /// `v2 - c s_j`
        r2: Scalar,
    },
    /// `Zs = y_j Z` with `Y_j = y_j B`, exposing the client's bad commitments.
    Misbehavior {
        /// `v Z`
        t1: RistrettoPoint,
        /// `v B`
        t2: RistrettoPoint,
        /// `Zs = y_j Z`
        t3: RistrettoPoint,
        /// Fiat-Shamir challenge
        c: Scalar,
        /// `v - c y_j`
        r1: Scalar,
    },
}

impl ServerTagProof {
    /// Whether this proof accuses the client.
    pub fn is_misbehavior(&self) -> bool {
        matches!(self, ServerTagProof::Misbehavior { .. })
    }

    /// Byte length of the encoding.
    pub fn encoded_length(&self) -> usize {
        match self {
            ServerTagProof::Honest { .. } => 1 + 3 * POINT_LENGTH + 3 * SCALAR_LENGTH,
            ServerTagProof::Misbehavior { .. } => 1 + 3 * POINT_LENGTH + 2 * SCALAR_LENGTH,
        }
    }

    /// `kind ‖ t1 ‖ t2 ‖ t3 ‖ c ‖ r1 [‖ r2]`, where `kind` is 1 for honest
    /// proofs and 0 for misbehavior proofs, which omit `r2`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_length());
        match self {
            ServerTagProof::Honest { t1, t2, t3, c, r1, r2 } => {
                bytes.push(HONEST_PROOF);
                bytes.extend_from_slice(&group::encode_points(&[*t1, *t2, *t3]));
                for s in [c, r1, r2] {
                    bytes.extend_from_slice(s.as_bytes());
                }
            }
            ServerTagProof::Misbehavior { t1, t2, t3, c, r1 } => {
                bytes.push(MISBEHAVIOR_PROOF);
                bytes.extend_from_slice(&group::encode_points(&[*t1, *t2, *t3]));
                for s in [c, r1] {
                    bytes.extend_from_slice(s.as_bytes());
                }
            }
        }
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> DagaResult<ServerTagProof> {
        let kind = reader.u8()?;
        if kind != HONEST_PROOF && kind != MISBEHAVIOR_PROOF {
            return Err(DagaError::InvalidEncoding("ServerTagProof kind"));
        }
        let (t1, t2, t3) = (reader.point()?, reader.point()?, reader.point()?);
        let (c, r1) = (reader.scalar()?, reader.scalar()?);
        Ok(if kind == HONEST_PROOF {
            ServerTagProof::Honest { t1, t2, t3, c, r1, r2: reader.scalar()? }
        } else {
            ServerTagProof::Misbehavior { t1, t2, t3, c, r1 }
        })
    }

    /// Decode one proof.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<ServerTagProof> {
        let mut reader = ByteReader::new(bytes);
        let proof = ServerTagProof::read(&mut reader)?;
        reader.finish("ServerTagProof")?;
        Ok(proof)
    }
}

serde_boilerplate!(ServerTagProof);

/// Request travelling through the servers, growing by one tag per hop.
///
/// # Encoding
///
/// ```text
/// request ‖ hops:u32be ‖ tags[hops] ‖ proofs[hops] ‖ indexes[hops]:u32be ‖ sigs[hops]
/// ```
///
/// The hop count precedes the lists since `hops ≤ m` varies while the
/// message travels.  Each proof carries its kind byte, see
/// `ServerTagProof`, and each of `sigs` is `index:u32be ‖ signature[64]`.
/// `request` is the `AuthenticationMessage` encoding, whose size follows
/// from `n` and `m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMessage {
    /// Client's original request
    pub request: AuthenticationMessage,
    /// `tags[k]`, the tag after the `k`th hop
    pub tags: Vec<RistrettoPoint>,
    /// Proof of each hop
    pub proofs: Vec<ServerTagProof>,
    /// Server that made each hop
    pub indexes: Vec<u32>,
    /// Signature of each hop over the chain so far
    pub sigs: Vec<ServerSignature>,
}

impl ServerMessage {
    /// Message no server has processed yet.
    pub fn new(request: AuthenticationMessage) -> ServerMessage {
        ServerMessage { request, tags: Vec::new(), proofs: Vec::new(), indexes: Vec::new(), sigs: Vec::new() }
    }

    /// Number of hops so far.
    pub fn hops(&self) -> usize {
        self.tags.len()
    }

    /// Tag the next server rewrites: the latest one, or `T0`.
    pub fn current_tag(&self) -> &RistrettoPoint {
        self.tags.last().unwrap_or(&self.request.initial.t0)
    }

    /// Lists of equal length.
    pub(crate) fn check_lengths(&self) -> DagaResult<()> {
        let k = self.tags.len();
        if self.proofs.len() != k || self.indexes.len() != k || self.sigs.len() != k {
            return Err(DagaError::InvalidInput("server message lists differ in length"));
        }
        Ok(())
    }

    /// Transcript signed by the `k`th hop:
    /// `request ‖ tags[..=k] ‖ proofs[..=k] ‖ indexes[..=k]`.
    pub(crate) fn hop_transcript(&self, request: &[u8], k: usize) -> Transcript {
        let mut bytes = request.to_vec();
        bytes.extend_from_slice(&group::encode_points(&self.tags[..=k]));
        for proof in &self.proofs[..=k] {
            bytes.extend_from_slice(&proof.to_bytes());
        }
        for index in &self.indexes[..=k] {
            bytes.extend_from_slice(&index.to_be_bytes());
        }
        signing_context(b"daga-server-message").bytes(&bytes)
    }

    /// `request ‖ count ‖ tags ‖ proofs ‖ indexes ‖ sigs`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.request.to_bytes();
        bytes.extend_from_slice(&(self.tags.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&group::encode_points(&self.tags));
        for proof in &self.proofs {
            bytes.extend_from_slice(&proof.to_bytes());
        }
        for index in &self.indexes {
            bytes.extend_from_slice(&index.to_be_bytes());
        }
        for sig in &self.sigs {
            bytes.extend_from_slice(&sig.to_bytes());
        }
        bytes
    }

    /// Decode a message of at most `m` hops sized for `context`.
    pub fn from_bytes(bytes: &[u8], context: &AuthenticationContext) -> DagaResult<ServerMessage> {
        let (n, m) = (context.client_count(), context.server_count());
        let mut reader = ByteReader::new(bytes);
        let request = AuthenticationMessage::read(&mut reader, n, m)?;
        let hops = reader.u32()? as usize;
        if hops > m {
            return Err(DagaError::InvalidInput("more hops than servers"));
        }
        if reader.remaining() < hops * (POINT_LENGTH + 4 + SERVER_SIGNATURE_LENGTH) {
            return Err(DagaError::BytesLength { name: "ServerMessage", length: bytes.len() });
        }
        let tags = reader.points(hops)?;
        let proofs = (0..hops).map(|_| ServerTagProof::read(&mut reader)).collect::<DagaResult<Vec<_>>>()?;
        let indexes = (0..hops).map(|_| reader.u32()).collect::<DagaResult<Vec<_>>>()?;
        let sigs = (0..hops).map(|_| ServerSignature::read(&mut reader)).collect::<DagaResult<Vec<_>>>()?;
        reader.finish("ServerMessage")?;
        Ok(ServerMessage { request, tags, proofs, indexes, sigs })
    }
}
