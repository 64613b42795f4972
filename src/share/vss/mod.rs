//! Pedersen verifiable secret sharing with complaints.
//!
//! A `Dealer` shares a secret `s` among a fixed list of verifiers using
//! two polynomials, `F` with `F(0) = s` and a blinding `G`, committed
//! jointly as `C_k = F_k B + G_k H`.  Each verifier receives its
//! `(F(i), G(i))` inside an `EncryptedDeal`, checks it against the
//! commitments, and broadcasts a signed `Response`.  A complaint
//! obliges the dealer to publish the deal in a `Justification`, which
//! either clears the complaint or proves the dealer faulty.
//!
//! Every message carries a session id binding the dealer, the verifiers,
//! the commitments and the threshold, so nothing replays across sessions.

use alloc::vec::Vec;

use aead::KeyInit;
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Nonce};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;

use super::poly::{self, PriShare, PubPoly};
use crate::errors::{DagaError, DagaResult};
use crate::group::{self, ByteReader, POINT_LENGTH, SCALAR_LENGTH};
use crate::keys::{PublicKey, PUBLIC_KEY_LENGTH};
use crate::sign::{Signature, SIGNATURE_LENGTH};
use crate::transcript::{signing_context, SigningTranscript};

mod aggregator;
mod dealer;
mod verifier;


pub use self::aggregator::Aggregator;
pub use self::dealer::Dealer;
pub use self::verifier::Verifier;

/// Length of a session id.
pub const SESSION_ID_LENGTH: usize = 32;

/// Length of the ChaCha20-Poly1305 nonce of an encrypted deal.
pub const ENCRYPTION_NONCE_LENGTH: usize = 12;

const CHACHA20POLY1305_KEY_LENGTH: usize = 32;

/// Hash binding a sharing session to its participants and parameters.
pub type SessionId = [u8; SESSION_ID_LENGTH];

/// Smallest threshold at which a majority of `n` verifiers is needed.
pub fn minimum_t(n: usize) -> usize {
    (n + 1) / 2
}

/// Size of a sharing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    /// Number of verifiers receiving a share
    pub participants: usize,
    /// Number of shares needed to recover the secret
    pub threshold: usize,
}

impl Parameters {
    /// Bundle `participants` and `threshold` without validating them.
    pub fn new(participants: usize, threshold: usize) -> Parameters {
        Parameters { participants, threshold }
    }

    /// Require `2 ≤ threshold ≤ participants`.
    pub fn validate(&self) -> DagaResult<()> {
        if self.threshold < 2 {
            return Err(DagaError::InvalidInput("threshold must be at least 2"));
        }
        if self.threshold > self.participants {
            return Err(DagaError::InvalidInput("threshold exceeds participants"));
        }
        if self.participants > u32::MAX as usize {
            return Err(DagaError::InvalidInput("too many participants"));
        }
        Ok(())
    }
}

/// Second base of the Pedersen commitments, with unknown logarithm to `B`.
pub fn pedersen_base(verifiers: &[PublicKey]) -> RistrettoPoint {
    let keys: Vec<u8> = verifiers.iter().flat_map(|v| v.to_bytes()).collect();
    group::hash_to_point(group::VSS_BASE_DOMAIN, &[&keys])
}

/// `Hash(dealer ‖ verifiers ‖ commitments ‖ t)`
pub fn session_id(
    dealer: &PublicKey,
    verifiers: &[PublicKey],
    commitments: &[RistrettoPoint],
    threshold: usize,
) -> SessionId {
    let keys: Vec<u8> = verifiers.iter().flat_map(|v| v.to_bytes()).collect();
    let commits = group::encode_points(commitments);
    let t = (threshold as u32).to_be_bytes();
    let digest = group::hash_bytes(
        group::VSS_SESSION_DOMAIN,
        &[&dealer.to_bytes()[..], &keys, &commits, &t[..]],
    );
    let mut sid = [0u8; SESSION_ID_LENGTH];
    sid.copy_from_slice(&digest[..SESSION_ID_LENGTH]);
    sid
}

/// One verifier's shares of `F` and `G` together with the public commitments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    /// Session this deal belongs to
    pub session_id: SessionId,
    /// `F(i+1)`
    pub sec_share: PriShare,
    /// `G(i+1)`
    pub rnd_share: PriShare,
    /// Threshold of the sharing
    pub threshold: u32,
    /// `C_k = F_k B + G_k H`
    pub commitments: Vec<RistrettoPoint>,
}

impl Deal {
    /// `sid ‖ t ‖ i ‖ F(i+1) ‖ G(i+1) ‖ C[t]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            SESSION_ID_LENGTH + 8 + 2 * SCALAR_LENGTH + self.commitments.len() * POINT_LENGTH,
        );
        bytes.extend_from_slice(&self.session_id);
        bytes.extend_from_slice(&self.threshold.to_be_bytes());
        bytes.extend_from_slice(&self.sec_share.index.to_be_bytes());
        bytes.extend_from_slice(self.sec_share.value.as_bytes());
        bytes.extend_from_slice(self.rnd_share.value.as_bytes());
        bytes.extend_from_slice(&group::encode_points(&self.commitments));
        bytes
    }

    /// Decode a deal; the threshold inside sizes the commitments.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<Deal> {
        let mut reader = ByteReader::new(bytes);
        let deal = Deal::read(&mut reader)?;
        reader.finish("Deal")?;
        Ok(deal)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> DagaResult<Deal> {
        let mut session_id = [0u8; SESSION_ID_LENGTH];
        session_id.copy_from_slice(reader.take(SESSION_ID_LENGTH, "SessionId")?);
        let threshold = reader.u32()?;
        let index = reader.u32()?;
        let sec = reader.scalar()?;
        let rnd = reader.scalar()?;
        if threshold as usize > reader.remaining() / POINT_LENGTH {
            return Err(DagaError::InvalidInput("deal threshold exceeds commitments"));
        }
        let commitments = reader.points(threshold as usize)?;
        Ok(Deal {
            session_id,
            sec_share: PriShare { index, value: sec },
            rnd_share: PriShare { index, value: rnd },
            threshold,
            commitments,
        })
    }

    /// Check this deal as the share of verifier `index` in session `sid`.
    ///
    /// Verifies `F(i+1) B + G(i+1) H = Σ_k (i+1)^k C_k`.
    pub fn verify(&self, h: &RistrettoPoint, index: u32, threshold: usize, sid: &SessionId) -> DagaResult<()> {
        if &self.session_id != sid {
            return Err(DagaError::SessionMismatch);
        }
        if self.threshold as usize != threshold || self.commitments.len() != threshold {
            return Err(DagaError::MismatchedThreshold);
        }
        if self.sec_share.index != index || self.rnd_share.index != index {
            return Err(DagaError::InvalidInput("deal addressed to another verifier"));
        }
        let commits = PubPoly::new(group::base(), self.commitments.clone())?;
        let expected = commits.eval(index).value;
        let actual = RistrettoPoint::vartime_double_scalar_mul_basepoint(
            &self.rnd_share.value,
            h,
            &self.sec_share.value,
        );
        if actual != expected {
            return Err(DagaError::Misbehavior(index));
        }
        Ok(())
    }
}

serde_boilerplate!(Deal);

/// A `Deal` encrypted to one verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDeal {
    /// Ephemeral Diffie-Hellman key of the dealer
    pub dh_key: PublicKey,
    /// Dealer's signature over the ephemeral key and nonce
    pub signature: Signature,
    /// ChaCha20-Poly1305 nonce
    pub nonce: [u8; ENCRYPTION_NONCE_LENGTH],
    /// Encrypted `Deal::to_bytes`
    pub cipher: Vec<u8>,
}

impl EncryptedDeal {
    /// `dh_key ‖ signature ‖ nonce ‖ cipher`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            PUBLIC_KEY_LENGTH + SIGNATURE_LENGTH + ENCRYPTION_NONCE_LENGTH + self.cipher.len(),
        );
        bytes.extend_from_slice(&self.dh_key.to_bytes());
        bytes.extend_from_slice(&self.signature.to_bytes());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.cipher);
        bytes
    }

    /// Decode an encrypted deal, the ciphertext taking the remaining bytes.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<EncryptedDeal> {
        let mut reader = ByteReader::new(bytes);
        let dh_key = PublicKey::from_bytes(reader.take(PUBLIC_KEY_LENGTH, "PublicKey")?)?;
        let signature = Signature::from_bytes(reader.take(SIGNATURE_LENGTH, "Signature")?)?;
        let mut nonce = [0u8; ENCRYPTION_NONCE_LENGTH];
        nonce.copy_from_slice(reader.take(ENCRYPTION_NONCE_LENGTH, "nonce")?);
        let cipher = reader.take(reader.remaining(), "cipher")?.to_vec();
        Ok(EncryptedDeal { dh_key, signature, nonce, cipher })
    }
}

serde_boilerplate!(EncryptedDeal);

fn dh_key_transcript(dh_key: &PublicKey, nonce: &[u8; ENCRYPTION_NONCE_LENGTH]) -> Transcript {
    let mut t = signing_context(b"vss-dh-key").bytes(&dh_key.to_bytes());
    t.append_message(b"nonce", nonce);
    t
}

/// Symmetric key both ends derive from the Diffie-Hellman point.
fn encryption_key(
    dealer: &PublicKey,
    verifier: &PublicKey,
    dh_key: &PublicKey,
    shared: &RistrettoPoint,
) -> [u8; CHACHA20POLY1305_KEY_LENGTH] {
    let mut t = Transcript::new(b"vss-encryption");
    t.commit_point(b"dealer", dealer.as_compressed());
    t.commit_point(b"verifier", verifier.as_compressed());
    t.commit_point(b"dh key", dh_key.as_compressed());
    t.commit_point(b"key exchange", &shared.compress());
    let mut key = [0u8; CHACHA20POLY1305_KEY_LENGTH];
    t.challenge_bytes(b"key", &mut key);
    key
}

fn encrypt(key: &[u8; CHACHA20POLY1305_KEY_LENGTH], nonce: &[u8; ENCRYPTION_NONCE_LENGTH], plaintext: &[u8]) -> DagaResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(&(*key).into());
    cipher
        .encrypt(Nonce::from_slice(&nonce[..]), plaintext)
        .map_err(|_| DagaError::InvalidInput("deal encryption failed"))
}

fn decrypt(key: &[u8; CHACHA20POLY1305_KEY_LENGTH], nonce: &[u8; ENCRYPTION_NONCE_LENGTH], ciphertext: &[u8]) -> DagaResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(&(*key).into());
    cipher
        .decrypt(Nonce::from_slice(&nonce[..]), ciphertext)
        .map_err(|_| DagaError::InvalidEncoding("encrypted deal"))
}

/// Verdict of a verifier on its deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The deal checked out
    Approval,
    /// The deal was invalid
    Complaint,
}

impl Status {
    fn to_byte(self) -> u8 {
        match self {
            Status::Approval => 1,
            Status::Complaint => 0,
        }
    }

    fn from_byte(b: u8) -> DagaResult<Status> {
        match b {
            1 => Ok(Status::Approval),
            0 => Ok(Status::Complaint),
            _ => Err(DagaError::InvalidEncoding("response status")),
        }
    }
}

/// Signed verdict broadcast by verifier `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Session this response belongs to
    pub session_id: SessionId,
    /// Index of the responding verifier
    pub index: u32,
    /// Approval or complaint
    pub status: Status,
    /// Verifier's signature over the fields above
    pub signature: Signature,
}

/// Length of an encoded `Response`.
pub const RESPONSE_LENGTH: usize = SESSION_ID_LENGTH + 4 + 1 + SIGNATURE_LENGTH;

fn response_transcript(session_id: &SessionId, index: u32, status: Status) -> Transcript {
    let mut t = signing_context(b"vss-response").bytes(session_id);
    t.commit_index(b"index", index);
    t.append_message(b"status", &[status.to_byte()]);
    t
}

impl Response {
    pub(crate) fn transcript(&self) -> Transcript {
        response_transcript(&self.session_id, self.index, self.status)
    }

    /// `sid ‖ index ‖ status ‖ signature`
    pub fn to_bytes(&self) -> [u8; RESPONSE_LENGTH] {
        let mut bytes = [0u8; RESPONSE_LENGTH];
        bytes[..SESSION_ID_LENGTH].copy_from_slice(&self.session_id);
        bytes[SESSION_ID_LENGTH..SESSION_ID_LENGTH + 4].copy_from_slice(&self.index.to_be_bytes());
        bytes[SESSION_ID_LENGTH + 4] = self.status.to_byte();
        bytes[SESSION_ID_LENGTH + 5..].copy_from_slice(&self.signature.to_bytes());
        bytes
    }

    /// Decode a response.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<Response> {
        if bytes.len() != RESPONSE_LENGTH {
            return Err(DagaError::BytesLength { name: "Response", length: RESPONSE_LENGTH });
        }
        let mut reader = ByteReader::new(bytes);
        let mut session_id = [0u8; SESSION_ID_LENGTH];
        session_id.copy_from_slice(reader.take(SESSION_ID_LENGTH, "SessionId")?);
        let index = reader.u32()?;
        let status = Status::from_byte(reader.u8()?)?;
        let signature = Signature::from_bytes(reader.take(SIGNATURE_LENGTH, "Signature")?)?;
        Ok(Response { session_id, index, status, signature })
    }
}

serde_boilerplate!(Response);

/// Dealer's answer to a complaint: the plaintext deal, signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Justification {
    /// Session this justification belongs to
    pub session_id: SessionId,
    /// Index of the complaining verifier
    pub index: u32,
    /// The deal originally sent to that verifier
    pub deal: Deal,
    /// Dealer's signature over the fields above
    pub signature: Signature,
}

fn justification_transcript(session_id: &SessionId, index: u32, deal: &Deal) -> Transcript {
    let mut t = signing_context(b"vss-justification").bytes(session_id);
    t.commit_index(b"index", index);
    t.append_message(b"deal", &deal.to_bytes());
    t
}

impl Justification {
    pub(crate) fn transcript(&self) -> Transcript {
        justification_transcript(&self.session_id, self.index, &self.deal)
    }

    /// `sid ‖ index ‖ signature ‖ deal`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.session_id);
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes.extend_from_slice(&self.signature.to_bytes());
        bytes.extend_from_slice(&self.deal.to_bytes());
        bytes
    }

    /// Decode a justification.
    pub fn from_bytes(bytes: &[u8]) -> DagaResult<Justification> {
        let mut reader = ByteReader::new(bytes);
        let mut session_id = [0u8; SESSION_ID_LENGTH];
        session_id.copy_from_slice(reader.take(SESSION_ID_LENGTH, "SessionId")?);
        let index = reader.u32()?;
        let signature = Signature::from_bytes(reader.take(SIGNATURE_LENGTH, "Signature")?)?;
        let deal = Deal::read(&mut reader)?;
        reader.finish("Justification")?;
        Ok(Justification { session_id, index, deal, signature })
    }
}

serde_boilerplate!(Justification);

/// Recover the shared secret from the deals of at least `t` verifiers.
///
/// All deals must come from one session.
pub fn recover_secret(deals: &[Deal], t: usize) -> DagaResult<Scalar> {
    let first = deals.first().ok_or(DagaError::InsufficientShares { needed: t, got: 0 })?;
    let mut shares = Vec::with_capacity(deals.len());
    for deal in deals {
        if deal.session_id != first.session_id {
            return Err(DagaError::SessionMismatch);
        }
        if deal.threshold as usize != t {
            return Err(DagaError::MismatchedThreshold);
        }
        shares.push(Some(deal.sec_share.clone()));
    }
    poly::recover_secret(&shares, t)
}
