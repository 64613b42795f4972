//! Authentication contexts and per-round server secrets.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{DagaError, DagaResult};
use crate::group::{self, ByteReader, POINT_LENGTH};
use crate::keys::{PublicKey, PUBLIC_KEY_LENGTH};

/// Length of a context identifier.
pub const CONTEXT_ID_LENGTH: usize = 32;

/// Hash of the canonical encoding of an `AuthenticationContext`.
pub type ContextId = [u8; CONTEXT_ID_LENGTH];

/// Secret `r_j` behind a server's round commitment `R_j = r_j B`.
///
/// Never serialized.  Dropping or retiring it overwrites the scalar.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RoundSecret {
    r: Scalar,
}

impl RoundSecret {
    /// Fresh round secret.
    pub fn generate_with<R: RngCore + CryptoRng>(mut rng: R) -> RoundSecret {
        RoundSecret { r: group::random_nonzero_scalar(&mut rng) }
    }

    /// Fresh round secret from the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn generate() -> RoundSecret {
        Self::generate_with(getrandom_or_panic::getrandom_or_panic())
    }

    /// Published commitment `R_j`.
    pub fn commitment(&self) -> RistrettoPoint {
        group::base() * self.r
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.r
    }

    /// Erase the secret once its context expires.
    pub fn retire(self) {}
}

impl core::fmt::Debug for RoundSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "RoundSecret(..)")
    }
}

/// `H_i = Hash(i ‖ R_1 ‖ .. ‖ R_m)`, mapped onto the group.
fn derive_generators(n: usize, commitments: &[RistrettoPoint]) -> Vec<RistrettoPoint> {
    let rs = group::encode_points(commitments);
    (0..n as u32)
        .map(|i| group::hash_to_point(group::GENERATOR_DOMAIN, &[&i.to_be_bytes()[..], &rs]))
        .collect()
}

/// Public parameters of one authentication round.
///
/// Immutable once built and freely shared between clients and servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationContext {
    clients: Vec<PublicKey>,
    servers: Vec<PublicKey>,
    generators: Vec<RistrettoPoint>,
    commitments: Vec<RistrettoPoint>,
    id: ContextId,
}

impl AuthenticationContext {
    /// Context for clients `X`, servers `Y` and server round commitments `R`.
    ///
    /// The per-client generators `H` are derived from `R` alone, so no
    /// client can influence them.
    pub fn new(
        clients: Vec<PublicKey>,
        servers: Vec<PublicKey>,
        commitments: Vec<RistrettoPoint>,
    ) -> DagaResult<AuthenticationContext> {
        if clients.is_empty() {
            return Err(DagaError::InvalidInput("context without clients"));
        }
        if servers.is_empty() {
            return Err(DagaError::InvalidInput("context without servers"));
        }
        if servers.len() != commitments.len() {
            return Err(DagaError::InvalidInput("one round commitment per server required"));
        }
        if clients.len() > u32::MAX as usize || servers.len() > u32::MAX as usize {
            return Err(DagaError::InvalidInput("context too large"));
        }
        for r in &commitments {
            group::ensure_not_identity(r, "identity round commitment")?;
        }
        let generators = derive_generators(clients.len(), &commitments);
        let distinct: BTreeSet<[u8; POINT_LENGTH]> = generators.iter().map(group::encode_point).collect();
        if distinct.len() != generators.len() {
            return Err(DagaError::InvalidInput("client generators collide"));
        }
        let mut context = AuthenticationContext { clients, servers, generators, commitments, id: [0u8; CONTEXT_ID_LENGTH] };
        let digest = group::hash_bytes(group::CONTEXT_ID_DOMAIN, &[&context.to_bytes()]);
        context.id.copy_from_slice(&digest[..CONTEXT_ID_LENGTH]);
        Ok(context)
    }

    /// Client keys `X`.
    pub fn clients(&self) -> &[PublicKey] {
        &self.clients
    }

    /// Server keys `Y`.
    pub fn servers(&self) -> &[PublicKey] {
        &self.servers
    }

    /// Per-client generators `H`.
    pub fn generators(&self) -> &[RistrettoPoint] {
        &self.generators
    }

    /// Server round commitments `R`.
    pub fn commitments(&self) -> &[RistrettoPoint] {
        &self.commitments
    }

    /// Number of clients `n`.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of servers `m`.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Identifier every message bound to this context carries.
    pub fn id(&self) -> &ContextId {
        &self.id
    }

    /// Byte length of the encoding of a context with `n` clients and `m` servers.
    pub fn encoded_length(n: usize, m: usize) -> usize {
        (2 * n + 2 * m) * POINT_LENGTH
    }

    /// `X ‖ Y ‖ H ‖ R`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::encoded_length(self.clients.len(), self.servers.len()));
        for k in self.clients.iter().chain(self.servers.iter()) {
            bytes.extend_from_slice(&k.to_bytes());
        }
        bytes.extend_from_slice(&group::encode_points(&self.generators));
        bytes.extend_from_slice(&group::encode_points(&self.commitments));
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, n: usize, m: usize) -> DagaResult<AuthenticationContext> {
        let mut keys = |count: usize| -> DagaResult<Vec<PublicKey>> {
            (0..count)
                .map(|_| PublicKey::from_bytes(reader.take(PUBLIC_KEY_LENGTH, "PublicKey")?))
                .collect()
        };
        let clients = keys(n)?;
        let servers = keys(m)?;
        let generators = reader.points(n)?;
        let commitments = reader.points(m)?;
        let context = AuthenticationContext::new(clients, servers, commitments)?;
        if context.generators != generators {
            return Err(DagaError::InvalidInput("generators do not derive from the round commitments"));
        }
        Ok(context)
    }

    /// Decode a context of `n` clients and `m` servers, re-deriving `H`.
    pub fn from_bytes(bytes: &[u8], n: usize, m: usize) -> DagaResult<AuthenticationContext> {
        let mut reader = ByteReader::new(bytes);
        let context = AuthenticationContext::read(&mut reader, n, m)?;
        reader.finish("AuthenticationContext")?;
        Ok(context)
    }

    /// Fail with `SessionMismatch` unless `id` names this context.
    pub fn check_id(&self, id: &ContextId) -> DagaResult<()> {
        if &self.id != id {
            return Err(DagaError::SessionMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    fn keys(n: usize, rng: &mut ChaCha20Rng) -> Vec<PublicKey> {
        (0..n).map(|_| Keypair::generate_with(&mut *rng).public).collect()
    }

    #[test]
    fn generators_follow_round_commitments() {
        let mut rng = ChaCha20Rng::from_seed([5u8; 32]);
        let (x, y) = (keys(4, &mut rng), keys(2, &mut rng));
        let secrets: Vec<RoundSecret> = (0..2).map(|_| RoundSecret::generate_with(&mut rng)).collect();
        let r: Vec<RistrettoPoint> = secrets.iter().map(|s| s.commitment()).collect();

        let ctx = AuthenticationContext::new(x.clone(), y.clone(), r.clone()).unwrap();
        assert_eq!(ctx.generators().len(), 4);
        assert_eq!(ctx, AuthenticationContext::new(x.clone(), y.clone(), r.clone()).unwrap());

        let other_r = alloc::vec![r[1], r[0]];
        let other = AuthenticationContext::new(x, y, other_r).unwrap();
        assert_ne!(ctx.generators(), other.generators());
        assert_ne!(ctx.id(), other.id());
        assert_eq!(ctx.check_id(other.id()), Err(DagaError::SessionMismatch));
    }

    #[test]
    fn decoding_rederives_generators() {
        let mut rng = ChaCha20Rng::from_seed([6u8; 32]);
        let (x, y) = (keys(3, &mut rng), keys(2, &mut rng));
        let r = alloc::vec![group::base() * Scalar::from(3u8), group::base() * Scalar::from(5u8)];
        let ctx = AuthenticationContext::new(x, y, r).unwrap();

        let mut bytes = ctx.to_bytes();
        assert_eq!(bytes.len(), AuthenticationContext::encoded_length(3, 2));
        assert_eq!(AuthenticationContext::from_bytes(&bytes, 3, 2).unwrap(), ctx);
        assert!(AuthenticationContext::from_bytes(&bytes, 2, 3).is_err());

        // Swap H_0 and H_1.
        let h = 5 * POINT_LENGTH;
        let (a, b) = bytes[h..h + 2 * POINT_LENGTH].split_at_mut(POINT_LENGTH);
        a.swap_with_slice(b);
        assert!(matches!(
            AuthenticationContext::from_bytes(&bytes, 3, 2),
            Err(DagaError::InvalidInput(_))
        ));
    }

    #[test]
    fn malformed_contexts_are_rejected() {
        let mut rng = ChaCha20Rng::from_seed([7u8; 32]);
        let (x, y) = (keys(2, &mut rng), keys(2, &mut rng));
        let r = alloc::vec![group::base(); 2];
        assert!(AuthenticationContext::new(Vec::new(), y.clone(), r.clone()).is_err());
        assert!(AuthenticationContext::new(x.clone(), Vec::new(), Vec::new()).is_err());
        assert!(AuthenticationContext::new(x.clone(), y.clone(), r[..1].to_vec()).is_err());
        assert!(AuthenticationContext::new(x, y, alloc::vec![group::base(), group::identity()]).is_err());
    }
}
