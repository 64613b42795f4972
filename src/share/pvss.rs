//! Publicly verifiable secret sharing.
//!
//! A dealer shares `s` among holders of keys `X_i`: share `i` is
//! published encrypted as `p(i+1) X_i` together with a DLEQ proof
//! against the public polynomial committed under a second base `H`.
//! Anyone can check every encrypted share.  Holder `i` decrypts to
//! `p(i+1) B` with a DLEQ proof against its own key, and any `t`
//! decrypted shares recover `s B`.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};

use super::poly::{self, PriPoly, PubPoly, PubShare};
use crate::dleq::{self, DleqProof};
use crate::errors::{DagaError, DagaResult};
use crate::group;
use crate::keys::{Keypair, PublicKey};
use crate::transcript::SigningTranscript;

const ENC_LABEL: &[u8] = b"pvss-encrypted-shares";

/// Share `p(i+1) X_i` with its proof of consistency with the public polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedShare {
    /// Recipient index
    pub index: u32,
    /// `p(i+1) X_i`
    pub value: RistrettoPoint,
    /// `log_H(p(i+1) H) = log_{X_i}(p(i+1) X_i)`
    pub proof: DleqProof,
}

/// Share `p(i+1) B` with its proof of correct decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptedShare {
    /// Recipient index
    pub index: u32,
    /// `p(i+1) B`
    pub value: RistrettoPoint,
    /// `log_B(X_i) = log_{value}(p(i+1) X_i)`
    pub proof: DleqProof,
}

fn points(keys: &[PublicKey]) -> Vec<RistrettoPoint> {
    keys.iter().map(|k| *k.as_point()).collect()
}

fn dec_transcript(index: u32) -> merlin::Transcript {
    let mut t = merlin::Transcript::new(b"pvss-decrypted-share");
    t.commit_index(b"index", index);
    t
}

/// Share `secret` among `keys` with threshold `t`, committing under `h`.
pub fn enc_shares_rng<R>(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    secret: &Scalar,
    t: usize,
    mut rng: R,
) -> DagaResult<(Vec<EncryptedShare>, PubPoly)>
where
    R: RngCore + CryptoRng,
{
    if t == 0 || t > keys.len() {
        return Err(DagaError::InvalidInput("threshold must lie in 1..=n"));
    }
    let pri = PriPoly::new_rng(t, Some(*secret), &mut rng)?;
    let pub_poly = pri.commit(h);

    let values: Vec<Scalar> = pri.shares(keys.len()).iter().map(|s| s.value).collect();
    let hs = alloc::vec![*h; keys.len()];
    let xs = points(keys);
    let (proofs, _, enc) = dleq::prove_batch_rng(ENC_LABEL, &values, &hs, &xs, &mut rng)?;

    let shares = proofs
        .into_iter()
        .zip(enc)
        .enumerate()
        .map(|(i, (proof, value))| EncryptedShare { index: i as u32, value, proof })
        .collect();
    Ok((shares, pub_poly))
}

/// Share `secret` with the default randomness source.
#[cfg(feature = "getrandom")]
pub fn enc_shares(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    secret: &Scalar,
    t: usize,
) -> DagaResult<(Vec<EncryptedShare>, PubPoly)> {
    enc_shares_rng(h, keys, secret, t, getrandom_or_panic::getrandom_or_panic())
}

/// Check one encrypted share against the public polynomial.
pub fn verify_enc_share(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    pub_poly: &PubPoly,
    share: &EncryptedShare,
) -> DagaResult<()> {
    let i = share.index as usize;
    if i >= keys.len() {
        return Err(DagaError::InvalidInput("share index outside recipients"));
    }
    let hs = alloc::vec![*h; keys.len()];
    let xs = points(keys);
    let batch = dleq::batch_transcript(ENC_LABEL, &hs, &xs)?;
    let sh = pub_poly.eval(share.index).value;
    share.proof.verify(dleq::batch_member(&batch, share.index), h, &xs[i], &sh, &share.value)
}

/// Keep the encrypted shares that verify, dropping the rest.
pub fn verify_enc_shares(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    pub_poly: &PubPoly,
    shares: &[EncryptedShare],
) -> Vec<EncryptedShare> {
    shares.iter().filter(|s| verify_enc_share(h, keys, pub_poly, s).is_ok()).copied().collect()
}

/// Decrypt our share `S_i = x⁻¹ (p(i+1) X_i)` after checking it.
pub fn dec_share_rng<R>(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    pub_poly: &PubPoly,
    keypair: &Keypair,
    share: &EncryptedShare,
    rng: R,
) -> DagaResult<DecryptedShare>
where
    R: RngCore + CryptoRng,
{
    verify_enc_share(h, keys, pub_poly, share)?;
    if keys[share.index as usize] != keypair.public {
        return Err(DagaError::InvalidInput("share belongs to another recipient"));
    }
    let x = keypair.secret.scalar();
    let value = share.value * x.invert();
    let (proof, _, _) = DleqProof::prove_rng(dec_transcript(share.index), x, &group::base(), &value, rng);
    Ok(DecryptedShare { index: share.index, value, proof })
}

/// Decrypt our share with the default randomness source.
#[cfg(feature = "getrandom")]
pub fn dec_share(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    pub_poly: &PubPoly,
    keypair: &Keypair,
    share: &EncryptedShare,
) -> DagaResult<DecryptedShare> {
    dec_share_rng(h, keys, pub_poly, keypair, share, getrandom_or_panic::getrandom_or_panic())
}

/// Decrypt every share addressed to `keypair`, skipping invalid ones.
pub fn dec_share_batch_rng<R>(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    pub_poly: &PubPoly,
    keypair: &Keypair,
    shares: &[EncryptedShare],
    mut rng: R,
) -> Vec<DecryptedShare>
where
    R: RngCore + CryptoRng,
{
    shares
        .iter()
        .filter_map(|s| dec_share_rng(h, keys, pub_poly, keypair, s, &mut rng).ok())
        .collect()
}

/// Check a decrypted share against its encrypted form and the recipient key.
pub fn verify_dec_share(key: &PublicKey, enc: &EncryptedShare, dec: &DecryptedShare) -> DagaResult<()> {
    if enc.index != dec.index {
        return Err(DagaError::InvalidInput("share indices differ"));
    }
    dec.proof.verify(dec_transcript(dec.index), &group::base(), &dec.value, key.as_point(), &enc.value)
}

/// Recover `s B` from the shares that verify.
///
/// Every decrypted share must match a valid encrypted share with the same
/// index.  Fails with `InsufficientShares` when fewer than `t` survive.
pub fn recover_secret(
    h: &RistrettoPoint,
    keys: &[PublicKey],
    pub_poly: &PubPoly,
    enc: &[EncryptedShare],
    dec: &[DecryptedShare],
    t: usize,
) -> DagaResult<RistrettoPoint> {
    let mut valid: Vec<Option<PubShare>> = Vec::with_capacity(dec.len());
    for d in dec {
        let Some(e) = enc.iter().find(|e| e.index == d.index) else { continue };
        let Some(key) = keys.get(d.index as usize) else { continue };
        if verify_enc_share(h, keys, pub_poly, e).is_err() || verify_dec_share(key, e, d).is_err() {
            continue;
        }
        valid.push(Some(PubShare { index: d.index, value: d.value }));
    }
    poly::recover_commit(&valid, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    struct Setup {
        h: RistrettoPoint,
        keypairs: Vec<Keypair>,
        keys: Vec<PublicKey>,
        secret: Scalar,
    }

    fn setup(n: usize) -> Setup {
        let h = group::hash_to_point(b"pvss test", &[]);
        let keypairs: Vec<Keypair> = (0..n).map(|_| Keypair::generate_with(OsRng)).collect();
        let keys = keypairs.iter().map(|k| k.public).collect();
        Setup { h, keypairs, keys, secret: group::random_scalar(&mut OsRng) }
    }

    #[test]
    fn pvss_end_to_end() {
        let (n, t) = (6usize, 4usize);
        let s = setup(n);
        let (enc, pub_poly) = enc_shares_rng(&s.h, &s.keys, &s.secret, t, OsRng).unwrap();
        assert_eq!(pub_poly.commit(), s.h * s.secret);
        assert_eq!(verify_enc_shares(&s.h, &s.keys, &pub_poly, &enc).len(), n);

        let dec: Vec<DecryptedShare> = enc
            .iter()
            .zip(s.keypairs.iter())
            .map(|(e, kp)| dec_share_rng(&s.h, &s.keys, &pub_poly, kp, e, OsRng).unwrap())
            .collect();
        for ((e, d), key) in enc.iter().zip(dec.iter()).zip(s.keys.iter()) {
            verify_dec_share(key, e, d).unwrap();
        }
        let recovered = recover_secret(&s.h, &s.keys, &pub_poly, &enc, &dec, t).unwrap();
        assert_eq!(recovered, group::base() * s.secret);
    }

    #[test]
    fn pvss_tolerates_up_to_n_minus_t_corruptions() {
        let (n, t) = (10usize, 7usize);
        let s = setup(n);
        let (mut enc, pub_poly) = enc_shares_rng(&s.h, &s.keys, &s.secret, t, OsRng).unwrap();

        for i in [0usize, 5] {
            enc[i].value += group::base();
        }
        let valid = verify_enc_shares(&s.h, &s.keys, &pub_poly, &enc);
        assert_eq!(valid.len(), n - 2);

        let mut dec: Vec<DecryptedShare> = Vec::new();
        for (i, kp) in s.keypairs.iter().enumerate() {
            let res = dec_share_rng(&s.h, &s.keys, &pub_poly, kp, &enc[i], OsRng);
            if i == 0 || i == 5 {
                assert_eq!(res.unwrap_err(), DagaError::BadProof);
            } else {
                dec.push(res.unwrap());
            }
        }
        // dec holds indices 1,2,3,4,6,7,8,9.
        dec[0].value += group::base();
        let recovered = recover_secret(&s.h, &s.keys, &pub_poly, &enc, &dec, t).unwrap();
        assert_eq!(recovered, group::base() * s.secret);

        dec[1].proof.r += Scalar::ONE;
        assert_eq!(
            recover_secret(&s.h, &s.keys, &pub_poly, &enc, &dec, t),
            Err(DagaError::InsufficientShares { needed: t, got: t - 1 }),
        );
    }

    #[test]
    fn decrypting_someone_elses_share_fails() {
        let s = setup(3);
        let (enc, pub_poly) = enc_shares_rng(&s.h, &s.keys, &s.secret, 2, OsRng).unwrap();
        let res = dec_share_rng(&s.h, &s.keys, &pub_poly, &s.keypairs[1], &enc[0], OsRng);
        assert!(matches!(res, Err(DagaError::InvalidInput(_))));

        let batch = dec_share_batch_rng(&s.h, &s.keys, &pub_poly, &s.keypairs[1], &enc, OsRng);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].index, 1);

        // An honest proof moved to another index no longer verifies.
        let mut moved = enc[1];
        moved.index = 2;
        assert!(verify_enc_share(&s.h, &s.keys, &pub_poly, &moved).is_err());

        assert!(enc_shares_rng(&s.h, &s.keys, &s.secret, 4, OsRng).is_err());
    }
}
