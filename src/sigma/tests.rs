use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, SeedableRng};

use super::*;
use crate::group;
use crate::transcript::signing_context;

/// OR over `n` branches of `T0 = s H_k ∧ S = s B ∧ X_k = x_k B`, true at `index`.
struct Membership {
    statement: Statement,
    predicate: Predicate,
    witness: Witness,
}

fn membership(n: usize, index: usize) -> Membership {
    let mut rng = ChaCha20Rng::from_seed([7u8; 32]);
    let s = group::random_scalar(&mut rng);
    let xs: Vec<Scalar> = (0..n).map(|_| group::random_scalar(&mut rng)).collect();
    let hs: Vec<RistrettoPoint> = (0..n).map(|_| group::base() * group::random_scalar(&mut rng)).collect();

    let mut statement = Statement::new();
    let s_var = statement.allocate_scalar("s");
    let b = statement.allocate_point("B", group::base());
    let t0 = statement.allocate_point("T0", hs[index] * s);
    let sm = statement.allocate_point("S", group::base() * s);
    let mut branches = Vec::new();
    let mut x_vars = Vec::new();
    for k in 0..n {
        let x = statement.allocate_scalar("x");
        let xk = statement.allocate_point("X", group::base() * xs[k]);
        let hk = statement.allocate_point("H", hs[k]);
        branches.push(Predicate::and(alloc::vec![
            Predicate::rep(t0, s_var, hk),
            Predicate::rep(sm, s_var, b),
            Predicate::rep(xk, x, b),
        ]));
        x_vars.push(x);
    }
    let predicate = Predicate::or(branches);

    let mut witness = Witness::new(&statement);
    witness.set(s_var, s);
    witness.set(x_vars[index], xs[index]);
    Membership { statement, predicate, witness }
}

#[test]
fn shape_of_membership_proof() {
    let m = membership(4, 1);
    assert_eq!(
        m.predicate.shape().unwrap(),
        Shape { commitments: 12, sub_challenges: 4, responses: 8 },
    );
}

#[test]
fn interactive_run_completes() {
    let m = membership(3, 2);
    let mut prover = Prover::new(&m.statement, &m.predicate, &m.witness, &[2]).unwrap();
    let mut verifier = Verifier::new(&m.statement, &m.predicate).unwrap();

    let proof = run(&mut prover, &mut verifier, OsRng, |_| true).unwrap();
    assert_eq!(prover.phase(), Phase::Complete);
    assert_eq!(verifier.phase(), Phase::Complete);

    let sum: Scalar = proof.sub_challenges.iter().sum();
    assert_eq!(sum, proof.challenge);
    proof.check(&m.statement, &m.predicate).unwrap();

    let shape = m.predicate.shape().unwrap();
    let bytes = proof.to_bytes();
    assert_eq!(bytes.len(), Proof::encoded_length(shape));
    assert_eq!(Proof::from_bytes(&bytes, shape).unwrap(), proof);
}

#[test]
fn fiat_shamir_proof_rejects_tampering() {
    let m = membership(4, 0);
    let ctx = signing_context(b"sigma test");
    let proof = prove_rng(ctx.bytes(b"msg"), &m.statement, &m.predicate, &m.witness, &[0], OsRng).unwrap();
    verify(ctx.bytes(b"msg"), &m.statement, &m.predicate, &proof).unwrap();
    assert_eq!(verify(ctx.bytes(b"other"), &m.statement, &m.predicate, &proof), Err(DagaError::BadProof));

    let mut bad = proof.clone();
    bad.commitments[5] += group::base();
    assert_eq!(verify(ctx.bytes(b"msg"), &m.statement, &m.predicate, &bad), Err(DagaError::BadProof));

    let mut bad = proof.clone();
    bad.sub_challenges[1] += Scalar::ONE;
    assert_eq!(bad.check(&m.statement, &m.predicate), Err(DagaError::BadProof));

    // Moving weight between branches keeps the sum but breaks the equations.
    let mut bad = proof.clone();
    bad.sub_challenges[1] += Scalar::ONE;
    bad.sub_challenges[2] -= Scalar::ONE;
    assert_eq!(bad.check(&m.statement, &m.predicate), Err(DagaError::BadProof));

    let mut bad = proof.clone();
    bad.responses[3] += Scalar::ONE;
    assert_eq!(bad.check(&m.statement, &m.predicate), Err(DagaError::BadProof));

    let mut bad = proof;
    bad.responses.pop();
    assert!(matches!(bad.check(&m.statement, &m.predicate), Err(DagaError::InvalidInput(_))));
}

#[test]
fn wrong_witness_does_not_verify() {
    let m = membership(3, 1);
    // Claim branch 0 with a made up key.
    let mut witness = m.witness.clone();
    witness.set(ScalarVar(1), group::random_scalar(&mut OsRng));
    let ctx = signing_context(b"sigma test");
    let proof = prove_rng(ctx.bytes(b""), &m.statement, &m.predicate, &witness, &[0], OsRng).unwrap();
    assert_eq!(verify(ctx.bytes(b""), &m.statement, &m.predicate, &proof), Err(DagaError::BadProof));
}

#[test]
fn missing_witness_fails_before_commitments() {
    let m = membership(3, 1);
    let res = Prover::new(&m.statement, &m.predicate, &m.witness, &[2]);
    assert!(matches!(res, Err(DagaError::InvalidInput(_))));
    let res = Prover::new(&m.statement, &m.predicate, &m.witness, &[3]);
    assert!(matches!(res, Err(DagaError::InvalidInput(_))));
    let res = Prover::new(&m.statement, &m.predicate, &m.witness, &[]);
    assert!(matches!(res, Err(DagaError::InvalidInput(_))));
}

#[test]
fn abort_at_any_boundary() {
    let m = membership(2, 0);
    for stop in [Phase::AwaitMasterChallenge, Phase::AwaitResponses, Phase::Complete] {
        let mut prover = Prover::new(&m.statement, &m.predicate, &m.witness, &[0]).unwrap();
        let mut verifier = Verifier::new(&m.statement, &m.predicate).unwrap();
        let res = run(&mut prover, &mut verifier, OsRng, |phase| phase != stop);
        assert_eq!(res, Err(DagaError::Aborted));
        assert_eq!(prover.phase(), Phase::Aborted);
        assert_eq!(verifier.phase(), Phase::Aborted);
        assert_eq!(prover.respond(&Scalar::ONE).unwrap_err(), DagaError::Aborted);
        assert_eq!(verifier.set_challenge(Scalar::ONE).unwrap_err(), DagaError::Aborted);
    }
}

#[test]
fn steps_out_of_order_are_rejected() {
    let m = membership(2, 1);
    let mut prover = Prover::new(&m.statement, &m.predicate, &m.witness, &[1]).unwrap();
    assert!(matches!(prover.respond(&Scalar::ONE), Err(DagaError::InvalidInput(_))));
    let commitments = prover.commit(OsRng).unwrap();
    assert!(matches!(prover.commit(OsRng), Err(DagaError::InvalidInput(_))));

    let mut verifier = Verifier::new(&m.statement, &m.predicate).unwrap();
    assert!(matches!(verifier.set_challenge(Scalar::ONE), Err(DagaError::InvalidInput(_))));
    let mut short = commitments.clone();
    short.0.pop();
    assert!(matches!(verifier.receive_commitments(short), Err(DagaError::InvalidInput(_))));
    verifier.receive_commitments(commitments).unwrap();
    let cs = verifier.challenge_rng(OsRng).unwrap();
    let responses = prover.respond(&cs).unwrap();
    verifier.verify_responses(responses).unwrap();
}

#[test]
fn nested_disjunctions() {
    // (a = x B ∧ (b = y B ∨ c = z B)) ∨ d = w B, knowing x and z only.
    let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
    let (x, y, z, w) = (
        group::random_scalar(&mut rng),
        group::random_scalar(&mut rng),
        group::random_scalar(&mut rng),
        group::random_scalar(&mut rng),
    );
    let mut statement = Statement::new();
    let vars: Vec<ScalarVar> = ["x", "y", "z", "w"].iter().map(|n| statement.allocate_scalar(*n)).collect();
    let b = statement.allocate_point("B", group::base());
    let points: Vec<PointVar> = [x, y, z, w]
        .iter()
        .map(|s| statement.allocate_point("P", group::base() * s))
        .collect();
    let predicate = Predicate::or(alloc::vec![
        Predicate::and(alloc::vec![
            Predicate::rep(points[0], vars[0], b),
            Predicate::or(alloc::vec![
                Predicate::rep(points[1], vars[1], b),
                Predicate::rep(points[2], vars[2], b),
            ]),
        ]),
        Predicate::rep(points[3], vars[3], b),
    ]);
    let mut witness = Witness::new(&statement);
    witness.set(vars[0], x);
    witness.set(vars[2], z);

    let ctx = signing_context(b"nested");
    let proof = prove_rng(ctx.bytes(b""), &statement, &predicate, &witness, &[0, 1], OsRng).unwrap();
    verify(ctx.bytes(b""), &statement, &predicate, &proof).unwrap();
    assert_eq!(proof.sub_challenges.len(), 4);

    // Claiming the inner branch we cannot open fails up front.
    assert!(Prover::new(&statement, &predicate, &witness, &[0, 0]).is_err());
    // The whole left side is simulated when we pick the right branch, but we lack w.
    assert!(Prover::new(&statement, &predicate, &witness, &[1, 0]).is_err());
}
