use alloc::vec::Vec;

use curve25519_dalek::scalar::Scalar;
use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, SeedableRng};

use super::*;
use crate::errors::DagaError;
use crate::group;
use crate::sigma::Commitments;

fn setup(n: usize, m: usize, seed: u8) -> (Vec<Client>, Vec<Server>, AuthenticationContext) {
    generate_context(n, m, ChaCha20Rng::from_seed([seed; 32])).unwrap()
}

/// Run one authentication by hand, returning the completed server message.
fn authenticate_raw(
    client: &Client,
    servers: &[Server],
    context: &AuthenticationContext,
    initial: InitialTagAndCommitments,
    opening: &Opening,
) -> ServerMessage {
    struct Recording<'a> {
        inner: LocalQuorum<'a, OsRng>,
        reply: Option<ServerMessage>,
    }
    impl Quorum for Recording<'_> {
        fn challenge(&mut self, context: &AuthenticationContext, commitments: &Commitments) -> crate::DagaResult<ChallengeBundle> {
            self.inner.challenge(context, commitments)
        }
        fn authenticate(&mut self, context: &AuthenticationContext, request: AuthenticationMessage) -> crate::DagaResult<ServerMessage> {
            let reply = self.inner.authenticate(context, request)?;
            self.reply = Some(reply.clone());
            Ok(reply)
        }
    }

    let mut quorum = Recording { inner: LocalQuorum::new(servers), reply: None };
    client.authenticate_with(context, &mut quorum, initial, opening, OsRng).unwrap();
    quorum.reply.unwrap()
}

#[test]
fn tags_link_within_a_context() {
    let (clients, servers, context) = setup(3, 3, 1);
    let mut quorum = LocalQuorum::new(&servers);

    let first = clients[0].authenticate(&context, &mut quorum).unwrap();
    let again = clients[0].authenticate(&context, &mut quorum).unwrap();
    let other = clients[1].authenticate(&context, &mut quorum).unwrap();
    assert_ne!(first, group::identity());
    assert_ne!(other, group::identity());
    assert_eq!(first, again);
    assert_ne!(first, other);

    // The final tag is (∏ r_j) H_i whatever the server order.
    let (clients2, servers2, context2) = setup(3, 3, 2);
    let mut quorum2 = LocalQuorum::new_rng(&servers2, ChaCha20Rng::from_seed([9u8; 32]));
    let tag = clients2[0].authenticate_rng(&context2, &mut quorum2, OsRng).unwrap();
    assert_ne!(tag, first);
    assert_eq!(tag, clients2[0].authenticate_rng(&context2, &mut quorum2, OsRng).unwrap());
}

#[test]
fn single_server_flags_inconsistent_commitments() {
    let (clients, servers, context) = setup(3, 1, 3);

    let honest = clients[2].authenticate(&context, &mut LocalQuorum::new(&servers)).unwrap();
    assert_ne!(honest, group::identity());

    // S_1 = identity = 0·B and T0 = 0·H, so the proof of knowledge holds
    // with s = 0 while the server's shared secret cannot match.
    let (mut initial, _) = clients[2].initial_tag_rng(&context, OsRng).unwrap();
    initial.s_commits[2] = group::identity();
    initial.t0 = group::identity();
    let opening = Opening { s: Scalar::ZERO };
    let reply = authenticate_raw(&clients[2], &servers, &context, initial, &opening);
    assert_eq!(finalize_tag(&context, &reply).unwrap(), group::identity());
    assert!(reply.proofs[0].is_misbehavior());
}

#[test]
fn every_server_flags_bogus_commitments() {
    let (clients, servers, context) = setup(3, 3, 4);
    let mut rng = ChaCha20Rng::from_seed([40u8; 32]);

    // Commitments unrelated to the shared secrets, with a consistent opening.
    let mut s = Scalar::ONE;
    let mut s_commits = alloc::vec![group::base() * group::random_nonzero_scalar(&mut rng), group::base()];
    for _ in 0..3 {
        s *= group::random_nonzero_scalar(&mut rng);
        s_commits.push(group::base() * s);
    }
    let t0 = context.generators()[1] * s;
    let initial = InitialTagAndCommitments { s_commits, t0 };
    let reply = authenticate_raw(&clients[1], &servers, &context, initial, &Opening { s });

    assert_eq!(finalize_tag(&context, &reply).unwrap(), group::identity());
    assert!(reply.proofs.iter().all(ServerTagProof::is_misbehavior));
    assert!(reply.tags.iter().all(|t| *t == group::identity()));
}

#[test]
fn lone_client_cannot_authenticate() {
    let (clients, servers, context) = setup(1, 2, 5);
    assert!(matches!(
        clients[0].authenticate(&context, &mut LocalQuorum::new(&servers)),
        Err(DagaError::InvalidInput(_))
    ));
}

#[test]
fn tampered_server_messages_are_rejected() {
    let (clients, servers, context) = setup(3, 2, 6);
    let (initial, opening) = clients[0].initial_tag_rng(&context, OsRng).unwrap();
    let reply = authenticate_raw(&clients[0], &servers, &context, initial, &opening);
    assert_ne!(finalize_tag(&context, &reply).unwrap(), group::identity());

    let rejected = |msg: &ServerMessage| {
        matches!(finalize_tag(&context, msg), Err(DagaError::BadSignature) | Err(DagaError::BadProof))
    };

    let mut bad = reply.clone();
    bad.tags[0] = bad.tags[0] + group::base();
    assert!(rejected(&bad));

    let mut bad = reply.clone();
    bad.tags[1] = group::identity();
    assert!(rejected(&bad));

    let mut bad = reply.clone();
    if let ServerTagProof::Honest { r2, .. } = &mut bad.proofs[1] {
        *r2 += Scalar::ONE;
    }
    assert!(rejected(&bad));

    let mut bad = reply.clone();
    bad.request.initial.t0 = bad.request.initial.t0 + group::base();
    assert!(rejected(&bad));

    let mut bad = reply.clone();
    bad.request.proof.responses[0] += Scalar::ONE;
    assert!(rejected(&bad));

    let mut bad = reply.clone();
    bad.request.proof.bundle.cs += Scalar::ONE;
    assert!(rejected(&bad));

    let mut bad = reply.clone();
    bad.sigs.swap(0, 1);
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadSignature));

    let mut bad = reply.clone();
    bad.indexes.swap(0, 1);
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadSignature));

    let mut bad = reply.clone();
    bad.indexes[1] = 7;
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadSignature));

    let mut bad = reply.clone();
    bad.sigs[1].index = bad.sigs[0].index;
    bad.indexes[1] = bad.indexes[0];
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadSignature));

    let mut bad = reply.clone();
    bad.request.proof.bundle.sigs[0].index = 9;
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadSignature));

    let mut bad = reply.clone();
    bad.request.initial.s_commits[1] = group::base() + group::base();
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadProof));

    let mut bad = reply.clone();
    bad.request.initial.s_commits[0] = group::identity();
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::BadProof));

    let mut bad = reply.clone();
    bad.request.context_id[0] ^= 1;
    assert_eq!(finalize_tag(&context, &bad), Err(DagaError::SessionMismatch));

    let mut partial = reply.clone();
    partial.tags.pop();
    partial.proofs.pop();
    partial.indexes.pop();
    partial.sigs.pop();
    assert!(verify_server_message(&context, &partial).is_ok());
    assert!(matches!(finalize_tag(&context, &partial), Err(DagaError::InvalidInput(_))));
    let hop = partial.indexes[0] as usize;
    assert_eq!(
        servers[hop].process_server_message(&context, partial),
        Err(DagaError::DuplicateSignature(hop as u32)),
    );
}

#[test]
fn transcripts_do_not_reveal_the_client() {
    let (clients, servers, context) = setup(4, 3, 11);
    let replies: Vec<ServerMessage> = [0usize, 3]
        .iter()
        .map(|&i| {
            let (initial, opening) = clients[i].initial_tag_rng(&context, OsRng).unwrap();
            authenticate_raw(&clients[i], &servers, &context, initial, &opening)
        })
        .collect();
    let (a, b) = (&replies[0], &replies[1]);

    assert_eq!(a.request.to_bytes().len(), b.request.to_bytes().len());
    assert_eq!(a.to_bytes().len(), b.to_bytes().len());
    for reply in &replies {
        verify_authentication_message(&context, &reply.request).unwrap();
        let proof = &reply.request.proof;
        assert_eq!(proof.commitments.len(), 3 * 4);
        assert_eq!(proof.sub_challenges.len(), 4);
        assert_eq!(proof.responses.len(), 2 * 4);
        // Simulated branches are indistinguishable from the real one.
        assert!(proof.sub_challenges.iter().all(|c| *c != Scalar::ZERO));
        assert!(proof.responses.iter().all(|r| *r != Scalar::ZERO));
        assert!(proof.commitments.iter().all(|t| *t != group::identity()));
        let sum: Scalar = proof.sub_challenges.iter().sum();
        assert_eq!(sum, proof.bundle.cs);
        assert!(reply.proofs.iter().all(|p| !p.is_misbehavior()));
    }
    let kinds = |r: &ServerMessage| r.proofs.iter().map(|p| p.to_bytes()[0]).collect::<Vec<u8>>();
    assert_eq!(kinds(a), kinds(b));
}

#[test]
fn quorum_gives_up_after_bounded_elections() {
    let (clients, mut servers, context) = setup(3, 3, 7);
    // Server 1 signs with a key the context does not list.
    servers[1] = Server::new(1, crate::Keypair::generate_with(OsRng), RoundSecret::generate_with(OsRng));
    let mut quorum = LocalQuorum::new(&servers).with_max_attempts(2);
    assert_eq!(clients[0].authenticate(&context, &mut quorum), Err(DagaError::BadSignature));
}

#[test]
fn challenge_generation_enforces_its_order() {
    let (_, servers, context) = setup(2, 2, 8);
    let commitments = Commitments(alloc::vec![group::base(); 6]);

    let (mut g0, c0) = servers[0].start_challenge_rng(&context, &commitments, OsRng).unwrap();
    let (mut g1, c1) = servers[1].start_challenge_rng(&context, &commitments, OsRng).unwrap();
    assert!(g1.open(0).is_err());
    g0.receive_commitment(&c1).unwrap();
    g1.receive_commitment(&c0).unwrap();
    assert_eq!(g1.receive_commitment(&c0), Err(DagaError::DuplicateSignature(0)));

    // Server 1 waits for the leader's opening.
    assert!(g1.open(0).is_err());
    let o0 = g0.open(0).unwrap();
    let mut forged = o0;
    forged.opening += Scalar::ONE;
    assert_eq!(g1.receive_opening(&forged), Err(DagaError::Misbehavior(0)));
    g1.receive_opening(&o0).unwrap();
    let o1 = g1.open(0).unwrap();
    g0.receive_opening(&o1).unwrap();

    let cs = g0.challenge().unwrap();
    assert_eq!(cs, g1.challenge().unwrap());
    assert_eq!(cs, o0.opening + o1.opening);

    // Whoever signs first leads, and nobody signs out of turn.
    assert!(servers[1].cosign(&g1, ChallengeBundle::new(cs)).is_ok());
    let bundle = servers[0].cosign(&g0, ChallengeBundle::new(cs)).unwrap();
    assert!(servers[0].cosign(&g0, bundle.clone()).is_err());
    let bundle = servers[1].cosign(&g1, bundle).unwrap();
    bundle.verify(&context, &commitments).unwrap();

    let mut duplicated = bundle.clone();
    duplicated.sigs[1] = duplicated.sigs[0];
    assert_eq!(duplicated.verify(&context, &commitments), Err(DagaError::DuplicateSignature(0)));

    let other = Commitments(alloc::vec![group::identity(); 6]);
    assert_eq!(bundle.verify(&context, &other), Err(DagaError::BadSignature));
}

#[test]
fn messages_decode_against_their_context() {
    let (clients, servers, context) = setup(3, 2, 9);
    let (initial, opening) = clients[2].initial_tag_rng(&context, OsRng).unwrap();
    let reply = authenticate_raw(&clients[2], &servers, &context, initial, &opening);

    let bytes = reply.to_bytes();
    let decoded = ServerMessage::from_bytes(&bytes, &context).unwrap();
    assert_eq!(decoded, reply);
    assert_eq!(finalize_tag(&context, &decoded), finalize_tag(&context, &reply));

    let request = reply.request.to_bytes();
    assert_eq!(request.len(), AuthenticationMessage::encoded_length(3, 2));
    assert_eq!(&bytes[..request.len()], &request[..]);
    assert_eq!(bytes[request.len()..request.len() + 4], 2u32.to_be_bytes());
    assert_eq!(bytes.len(), request.len() + 4 + 2 * (32 + (1 + 6 * 32) + 4 + (4 + 64)));
    assert_eq!(bytes[request.len() + 4 + 2 * 32], 1);
    assert_eq!(AuthenticationMessage::from_bytes(&request, &context).unwrap(), reply.request);
    assert!(ServerMessage::from_bytes(&bytes[..bytes.len() - 1], &context).is_err());

    let (_, _, bigger) = setup(4, 2, 9);
    assert!(AuthenticationMessage::from_bytes(&request, &bigger).is_err());

    for proof in &reply.proofs {
        let encoded = proof.to_bytes();
        assert_eq!(encoded.len(), proof.encoded_length());
        assert_eq!(ServerTagProof::from_bytes(&encoded).unwrap(), *proof);
    }
    let mut marker = reply.proofs[0].to_bytes();
    marker[0] = 7;
    assert_eq!(ServerTagProof::from_bytes(&marker), Err(DagaError::InvalidEncoding("ServerTagProof kind")));
}

#[test]
fn retiring_servers() {
    let (_, servers, context) = setup(2, 2, 10);
    assert_eq!(servers[0].round_commitment(), context.commitments()[0]);
    for server in servers {
        server.retire();
    }
}
