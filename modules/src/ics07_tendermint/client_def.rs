//! The Tendermint light client: header verification, misbehaviour detection and verification
//! of counterparty state proofs against a trusted consensus state.

use prost::Message;

use crate::ics02_client::height::Height;
use crate::ics03_connection::connection::ConnectionEnd;
use crate::ics04_channel::channel::ChannelEnd;
use crate::ics04_channel::packet::Sequence;
use crate::ics07_tendermint::client_state::{ClientState, TrustThreshold};
use crate::ics07_tendermint::consensus_state::ConsensusState;
use crate::ics07_tendermint::error::{Error, Kind};
use crate::ics07_tendermint::header::{canonical_sign_bytes, Header};
use crate::ics07_tendermint::misbehaviour::Misbehaviour;
use crate::ics23_commitment::commitment::{CommitmentPrefix, CommitmentProofBytes};
use crate::ics23_commitment::merkle;
use crate::ics23_commitment::specs::ProofSpecs;
use crate::ics24_host::identifier::{ChannelId, ConnectionId, PortId};
use crate::ics24_host::path::Path;
use crate::proto::{RawChannel, RawConnectionEnd};
use crate::timestamp::Timestamp;

/// Outcome of submitting a header that passed verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The header extends the client.
    Updated {
        client_state: ClientState,
        consensus_state: ConsensusState,
    },
    /// The header conflicts with a consensus state the client already holds at the same
    /// height; the returned client state is frozen.
    Frozen { client_state: ClientState },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TendermintClient {
    specs: ProofSpecs,
}

impl TendermintClient {
    pub fn new(specs: ProofSpecs) -> Self {
        Self { specs }
    }

    /// Verifies `header` against the consensus state at its trusted height and decides how the
    /// client moves. `existing` is the consensus state the client already holds at the header
    /// height, if any.
    pub fn check_header_and_update_state(
        &self,
        client_state: &ClientState,
        trusted: &ConsensusState,
        existing: Option<&ConsensusState>,
        header: &Header,
        now: Timestamp,
    ) -> Result<UpdateOutcome, Error> {
        if client_state.is_frozen() {
            return Err(Kind::ClientFrozen.into());
        }

        if header.height() <= client_state.latest_height() {
            let low_height = || {
                Kind::LowHeaderHeight {
                    header: header.height(),
                    latest: client_state.latest_height(),
                }
            };
            let existing = existing.ok_or_else(low_height)?;

            self.verify_header(client_state, trusted, header, now)?;
            if ConsensusState::from(header) == *existing {
                return Err(low_height().into());
            }

            return Ok(UpdateOutcome::Frozen {
                client_state: client_state.clone().with_frozen_height(header.height()),
            });
        }

        self.verify_header(client_state, trusted, header, now)?;

        Ok(UpdateOutcome::Updated {
            client_state: client_state.clone().with_header(header),
            consensus_state: ConsensusState::from(header),
        })
    }

    /// Checks that `header` is a validly signed descendant of the `trusted` consensus state.
    pub fn verify_header(
        &self,
        client_state: &ClientState,
        trusted: &ConsensusState,
        header: &Header,
        now: Timestamp,
    ) -> Result<(), Error> {
        if client_state.is_frozen() {
            return Err(Kind::ClientFrozen.into());
        }

        let block = &header.signed_header.header;
        let commit = &header.signed_header.commit;

        if block.chain_id != client_state.chain_id {
            return Err(Kind::ChainIdMismatch {
                header: block.chain_id.to_string(),
                client: client_state.chain_id.to_string(),
            }
            .into());
        }
        if header.trusted_height >= header.height() {
            return Err(Kind::InvalidRawHeader(format!(
                "trusted height {} is not below header height {}",
                header.trusted_height,
                header.height()
            ))
            .into());
        }
        if commit.height != block.height || commit.block_hash != block.hash() {
            return Err(Kind::InvalidCommit(format!(
                "commit for height {} does not sign this header",
                commit.height
            ))
            .into());
        }

        self.check_time(client_state, trusted, header, now)?;
        check_validator_hashes(trusted, header)?;

        let sign_bytes = canonical_sign_bytes(&block.chain_id, block.height, &commit.block_hash);
        let (trusted_signed, own_signed) = tally(header, &sign_bytes)?;

        // More than two thirds of the trusted validators must vouch for the header.
        let trusted_total = header.trusted_validator_set.total_voting_power();
        if !TrustThreshold::TWO_THIRDS.is_exceeded(trusted_signed, trusted_total) {
            return Err(Kind::InsufficientVotingPower {
                signed: trusted_signed,
                total: trusted_total,
                threshold: format!("{} of the trusted validators", TrustThreshold::TWO_THIRDS),
            }
            .into());
        }

        let own_total = header.validator_set.total_voting_power();
        if !client_state.trust_level.is_exceeded(own_signed, own_total) {
            return Err(Kind::InsufficientVotingPower {
                signed: own_signed,
                total: own_total,
                threshold: format!("{} of the header validators", client_state.trust_level),
            }
            .into());
        }

        Ok(())
    }

    fn check_time(
        &self,
        client_state: &ClientState,
        trusted: &ConsensusState,
        header: &Header,
        now: Timestamp,
    ) -> Result<(), Error> {
        if client_state.expired(trusted.timestamp, now) {
            return Err(Kind::ClientExpired.into());
        }

        let time = header.timestamp();
        let window_end = trusted
            .timestamp
            .checked_add(client_state.trusting_period)
            .and_then(|t| t.checked_add(client_state.max_clock_drift));
        match window_end {
            Some(end) if time >= trusted.timestamp && time <= end => {}
            _ => return Err(Kind::ExpiredHeader.into()),
        }

        match now.checked_add(client_state.max_clock_drift) {
            Some(limit) if time > limit => Err(Kind::HeaderFromFuture.into()),
            _ => Ok(()),
        }
    }

    /// Freezes the client if `misbehaviour` holds two distinct, validly signed headers for the
    /// same height. Returns the frozen client state.
    pub fn check_misbehaviour(
        &self,
        client_state: &ClientState,
        trusted1: &ConsensusState,
        trusted2: &ConsensusState,
        misbehaviour: &Misbehaviour,
        now: Timestamp,
    ) -> Result<ClientState, Error> {
        if client_state.is_frozen() {
            return Err(Kind::ClientFrozen.into());
        }

        let (h1, h2) = (&misbehaviour.header1, &misbehaviour.header2);
        if h1.height() != h2.height() {
            return Err(Kind::InvalidMisbehaviour(format!(
                "headers are at different heights {} and {}",
                h1.height(),
                h2.height()
            ))
            .into());
        }
        if h1.hash() == h2.hash() {
            return Err(Kind::InvalidMisbehaviour("headers are identical".to_string()).into());
        }

        self.verify_header(client_state, trusted1, h1, now)?;
        self.verify_header(client_state, trusted2, h2, now)?;

        Ok(client_state.clone().with_frozen_height(h1.height()))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_connection_state(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        connection_id: &ConnectionId,
        expected: &ConnectionEnd,
    ) -> Result<(), Error> {
        let value = RawConnectionEnd::from(expected.clone()).encode_to_vec();
        let path = Path::Connections(connection_id.clone());
        self.verify_membership(client_state, consensus_state, prefix, proof, height, &path, &value)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_channel_state(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        port_id: &PortId,
        channel_id: &ChannelId,
        expected: &ChannelEnd,
    ) -> Result<(), Error> {
        let value = RawChannel::from(expected.clone()).encode_to_vec();
        let path = Path::ChannelEnds(port_id.clone(), channel_id.clone());
        self.verify_membership(client_state, consensus_state, prefix, proof, height, &path, &value)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_packet_commitment(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
        commitment: &[u8],
    ) -> Result<(), Error> {
        let path = Path::Commitments {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        };
        self.verify_membership(
            client_state,
            consensus_state,
            prefix,
            proof,
            height,
            &path,
            commitment,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_packet_acknowledgement(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
        ack_commitment: &[u8],
    ) -> Result<(), Error> {
        let path = Path::Acks {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        };
        self.verify_membership(
            client_state,
            consensus_state,
            prefix,
            proof,
            height,
            &path,
            ack_commitment,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_packet_receipt_absence(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Result<(), Error> {
        if client_state.is_frozen() {
            return Err(Kind::ClientFrozen.into());
        }

        let path = Path::Receipts {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
            sequence,
        };
        merkle::verify_non_membership(
            &self.specs,
            consensus_state.root(),
            prefix,
            proof,
            height,
            &path.to_key(),
        )
        .map_err(|e| Kind::ProofVerificationFailure.context(e).into())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_next_sequence_recv(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: Sequence,
    ) -> Result<(), Error> {
        let path = Path::SeqRecvs(port_id.clone(), channel_id.clone());
        let value = u64::from(sequence).to_be_bytes();
        self.verify_membership(client_state, consensus_state, prefix, proof, height, &path, &value)
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_membership(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
        prefix: &CommitmentPrefix,
        proof: &CommitmentProofBytes,
        height: Height,
        path: &Path,
        value: &[u8],
    ) -> Result<(), Error> {
        if client_state.is_frozen() {
            return Err(Kind::ClientFrozen.into());
        }

        merkle::verify_membership(
            &self.specs,
            consensus_state.root(),
            prefix,
            proof,
            height,
            &path.to_key(),
            value,
        )
        .map_err(|e| Kind::ProofVerificationFailure.context(e).into())
    }
}

fn check_validator_hashes(trusted: &ConsensusState, header: &Header) -> Result<(), Error> {
    let block = &header.signed_header.header;

    if header.trusted_validator_set.hash() != trusted.next_validators_hash {
        return Err(Kind::ValidatorSetHashMismatch(format!(
            "trusted validators do not hash to the next validators of height {}",
            header.trusted_height
        ))
        .into());
    }
    if header.validator_set.hash() != block.validators_hash {
        return Err(Kind::ValidatorSetHashMismatch(
            "header validators do not hash to the header's validators hash".to_string(),
        )
        .into());
    }

    let adjacent = header.trusted_height.revision_number == header.height().revision_number
        && header.trusted_height.increment() == header.height();
    if adjacent && block.validators_hash != trusted.next_validators_hash {
        return Err(Kind::ValidatorSetHashMismatch(
            "adjacent header validators differ from the trusted next validators".to_string(),
        )
        .into());
    }

    Ok(())
}

/// Sums the voting power behind valid commit signatures, once per validator: first from the
/// trusted validator set, then from the header's own set. An invalid signature by a member of
/// the header's validator set rejects the whole header.
fn tally(header: &Header, sign_bytes: &[u8]) -> Result<(u64, u64), Error> {
    let mut trusted_signed = 0u64;
    let mut own_signed = 0u64;

    for sig in header.signed_header.commit.unique_signatures() {
        let own = header.validator_set.validator(&sig.validator_address);
        let trusted = header.trusted_validator_set.validator(&sig.validator_address);

        let signer = match own.or(trusted) {
            Some(signer) => signer,
            None => continue,
        };
        signer.verify_signature(sign_bytes, &sig.signature)?;

        if let Some(v) = own {
            own_signed = own_signed.saturating_add(v.voting_power);
        }
        if let Some(v) = trusted {
            if v.pub_key == signer.pub_key {
                trusted_signed = trusted_signed.saturating_add(v.voting_power);
            }
        }
    }

    Ok((trusted_signed, own_signed))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::ics07_tendermint::header::ValidatorSet;
    use crate::ics23_commitment::commitment::CommitmentRoot;
    use crate::ics24_host::identifier::{ChainId, ClientId};
    use crate::mock::host::{signed_header, validator_keys, validator_set};

    const T0: u64 = 1_000_000;

    struct Fixture {
        chain_id: ChainId,
        keys: Vec<SigningKey>,
        set: ValidatorSet,
        client_state: ClientState,
        trusted: ConsensusState,
    }

    impl Fixture {
        fn new(validators: usize) -> Self {
            Self::with_powers(&vec![10; validators])
        }

        fn with_powers(powers: &[u64]) -> Self {
            let chain_id = ChainId::new("chainA".to_string(), 0);
            let keys = validator_keys("chainA", powers.len());
            let set = validator_set(&keys, powers);
            let client_state = ClientState::new(
                chain_id.clone(),
                TrustThreshold::ONE_THIRD,
                Duration::from_secs(14 * 24 * 3600),
                Duration::from_secs(21 * 24 * 3600),
                Duration::from_secs(10),
                Height::new(0, 10),
            )
            .unwrap();
            let trusted = ConsensusState::new(
                Timestamp::from_seconds(T0),
                CommitmentRoot::from_bytes(&[0xaa; 32]),
                set.hash(),
            );

            Self {
                chain_id,
                keys,
                set,
                client_state,
                trusted,
            }
        }

        fn header(&self, height: u64, time: u64, signers: &[SigningKey], app_hash: u8) -> Header {
            Header {
                signed_header: signed_header(
                    &self.chain_id,
                    height,
                    Timestamp::from_seconds(time),
                    vec![app_hash; 32],
                    signers,
                    &self.set,
                    &self.set,
                ),
                validator_set: self.set.clone(),
                trusted_height: Height::new(0, 10),
                trusted_validator_set: self.set.clone(),
            }
        }

        fn now(&self) -> Timestamp {
            Timestamp::from_seconds(T0 + 100)
        }
    }

    #[test]
    fn header_verification() {
        struct Test {
            name: String,
            fixture: Fixture,
            header: Header,
            now: Timestamp,
            want: Result<(), Kind>,
        }

        let f = Fixture::new(4);
        let all = f.keys.clone();

        let mut bad_signature = f.header(11, T0 + 5, &all, 1);
        bad_signature.signed_header.commit.signatures[1].signature[0] ^= 0x01;

        let mut wrong_validators = f.header(20, T0 + 5, &all, 1);
        wrong_validators.validator_set = validator_set(&all, &[10, 10, 10, 11]);

        let mut wrong_trusted = f.header(20, T0 + 5, &all, 1);
        wrong_trusted.trusted_validator_set = validator_set(&all[..3], &[10, 10, 10]);

        let mut adjacent_rotation = f.header(11, T0 + 5, &all, 1);
        let rotated = validator_set(&all, &[20, 10, 10, 10]);
        adjacent_rotation.signed_header = signed_header(
            &f.chain_id,
            11,
            Timestamp::from_seconds(T0 + 5),
            vec![1; 32],
            &all,
            &rotated,
            &rotated,
        );
        adjacent_rotation.validator_set = rotated;

        let mut unsigned_commit = f.header(11, T0 + 5, &all, 1);
        unsigned_commit.signed_header.commit.block_hash = vec![0; 32];

        let other_chain = ChainId::new("chainB".to_string(), 0);
        let mut foreign = f.header(11, T0 + 5, &all, 1);
        foreign.signed_header = signed_header(
            &other_chain,
            11,
            Timestamp::from_seconds(T0 + 5),
            vec![1; 32],
            &all,
            &f.set,
            &f.set,
        );

        let three = Fixture::new(3);
        let two_of_three = three.header(11, T0 + 5, &three.keys[..2], 1);

        let tests: Vec<Test> = vec![
            Test {
                name: "Adjacent header signed by every validator".to_string(),
                header: f.header(11, T0 + 5, &all, 1),
                now: f.now(),
                fixture: Fixture::new(4),
                want: Ok(()),
            },
            Test {
                name: "Non-adjacent header signed by three of four validators".to_string(),
                header: f.header(20, T0 + 50, &all[..3], 1),
                now: f.now(),
                fixture: Fixture::new(4),
                want: Ok(()),
            },
            Test {
                name: "Half of the trusted power is not enough".to_string(),
                header: f.header(20, T0 + 50, &all[..2], 1),
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::InsufficientVotingPower {
                    signed: 20,
                    total: 40,
                    threshold: "2/3 of the trusted validators".to_string(),
                }),
            },
            Test {
                name: "Exactly two thirds of the trusted power is rejected".to_string(),
                header: two_of_three,
                now: three.now(),
                fixture: three,
                want: Err(Kind::InsufficientVotingPower {
                    signed: 20,
                    total: 30,
                    threshold: "2/3 of the trusted validators".to_string(),
                }),
            },
            Test {
                name: "Header time before the trusted time".to_string(),
                header: f.header(11, T0 - 1, &all, 1),
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::ExpiredHeader),
            },
            Test {
                name: "Header time past the trusting period".to_string(),
                header: f.header(11, T0 + 15 * 24 * 3600, &all, 1),
                now: Timestamp::from_seconds(T0 + 15 * 24 * 3600),
                fixture: Fixture::new(4),
                want: Err(Kind::ClientExpired),
            },
            Test {
                name: "Header from the future".to_string(),
                header: f.header(11, T0 + 200, &all, 1),
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::HeaderFromFuture),
            },
            Test {
                name: "Corrupted signature".to_string(),
                header: bad_signature,
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::InvalidSignature(String::new())),
            },
            Test {
                name: "Validator set does not match the header".to_string(),
                header: wrong_validators,
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::ValidatorSetHashMismatch(String::new())),
            },
            Test {
                name: "Trusted validator set does not match the trusted state".to_string(),
                header: wrong_trusted,
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::ValidatorSetHashMismatch(String::new())),
            },
            Test {
                name: "Adjacent header with a rotated validator set".to_string(),
                header: adjacent_rotation,
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::ValidatorSetHashMismatch(String::new())),
            },
            Test {
                name: "Commit signs a different block".to_string(),
                header: unsigned_commit,
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::InvalidCommit(String::new())),
            },
            Test {
                name: "Header from another chain".to_string(),
                header: foreign,
                now: f.now(),
                fixture: Fixture::new(4),
                want: Err(Kind::ChainIdMismatch {
                    header: "chainB-0".to_string(),
                    client: "chainA-0".to_string(),
                }),
            },
        ];

        let client = TendermintClient::default();
        for test in tests {
            let res = client.verify_header(
                &test.fixture.client_state,
                &test.fixture.trusted,
                &test.header,
                test.now,
            );
            let got = res.as_ref().map_err(|e| e.kind().clone()).map(|_| ());

            // Kinds carrying free-form descriptions are compared by variant only.
            let same = match (&got, &test.want) {
                (Err(Kind::InvalidSignature(_)), Err(Kind::InvalidSignature(_)))
                | (Err(Kind::ValidatorSetHashMismatch(_)), Err(Kind::ValidatorSetHashMismatch(_)))
                | (Err(Kind::InvalidCommit(_)), Err(Kind::InvalidCommit(_))) => true,
                (got, want) => got == want,
            };
            assert!(
                same,
                "verify_header: test `{}` got {:?}, want {:?}",
                test.name, got, test.want
            );
        }
    }

    #[test]
    fn more_than_two_thirds_of_the_power_must_sign() {
        let f = Fixture::with_powers(&[34, 33, 33]);
        assert_eq!(f.set.total_voting_power(), 100);
        let client = TendermintClient::default();

        let header = f.header(20, T0 + 50, &f.keys[..1], 1);
        let err = client
            .verify_header(&f.client_state, &f.trusted, &header, f.now())
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &Kind::InsufficientVotingPower {
                signed: 34,
                total: 100,
                threshold: "2/3 of the trusted validators".to_string(),
            }
        );

        let header = f.header(20, T0 + 50, &f.keys[..2], 1);
        client
            .verify_header(&f.client_state, &f.trusted, &header, f.now())
            .unwrap();
    }

    #[test]
    fn header_validators_must_reach_the_trust_level() {
        let f = Fixture::new(4);
        let newcomers = validator_keys("newcomers", 4);
        let mut all = f.keys.clone();
        all.extend(newcomers);
        let grown = validator_set(&all, &[10; 8]);

        let mut header = f.header(20, T0 + 50, &f.keys, 1);
        header.signed_header = signed_header(
            &f.chain_id,
            20,
            Timestamp::from_seconds(T0 + 50),
            vec![1; 32],
            &f.keys,
            &grown,
            &grown,
        );
        header.validator_set = grown;

        let client = TendermintClient::default();
        // Half of the new set signed: enough for 1/3, not for 2/3.
        assert!(client
            .verify_header(&f.client_state, &f.trusted, &header, f.now())
            .is_ok());

        let mut strict = f.client_state.clone();
        strict.trust_level = TrustThreshold::TWO_THIRDS;
        let err = client
            .verify_header(&strict, &f.trusted, &header, f.now())
            .unwrap_err();
        assert!(matches!(err.kind(), Kind::InsufficientVotingPower { signed: 40, total: 80, .. }));
    }

    #[test]
    fn update_outcomes() {
        let f = Fixture::new(4);
        let client = TendermintClient::default();

        let header = f.header(12, T0 + 5, &f.keys, 1);
        match client
            .check_header_and_update_state(&f.client_state, &f.trusted, None, &header, f.now())
            .unwrap()
        {
            UpdateOutcome::Updated {
                client_state,
                consensus_state,
            } => {
                assert_eq!(client_state.latest_height(), Height::new(0, 12));
                assert_eq!(consensus_state.root.as_bytes(), &[1; 32][..]);
                assert_eq!(consensus_state.timestamp, Timestamp::from_seconds(T0 + 5));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        // A header at or below the latest height is stale unless it conflicts with the
        // consensus state recorded at its height.
        let mut advanced = f.client_state.clone();
        advanced.latest_height = Height::new(0, 30);
        let stale = f.header(20, T0 + 5, &f.keys, 1);
        let recorded = ConsensusState::from(&stale);

        let err = client
            .check_header_and_update_state(&advanced, &f.trusted, None, &stale, f.now())
            .unwrap_err();
        assert!(matches!(err.kind(), Kind::LowHeaderHeight { .. }));

        let err = client
            .check_header_and_update_state(&advanced, &f.trusted, Some(&recorded), &stale, f.now())
            .unwrap_err();
        assert!(matches!(err.kind(), Kind::LowHeaderHeight { .. }));

        let conflicting = f.header(20, T0 + 5, &f.keys, 2);
        match client
            .check_header_and_update_state(&advanced, &f.trusted, Some(&recorded), &conflicting, f.now())
            .unwrap()
        {
            UpdateOutcome::Frozen { client_state } => {
                assert_eq!(client_state.frozen_height, Some(Height::new(0, 20)));
                assert_eq!(client_state.latest_height(), Height::new(0, 30));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        // A conflicting header that is not validly signed is rejected, not evidence.
        let forged = f.header(20, T0 + 5, &f.keys[..1], 2);
        assert!(client
            .check_header_and_update_state(&advanced, &f.trusted, Some(&recorded), &forged, f.now())
            .is_err());

        let frozen = f.client_state.clone().with_frozen_height(Height::new(0, 5));
        let err = client
            .check_header_and_update_state(&frozen, &f.trusted, None, &header, f.now())
            .unwrap_err();
        assert_eq!(err.kind(), &Kind::ClientFrozen);
    }

    #[test]
    fn misbehaviour_freezes_the_client() {
        let f = Fixture::new(4);
        let client = TendermintClient::default();
        let client_id = ClientId::default();

        let evidence = Misbehaviour {
            client_id: client_id.clone(),
            header1: f.header(15, T0 + 5, &f.keys, 1),
            header2: f.header(15, T0 + 5, &f.keys, 2),
        };
        let frozen = client
            .check_misbehaviour(&f.client_state, &f.trusted, &f.trusted, &evidence, f.now())
            .unwrap();
        assert_eq!(frozen.frozen_height, Some(Height::new(0, 15)));

        let identical = Misbehaviour {
            client_id: client_id.clone(),
            header1: f.header(15, T0 + 5, &f.keys, 1),
            header2: f.header(15, T0 + 5, &f.keys, 1),
        };
        assert!(client
            .check_misbehaviour(&f.client_state, &f.trusted, &f.trusted, &identical, f.now())
            .is_err());

        let different_heights = Misbehaviour {
            client_id,
            header1: f.header(15, T0 + 5, &f.keys, 1),
            header2: f.header(16, T0 + 5, &f.keys, 2),
        };
        assert!(client
            .check_misbehaviour(&f.client_state, &f.trusted, &f.trusted, &different_heights, f.now())
            .is_err());

        let err = client
            .check_misbehaviour(&frozen, &f.trusted, &f.trusted, &evidence, f.now())
            .unwrap_err();
        assert_eq!(err.kind(), &Kind::ClientFrozen);
    }
}
