//! The challenge state machine.
//!
//! [`apply`] is the single entry point for state-changing actions other than
//! result submission (see [`crate::reconcile`]). It validates the action
//! against the current state, mutates the record, and returns the events the
//! coordinator must act on.

use crate::bracket;
use crate::error::LifecycleError;
use crate::event::LifecycleEvent;
use crate::reconcile;
use arena_types::{
    Challenge, ChallengeStatus, CoordinatorParams, EscrowRef, PlayerAddress, Timestamp,
};

/// A state-changing action on a challenge.
#[derive(Clone, Debug)]
pub enum Action {
    /// A head-to-head joiner signals intent, starting the funding handshake.
    ExpressJoinIntent { actor: PlayerAddress },
    /// The creator locks their stake in escrow against the pending joiner.
    CreatorFund {
        actor: PlayerAddress,
        escrow_ref: EscrowRef,
    },
    /// The confirmed joiner locks their stake, activating the challenge.
    JoinerFund { actor: PlayerAddress },
    /// A tournament entrant takes a seat, paying their stake in the same
    /// step. The creator takes a seat the same way.
    TournamentJoin { actor: PlayerAddress },
    /// Sweep tick: fire whichever armed deadline has passed, if any.
    Timeout,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::ExpressJoinIntent { .. } => "express join intent",
            Action::CreatorFund { .. } => "fund as creator",
            Action::JoinerFund { .. } => "fund as joiner",
            Action::TournamentJoin { .. } => "join tournament",
            Action::Timeout => "time out",
        }
    }
}

/// Apply an action to a challenge.
///
/// On success the record is mutated and `updated_at` is bumped; on error the
/// record is untouched. `Timeout` is idempotent: if no armed deadline has
/// passed it succeeds with no events.
pub fn apply(
    challenge: &mut Challenge,
    action: Action,
    now: Timestamp,
    params: &CoordinatorParams,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    let events = match &action {
        Action::ExpressJoinIntent { actor } => express_join_intent(challenge, actor, now, params)?,
        Action::CreatorFund { actor, escrow_ref } => {
            creator_fund(challenge, actor, escrow_ref.clone(), now, params)?
        }
        Action::JoinerFund { actor } => joiner_fund(challenge, actor, now, params)?,
        Action::TournamentJoin { actor } => tournament_join(challenge, actor, now, params)?,
        Action::Timeout => timeout(challenge, now, params)?,
    };
    if !events.is_empty() {
        challenge.updated_at = now;
    }
    Ok(events)
}

fn invalid(challenge: &Challenge, action: &Action) -> LifecycleError {
    LifecycleError::InvalidTransition {
        from: challenge.status,
        action: action.name(),
    }
}

fn express_join_intent(
    challenge: &mut Challenge,
    actor: &PlayerAddress,
    now: Timestamp,
    params: &CoordinatorParams,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if challenge.is_tournament() {
        return Err(invalid(
            challenge,
            &Action::ExpressJoinIntent {
                actor: actor.clone(),
            },
        ));
    }
    if !challenge.status.is_open() {
        return Err(invalid(
            challenge,
            &Action::ExpressJoinIntent {
                actor: actor.clone(),
            },
        ));
    }
    if *actor == challenge.creator {
        return Err(LifecycleError::SelfChallenge);
    }
    if challenge.pending_joiner.is_some() {
        return Err(LifecycleError::JoinerAlreadyPending);
    }
    // An expired listing is dead even if the sweeper hasn't cancelled it yet.
    if let Some(expiry) = challenge.expires_at {
        if expiry.is_past(now) {
            return Err(LifecycleError::DeadlinePassed {
                which: "expiration",
            });
        }
    }

    challenge.pending_joiner = Some(actor.clone());
    challenge.status = ChallengeStatus::CreatorConfirmationRequired;
    // The funding deadline supersedes the open-listing expiry; a joiner who
    // arrives one second before expiry still gets the full handshake window.
    challenge.expires_at = None;
    challenge.creator_funding_deadline = Some(now.plus_secs(params.creator_funding_window_secs));
    Ok(vec![LifecycleEvent::JoinIntentExpressed {
        joiner: actor.clone(),
    }])
}

fn creator_fund(
    challenge: &mut Challenge,
    actor: &PlayerAddress,
    escrow_ref: EscrowRef,
    now: Timestamp,
    params: &CoordinatorParams,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if challenge.status != ChallengeStatus::CreatorConfirmationRequired {
        return Err(invalid(
            challenge,
            &Action::CreatorFund {
                actor: actor.clone(),
                escrow_ref,
            },
        ));
    }
    if *actor != challenge.creator {
        return Err(LifecycleError::WrongCreator(actor.to_string()));
    }
    if let Some(deadline) = challenge.creator_funding_deadline {
        if deadline.is_past(now) {
            return Err(LifecycleError::DeadlinePassed {
                which: "creator funding",
            });
        }
    }

    // The pending joiner becomes the confirmed challenger.
    challenge.challenger = challenge.pending_joiner.take();
    challenge.escrow_ref = Some(escrow_ref);
    challenge.participants.push(challenge.creator.clone());
    challenge.status = ChallengeStatus::CreatorFunded;
    challenge.creator_funding_deadline = None;
    challenge.joiner_funding_deadline = Some(now.plus_secs(params.joiner_funding_window_secs));
    Ok(vec![LifecycleEvent::CreatorFunded])
}

fn joiner_fund(
    challenge: &mut Challenge,
    actor: &PlayerAddress,
    now: Timestamp,
    params: &CoordinatorParams,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if challenge.status != ChallengeStatus::CreatorFunded {
        return Err(invalid(
            challenge,
            &Action::JoinerFund {
                actor: actor.clone(),
            },
        ));
    }
    if challenge.challenger.as_ref() != Some(actor) {
        return Err(LifecycleError::WrongJoiner(actor.to_string()));
    }
    if let Some(deadline) = challenge.joiner_funding_deadline {
        if deadline.is_past(now) {
            return Err(LifecycleError::DeadlinePassed {
                which: "joiner funding",
            });
        }
    }

    challenge.participants.push(actor.clone());
    activate(challenge, now, params);
    Ok(vec![LifecycleEvent::Activated])
}

fn tournament_join(
    challenge: &mut Challenge,
    actor: &PlayerAddress,
    now: Timestamp,
    params: &CoordinatorParams,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if !challenge.is_tournament() || !challenge.status.is_open() {
        return Err(invalid(
            challenge,
            &Action::TournamentJoin {
                actor: actor.clone(),
            },
        ));
    }
    if challenge.is_participant(actor) {
        return Err(LifecycleError::AlreadyJoined(actor.to_string()));
    }
    if challenge.participants.len() as u32 >= challenge.max_players {
        return Err(LifecycleError::ChallengeFull(challenge.max_players));
    }
    if let Some(expiry) = challenge.expires_at {
        if expiry.is_past(now) {
            return Err(LifecycleError::DeadlinePassed {
                which: "expiration",
            });
        }
    }

    challenge.participants.push(actor.clone());
    let mut events = vec![LifecycleEvent::ParticipantJoined {
        player: actor.clone(),
    }];

    if challenge.participants.len() as u32 == challenge.max_players {
        bracket::seed(challenge)?;
        // The escrow program derives the tournament pool account from the
        // challenge id; record that reference here so settlement sees it.
        challenge.escrow_ref = Some(EscrowRef::new(format!("escrow:{}", challenge.id)));
        activate(challenge, now, params);
        events.push(LifecycleEvent::Activated);
    }
    Ok(events)
}

/// Shared activation step: fix the prize pool, open the result window.
fn activate(challenge: &mut Challenge, now: Timestamp, params: &CoordinatorParams) {
    let seats = challenge.participants.len() as u64;
    challenge.prize_pool = challenge.stake_amount.prize_pool(seats, params.fee_bps);
    challenge.status = ChallengeStatus::Active;
    challenge.joiner_funding_deadline = None;
    challenge.expires_at = None;
    challenge.result_deadline = Some(now.plus_secs(params.result_window_secs));
}

fn timeout(
    challenge: &mut Challenge,
    now: Timestamp,
    params: &CoordinatorParams,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    match challenge.status {
        ChallengeStatus::PendingWaitingForOpponent => {
            match challenge.expires_at {
                Some(expiry) if expiry.is_past(now) => {}
                _ => return Ok(Vec::new()),
            }
            // An open challenge with nobody committed simply goes away.
            // Funded tournament seats are returned.
            challenge.status = ChallengeStatus::Cancelled;
            challenge.expires_at = None;
            let mut events = Vec::new();
            if !challenge.participants.is_empty() {
                events.push(LifecycleEvent::RefundParticipants {
                    participants: challenge.participants.clone(),
                });
            }
            events.push(LifecycleEvent::Cancelled { reason: "expired" });
            Ok(events)
        }
        ChallengeStatus::CreatorConfirmationRequired => {
            match challenge.creator_funding_deadline {
                Some(deadline) if deadline.is_past(now) => {}
                _ => return Ok(Vec::new()),
            }
            // Creator never funded: release the joiner, relist fresh.
            challenge.pending_joiner = None;
            challenge.creator_funding_deadline = None;
            challenge.status = ChallengeStatus::PendingWaitingForOpponent;
            challenge.expires_at = Some(now.plus_secs(params.open_expiration_secs));
            Ok(vec![LifecycleEvent::RevertedToOpen {
                reason: "creator funding timeout",
            }])
        }
        ChallengeStatus::CreatorFunded => {
            match challenge.joiner_funding_deadline {
                Some(deadline) if deadline.is_past(now) => {}
                _ => return Ok(Vec::new()),
            }
            // Joiner never funded: unwind the creator's escrow, relist fresh.
            let mut events = Vec::new();
            if let Some(escrow_ref) = challenge.escrow_ref.take() {
                events.push(LifecycleEvent::RefundCreator {
                    escrow_ref,
                    creator: challenge.creator.clone(),
                });
            }
            challenge.challenger = None;
            challenge.participants.clear();
            challenge.joiner_funding_deadline = None;
            challenge.status = ChallengeStatus::PendingWaitingForOpponent;
            challenge.expires_at = Some(now.plus_secs(params.open_expiration_secs));
            events.push(LifecycleEvent::RevertedToOpen {
                reason: "joiner funding timeout",
            });
            Ok(events)
        }
        ChallengeStatus::Active => {
            match challenge.result_deadline {
                Some(deadline) if deadline.is_past(now) => {}
                _ => return Ok(Vec::new()),
            }
            reconcile::deadline_outcome(challenge, now)
        }
        // Terminal states have no armed deadlines.
        ChallengeStatus::Completed | ChallengeStatus::Disputed | ChallengeStatus::Cancelled => {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::{ChallengeId, StakeAmount};

    fn addr(s: &str) -> PlayerAddress {
        PlayerAddress::new(s)
    }

    fn params() -> CoordinatorParams {
        CoordinatorParams::fast_defaults()
    }

    fn open_challenge(max_players: u32) -> Challenge {
        Challenge::open(
            ChallengeId::new("c1"),
            addr("alice"),
            StakeAmount::new(1_000),
            max_players,
            Timestamp::new(100),
            &params(),
        )
    }

    fn join_intent(c: &mut Challenge, who: &str, now: u64) -> Vec<LifecycleEvent> {
        apply(
            c,
            Action::ExpressJoinIntent { actor: addr(who) },
            Timestamp::new(now),
            &params(),
        )
        .unwrap()
    }

    #[test]
    fn full_happy_path_to_active() {
        let p = params();
        let mut c = open_challenge(2);

        let events = join_intent(&mut c, "bob", 110);
        assert_eq!(c.status, ChallengeStatus::CreatorConfirmationRequired);
        assert_eq!(c.pending_joiner, Some(addr("bob")));
        assert_eq!(c.creator_funding_deadline, Some(Timestamp::new(120)));
        assert_eq!(
            events,
            vec![LifecycleEvent::JoinIntentExpressed { joiner: addr("bob") }]
        );

        apply(
            &mut c,
            Action::CreatorFund {
                actor: addr("alice"),
                escrow_ref: EscrowRef::new("escrow1"),
            },
            Timestamp::new(115),
            &p,
        )
        .unwrap();
        assert_eq!(c.status, ChallengeStatus::CreatorFunded);
        assert_eq!(c.challenger, Some(addr("bob")));
        assert_eq!(c.pending_joiner, None);
        assert_eq!(c.joiner_funding_deadline, Some(Timestamp::new(125)));

        let events = apply(
            &mut c,
            Action::JoinerFund { actor: addr("bob") },
            Timestamp::new(120),
            &p,
        )
        .unwrap();
        assert_eq!(events, vec![LifecycleEvent::Activated]);
        assert_eq!(c.status, ChallengeStatus::Active);
        assert_eq!(c.participants, vec![addr("alice"), addr("bob")]);
        // 2 x 1000 minus the 5% fee.
        assert_eq!(c.prize_pool, StakeAmount::new(1_900));
        assert_eq!(c.result_deadline, Some(Timestamp::new(170)));
        assert_eq!(c.expires_at, None);
    }

    #[test]
    fn creator_cannot_join_own_challenge() {
        let mut c = open_challenge(2);
        let err = apply(
            &mut c,
            Action::ExpressJoinIntent {
                actor: addr("alice"),
            },
            Timestamp::new(110),
            &params(),
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::SelfChallenge);
    }

    #[test]
    fn join_intent_on_expired_listing_rejected() {
        let p = params();
        let mut c = open_challenge(2);
        // Listing expires at 200; the sweeper just hasn't run yet.
        let before = c.clone();
        let err = apply(
            &mut c,
            Action::ExpressJoinIntent { actor: addr("bob") },
            Timestamp::new(500),
            &p,
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::DeadlinePassed {
            which: "expiration"
        });
        assert_eq!(c, before);

        // The sweep still cancels it.
        apply(&mut c, Action::Timeout, Timestamp::new(500), &p).unwrap();
        assert_eq!(c.status, ChallengeStatus::Cancelled);
    }

    #[test]
    fn tournament_join_on_expired_listing_rejected() {
        let p = params();
        let mut c = open_challenge(4);
        apply(
            &mut c,
            Action::TournamentJoin { actor: addr("p1") },
            Timestamp::new(110),
            &p,
        )
        .unwrap();

        let err = apply(
            &mut c,
            Action::TournamentJoin { actor: addr("p2") },
            Timestamp::new(500),
            &p,
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::DeadlinePassed {
            which: "expiration"
        });
        assert_eq!(c.participants, vec![addr("p1")]);
        assert_eq!(c.status, ChallengeStatus::PendingWaitingForOpponent);
    }

    #[test]
    fn second_join_intent_rejected() {
        let mut c = open_challenge(2);
        join_intent(&mut c, "bob", 110);
        let err = apply(
            &mut c,
            Action::ExpressJoinIntent {
                actor: addr("carol"),
            },
            Timestamp::new(111),
            &params(),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn only_creator_may_fund_confirmation() {
        let mut c = open_challenge(2);
        join_intent(&mut c, "bob", 110);
        let err = apply(
            &mut c,
            Action::CreatorFund {
                actor: addr("bob"),
                escrow_ref: EscrowRef::new("e"),
            },
            Timestamp::new(112),
            &params(),
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::WrongCreator("bob".into()));
    }

    #[test]
    fn late_creator_funding_rejected() {
        let mut c = open_challenge(2);
        join_intent(&mut c, "bob", 110);
        let err = apply(
            &mut c,
            Action::CreatorFund {
                actor: addr("alice"),
                escrow_ref: EscrowRef::new("e"),
            },
            Timestamp::new(500),
            &params(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::DeadlinePassed {
                which: "creator funding"
            }
        );
    }

    #[test]
    fn creator_funding_timeout_reverts_to_open() {
        let p = params();
        let mut c = open_challenge(2);
        join_intent(&mut c, "bob", 110);

        let events = apply(&mut c, Action::Timeout, Timestamp::new(121), &p).unwrap();
        assert_eq!(
            events,
            vec![LifecycleEvent::RevertedToOpen {
                reason: "creator funding timeout"
            }]
        );
        assert_eq!(c.status, ChallengeStatus::PendingWaitingForOpponent);
        assert_eq!(c.pending_joiner, None);
        assert_eq!(c.creator_funding_deadline, None);
        // A fresh full expiration window is armed.
        assert_eq!(c.expires_at, Some(Timestamp::new(221)));

        // A new joiner can start over.
        join_intent(&mut c, "carol", 130);
        assert_eq!(c.pending_joiner, Some(addr("carol")));
    }

    #[test]
    fn joiner_funding_timeout_refunds_creator() {
        let p = params();
        let mut c = open_challenge(2);
        join_intent(&mut c, "bob", 110);
        apply(
            &mut c,
            Action::CreatorFund {
                actor: addr("alice"),
                escrow_ref: EscrowRef::new("escrow1"),
            },
            Timestamp::new(112),
            &p,
        )
        .unwrap();

        let events = apply(&mut c, Action::Timeout, Timestamp::new(123), &p).unwrap();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::RefundCreator {
                    escrow_ref: EscrowRef::new("escrow1"),
                    creator: addr("alice"),
                },
                LifecycleEvent::RevertedToOpen {
                    reason: "joiner funding timeout"
                },
            ]
        );
        assert_eq!(c.status, ChallengeStatus::PendingWaitingForOpponent);
        assert_eq!(c.challenger, None);
        assert!(c.participants.is_empty());
        assert_eq!(c.escrow_ref, None);
    }

    #[test]
    fn expiry_with_pending_joiner_does_not_cancel() {
        let p = params();
        let mut c = open_challenge(2);
        // Joiner arrives one second before expiry (expires_at = 200).
        join_intent(&mut c, "bob", 199);

        // At 205 the original expiry has passed but the funding window
        // (deadline 209) has not: the sweep must leave the handshake alone.
        assert_eq!(c.expires_at, None);
        let events = apply(&mut c, Action::Timeout, Timestamp::new(205), &p).unwrap();
        assert!(events.is_empty());
        assert_eq!(c.status, ChallengeStatus::CreatorConfirmationRequired);
        assert_eq!(c.pending_joiner, Some(addr("bob")));
    }

    #[test]
    fn open_expiry_cancels() {
        let p = params();
        let mut c = open_challenge(2);
        let events = apply(&mut c, Action::Timeout, Timestamp::new(201), &p).unwrap();
        assert_eq!(events, vec![LifecycleEvent::Cancelled { reason: "expired" }]);
        assert_eq!(c.status, ChallengeStatus::Cancelled);
    }

    #[test]
    fn timeout_is_idempotent_when_no_deadline_passed() {
        let p = params();
        let mut c = open_challenge(2);
        let events = apply(&mut c, Action::Timeout, Timestamp::new(150), &p).unwrap();
        assert!(events.is_empty());
        assert_eq!(c.status, ChallengeStatus::PendingWaitingForOpponent);
    }

    #[test]
    fn tournament_fills_and_activates() {
        let p = params();
        let mut c = open_challenge(8);
        let names = ["alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi"];
        for (i, name) in names.iter().enumerate() {
            let events = apply(
                &mut c,
                Action::TournamentJoin { actor: addr(name) },
                Timestamp::new(110 + i as u64),
                &p,
            )
            .unwrap();
            if i < names.len() - 1 {
                assert_eq!(c.status, ChallengeStatus::PendingWaitingForOpponent);
            } else {
                assert!(events.contains(&LifecycleEvent::Activated));
            }
        }
        assert_eq!(c.status, ChallengeStatus::Active);
        assert_eq!(c.participants.len(), 8);
        // 8 x 1000 minus the 5% fee.
        assert_eq!(c.prize_pool, StakeAmount::new(7_600));
        // The derived pool escrow is recorded at activation.
        assert_eq!(c.escrow_ref, Some(EscrowRef::new("escrow:c1")));
        let t = c.tournament.as_ref().unwrap();
        // 8 players: 4 -> 2 -> 1 matches.
        assert_eq!(t.rounds.len(), 3);
        assert_eq!(t.rounds[0].matches.len(), 4);
        assert_eq!(t.rounds[1].matches.len(), 2);
        assert_eq!(t.rounds[2].matches.len(), 1);
    }

    #[test]
    fn tournament_rejects_double_join_and_overflow() {
        let p = params();
        let mut c = open_challenge(4);
        for name in ["a1", "b1", "c1"] {
            apply(
                &mut c,
                Action::TournamentJoin { actor: addr(name) },
                Timestamp::new(110),
                &p,
            )
            .unwrap();
        }
        let err = apply(
            &mut c,
            Action::TournamentJoin { actor: addr("a1") },
            Timestamp::new(111),
            &p,
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::AlreadyJoined("a1".into()));

        apply(
            &mut c,
            Action::TournamentJoin { actor: addr("d1") },
            Timestamp::new(112),
            &p,
        )
        .unwrap();
        let err = apply(
            &mut c,
            Action::TournamentJoin { actor: addr("e1") },
            Timestamp::new(113),
            &p,
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn tournament_expiry_refunds_seated_players() {
        let p = params();
        let mut c = open_challenge(8);
        for name in ["p1", "p2", "p3"] {
            apply(
                &mut c,
                Action::TournamentJoin { actor: addr(name) },
                Timestamp::new(110),
                &p,
            )
            .unwrap();
        }
        let events = apply(&mut c, Action::Timeout, Timestamp::new(201), &p).unwrap();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::RefundParticipants {
                    participants: vec![addr("p1"), addr("p2"), addr("p3")],
                },
                LifecycleEvent::Cancelled { reason: "expired" },
            ]
        );
        assert_eq!(c.status, ChallengeStatus::Cancelled);
    }
}
