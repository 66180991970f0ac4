//! Result submission and reconciliation.
//!
//! Reconciliation never trusts a single claim: the outcome is derived only
//! once every expected claim is in, or once the result deadline forces a
//! decision over whatever arrived.

use crate::bracket;
use crate::error::LifecycleError;
use crate::event::LifecycleEvent;
use arena_types::{Challenge, ChallengeStatus, Outcome, PlayerAddress, ResultEntry, Timestamp};

/// Record a result claim from a participant.
///
/// Head-to-head challenges reconcile as soon as both claims are in:
/// exactly one win claim is decisive, two win claims raise a dispute, two
/// loss claims forfeit the pool. Tournament claims are routed to the
/// bracket engine.
pub fn record_result(
    challenge: &mut Challenge,
    actor: &PlayerAddress,
    claimed_win: bool,
    proof: Option<Vec<u8>>,
    now: Timestamp,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if !challenge.status.accepts_results() {
        return Err(LifecycleError::InvalidTransition {
            from: challenge.status,
            action: "submit result",
        });
    }
    if !challenge.is_participant(actor) {
        return Err(LifecycleError::NotAParticipant(actor.to_string()));
    }

    if challenge.is_tournament() {
        let mut events = bracket::record_match_result(challenge, actor, claimed_win, proof, now)?;
        events.insert(
            0,
            LifecycleEvent::ResultRecorded {
                player: actor.clone(),
                claimed_win,
            },
        );
        challenge.updated_at = now;
        return Ok(events);
    }

    if challenge.results.contains_key(actor) {
        return Err(LifecycleError::DuplicateResult(actor.to_string()));
    }
    challenge.results.insert(
        actor.clone(),
        ResultEntry {
            claimed_win,
            submitted_at: now,
            proof,
        },
    );

    let mut events = vec![LifecycleEvent::ResultRecorded {
        player: actor.clone(),
        claimed_win,
    }];
    if challenge.results.len() == challenge.participants.len() {
        events.extend(reconcile_head_to_head(challenge, now));
    }
    challenge.updated_at = now;
    Ok(events)
}

/// Derive the outcome from two complete head-to-head claims.
fn reconcile_head_to_head(challenge: &mut Challenge, now: Timestamp) -> Vec<LifecycleEvent> {
    let winners: Vec<PlayerAddress> = challenge
        .results
        .iter()
        .filter(|(_, entry)| entry.claimed_win)
        .map(|(player, _)| player.clone())
        .collect();

    match winners.len() {
        1 => complete(challenge, Outcome::Player(winners[0].clone()), now),
        0 => complete(challenge, Outcome::Forfeit, now),
        _ => dispute(challenge, "both participants claimed a win", now),
    }
}

/// Force an outcome once the result deadline has passed.
///
/// No submissions forfeits the pool. A lone win claim stands. A lone loss
/// claim concedes to the opponent. Tournaments that failed to finish in
/// time go to an operator.
pub(crate) fn deadline_outcome(
    challenge: &mut Challenge,
    now: Timestamp,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if challenge.is_tournament() {
        return Ok(dispute(
            challenge,
            "bracket unfinished at result deadline",
            now,
        ));
    }

    let claims: Vec<(PlayerAddress, bool)> = challenge
        .results
        .iter()
        .map(|(player, entry)| (player.clone(), entry.claimed_win))
        .collect();
    let events = match claims.as_slice() {
        [] => complete(challenge, Outcome::Forfeit, now),
        [(submitter, true)] => complete(challenge, Outcome::Player(submitter.clone()), now),
        [(submitter, false)] => match challenge.opponent_of(submitter).cloned() {
            Some(opponent) => complete(challenge, Outcome::Player(opponent), now),
            None => complete(challenge, Outcome::Tie, now),
        },
        // Both claims arrived but reconciliation never ran; run it now.
        _ => reconcile_head_to_head(challenge, now),
    };
    Ok(events)
}

/// Resolve a disputed challenge with an operator-chosen outcome.
pub fn resolve_dispute(
    challenge: &mut Challenge,
    outcome: Outcome,
    operator: &str,
    now: Timestamp,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    if challenge.status != ChallengeStatus::Disputed {
        return Err(LifecycleError::InvalidTransition {
            from: challenge.status,
            action: "resolve dispute",
        });
    }
    if let Some(winner) = outcome.winner() {
        if !challenge.is_participant(winner) {
            return Err(LifecycleError::InvalidWinner(winner.to_string()));
        }
    }

    let mut events = complete(challenge, outcome.clone(), now);
    challenge.resolved_by = Some(operator.to_string());
    if let Some(tournament) = challenge.tournament.as_mut() {
        tournament.stage = arena_types::TournamentStage::Concluded;
        tournament.champion = outcome.winner().cloned();
    }
    events.push(LifecycleEvent::DisputeResolved {
        outcome,
        operator: operator.to_string(),
    });
    challenge.updated_at = now;
    Ok(events)
}

/// Mark the challenge completed with `outcome` and arm settlement
/// bookkeeping. Only a decisive outcome owes a payout.
pub(crate) fn complete(
    challenge: &mut Challenge,
    outcome: Outcome,
    now: Timestamp,
) -> Vec<LifecycleEvent> {
    challenge.status = ChallengeStatus::Completed;
    challenge.outcome = Some(outcome.clone());
    challenge.result_deadline = None;
    if outcome.is_decisive() {
        challenge.can_claim = true;
        challenge.needs_payout = true;
    }
    challenge.updated_at = now;
    vec![LifecycleEvent::Completed { outcome }]
}

pub(crate) fn dispute(
    challenge: &mut Challenge,
    reason: &str,
    now: Timestamp,
) -> Vec<LifecycleEvent> {
    challenge.status = ChallengeStatus::Disputed;
    challenge.result_deadline = None;
    challenge.updated_at = now;
    vec![LifecycleEvent::Disputed {
        reason: reason.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::{apply, Action};
    use arena_types::{ChallengeId, CoordinatorParams, EscrowRef, StakeAmount};

    fn addr(s: &str) -> PlayerAddress {
        PlayerAddress::new(s)
    }

    fn active_pair() -> Challenge {
        let p = CoordinatorParams::fast_defaults();
        let mut c = Challenge::open(
            ChallengeId::new("c1"),
            addr("alice"),
            StakeAmount::new(1_000),
            2,
            Timestamp::new(100),
            &p,
        );
        apply(
            &mut c,
            Action::ExpressJoinIntent { actor: addr("bob") },
            Timestamp::new(110),
            &p,
        )
        .unwrap();
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
        apply(
            &mut c,
            Action::JoinerFund { actor: addr("bob") },
            Timestamp::new(114),
            &p,
        )
        .unwrap();
        c
    }

    #[test]
    fn decisive_outcome_arms_settlement() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Active);

        let events =
            record_result(&mut c, &addr("bob"), false, None, Timestamp::new(121)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.outcome, Some(Outcome::Player(addr("alice"))));
        assert!(c.can_claim);
        assert!(c.needs_payout);
        assert!(!c.payout_triggered);
        assert!(events.contains(&LifecycleEvent::Completed {
            outcome: Outcome::Player(addr("alice")),
        }));
    }

    #[test]
    fn conflicting_claims_raise_dispute() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        let events = record_result(&mut c, &addr("bob"), true, None, Timestamp::new(121)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Disputed);
        assert_eq!(c.outcome, None);
        assert!(!c.needs_payout);
        assert!(events
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Disputed { .. })));
    }

    #[test]
    fn mutual_loss_claims_forfeit_the_pool() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), false, None, Timestamp::new(120)).unwrap();
        record_result(&mut c, &addr("bob"), false, None, Timestamp::new(121)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.outcome, Some(Outcome::Forfeit));
        assert!(!c.needs_payout);
        assert!(!c.can_claim);
    }

    #[test]
    fn duplicate_submission_rejected() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        let err =
            record_result(&mut c, &addr("alice"), false, None, Timestamp::new(121)).unwrap_err();
        assert_eq!(err, LifecycleError::DuplicateResult("alice".into()));
        // The original claim stands.
        assert!(c.results[&addr("alice")].claimed_win);
    }

    #[test]
    fn outsider_cannot_submit() {
        let mut c = active_pair();
        let err =
            record_result(&mut c, &addr("mallory"), true, None, Timestamp::new(120)).unwrap_err();
        assert_eq!(err, LifecycleError::NotAParticipant("mallory".into()));
    }

    #[test]
    fn results_rejected_after_completion() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        record_result(&mut c, &addr("bob"), false, None, Timestamp::new(121)).unwrap();
        let err =
            record_result(&mut c, &addr("bob"), true, None, Timestamp::new(122)).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn deadline_with_no_submissions_forfeits() {
        let p = CoordinatorParams::fast_defaults();
        let mut c = active_pair();
        let events = apply(&mut c, Action::Timeout, Timestamp::new(500), &p).unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.outcome, Some(Outcome::Forfeit));
        assert!(!c.needs_payout);
        assert!(events.contains(&LifecycleEvent::Completed {
            outcome: Outcome::Forfeit,
        }));
    }

    #[test]
    fn deadline_with_lone_win_claim_stands() {
        let p = CoordinatorParams::fast_defaults();
        let mut c = active_pair();
        record_result(&mut c, &addr("bob"), true, None, Timestamp::new(120)).unwrap();
        apply(&mut c, Action::Timeout, Timestamp::new(500), &p).unwrap();
        assert_eq!(c.outcome, Some(Outcome::Player(addr("bob"))));
        assert!(c.needs_payout);
    }

    #[test]
    fn deadline_with_lone_loss_claim_concedes() {
        let p = CoordinatorParams::fast_defaults();
        let mut c = active_pair();
        record_result(&mut c, &addr("bob"), false, None, Timestamp::new(120)).unwrap();
        apply(&mut c, Action::Timeout, Timestamp::new(500), &p).unwrap();
        assert_eq!(c.outcome, Some(Outcome::Player(addr("alice"))));
        assert!(c.needs_payout);
    }

    #[test]
    fn dispute_resolution_with_decisive_winner() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        record_result(&mut c, &addr("bob"), true, None, Timestamp::new(121)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Disputed);

        let events = resolve_dispute(
            &mut c,
            Outcome::Player(addr("bob")),
            "ops@arena",
            Timestamp::new(200),
        )
        .unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.outcome, Some(Outcome::Player(addr("bob"))));
        assert_eq!(c.resolved_by.as_deref(), Some("ops@arena"));
        assert!(c.needs_payout);
        assert!(events
            .iter()
            .any(|e| matches!(e, LifecycleEvent::DisputeResolved { .. })));
    }

    #[test]
    fn dispute_resolution_rejects_outsider_winner() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        record_result(&mut c, &addr("bob"), true, None, Timestamp::new(121)).unwrap();
        let err = resolve_dispute(
            &mut c,
            Outcome::Player(addr("mallory")),
            "ops@arena",
            Timestamp::new(200),
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::InvalidWinner("mallory".into()));
        assert_eq!(c.status, ChallengeStatus::Disputed);
    }

    #[test]
    fn dispute_resolution_as_tie_owes_nothing() {
        let mut c = active_pair();
        record_result(&mut c, &addr("alice"), true, None, Timestamp::new(120)).unwrap();
        record_result(&mut c, &addr("bob"), true, None, Timestamp::new(121)).unwrap();
        resolve_dispute(&mut c, Outcome::Tie, "ops@arena", Timestamp::new(200)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.outcome, Some(Outcome::Tie));
        assert!(!c.needs_payout);
        assert!(!c.can_claim);
    }

    #[test]
    fn resolve_requires_disputed_state() {
        let mut c = active_pair();
        let err = resolve_dispute(
            &mut c,
            Outcome::Tie,
            "ops@arena",
            Timestamp::new(200),
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }
}
