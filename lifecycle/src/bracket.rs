//! Single-elimination bracket engine.
//!
//! Brackets are seeded in join order once every seat is funded. Matches
//! reconcile exactly like head-to-head challenges, except that anything
//! short of one decisive win claim escalates the whole challenge to an
//! operator: a bracket cannot continue past a dead match.

use crate::error::LifecycleError;
use crate::event::LifecycleEvent;
use crate::reconcile;
use arena_types::{
    BracketMatch, Challenge, MatchId, MatchStatus, Outcome, PlayerAddress, ResultEntry, Round,
    Timestamp, Tournament, TournamentStage,
};

/// Build the bracket from the funded participant list.
///
/// The participant count must be a power of two (enforced at creation);
/// round zero pairs players in join order, and each later round halves.
pub(crate) fn seed(challenge: &mut Challenge) -> Result<(), LifecycleError> {
    let tournament = challenge
        .tournament
        .as_mut()
        .ok_or(LifecycleError::BracketMissing)?;

    let players = &challenge.participants;
    let round_count = players.len().trailing_zeros();
    let mut rounds = Vec::with_capacity(round_count as usize);

    let mut first = Vec::with_capacity(players.len() / 2);
    for (i, pair) in players.chunks(2).enumerate() {
        let mut m = BracketMatch::new(MatchId::new(0, i as u32));
        m.player1 = Some(pair[0].clone());
        m.player2 = Some(pair[1].clone());
        m.status = MatchStatus::InPlay;
        first.push(m);
    }
    rounds.push(Round { matches: first });

    let mut matches_in_round = players.len() / 4;
    for round in 1..round_count {
        let matches = (0..matches_in_round)
            .map(|i| BracketMatch::new(MatchId::new(round, i as u32)))
            .collect();
        rounds.push(Round { matches });
        matches_in_round /= 2;
    }

    tournament.rounds = rounds;
    tournament.stage = TournamentStage::InProgress { round: 0 };
    Ok(())
}

/// What a recorded claim did to the bracket.
enum BracketStep {
    /// Waiting on the opponent's claim.
    Recorded,
    /// The match was decided and the winner advanced.
    Decided {
        match_id: MatchId,
        winner: PlayerAddress,
        round_advanced: Option<u32>,
    },
    /// The final was decided.
    Champion {
        match_id: MatchId,
        champion: PlayerAddress,
    },
    /// The match cannot produce a winner; operator intervention needed.
    Deadlock { reason: &'static str },
}

/// Record a result claim for the submitter's current in-play match.
pub(crate) fn record_match_result(
    challenge: &mut Challenge,
    actor: &PlayerAddress,
    claimed_win: bool,
    proof: Option<Vec<u8>>,
    now: Timestamp,
) -> Result<Vec<LifecycleEvent>, LifecycleError> {
    // Take the bracket out to keep the borrow on `challenge` free for the
    // completion/dispute paths below.
    let mut tournament = challenge
        .tournament
        .take()
        .ok_or(LifecycleError::BracketMissing)?;

    let step = advance_bracket(&mut tournament, actor, claimed_win, proof, now);
    challenge.tournament = Some(tournament);

    let mut events = Vec::new();
    match step? {
        BracketStep::Recorded => {}
        BracketStep::Decided {
            match_id,
            winner,
            round_advanced,
        } => {
            events.push(LifecycleEvent::MatchDecided { match_id, winner });
            if let Some(round) = round_advanced {
                events.push(LifecycleEvent::RoundAdvanced { round });
            }
        }
        BracketStep::Champion { match_id, champion } => {
            events.push(LifecycleEvent::MatchDecided {
                match_id,
                winner: champion.clone(),
            });
            events.push(LifecycleEvent::ChampionCrowned {
                champion: champion.clone(),
            });
            events.extend(reconcile::complete(
                challenge,
                Outcome::Player(champion),
                now,
            ));
        }
        BracketStep::Deadlock { reason } => {
            events.extend(reconcile::dispute(challenge, reason, now));
        }
    }
    Ok(events)
}

fn advance_bracket(
    tournament: &mut Tournament,
    actor: &PlayerAddress,
    claimed_win: bool,
    proof: Option<Vec<u8>>,
    now: Timestamp,
) -> Result<BracketStep, LifecycleError> {
    let current_round = match tournament.stage {
        TournamentStage::InProgress { round } => round,
        _ => return Err(LifecycleError::NoMatchInPlay(actor.to_string())),
    };

    let round = tournament
        .round_mut(current_round)
        .ok_or(LifecycleError::BracketMissing)?;
    let m = round
        .matches
        .iter_mut()
        .find(|m| m.status == MatchStatus::InPlay && m.involves(actor))
        .ok_or_else(|| LifecycleError::NoMatchInPlay(actor.to_string()))?;

    if m.results.contains_key(actor) {
        return Err(LifecycleError::DuplicateResult(actor.to_string()));
    }
    m.results.insert(
        actor.clone(),
        ResultEntry {
            claimed_win,
            submitted_at: now,
            proof,
        },
    );
    if m.results.len() < 2 {
        return Ok(BracketStep::Recorded);
    }

    let winners: Vec<PlayerAddress> = m
        .results
        .iter()
        .filter(|(_, entry)| entry.claimed_win)
        .map(|(player, _)| player.clone())
        .collect();
    let winner = match winners.as_slice() {
        [w] => w.clone(),
        [] => {
            return Ok(BracketStep::Deadlock {
                reason: "both players claimed a loss in a bracket match",
            })
        }
        _ => {
            return Ok(BracketStep::Deadlock {
                reason: "both players claimed a win in a bracket match",
            })
        }
    };

    m.outcome = Some(Outcome::Player(winner.clone()));
    m.status = MatchStatus::Decided;
    let match_id = m.id;

    if current_round == tournament.final_round() {
        tournament.champion = Some(winner.clone());
        tournament.stage = TournamentStage::Concluded;
        return Ok(BracketStep::Champion {
            match_id,
            champion: winner,
        });
    }

    // Winner advances: match i feeds match i/2, slot chosen by parity.
    let next_id = match_id.next();
    let slot_one = match_id.feeds_first_slot();
    let next = tournament
        .match_at_mut(next_id)
        .ok_or(LifecycleError::BracketMissing)?;
    if slot_one {
        next.player1 = Some(winner.clone());
    } else {
        next.player2 = Some(winner.clone());
    }

    let mut round_advanced = None;
    if tournament
        .round(current_round)
        .is_some_and(|r| r.is_complete())
    {
        let next_round = current_round + 1;
        if let Some(r) = tournament.round_mut(next_round) {
            for m in &mut r.matches {
                if m.players().is_some() {
                    m.status = MatchStatus::InPlay;
                }
            }
        }
        tournament.stage = TournamentStage::InProgress { round: next_round };
        round_advanced = Some(next_round);
    }

    Ok(BracketStep::Decided {
        match_id,
        winner,
        round_advanced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::record_result;
    use crate::transition::{apply, Action};
    use arena_types::{ChallengeId, ChallengeStatus, CoordinatorParams, StakeAmount};

    fn addr(s: &str) -> PlayerAddress {
        PlayerAddress::new(s)
    }

    fn active_tournament(names: &[&str]) -> Challenge {
        let p = CoordinatorParams::fast_defaults();
        let mut c = Challenge::open(
            ChallengeId::new("t1"),
            addr(names[0]),
            StakeAmount::new(500),
            names.len() as u32,
            Timestamp::new(100),
            &p,
        );
        for name in names {
            apply(
                &mut c,
                Action::TournamentJoin { actor: addr(name) },
                Timestamp::new(110),
                &p,
            )
            .unwrap();
        }
        assert_eq!(c.status, ChallengeStatus::Active);
        c
    }

    /// Both players of a match submit; `winner` claims the win.
    fn play_match(c: &mut Challenge, winner: &str, loser: &str, now: u64) {
        record_result(c, &addr(winner), true, None, Timestamp::new(now)).unwrap();
        record_result(c, &addr(loser), false, None, Timestamp::new(now + 1)).unwrap();
    }

    #[test]
    fn eight_player_bracket_runs_to_champion() {
        let names = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"];
        let mut c = active_tournament(&names);

        // Round 0: odd seeds win.
        play_match(&mut c, "p1", "p2", 200);
        play_match(&mut c, "p3", "p4", 210);
        play_match(&mut c, "p5", "p6", 220);
        play_match(&mut c, "p7", "p8", 230);
        {
            let t = c.tournament.as_ref().unwrap();
            assert_eq!(t.stage, TournamentStage::InProgress { round: 1 });
            let semi = &t.rounds[1].matches;
            assert_eq!(semi[0].players(), Some((&addr("p1"), &addr("p3"))));
            assert_eq!(semi[1].players(), Some((&addr("p5"), &addr("p7"))));
            assert!(semi.iter().all(|m| m.status == MatchStatus::InPlay));
        }

        // Semifinals.
        play_match(&mut c, "p1", "p3", 300);
        play_match(&mut c, "p7", "p5", 310);
        {
            let t = c.tournament.as_ref().unwrap();
            let fin = &t.rounds[2].matches[0];
            assert_eq!(fin.players(), Some((&addr("p1"), &addr("p7"))));
        }

        // Final.
        record_result(&mut c, &addr("p7"), true, None, Timestamp::new(400)).unwrap();
        let events =
            record_result(&mut c, &addr("p1"), false, None, Timestamp::new(401)).unwrap();

        assert_eq!(c.status, ChallengeStatus::Completed);
        assert_eq!(c.outcome, Some(Outcome::Player(addr("p7"))));
        assert!(c.needs_payout);
        let t = c.tournament.as_ref().unwrap();
        assert_eq!(t.champion, Some(addr("p7")));
        assert_eq!(t.stage, TournamentStage::Concluded);
        assert!(events.contains(&LifecycleEvent::ChampionCrowned {
            champion: addr("p7"),
        }));
    }

    #[test]
    fn four_player_bracket_shape() {
        let mut c = active_tournament(&["a", "b", "c", "d"]);
        {
            let t = c.tournament.as_ref().unwrap();
            assert_eq!(t.rounds.len(), 2);
            assert_eq!(t.rounds[0].matches.len(), 2);
            assert_eq!(t.rounds[1].matches.len(), 1);
        }

        play_match(&mut c, "b", "a", 200);
        play_match(&mut c, "c", "d", 210);
        play_match(&mut c, "c", "b", 300);
        assert_eq!(c.outcome, Some(Outcome::Player(addr("c"))));
    }

    #[test]
    fn conflicting_match_claims_escalate_whole_challenge() {
        let mut c = active_tournament(&["a", "b", "c", "d"]);
        record_result(&mut c, &addr("a"), true, None, Timestamp::new(200)).unwrap();
        let events = record_result(&mut c, &addr("b"), true, None, Timestamp::new(201)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Disputed);
        assert!(events
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Disputed { .. })));
    }

    #[test]
    fn double_loss_match_claims_escalate_too() {
        let mut c = active_tournament(&["a", "b", "c", "d"]);
        record_result(&mut c, &addr("a"), false, None, Timestamp::new(200)).unwrap();
        record_result(&mut c, &addr("b"), false, None, Timestamp::new(201)).unwrap();
        assert_eq!(c.status, ChallengeStatus::Disputed);
    }

    #[test]
    fn eliminated_player_cannot_submit_next_round() {
        let mut c = active_tournament(&["a", "b", "c", "d"]);
        play_match(&mut c, "a", "b", 200);
        play_match(&mut c, "c", "d", 210);
        // "b" lost round 0 and has no match in the final.
        let err = record_result(&mut c, &addr("b"), true, None, Timestamp::new(300)).unwrap_err();
        assert_eq!(err, LifecycleError::NoMatchInPlay("b".into()));
    }

    #[test]
    fn waiting_player_cannot_submit_before_round_opens() {
        let mut c = active_tournament(&["a", "b", "c", "d"]);
        play_match(&mut c, "a", "b", 200);
        // "a" advanced, but the final is not in play until the other semi
        // finishes.
        let err = record_result(&mut c, &addr("a"), true, None, Timestamp::new(250)).unwrap_err();
        assert_eq!(err, LifecycleError::NoMatchInPlay("a".into()));
    }

    #[test]
    fn operator_resolves_bracket_dispute_to_champion() {
        let mut c = active_tournament(&["a", "b", "c", "d"]);
        record_result(&mut c, &addr("a"), true, None, Timestamp::new(200)).unwrap();
        record_result(&mut c, &addr("b"), true, None, Timestamp::new(201)).unwrap();

        crate::reconcile::resolve_dispute(
            &mut c,
            Outcome::Player(addr("a")),
            "ops@arena",
            Timestamp::new(300),
        )
        .unwrap();
        assert_eq!(c.status, ChallengeStatus::Completed);
        let t = c.tournament.as_ref().unwrap();
        assert_eq!(t.champion, Some(addr("a")));
        assert_eq!(t.stage, TournamentStage::Concluded);
    }
}
