//! Lineup reconstruction from play-by-play.
//!
//! A finite-state machine per team per game replays the ordered event
//! slice and emits contiguous stints. The on-court set is either a
//! resolved five-player [`Lineup`] or an unresolved set of known players.
//! Every period is partitioned by the emitted stints, unresolved
//! stretches included.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::metrics::possessions;
use crate::models::{
    BoxCounts, EventKind, GameClock, GameId, Lineup, LineupStint, PlayByPlayEvent, PlayerId,
    StintStatus, TeamId, UnresolvedReason,
};

/// Period structure of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodLengths {
    pub regulation_periods: u8,
    pub regulation_secs: u32,
    pub overtime_secs: u32,
}

impl Default for PeriodLengths {
    /// Four 10-minute quarters, 5-minute overtimes.
    fn default() -> Self {
        Self {
            regulation_periods: 4,
            regulation_secs: 600,
            overtime_secs: 300,
        }
    }
}

impl PeriodLengths {
    pub fn length(&self, period: u8) -> GameClock {
        if period <= self.regulation_periods {
            GameClock::from_secs(self.regulation_secs)
        } else {
            GameClock::from_secs(self.overtime_secs)
        }
    }
}

/// Who is on the floor.
#[derive(Debug, Clone, PartialEq)]
enum Court {
    Resolved(Lineup),
    Unresolved {
        reason: UnresolvedReason,
        known: BTreeSet<PlayerId>,
        /// Known set holds at least one stale player; cannot self-heal
        overflow: bool,
    },
}

impl Court {
    fn from_starters(starters: &[PlayerId]) -> Self {
        let known: BTreeSet<PlayerId> = starters.iter().cloned().collect();
        match Lineup::new(known.iter().cloned()) {
            Some(lineup) => Court::Resolved(lineup),
            None => Court::Unresolved {
                reason: UnresolvedReason::StarterCount,
                overflow: known.len() > Lineup::SIZE,
                known,
            },
        }
    }

    fn status(&self) -> StintStatus {
        match self {
            Court::Resolved(lineup) => StintStatus::Resolved {
                lineup: lineup.clone(),
            },
            Court::Unresolved { reason, known, .. } => StintStatus::Unresolved {
                reason: *reason,
                known_players: known.iter().cloned().collect(),
            },
        }
    }

    /// Apply one batch of simultaneous substitutions. Removals are applied
    /// before insertions so the order within a batch does not matter.
    fn substitute(&self, subs: &[(PlayerId, PlayerId)]) -> Court {
        match self {
            Court::Resolved(lineup) => {
                let mut on: BTreeSet<PlayerId> = lineup.players().iter().cloned().collect();
                let mut out_missing = false;
                let mut in_present = false;
                for (_, out) in subs {
                    out_missing |= !on.remove(out);
                }
                for (player_in, _) in subs {
                    in_present |= !on.insert(player_in.clone());
                }
                if !out_missing && !in_present {
                    if let Some(lineup) = Lineup::new(on.iter().cloned()) {
                        return Court::Resolved(lineup);
                    }
                }
                Court::Unresolved {
                    reason: UnresolvedReason::SubstitutionMismatch,
                    overflow: out_missing || on.len() > Lineup::SIZE,
                    known: on,
                }
            }
            Court::Unresolved {
                reason,
                known,
                overflow,
            } => {
                // An unknown player subbing out reveals nothing that
                // remains on the floor; only insertions grow the set.
                let outs_known = subs.iter().all(|(_, out)| known.contains(out));
                let mut known = known.clone();
                for (_, out) in subs {
                    known.remove(out);
                }
                for (player_in, _) in subs {
                    known.insert(player_in.clone());
                }
                // An over-full set is trusted again once substitutions of
                // players it holds bring it back to exactly five.
                let overflow = if *overflow {
                    !(outs_known && known.len() == Lineup::SIZE)
                } else {
                    known.len() > Lineup::SIZE
                };
                Court::unresolved_or_recovered(*reason, known, overflow)
            }
        }
    }

    fn unresolved_or_recovered(
        reason: UnresolvedReason,
        known: BTreeSet<PlayerId>,
        overflow: bool,
    ) -> Court {
        if !overflow {
            if let Some(lineup) = Lineup::new(known.iter().cloned()) {
                return Court::Resolved(lineup);
            }
        }
        Court::Unresolved {
            reason,
            known,
            overflow,
        }
    }

    /// Observe a player of this team acting on the floor. Returns the new
    /// court when the observation changes resolution.
    fn observe(&mut self, actor: &PlayerId, checked: bool) -> Option<Court> {
        match self {
            Court::Resolved(lineup) => {
                if !checked || lineup.contains(actor) {
                    return None;
                }
                let mut known: BTreeSet<PlayerId> = lineup.players().iter().cloned().collect();
                known.insert(actor.clone());
                Some(Court::Unresolved {
                    reason: UnresolvedReason::ActorOffCourt,
                    known,
                    overflow: true,
                })
            }
            Court::Unresolved {
                reason,
                known,
                overflow,
            } => {
                if *overflow || known.contains(actor) {
                    return None;
                }
                known.insert(actor.clone());
                if known.len() == Lineup::SIZE {
                    return Some(Court::unresolved_or_recovered(*reason, known.clone(), false));
                }
                None
            }
        }
    }
}

/// Players of the acting team revealed by an event, with whether the
/// event requires them to be on the floor.
fn actors(kind: &EventKind) -> Vec<(&PlayerId, bool)> {
    match kind {
        EventKind::FieldGoal {
            shooter, assist, ..
        } => {
            let mut actors = vec![(shooter, true)];
            actors.extend(assist.iter().map(|a| (a, false)));
            actors
        }
        EventKind::FreeThrow { shooter, .. } => vec![(shooter, false)],
        EventKind::Rebound {
            player: Some(player),
            ..
        } => vec![(player, true)],
        EventKind::Turnover {
            player: Some(player),
            ..
        } => vec![(player, true)],
        _ => Vec::new(),
    }
}

/// Event kinds that move the box score. Pending substitutions are
/// committed before any of these is attributed.
fn is_box_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::FieldGoal { .. }
            | EventKind::FreeThrow { .. }
            | EventKind::Rebound { .. }
            | EventKind::Turnover { .. }
            | EventKind::Foul { .. }
    )
}

/// Add an event to the acting side's counts (`own`) and the other
/// side's (`other`) for blocks and steals.
pub(crate) fn accumulate(kind: &EventKind, own: &mut BoxCounts, other: &mut BoxCounts) {
    match kind {
        EventKind::FieldGoal {
            made,
            three,
            assist,
            blocked_by,
            ..
        } => {
            own.fga += 1;
            if *three {
                own.fg3a += 1;
            }
            if *made {
                own.fgm += 1;
                own.pts += if *three { 3 } else { 2 };
                if *three {
                    own.fg3m += 1;
                }
                if assist.is_some() {
                    own.ast += 1;
                }
            }
            if blocked_by.is_some() {
                other.blk += 1;
            }
        }
        EventKind::FreeThrow { made, .. } => {
            own.fta += 1;
            if *made {
                own.ftm += 1;
                own.pts += 1;
            }
        }
        EventKind::Rebound { offensive, .. } => {
            if *offensive {
                own.orb += 1;
            } else {
                own.drb += 1;
            }
        }
        EventKind::Turnover { stolen_by, .. } => {
            own.tov += 1;
            if stolen_by.is_some() {
                other.stl += 1;
            }
        }
        EventKind::Foul { .. } => own.pf += 1,
        _ => {}
    }
}

#[derive(Debug)]
struct OpenStint {
    period: u8,
    start: GameClock,
    team: BoxCounts,
    opponent: BoxCounts,
    event_count: u32,
}

struct Reconstructor<'a> {
    game_id: &'a GameId,
    team_id: &'a TeamId,
    periods: PeriodLengths,
    court: Court,
    open: Option<OpenStint>,
    pending: Vec<(PlayerId, PlayerId)>,
    pending_at: Option<(u8, GameClock)>,
    stints: Vec<LineupStint>,
}

impl<'a> Reconstructor<'a> {
    fn new(
        game_id: &'a GameId,
        team_id: &'a TeamId,
        starters: &[PlayerId],
        periods: PeriodLengths,
    ) -> Self {
        let court = Court::from_starters(starters);
        if let Court::Unresolved { known, .. } = &court {
            debug!(
                "Team {} in game {} has {} flagged starters",
                team_id,
                game_id,
                known.len()
            );
        }
        Self {
            game_id,
            team_id,
            periods,
            court,
            open: None,
            pending: Vec::new(),
            pending_at: None,
            stints: Vec::new(),
        }
    }

    fn open_at(&mut self, period: u8, start: GameClock) {
        self.open = Some(OpenStint {
            period,
            start,
            team: BoxCounts::default(),
            opponent: BoxCounts::default(),
            event_count: 0,
        });
    }

    /// Close the open stint at `end`. Zero-length stints that saw no
    /// events are dropped.
    fn close(&mut self, end: GameClock) {
        let Some(open) = self.open.take() else {
            return;
        };
        let end = end.min(open.start);
        if end == open.start && open.event_count == 0 {
            return;
        }
        self.stints.push(LineupStint {
            game_id: self.game_id.clone(),
            team_id: self.team_id.clone(),
            sequence: self.stints.len() as u32 + 1,
            period: open.period,
            start_clock: open.start,
            end_clock: end,
            status: self.court.status(),
            possessions: possessions(&open.team),
            opponent_possessions: possessions(&open.opponent),
            team: open.team,
            opponent: open.opponent,
            event_count: open.event_count,
        });
    }

    /// Make sure a stint is open in `period`, closing any stint left open
    /// in an earlier period at 0:00.
    fn ensure_open(&mut self, period: u8) {
        if self.open.as_ref().map(|open| open.period) != Some(period) {
            self.close(GameClock::ZERO);
            self.open_at(period, self.periods.length(period));
        }
    }

    /// Change the on-court set at `clock`, splitting the open stint.
    fn transition(&mut self, court: Court, period: u8, clock: GameClock) {
        if court == self.court {
            return;
        }
        if let Court::Unresolved { reason, .. } = &court {
            if matches!(self.court, Court::Resolved(_)) {
                debug!(
                    "Lineup for team {} in game {} unresolved at P{} {}: {}",
                    self.team_id, self.game_id, period, clock, reason
                );
            }
        }
        self.close(clock);
        self.court = court;
        self.open_at(period, clock);
    }

    fn commit_pending(&mut self) {
        let Some((period, clock)) = self.pending_at.take() else {
            return;
        };
        let subs = std::mem::take(&mut self.pending);
        let court = self.court.substitute(&subs);
        self.transition(court, period, clock);
    }

    fn handle(&mut self, event: &PlayByPlayEvent) {
        let clock = event.clock.min(self.periods.length(event.period));
        let ours = event.team_id.as_ref() == Some(self.team_id);

        match &event.kind {
            EventKind::PeriodStart => {
                self.commit_pending();
                self.ensure_open(event.period);
                return;
            }
            EventKind::PeriodEnd => {
                self.commit_pending();
                self.close(GameClock::ZERO);
                return;
            }
            EventKind::Substitution {
                player_in,
                player_out,
            } if ours => {
                if self.pending_at != Some((event.period, clock)) {
                    self.commit_pending();
                }
                self.ensure_open(event.period);
                self.pending.push((player_in.clone(), player_out.clone()));
                self.pending_at = Some((event.period, clock));
                return;
            }
            kind => {
                if self.pending_at != Some((event.period, clock)) || is_box_event(kind) {
                    self.commit_pending();
                }
            }
        }

        self.ensure_open(event.period);

        if ours {
            for (actor, checked) in actors(&event.kind) {
                if let Some(court) = self.court.observe(actor, checked) {
                    self.transition(court, event.period, clock);
                }
            }
        }

        let Some(open) = self.open.as_mut() else {
            return;
        };
        match &event.team_id {
            Some(team) if team == self.team_id => {
                accumulate(&event.kind, &mut open.team, &mut open.opponent)
            }
            Some(_) => accumulate(&event.kind, &mut open.opponent, &mut open.team),
            None => {}
        }
        if !matches!(event.kind, EventKind::Substitution { .. }) {
            open.event_count += 1;
        }
    }

    fn finish(mut self) -> Vec<LineupStint> {
        self.commit_pending();
        self.close(GameClock::ZERO);
        self.stints
    }
}

/// Reconstruct one team's stints for one game.
///
/// `events` must be the game's full, time-ordered event slice (both
/// teams); opponent events accumulate as counts against.
pub fn reconstruct_team(
    game_id: &GameId,
    team_id: &TeamId,
    starters: &[PlayerId],
    events: &[PlayByPlayEvent],
    periods: PeriodLengths,
) -> Vec<LineupStint> {
    let mut fsm = Reconstructor::new(game_id, team_id, starters, periods);
    for event in events {
        fsm.handle(event);
    }
    fsm.finish()
}

/// Reconstruct stints for every team with flagged starters in a game.
pub fn reconstruct_game(
    game_id: &GameId,
    starters: &BTreeMap<TeamId, Vec<PlayerId>>,
    events: &[PlayByPlayEvent],
    periods: PeriodLengths,
) -> Vec<LineupStint> {
    starters
        .iter()
        .flat_map(|(team_id, players)| {
            reconstruct_team(game_id, team_id, players, events, periods)
        })
        .collect()
}
