//! Per team-game play-by-play context.
//!
//! Second-chance points and points off turnovers both follow a possession
//! window. The window opens on the trigger (own offensive rebound, or an
//! opponent turnover) and credits the team's points until the possession
//! ends: an own turnover, any opponent shot, rebound or turnover, or a
//! new period. A made field goal ends it too, except for free throws
//! awarded at the same moment (and-ones).

use regex::Regex;

use crate::models::{
    EventKind, GameClock, GameId, PlayByPlayEvent, PlayContext, PlayerId, Season, ShotSplit, TeamId,
};

/// Description patterns for assists and transition plays.
#[derive(Debug, Clone)]
pub struct PlayClassifier {
    assist: Regex,
    transition: Regex,
}

impl PlayClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            assist: Regex::new(r"(?i)\bassist(s|ed)?\b")?,
            transition: Regex::new(
                r"(?i)\b(fast[- ]?break|in transition|transition|coast[- ]to[- ]coast|outlet)\b",
            )?,
        })
    }

    /// An assist id wins; otherwise the description is checked.
    pub fn is_assisted(&self, assist: Option<&PlayerId>, description: Option<&str>) -> bool {
        assist.is_some() || description.is_some_and(|d| self.assist.is_match(d))
    }

    /// Shots without a description count as half-court.
    pub fn is_transition(&self, description: Option<&str>) -> bool {
        description.is_some_and(|d| self.transition.is_match(d))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    Closed,
    Open { period: u8 },
    AfterMake { period: u8, clock: GameClock },
}

/// Points credited to a possession trigger.
#[derive(Debug, Clone, Copy)]
struct Window {
    state: WindowState,
    opportunities: u32,
    points: u32,
}

impl Window {
    fn new() -> Self {
        Self {
            state: WindowState::Closed,
            opportunities: 0,
            points: 0,
        }
    }

    fn open(&mut self, period: u8) {
        self.opportunities += 1;
        self.state = WindowState::Open { period };
    }

    /// Advance the window over one event. `ours` is whether the team
    /// tracked by this window is credited with the event.
    fn step(&mut self, event: &PlayByPlayEvent, ours: bool) {
        let points = points_scored(&event.kind);
        let opponent_possession = !ours && event.team_id.is_some() && ends_possession(&event.kind);

        self.state = match self.state {
            WindowState::Closed => WindowState::Closed,
            _ if matches!(event.kind, EventKind::PeriodStart | EventKind::PeriodEnd) => {
                WindowState::Closed
            }
            WindowState::Open { period } if event.period != period => WindowState::Closed,
            WindowState::Open { .. } if opponent_possession => WindowState::Closed,
            WindowState::Open { period } if ours => {
                self.points += points;
                match event.kind {
                    EventKind::FieldGoal { made: true, .. } => WindowState::AfterMake {
                        period,
                        clock: event.clock,
                    },
                    EventKind::Turnover { .. } => WindowState::Closed,
                    _ => WindowState::Open { period },
                }
            }
            open @ WindowState::Open { .. } => open,
            WindowState::AfterMake { period, clock } => {
                if event.period != period || event.clock != clock || opponent_possession {
                    WindowState::Closed
                } else {
                    if ours && matches!(event.kind, EventKind::FreeThrow { .. }) {
                        self.points += points;
                    }
                    WindowState::AfterMake { period, clock }
                }
            }
        };
    }

    fn per_opportunity(&self) -> Option<f64> {
        (self.opportunities > 0).then(|| self.points as f64 / self.opportunities as f64)
    }
}

fn points_scored(kind: &EventKind) -> u32 {
    match kind {
        EventKind::FieldGoal {
            made: true, three, ..
        } => {
            if *three {
                3
            } else {
                2
            }
        }
        EventKind::FreeThrow { made: true, .. } => 1,
        _ => 0,
    }
}

/// Events that show the acting team has the ball.
fn ends_possession(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::FieldGoal { .. }
            | EventKind::FreeThrow { .. }
            | EventKind::Rebound { .. }
            | EventKind::Turnover { .. }
    )
}

/// Build one team's play context from a game's ordered events (both
/// teams).
pub fn play_context(
    classifier: &PlayClassifier,
    season: Season,
    game_id: &GameId,
    team_id: &TeamId,
    events: &[PlayByPlayEvent],
) -> PlayContext {
    let mut fgm = 0;
    let mut assisted_fgm = 0;
    let mut transition = ShotSplit::default();
    let mut halfcourt = ShotSplit::default();
    let mut second_chance = Window::new();
    let mut off_turnover = Window::new();

    for event in events {
        let ours = event.team_id.as_ref() == Some(team_id);
        let theirs = !ours && event.team_id.is_some();
        let description = event.description.as_deref();

        second_chance.step(event, ours);
        off_turnover.step(event, ours);

        match &event.kind {
            EventKind::FieldGoal {
                made, three, assist, ..
            } if ours => {
                if *made {
                    fgm += 1;
                    if classifier.is_assisted(assist.as_ref(), description) {
                        assisted_fgm += 1;
                    }
                }
                let split = if classifier.is_transition(description) {
                    &mut transition
                } else {
                    &mut halfcourt
                };
                split.record(*made, *three);
            }
            EventKind::Rebound {
                offensive: true, ..
            } if ours => second_chance.open(event.period),
            EventKind::Turnover { .. } if theirs => off_turnover.open(event.period),
            _ => {}
        }
    }

    PlayContext {
        season,
        game_id: game_id.clone(),
        team_id: team_id.clone(),
        fgm,
        assisted_fgm,
        unassisted_fgm: fgm - assisted_fgm,
        assisted_rate: (fgm > 0).then(|| assisted_fgm as f64 / fgm as f64),
        offensive_rebounds: second_chance.opportunities,
        second_chance_points: second_chance.points,
        second_chance_per_rebound: second_chance.per_opportunity(),
        opponent_turnovers: off_turnover.opportunities,
        points_off_turnovers: off_turnover.points,
        points_per_turnover: off_turnover.per_opportunity(),
        transition_efg_pct: transition.efg_pct(),
        halfcourt_efg_pct: halfcourt.efg_pct(),
        transition,
        halfcourt,
    }
}
