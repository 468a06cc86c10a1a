//! Shot zone classification and per-game zone aggregation.

use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::{CourtPoint, EventKind, GameId, PlayByPlayEvent, Season, TeamId, Zone, ZoneShot};

/// Restricted-area radius in feet.
const RIM_RADIUS_FT: f64 = 4.0;

/// Half the lane width in feet.
const LANE_HALF_WIDTH_FT: f64 = 6.0;

/// Free-throw line distance from the basket in feet.
const LANE_DEPTH_FT: f64 = 13.75;

/// Threes taken within this distance of the basket's baseline plane count
/// as corner threes (14 ft from the baseline, basket 5.25 ft in).
const CORNER_MAX_Y_FT: f64 = 8.75;

/// Assigns every field-goal attempt to exactly one zone.
///
/// Coordinates win when present. Otherwise the play description is
/// matched against keyword patterns, which is approximate.
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    corner: Regex,
    rim: Regex,
    paint: Regex,
    midrange: Regex,
}

impl ZoneClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            corner: Regex::new(r"(?i)\bcorner\b")?,
            rim: Regex::new(r"(?i)\b(lay[- ]?up|dunk|tip[- ]?(in|shot)?|put[- ]?back|alley[- ]?oop|at the rim)\b")?,
            paint: Regex::new(r"(?i)\b(paint|hook|floater|in the lane|post|driving)\b")?,
            midrange: Regex::new(
                r"(?i)\b(jumper|jump shot|pull[- ]?up|fadeaway|step[- ]?back|mid[- ]?range|elbow|baseline)\b",
            )?,
        })
    }

    pub fn classify(
        &self,
        three: bool,
        location: Option<CourtPoint>,
        description: Option<&str>,
    ) -> Zone {
        if let Some(point) = location {
            return classify_point(three, point);
        }
        let Some(text) = description.filter(|d| !d.trim().is_empty()) else {
            return Zone::Unclassified;
        };
        if three {
            if self.corner.is_match(text) {
                Zone::CornerThree
            } else {
                Zone::AboveBreakThree
            }
        } else if self.rim.is_match(text) {
            Zone::AtRim
        } else if self.paint.is_match(text) {
            Zone::Paint
        } else if self.midrange.is_match(text) {
            Zone::Midrange
        } else {
            Zone::Unclassified
        }
    }
}

fn classify_point(three: bool, point: CourtPoint) -> Zone {
    if three {
        return if point.y <= CORNER_MAX_Y_FT {
            Zone::CornerThree
        } else {
            Zone::AboveBreakThree
        };
    }
    if point.distance() <= RIM_RADIUS_FT {
        Zone::AtRim
    } else if point.x.abs() <= LANE_HALF_WIDTH_FT && point.y <= LANE_DEPTH_FT {
        Zone::Paint
    } else {
        Zone::Midrange
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    fgm: u32,
    fga: u32,
    points: u32,
}

/// Aggregate one team's field-goal attempts in a game by zone.
///
/// Always returns all six zones. Zone attempts sum to the team's
/// play-by-play attempts; a disagreement with `box_fga` is logged.
pub fn aggregate_zones(
    classifier: &ZoneClassifier,
    season: Season,
    game_id: &GameId,
    team_id: &TeamId,
    events: &[PlayByPlayEvent],
    box_fga: Option<u32>,
) -> Vec<ZoneShot> {
    let mut tallies: BTreeMap<Zone, Tally> = Zone::ALL.iter().map(|z| (*z, Tally::default())).collect();

    for event in events.iter().filter(|e| e.team_id.as_ref() == Some(team_id)) {
        if let EventKind::FieldGoal {
            made,
            three,
            location,
            ..
        } = &event.kind
        {
            let zone = classifier.classify(*three, *location, event.description.as_deref());
            let tally = tallies.entry(zone).or_default();
            tally.fga += 1;
            if *made {
                tally.fgm += 1;
                tally.points += if *three { 3 } else { 2 };
            }
        }
    }

    let total_fga: u32 = tallies.values().map(|t| t.fga).sum();
    if let Some(box_fga) = box_fga {
        if box_fga != total_fga {
            warn!(
                "Game {} team {}: play-by-play has {} FGA, box score has {}",
                game_id, team_id, total_fga, box_fga
            );
        }
    }

    tallies
        .into_iter()
        .map(|(zone, t)| ZoneShot {
            season,
            game_id: game_id.clone(),
            team_id: team_id.clone(),
            zone,
            fgm: t.fgm,
            fga: t.fga,
            points: t.points,
            fg_pct: (t.fga > 0).then(|| t.fgm as f64 / t.fga as f64),
            fga_share: (total_fga > 0).then(|| t.fga as f64 / total_fga as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameClock, PlayerId};

    fn classifier() -> ZoneClassifier {
        ZoneClassifier::new().unwrap()
    }

    fn shot(seq: u32, team: &str, made: bool, three: bool, location: Option<(f64, f64)>, desc: Option<&str>) -> PlayByPlayEvent {
        PlayByPlayEvent {
            game_id: GameId::from("g1"),
            sequence: seq,
            period: 1,
            clock: GameClock::from_secs(600 - seq),
            team_id: Some(TeamId::from(team)),
            kind: EventKind::FieldGoal {
                shooter: PlayerId::from("p1"),
                made,
                three,
                assist: None,
                blocked_by: None,
                location: location.map(|(x, y)| CourtPoint { x, y }),
            },
            description: desc.map(String::from),
        }
    }

    #[test]
    fn test_classify_coordinates() {
        let c = classifier();
        let at = |three, x, y| c.classify(three, Some(CourtPoint { x, y }), None);
        assert_eq!(at(false, 1.0, 2.0), Zone::AtRim);
        assert_eq!(at(false, 3.0, 10.0), Zone::Paint);
        assert_eq!(at(false, 12.0, 10.0), Zone::Midrange);
        assert_eq!(at(false, 0.0, 16.0), Zone::Midrange);
        assert_eq!(at(true, 21.5, 2.0), Zone::CornerThree);
        assert_eq!(at(true, 5.0, 21.0), Zone::AboveBreakThree);
    }

    #[test]
    fn test_coordinates_override_description() {
        let c = classifier();
        let zone = c.classify(false, Some(CourtPoint { x: 15.0, y: 5.0 }), Some("Layup made"));
        assert_eq!(zone, Zone::Midrange);
    }

    #[test]
    fn test_classify_keywords() {
        let c = classifier();
        assert_eq!(c.classify(false, None, Some("Smith made Layup.")), Zone::AtRim);
        assert_eq!(c.classify(false, None, Some("Jones DUNK")), Zone::AtRim);
        assert_eq!(c.classify(false, None, Some("made Hook Shot")), Zone::Paint);
        assert_eq!(c.classify(false, None, Some("missed Jumper")), Zone::Midrange);
        assert_eq!(c.classify(true, None, Some("Three Point Jumper from the corner")), Zone::CornerThree);
        assert_eq!(c.classify(true, None, Some("Three Point Jumper")), Zone::AboveBreakThree);
        assert_eq!(c.classify(false, None, Some("made Two Point Shot")), Zone::Unclassified);
        assert_eq!(c.classify(false, None, None), Zone::Unclassified);
        assert_eq!(c.classify(true, None, Some("  ")), Zone::Unclassified);
    }

    #[test]
    fn test_aggregate_zones_totals() {
        let events = vec![
            shot(1, "A", true, false, Some((0.5, 1.0)), None),
            shot(2, "A", false, false, Some((0.5, 1.0)), None),
            shot(3, "A", true, true, Some((22.0, 1.0)), None),
            shot(4, "A", false, false, None, None),
            shot(5, "B", true, false, Some((0.5, 1.0)), None),
        ];
        let zones = aggregate_zones(&classifier(), 2025, &GameId::from("g1"), &TeamId::from("A"), &events, Some(4));
        assert_eq!(zones.len(), 6);

        let rim = zones.iter().find(|z| z.zone == Zone::AtRim).unwrap();
        assert_eq!((rim.fgm, rim.fga, rim.points), (1, 2, 2));
        assert_eq!(rim.fg_pct, Some(0.5));
        assert_eq!(rim.fga_share, Some(0.5));

        let corner = zones.iter().find(|z| z.zone == Zone::CornerThree).unwrap();
        assert_eq!(corner.points, 3);

        let paint = zones.iter().find(|z| z.zone == Zone::Paint).unwrap();
        assert_eq!(paint.fga, 0);
        assert_eq!(paint.fg_pct, None);

        let total: u32 = zones.iter().map(|z| z.fga).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_aggregate_zones_no_attempts() {
        let zones = aggregate_zones(&classifier(), 2025, &GameId::from("g1"), &TeamId::from("A"), &[], None);
        assert!(zones.iter().all(|z| z.fga == 0 && z.fga_share.is_none()));
    }
}
