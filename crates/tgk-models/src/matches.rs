//! Match models
//!
//! `score` is absent until a match starts, so every match type decodes it
//! with "try, default to absent": a missing or malformed score is `None`
//! rather than a decode failure.

use crate::ids::{MatchId, TeamId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use tgk_mapping::{InMapper, MapValue, Mappable, MappingError, OutMapper};

tgk_mapping::mapping_keys! {
    /// Keys of a score
    pub enum ScoreKeys {
        Home => "home",
        Away => "away",
    }
}

/// Goals of both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    /// Goals of the home team
    pub home: i64,
    /// Goals of the away team
    pub away: i64,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.home, self.away)
    }
}

impl Mappable for Score {
    type Keys = ScoreKeys;

    fn in_map(mapper: &InMapper<'_, ScoreKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            home: mapper.map(ScoreKeys::Home)?,
            away: mapper.map(ScoreKeys::Away)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<ScoreKeys>) -> Result<(), MappingError> {
        mapper.map(&self.home, ScoreKeys::Home);
        mapper.map(&self.away, ScoreKeys::Away);
        Ok(())
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of a team inside a match
    pub enum MatchTeamKeys {
        Id => "id",
        Name => "name",
        ShortName => "short_name",
    }
}

/// Team as listed in a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTeam {
    /// Team id
    pub id: TeamId,
    /// Full name
    pub name: String,
    /// Three letter code
    pub short_name: String,
}

impl Mappable for MatchTeam {
    type Keys = MatchTeamKeys;

    fn in_map(mapper: &InMapper<'_, MatchTeamKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            id: mapper.map(MatchTeamKeys::Id)?,
            name: mapper.map(MatchTeamKeys::Name)?,
            short_name: mapper.map(MatchTeamKeys::ShortName)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<MatchTeamKeys>) -> Result<(), MappingError> {
        mapper.map(&self.id, MatchTeamKeys::Id);
        mapper.map(&self.name, MatchTeamKeys::Name);
        mapper.map(&self.short_name, MatchTeamKeys::ShortName);
        Ok(())
    }
}

fn is_favorite(
    id: MatchId,
    home: &MatchTeam,
    away: &MatchTeam,
    is_favorite_match: impl Fn(MatchId) -> bool,
    is_favorite_team: impl Fn(TeamId) -> bool,
) -> bool {
    is_favorite_match(id) || is_favorite_team(home.id) || is_favorite_team(away.id)
}

tgk_mapping::mapping_keys! {
    /// Keys of a compact match
    pub enum MatchCompactKeys {
        Id => "id",
        Home => "home",
        Away => "away",
        Date => "date",
        EndDate => "endDate",
        Location => "location",
        Score => "score",
    }
}

/// Match as listed in the schedule
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCompact {
    /// Match id
    pub id: MatchId,
    /// Home side
    pub home: MatchTeam,
    /// Away side
    pub away: MatchTeam,
    /// Kick-off
    pub date: DateTime<Utc>,
    /// Expected end
    pub end_date: DateTime<Utc>,
    /// Stadium and city
    pub location: String,
    /// Current score, `None` before kick-off
    pub score: Option<Score>,
}

impl MatchCompact {
    /// Whether the match itself or either team is a favorite
    pub fn is_favorite(
        &self,
        is_favorite_match: impl Fn(MatchId) -> bool,
        is_favorite_team: impl Fn(TeamId) -> bool,
    ) -> bool {
        is_favorite(self.id, &self.home, &self.away, is_favorite_match, is_favorite_team)
    }

    /// Score as `h:a`, or `-:-` before kick-off
    #[must_use]
    pub fn score_string(&self) -> String {
        self.score.map_or_else(|| "-:-".to_string(), |score| score.to_string())
    }
}

impl Mappable for MatchCompact {
    type Keys = MatchCompactKeys;

    fn in_map(mapper: &InMapper<'_, MatchCompactKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            id: mapper.map(MatchCompactKeys::Id)?,
            home: mapper.map_nested(MatchCompactKeys::Home)?,
            away: mapper.map_nested(MatchCompactKeys::Away)?,
            date: mapper.map(MatchCompactKeys::Date)?,
            end_date: mapper.map(MatchCompactKeys::EndDate)?,
            location: mapper.map(MatchCompactKeys::Location)?,
            score: mapper.map_nested_optional(MatchCompactKeys::Score),
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<MatchCompactKeys>) -> Result<(), MappingError> {
        mapper.map(&self.id, MatchCompactKeys::Id);
        mapper.map_nested(&self.home, MatchCompactKeys::Home)?;
        mapper.map_nested(&self.away, MatchCompactKeys::Away)?;
        mapper.map(&self.date, MatchCompactKeys::Date);
        mapper.map(&self.end_date, MatchCompactKeys::EndDate);
        mapper.map(&self.location, MatchCompactKeys::Location);
        if let Some(score) = &self.score {
            mapper.map_nested(score, MatchCompactKeys::Score)?;
        }
        Ok(())
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of the schedule
    pub enum MatchesKeys {
        Matches => "matches",
    }
}

/// Full schedule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matches {
    /// Every match in schedule order
    pub matches: Vec<MatchCompact>,
}

impl Mappable for Matches {
    type Keys = MatchesKeys;

    fn in_map(mapper: &InMapper<'_, MatchesKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            matches: mapper.map_nested_array(MatchesKeys::Matches)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<MatchesKeys>) -> Result<(), MappingError> {
        mapper.map_nested_array(&self.matches, MatchesKeys::Matches)
    }
}

/// Kind of a live match event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Kick-off
    Start,
    /// Home side scored
    GoalHome,
    /// Away side scored
    GoalAway,
    /// Final whistle
    End,
    /// Free-text commentary
    Info,
    /// Half-time break began
    HalftimeStart,
    /// Second half began
    HalftimeEnd,
}

impl EventKind {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::GoalHome => "goal_home",
            Self::GoalAway => "goal_away",
            Self::End => "end",
            Self::Info => "info",
            Self::HalftimeStart => "halftime_start",
            Self::HalftimeEnd => "halftime_end",
        }
    }
}

impl MapValue for EventKind {
    const EXPECTED: &'static str = "event kind";

    fn from_json(value: &Value) -> Option<Self> {
        Some(match value.as_str()? {
            "start" => Self::Start,
            "goal_home" => Self::GoalHome,
            "goal_away" => Self::GoalAway,
            "end" => Self::End,
            "info" => Self::Info,
            "halftime_start" => Self::HalftimeStart,
            "halftime_end" => Self::HalftimeEnd,
            _ => return None,
        })
    }

    fn to_json(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of a match event
    pub enum MatchEventKeys {
        Kind => "type",
        Text => "text",
        RealMinute => "real_minute",
        MatchMinute => "match_minute",
    }
}

/// One entry of the live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    /// What happened
    pub kind: EventKind,
    /// Commentary
    pub text: String,
    /// Minutes since kick-off on the wall clock
    pub real_minute: i64,
    /// Minute of play
    pub match_minute: i64,
}

impl Mappable for MatchEvent {
    type Keys = MatchEventKeys;

    fn in_map(mapper: &InMapper<'_, MatchEventKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            kind: mapper.map(MatchEventKeys::Kind)?,
            text: mapper.map(MatchEventKeys::Text)?,
            real_minute: mapper.map(MatchEventKeys::RealMinute)?,
            match_minute: mapper.map(MatchEventKeys::MatchMinute)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<MatchEventKeys>) -> Result<(), MappingError> {
        mapper.map(&self.kind, MatchEventKeys::Kind);
        mapper.map(&self.text, MatchEventKeys::Text);
        mapper.map(&self.real_minute, MatchEventKeys::RealMinute);
        mapper.map(&self.match_minute, MatchEventKeys::MatchMinute);
        Ok(())
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of a full match
    pub enum MatchFullKeys {
        Id => "id",
        Home => "home",
        Away => "away",
        Date => "date",
        EndDate => "endDate",
        Location => "location",
        StageTitle => "stage_title",
        Score => "score",
        Events => "events",
    }
}

/// Match with its live feed
#[derive(Debug, Clone, PartialEq)]
pub struct MatchFull {
    /// Match id
    pub id: MatchId,
    /// Home side
    pub home: MatchTeam,
    /// Away side
    pub away: MatchTeam,
    /// Kick-off
    pub date: DateTime<Utc>,
    /// Expected end
    pub end_date: DateTime<Utc>,
    /// Stadium and city
    pub location: String,
    /// Group or knockout round
    pub stage_title: String,
    /// Current score, `None` before kick-off
    pub score: Option<Score>,
    /// Live feed in chronological order
    pub events: Vec<MatchEvent>,
}

impl MatchFull {
    /// Score implied by `events`, `None` if the match has not started
    #[must_use]
    pub fn reevaluate_score(events: &[MatchEvent]) -> Option<Score> {
        if !events.iter().any(|event| event.kind == EventKind::Start) {
            return None;
        }
        let count = |kind: EventKind| events.iter().filter(|event| event.kind == kind).count();
        Some(Score {
            home: i64::try_from(count(EventKind::GoalHome)).unwrap_or(i64::MAX),
            away: i64::try_from(count(EventKind::GoalAway)).unwrap_or(i64::MAX),
        })
    }

    /// The match as it looked at `real_minute`
    #[must_use]
    pub fn snapshot(&self, real_minute: i64) -> Self {
        let events: Vec<MatchEvent> = self
            .events
            .iter()
            .filter(|event| event.real_minute <= real_minute)
            .cloned()
            .collect();
        Self {
            score: Self::reevaluate_score(&events),
            events,
            ..self.clone()
        }
    }

    /// Kick-off happened
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.events.iter().any(|event| event.kind == EventKind::Start)
    }

    /// Final whistle happened
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.events.iter().any(|event| event.kind == EventKind::End)
    }

    /// Whether the match itself or either team is a favorite
    pub fn is_favorite(
        &self,
        is_favorite_match: impl Fn(MatchId) -> bool,
        is_favorite_team: impl Fn(TeamId) -> bool,
    ) -> bool {
        is_favorite(self.id, &self.home, &self.away, is_favorite_match, is_favorite_team)
    }
}

impl Mappable for MatchFull {
    type Keys = MatchFullKeys;

    fn in_map(mapper: &InMapper<'_, MatchFullKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            id: mapper.map(MatchFullKeys::Id)?,
            home: mapper.map_nested(MatchFullKeys::Home)?,
            away: mapper.map_nested(MatchFullKeys::Away)?,
            date: mapper.map(MatchFullKeys::Date)?,
            end_date: mapper.map(MatchFullKeys::EndDate)?,
            location: mapper.map(MatchFullKeys::Location)?,
            stage_title: mapper.map(MatchFullKeys::StageTitle)?,
            score: mapper.map_nested_optional(MatchFullKeys::Score),
            events: mapper.map_nested_array(MatchFullKeys::Events)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<MatchFullKeys>) -> Result<(), MappingError> {
        mapper.map(&self.id, MatchFullKeys::Id);
        mapper.map_nested(&self.home, MatchFullKeys::Home)?;
        mapper.map_nested(&self.away, MatchFullKeys::Away)?;
        mapper.map(&self.date, MatchFullKeys::Date);
        mapper.map(&self.end_date, MatchFullKeys::EndDate);
        mapper.map(&self.location, MatchFullKeys::Location);
        mapper.map(&self.stage_title, MatchFullKeys::StageTitle);
        if let Some(score) = &self.score {
            mapper.map_nested(score, MatchFullKeys::Score)?;
        }
        mapper.map_nested_array(&self.events, MatchFullKeys::Events)
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of the full schedule
    pub enum FullMatchesKeys {
        Matches => "matches",
    }
}

/// Full schedule with live feeds
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FullMatches {
    /// Every match in schedule order
    pub matches: Vec<MatchFull>,
}

impl Mappable for FullMatches {
    type Keys = FullMatchesKeys;

    fn in_map(mapper: &InMapper<'_, FullMatchesKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            matches: mapper.map_nested_array(FullMatchesKeys::Matches)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<FullMatchesKeys>) -> Result<(), MappingError> {
        mapper.map_nested_array(&self.matches, FullMatchesKeys::Matches)
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of a tournament stage
    pub enum StageKeys {
        Title => "title",
        Matches => "matches",
    }
}

/// One stage of the tournament with its matches
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// "Group A", "Quarter-finals", ...
    pub title: String,
    /// Matches of the stage in schedule order
    pub matches: Vec<MatchCompact>,
}

impl Stage {
    /// Kick-off of the first match, if any
    #[must_use]
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.matches.first().map(|game| game.date)
    }
}

impl Mappable for Stage {
    type Keys = StageKeys;

    fn in_map(mapper: &InMapper<'_, StageKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            title: mapper.map(StageKeys::Title)?,
            matches: mapper.map_nested_array(StageKeys::Matches)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<StageKeys>) -> Result<(), MappingError> {
        mapper.map(&self.title, StageKeys::Title);
        mapper.map_nested_array(&self.matches, StageKeys::Matches)
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of the stage list
    pub enum StagesKeys {
        Stages => "stages",
    }
}

/// Every stage of the tournament
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stages {
    /// Stages in tournament order
    pub stages: Vec<Stage>,
}

impl Mappable for Stages {
    type Keys = StagesKeys;

    fn in_map(mapper: &InMapper<'_, StagesKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            stages: mapper.map_nested_array(StagesKeys::Stages)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<StagesKeys>) -> Result<(), MappingError> {
        mapper.map_nested_array(&self.stages, StagesKeys::Stages)
    }
}
