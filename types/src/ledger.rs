use serde::{Deserialize, Serialize};
use std::fmt;

/// Team balance record, keyed by team name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub team_name: String,
    /// Roster identifiers as typed at login (comma-separated in practice).
    #[serde(default)]
    pub rolls: String,
    #[serde(default)]
    pub institute_email: String,
    pub cash: f64,
    /// Epoch milliseconds.
    #[serde(default)]
    pub created_at: u64,
}

impl Team {
    pub fn new(
        team_name: impl Into<String>,
        rolls: impl Into<String>,
        institute_email: impl Into<String>,
        cash: f64,
        created_at: u64,
    ) -> Self {
        Self {
            team_name: team_name.into(),
            rolls: rolls.into(),
            institute_email: institute_email.into(),
            cash,
            created_at,
        }
    }

    /// Fill profile fields that are blank in the stored record.
    ///
    /// Stored values always win; cash is never touched. Returns `true` if any
    /// field changed.
    pub fn fill_profile(&mut self, rolls: &str, institute_email: &str) -> bool {
        let mut changed = false;
        if self.rolls.trim().is_empty() && !rolls.trim().is_empty() {
            self.rolls = rolls.trim().to_string();
            changed = true;
        }
        if self.institute_email.trim().is_empty() && !institute_email.trim().is_empty() {
            self.institute_email = institute_email.trim().to_string();
            changed = true;
        }
        changed
    }
}

/// Round/event singleton.
///
/// A missing document reads as the default: inactive, round 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub round: u64,
}

impl RoundState {
    pub fn inactive(round: u64) -> Self {
        Self {
            active: false,
            round,
        }
    }

    pub fn active(round: u64) -> Self {
        Self { active: true, round }
    }

    /// Whether any round was ever started.
    pub fn has_started(&self) -> bool {
        self.round > 0
    }

    /// Apply a merge write: only fields present in the patch are replaced.
    pub fn merge(&mut self, patch: RoundPatch) {
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(round) = patch.round {
            self.round = round;
        }
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.active {
            write!(f, "ACTIVE({})", self.round)
        } else {
            write!(f, "INACTIVE({})", self.round)
        }
    }
}

/// Partial update of [RoundState] (merge semantics).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundPatch {
    pub active: Option<bool>,
    pub round: Option<u64>,
}

impl RoundPatch {
    pub fn start(round: u64) -> Self {
        Self {
            active: Some(true),
            round: Some(round),
        }
    }

    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            round: None,
        }
    }
}

/// Composite key of a bet: at most one bet per team per round.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BetKey {
    pub round: u64,
    pub team_name: String,
}

impl BetKey {
    pub fn new(round: u64, team_name: impl Into<String>) -> Self {
        Self {
            round,
            team_name: team_name.into(),
        }
    }
}

/// Renders the document id, `{round}_{teamName}`.
impl fmt::Display for BetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.round, self.team_name)
    }
}

/// Bet record, keyed by [BetKey].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub round: u64,
    pub team_name: String,
    /// Outcome label the team picked.
    pub plane: String,
    pub amount: f64,
    /// Epoch milliseconds.
    pub ts: u64,
}

impl Bet {
    pub fn key(&self) -> BetKey {
        BetKey::new(self.round, self.team_name.clone())
    }

    /// Outcome labels compare as trimmed strings.
    pub fn picked(&self, label: &str) -> bool {
        self.plane.trim() == label.trim()
    }
}

/// Client-local session cache entry written on login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub team_name: String,
    pub rolls: String,
    pub institute_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bet_key_renders_document_id() {
        let key = BetKey::new(3, "Falcons");
        assert_eq!(key.to_string(), "3_Falcons");
    }

    #[test]
    fn bet_serializes_camel_case() {
        let bet = Bet {
            round: 1,
            team_name: "Falcons".to_string(),
            plane: "7".to_string(),
            amount: 500.0,
            ts: 42,
        };
        let json = serde_json::to_value(&bet).unwrap();
        assert_eq!(json["teamName"], "Falcons");
        assert_eq!(json["plane"], "7");
        assert_eq!(json["amount"], 500.0);
    }

    #[test]
    fn team_missing_profile_fields_default() {
        let team: Team =
            serde_json::from_str(r#"{"teamName":"Owls","cash":9000}"#).unwrap();
        assert_eq!(team.rolls, "");
        assert_eq!(team.created_at, 0);
        assert_eq!(team.cash, 9000.0);
    }

    #[test]
    fn round_state_missing_fields_read_as_inactive_zero() {
        let state: RoundState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, RoundState::inactive(0));
        assert!(!state.has_started());
    }

    #[test]
    fn round_merge_keeps_absent_fields() {
        let mut state = RoundState::active(4);
        state.merge(RoundPatch::deactivate());
        assert_eq!(state, RoundState::inactive(4));

        state.merge(RoundPatch::start(5));
        assert_eq!(state, RoundState::active(5));
    }

    #[test]
    fn fill_profile_never_overwrites() {
        let mut team = Team::new("Falcons", "", "f@x.in", 10_000.0, 1);
        assert!(team.fill_profile(" 23XX01 ", "other@x.in"));
        assert_eq!(team.rolls, "23XX01");
        assert_eq!(team.institute_email, "f@x.in");
        assert!(!team.fill_profile("zzz", "zzz"));
    }

    #[test]
    fn picked_compares_trimmed() {
        let bet = Bet {
            round: 1,
            team_name: "A".to_string(),
            plane: " 7 ".to_string(),
            amount: 1.0,
            ts: 0,
        };
        assert!(bet.picked("7"));
        assert!(bet.picked("7  "));
        assert!(!bet.picked("07"));
    }
}
