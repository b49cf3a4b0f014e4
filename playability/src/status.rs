use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Whether a match may go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    Allowed,
    Postponed,
    Cancelled,
    Forfeited,
}

impl GameStatus {
    pub const ALL: [GameStatus; 4] = [
        GameStatus::Allowed,
        GameStatus::Postponed,
        GameStatus::Cancelled,
        GameStatus::Forfeited,
    ];

    pub fn is_playable(self) -> bool {
        matches!(self, GameStatus::Allowed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Allowed => "Allowed",
            GameStatus::Postponed => "Postponed",
            GameStatus::Cancelled => "Cancelled",
            GameStatus::Forfeited => "Forfeited",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for GameStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// The rule that stopped play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    ExtremeTemperature,
    HighHumidity,
    UnfavorableConditions,
    PoorAirQuality,
}

impl Cause {
    pub fn describe(self) -> &'static str {
        match self {
            Cause::ExtremeTemperature => "Extreme Temperature",
            Cause::HighHumidity => "High Humidity",
            Cause::UnfavorableConditions => "Unfavorable Conditions",
            Cause::PoorAirQuality => "Poor Air Quality",
        }
    }
}

/// A status together with the rule that produced it.
///
/// `cause` is `None` exactly when `status` is [`GameStatus::Allowed`]; only
/// the rules build one, so it is serialize-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub status: GameStatus,
    pub cause: Option<Cause>,
}

impl Verdict {
    pub const ALLOWED: Verdict = Verdict {
        status: GameStatus::Allowed,
        cause: None,
    };

    pub(crate) fn stopped(status: GameStatus, cause: Cause) -> Self {
        Self {
            status,
            cause: Some(cause),
        }
    }

    pub fn is_playable(&self) -> bool {
        self.status.is_playable()
    }

    /// Display phrase, e.g. `Game Cancelled (Poor Air Quality)`.
    pub fn label(&self) -> String {
        match self.cause {
            Some(cause) => format!("Game {} ({})", self.status, cause.describe()),
            None => format!("Game {}", self.status),
        }
    }

    pub fn headline(&self) -> &'static str {
        if self.is_playable() {
            "You can play football!"
        } else {
            "You cannot play football!"
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_allowed_is_playable() {
        assert!(GameStatus::Allowed.is_playable());
        assert!(!GameStatus::Postponed.is_playable());
        assert!(!GameStatus::Cancelled.is_playable());
        assert!(!GameStatus::Forfeited.is_playable());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Allowed".parse::<GameStatus>(), Ok(GameStatus::Allowed));
        assert_eq!(" forfeited ".parse::<GameStatus>(), Ok(GameStatus::Forfeited));
        assert!("Game Allowed".parse::<GameStatus>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Verdict::ALLOWED.label(), "Game Allowed");
        assert_eq!(
            Verdict::stopped(GameStatus::Forfeited, Cause::ExtremeTemperature).label(),
            "Game Forfeited (Extreme Temperature)"
        );
        assert_eq!(
            Verdict::stopped(GameStatus::Postponed, Cause::UnfavorableConditions).to_string(),
            "Game Postponed (Unfavorable Conditions)"
        );
    }

    #[test]
    fn test_headline() {
        assert_eq!(Verdict::ALLOWED.headline(), "You can play football!");
        assert_eq!(
            Verdict::stopped(GameStatus::Cancelled, Cause::HighHumidity).headline(),
            "You cannot play football!"
        );
    }

    #[test]
    fn test_status_serializes_as_variant_name() {
        let json = serde_json::to_string(&GameStatus::Postponed).unwrap();
        assert_eq!(json, "\"Postponed\"");
    }
}
