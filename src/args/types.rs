use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{DECIMAL_SCALE, format_decimal_micros, parse_decimal_micros};
use crate::error::ValidationError;

/// Probabilities are stored as parts per million.
pub const PROBABILITY_SCALE: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// One segment of the virtual-user ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStage {
    pub duration: Duration,
    pub target: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Probability(u32);

impl Probability {
    pub const NEVER: Probability = Probability(0);
    pub const ALWAYS: Probability = Probability(PROBABILITY_SCALE);

    #[must_use]
    pub const fn per_million(self) -> u32 {
        self.0
    }

    /// Builds a probability from parts per million.
    ///
    /// # Errors
    ///
    /// Returns an error when the value exceeds one million.
    pub fn from_per_million(value: u32) -> Result<Self, ValidationError> {
        if value > PROBABILITY_SCALE {
            return Err(ValidationError::ProbabilityOutOfRange {
                value: value.to_string(),
            });
        }
        Ok(Self(value))
    }
}

impl std::fmt::Display for Probability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_decimal_micros(u64::from(self.0)))
    }
}

impl std::str::FromStr for Probability {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let micros = parse_decimal_micros(s)?;
        if micros > DECIMAL_SCALE {
            return Err(ValidationError::ProbabilityOutOfRange {
                value: s.trim().to_owned(),
            });
        }
        let value = u32::try_from(micros).map_err(|_err| ValidationError::ProbabilityOutOfRange {
            value: s.trim().to_owned(),
        })?;
        Ok(Self(value))
    }
}

impl<'de> Deserialize<'de> for Probability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = NumberOrText::deserialize(deserializer)?;
        value
            .to_text()
            .parse::<Probability>()
            .map_err(serde::de::Error::custom)
    }
}

/// Config values that may be written either as a bare number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrText {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    pub(crate) fn to_text(&self) -> String {
        match self {
            NumberOrText::Integer(value) => value.to_string(),
            NumberOrText::Float(value) => value.to_string(),
            NumberOrText::Text(text) => text.clone(),
        }
    }
}

/// Inclusive range of HTTP statuses counted as expected responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRange {
    pub start: u16,
    pub end: u16,
}

impl StatusRange {
    pub const DEFAULT: StatusRange = StatusRange {
        start: 200,
        end: 399,
    };

    #[must_use]
    pub const fn contains(self, status: u16) -> bool {
        status >= self.start && status <= self.end
    }
}

impl std::fmt::Display for StatusRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl std::str::FromStr for StatusRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidStatusRange {
            value: s.to_owned(),
        };
        let trimmed = s.trim();
        let (start_text, end_text) = trimmed.split_once('-').unwrap_or((trimmed, trimmed));
        let start: u16 = start_text.trim().parse().map_err(|_err| invalid())?;
        let end: u16 = end_text.trim().parse().map_err(|_err| invalid())?;
        if !(100..=599).contains(&start) || !(100..=599).contains(&end) || start > end {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }
}

/// Cities the PVZ service accepts for new pickup points.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum City {
    #[serde(rename = "Москва", alias = "moscow")]
    Moscow,
    #[serde(rename = "Санкт-Петербург", alias = "saint-petersburg")]
    SaintPetersburg,
    #[serde(rename = "Казань", alias = "kazan")]
    Kazan,
}

impl City {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            City::Moscow => "Москва",
            City::SaintPetersburg => "Санкт-Петербург",
            City::Kazan => "Казань",
        }
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for City {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "москва" | "moscow" => Ok(City::Moscow),
            "санкт-петербург" | "saint-petersburg" | "spb" => Ok(City::SaintPetersburg),
            "казань" | "kazan" => Ok(City::Kazan),
            _ => Err(ValidationError::UnknownCity {
                value: s.to_owned(),
            }),
        }
    }
}
