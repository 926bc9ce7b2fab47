//! Grading policy: the school-wide rules for turning scores into a final grade.
//!
//! A [`GradingPolicy`] is an immutable value. Swapping it for another one
//! never touches raw scores; the store re-derives every row from its inputs.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::GradebookError;

/// How the academic year is divided into grading periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingSystem {
    /// Four periods per year.
    #[default]
    Bimestral,
    /// Three periods per year.
    Trimestral,
}

impl GradingSystem {
    /// Number of grading periods in one academic year.
    pub fn period_count(self) -> u8 {
        match self {
            GradingSystem::Bimestral => 4,
            GradingSystem::Trimestral => 3,
        }
    }

    /// Map a requested term into `1..=period_count`.
    ///
    /// Terms past the last period collapse onto the last period. Term zero
    /// is not a period and maps to the first one.
    pub fn clamp_term(self, term: u8) -> u8 {
        term.clamp(1, self.period_count())
    }

    /// The period a calendar date falls in.
    pub fn term_for_date(self, date: NaiveDate) -> u8 {
        let month = date.month();
        match self {
            GradingSystem::Trimestral => match month {
                1..=3 => 1,
                4..=6 => 2,
                _ => 3,
            },
            GradingSystem::Bimestral => match month {
                1..=2 => 1,
                3..=4 => 2,
                5..=6 => 3,
                _ => 4,
            },
        }
    }
}

impl fmt::Display for GradingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingSystem::Bimestral => write!(f, "bimestral"),
            GradingSystem::Trimestral => write!(f, "trimestral"),
        }
    }
}

impl FromStr for GradingSystem {
    type Err = GradebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bimestral" => Ok(GradingSystem::Bimestral),
            "trimestral" => Ok(GradingSystem::Trimestral),
            other => Err(GradebookError::InvalidChoice {
                field: "system",
                value: other.to_string(),
            }),
        }
    }
}

/// How the two component scores are combined into an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMethod {
    #[default]
    Arithmetic,
    Weighted,
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationMethod::Arithmetic => write!(f, "arithmetic"),
            CalculationMethod::Weighted => write!(f, "weighted"),
        }
    }
}

impl FromStr for CalculationMethod {
    type Err = GradebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arithmetic" => Ok(CalculationMethod::Arithmetic),
            "weighted" => Ok(CalculationMethod::Weighted),
            other => Err(GradebookError::InvalidChoice {
                field: "calculation_method",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a recovery (make-up) score exists and what it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryType {
    None,
    #[default]
    Grade,
    Exam,
}

impl fmt::Display for RecoveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryType::None => write!(f, "none"),
            RecoveryType::Grade => write!(f, "grade"),
            RecoveryType::Exam => write!(f, "exam"),
        }
    }
}

impl FromStr for RecoveryType {
    type Err = GradebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RecoveryType::None),
            "grade" => Ok(RecoveryType::Grade),
            "exam" => Ok(RecoveryType::Exam),
            other => Err(GradebookError::InvalidChoice {
                field: "recovery_type",
                value: other.to_string(),
            }),
        }
    }
}

/// How a recovery score combines with the period average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryRule {
    /// Mean of the average and the recovery score.
    Average,
    /// The higher of the two.
    Max,
    /// The recovery score replaces the average.
    #[default]
    Replace,
}

impl fmt::Display for RecoveryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryRule::Average => write!(f, "average"),
            RecoveryRule::Max => write!(f, "max"),
            RecoveryRule::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for RecoveryRule {
    type Err = GradebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "average" => Ok(RecoveryRule::Average),
            "max" => Ok(RecoveryRule::Max),
            "replace" => Ok(RecoveryRule::Replace),
            other => Err(GradebookError::InvalidChoice {
                field: "recovery_rule",
                value: other.to_string(),
            }),
        }
    }
}

/// Percentage weights for the weighted method.
///
/// They need not sum to 100; the computer normalizes by their sum.
/// `participation` is carried for the settings screen but takes no part
/// in the two-component average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default = "default_component_weight")]
    pub exam: f64,
    #[serde(default = "default_component_weight")]
    pub activities: f64,
    #[serde(default)]
    pub participation: f64,
}

fn default_component_weight() -> f64 {
    50.0
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            exam: default_component_weight(),
            activities: default_component_weight(),
            participation: 0.0,
        }
    }
}

/// Site-wide configuration describing how a period's final grade is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    #[serde(default)]
    pub system: GradingSystem,
    #[serde(default)]
    pub calculation_method: CalculationMethod,
    #[serde(default)]
    pub weights: Weights,
    /// Passing threshold on the 0-10 scale.
    #[serde(default = "default_min_passing_grade")]
    pub min_passing_grade: f64,
    #[serde(default)]
    pub recovery_type: RecoveryType,
    #[serde(default)]
    pub recovery_rule: RecoveryRule,
}

fn default_min_passing_grade() -> f64 {
    6.0
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            system: GradingSystem::default(),
            calculation_method: CalculationMethod::default(),
            weights: Weights::default(),
            min_passing_grade: default_min_passing_grade(),
            recovery_type: RecoveryType::default(),
            recovery_rule: RecoveryRule::default(),
        }
    }
}

impl GradingPolicy {
    pub fn period_count(&self) -> u8 {
        self.system.period_count()
    }

    pub fn clamp_term(&self, term: u8) -> u8 {
        self.system.clamp_term(term)
    }

    pub fn term_for_date(&self, date: NaiveDate) -> u8 {
        self.system.term_for_date(date)
    }
}
