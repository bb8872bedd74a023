//! Identifier, status, and price types for image tasks.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Task Identifier
// =============================================================================

/// Opaque, never-reused identifier of a task.
///
/// Backed by a random UUID. The string form is the hyphenated lowercase
/// representation, which is also what stores use as their key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Error returned when a string is not a valid task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task id '{0}'")]
pub struct ParseTaskIdError(pub String);

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParseTaskIdError(s.to_string()))
    }
}

// =============================================================================
// Task Status
// =============================================================================

/// Lifecycle status of a task.
///
/// `Pending` is the only non-terminal state. A task moves to exactly one of
/// the terminal states and stays there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Lowercase name used in logs and serialized views.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Price
// =============================================================================

/// Lowest price a task can carry.
pub const MIN_PRICE: f64 = 5.0;

/// Highest price a task can carry.
pub const MAX_PRICE: f64 = 50.0;

/// Error returned for prices outside `[MIN_PRICE, MAX_PRICE]`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("price {0} outside of [{MIN_PRICE}, {MAX_PRICE}]")]
pub struct PriceOutOfRange(pub f64);

/// Business price attached to a task at creation.
///
/// Always within `[5, 50]` and rounded to two decimal places.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    /// Creates a price, rounding to cents.
    pub fn new(value: f64) -> Result<Self, PriceOutOfRange> {
        if !value.is_finite() || !(MIN_PRICE..=MAX_PRICE).contains(&value) {
            return Err(PriceOutOfRange(value));
        }
        Ok(Self((value * 100.0).round() / 100.0))
    }

    /// Draws a uniformly distributed price from the allowed range.
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    /// Draws a price using the given random source.
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let raw = rng.random_range(MIN_PRICE..=MAX_PRICE);
        // Rounding stays inside the closed range since both bounds are whole cents.
        Self((raw * 100.0).round() / 100.0)
    }

    /// Returns the numeric value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Price {
    type Error = PriceOutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
