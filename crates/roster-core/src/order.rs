//! Parsing of `order_by=field,direction` query values.
//!
//! The set of orderable fields is owned by each domain, so [`OrderBy`] is
//! generic over a field type implementing [`OrderField`].

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderByError {
    #[error("unknown order field: {0}")]
    UnknownField(String),
    #[error("unknown direction: {0}")]
    UnknownDirection(String),
    #[error("invalid order_by format: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = OrderByError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(OrderByError::UnknownDirection(other.to_string())),
        }
    }
}

/// A field a domain allows ordering by.
pub trait OrderField: Copy + Sized {
    /// Field used when the client sends no `order_by`.
    const DEFAULT: Self;

    /// Maps a client-facing name to the field.
    fn from_name(name: &str) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderBy<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F: OrderField> Default for OrderBy<F> {
    fn default() -> Self {
        Self {
            field: F::DEFAULT,
            direction: Direction::Asc,
        }
    }
}

impl<F: OrderField> OrderBy<F> {
    pub fn new(field: F, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Parses `"field"` or `"field,direction"`. An empty value yields the default.
    pub fn parse(raw: &str) -> Result<Self, OrderByError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() > 2 {
            return Err(OrderByError::Malformed(raw.to_string()));
        }

        let name = parts[0].trim();
        let field =
            F::from_name(name).ok_or_else(|| OrderByError::UnknownField(name.to_string()))?;

        let direction = match parts.get(1) {
            Some(dir) => dir.parse()?,
            None => Direction::Asc,
        };

        Ok(Self { field, direction })
    }
}
