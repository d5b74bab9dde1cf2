use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum_macros::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    Row,
    Column,
}

/// A row or column, either by 1-based ordinal or by label.
///
/// Tokens that look like unsigned integers are ordinals, everything else is a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AxisToken {
    Ordinal(usize),
    Label(String),
}

impl From<usize> for AxisToken {
    fn from(value: usize) -> Self {
        Self::Ordinal(value)
    }
}

impl From<&str> for AxisToken {
    fn from(value: &str) -> Self {
        let value = value.trim();
        match value.parse::<usize>() {
            Ok(ordinal) => Self::Ordinal(ordinal),
            Err(_) => Self::Label(value.to_string()),
        }
    }
}

impl From<String> for AxisToken {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&String> for AxisToken {
    fn from(value: &String) -> Self {
        Self::from(value.as_str())
    }
}

impl Display for AxisToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisToken::Ordinal(ordinal) => write!(f, "{}", ordinal),
            AxisToken::Label(label) => f.write_str(label),
        }
    }
}

/// An unresolved well location, `<row>:<column>`, e.g. `A:1`, `1:1`, `H:12`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub row: AxisToken,
    pub column: AxisToken,
}

impl Location {
    pub fn new(row: impl Into<AxisToken>, column: impl Into<AxisToken>) -> Self {
        Self {
            row: row.into(),
            column: column.into(),
        }
    }
}

impl FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chunks: Vec<&str> = s.split(':').collect();
        match chunks.as_slice() {
            [row, column] if !row.trim().is_empty() && !column.trim().is_empty() => Ok(Self::new(*row, *column)),
            _ => Err(LocationError::Malformed(s.to_string())),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Anything that can be turned into a [`Location`], so that callers can use `"A:1"`, `(1, 1)` or `("A", 1)`.
pub trait IntoLocation {
    fn into_location(self) -> Result<Location, LocationError>;
}

impl IntoLocation for Location {
    fn into_location(self) -> Result<Location, LocationError> {
        Ok(self)
    }
}

impl IntoLocation for &Location {
    fn into_location(self) -> Result<Location, LocationError> {
        Ok(self.clone())
    }
}

impl IntoLocation for &str {
    fn into_location(self) -> Result<Location, LocationError> {
        Location::from_str(self)
    }
}

impl IntoLocation for String {
    fn into_location(self) -> Result<Location, LocationError> {
        Location::from_str(&self)
    }
}

impl IntoLocation for &String {
    fn into_location(self) -> Result<Location, LocationError> {
        Location::from_str(self)
    }
}

impl<R: Into<AxisToken>, C: Into<AxisToken>> IntoLocation for (R, C) {
    fn into_location(self) -> Result<Location, LocationError> {
        Ok(Location::new(self.0, self.1))
    }
}

/// One or more rows or columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisSelection(pub Vec<AxisToken>);

impl From<AxisToken> for AxisSelection {
    fn from(value: AxisToken) -> Self {
        Self(vec![value])
    }
}

impl From<usize> for AxisSelection {
    fn from(value: usize) -> Self {
        Self(vec![value.into()])
    }
}

impl From<&str> for AxisSelection {
    fn from(value: &str) -> Self {
        Self(vec![value.into()])
    }
}

impl<T: Into<AxisToken>> From<Vec<T>> for AxisSelection {
    fn from(value: Vec<T>) -> Self {
        Self(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AxisToken>, const N: usize> From<[T; N]> for AxisSelection {
    fn from(value: [T; N]) -> Self {
        Self(value.into_iter().map(Into::into).collect())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("Invalid location, required format: '<row>:<column>'. location: '{0}'")]
    Malformed(String),
    #[error("Invalid {axis} ordinal. ordinal: {ordinal}, count: {count}")]
    OrdinalOutOfRange { axis: Axis, ordinal: usize, count: usize },
    #[error("Unknown {axis} label. label: '{label}', labels: {labels:?}")]
    UnknownLabel {
        axis: Axis,
        label: String,
        labels: Vec<String>,
    },
}
