//! Discrete direction types
//!
//! A hat switch reports one of nine positions. Each position splits into a
//! horizontal and a vertical [`Direction`], which drive one axis each.

use crate::error::ControlError;
use std::fmt;

/// Signed one-dimensional intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Negative,
    #[default]
    Center,
    Positive,
}

impl Direction {
    /// Sign as a multiplier (-1.0, 0.0 or 1.0)
    pub fn sign(self) -> f64 {
        match self {
            Direction::Negative => -1.0,
            Direction::Center => 0.0,
            Direction::Positive => 1.0,
        }
    }

    /// Integer form (-1, 0 or 1)
    pub fn as_i32(self) -> i32 {
        match self {
            Direction::Negative => -1,
            Direction::Center => 0,
            Direction::Positive => 1,
        }
    }

    pub fn is_center(self) -> bool {
        self == Direction::Center
    }

    /// Opposite direction (Center stays Center)
    pub fn reversed(self) -> Self {
        match self {
            Direction::Negative => Direction::Positive,
            Direction::Center => Direction::Center,
            Direction::Positive => Direction::Negative,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = ControlError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Negative),
            0 => Ok(Direction::Center),
            1 => Ok(Direction::Positive),
            other => Err(ControlError::InvalidDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.as_i32())
    }
}

/// The nine positions of a hat switch
///
/// North is vertical +1 and East is horizontal +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HatState {
    #[default]
    Centered,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl HatState {
    /// All nine positions, centered first then clockwise from north
    pub const ALL: &'static [HatState] = &[
        HatState::Centered,
        HatState::North,
        HatState::NorthEast,
        HatState::East,
        HatState::SouthEast,
        HatState::South,
        HatState::SouthWest,
        HatState::West,
        HatState::NorthWest,
    ];

    /// Build from (horizontal, vertical) components
    pub fn from_components(horizontal: Direction, vertical: Direction) -> Self {
        use Direction::*;
        match (horizontal, vertical) {
            (Center, Center) => HatState::Centered,
            (Center, Positive) => HatState::North,
            (Positive, Positive) => HatState::NorthEast,
            (Positive, Center) => HatState::East,
            (Positive, Negative) => HatState::SouthEast,
            (Center, Negative) => HatState::South,
            (Negative, Negative) => HatState::SouthWest,
            (Negative, Center) => HatState::West,
            (Negative, Positive) => HatState::NorthWest,
        }
    }

    /// Build from raw integer components, rejecting anything outside {-1, 0, 1}
    pub fn from_raw(horizontal: i32, vertical: i32) -> Result<Self, ControlError> {
        Ok(Self::from_components(
            Direction::try_from(horizontal)?,
            Direction::try_from(vertical)?,
        ))
    }

    /// Split into (horizontal, vertical)
    pub fn components(self) -> (Direction, Direction) {
        use Direction::*;
        match self {
            HatState::Centered => (Center, Center),
            HatState::North => (Center, Positive),
            HatState::NorthEast => (Positive, Positive),
            HatState::East => (Positive, Center),
            HatState::SouthEast => (Positive, Negative),
            HatState::South => (Center, Negative),
            HatState::SouthWest => (Negative, Negative),
            HatState::West => (Negative, Center),
            HatState::NorthWest => (Negative, Positive),
        }
    }

    /// Short compass label for logs
    pub fn label(self) -> &'static str {
        match self {
            HatState::Centered => "C",
            HatState::North => "N",
            HatState::NorthEast => "NE",
            HatState::East => "E",
            HatState::SouthEast => "SE",
            HatState::South => "S",
            HatState::SouthWest => "SW",
            HatState::West => "W",
            HatState::NorthWest => "NW",
        }
    }
}

impl fmt::Display for HatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
