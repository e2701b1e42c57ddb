//! Rotation interval parsing and retention arithmetic.
//!
//! # Responsibilities
//! - Parse interval descriptors such as `"1D"` or `"30S"`
//! - Map unit letters to rotation units
//! - Convert a retention period into a rotated-file count
//!
//! # Design Decisions
//! - Parsing accepts any single trailing letter; unknown units are rejected
//!   only when a rotating writer is built from them
//! - A zero magnitude is a hard error, never clamped
//! - Rotation timing is case-insensitive, retention counting is not

use chrono::Duration;

use super::{XlogError, XlogResult};

/// Unit of a rotation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl RotationUnit {
    /// Map an interval unit letter (case-insensitive) to a unit.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'S' => Some(Self::Seconds),
            'M' => Some(Self::Minutes),
            'H' => Some(Self::Hours),
            'D' => Some(Self::Days),
            _ => None,
        }
    }

    /// Length of one unit in seconds.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
        }
    }

    /// `strftime` pattern used for the date suffix of rotated files.
    pub fn date_format(self) -> &'static str {
        match self {
            Self::Seconds => "%Y%m%d%H%M%S",
            Self::Minutes => "%Y%m%d%H%M",
            Self::Hours => "%Y%m%d%H",
            Self::Days => "%Y%m%d",
        }
    }
}

/// Time-based rotation policy derived from an interval descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub unit: RotationUnit,
    pub magnitude: u32,
    /// Unit letter exactly as written in the descriptor.
    pub letter: char,
}

impl RotationPolicy {
    /// Parse a descriptor into a policy usable by the rotating writer.
    pub fn from_interval(descriptor: &str) -> XlogResult<Self> {
        let (magnitude, letter) = parse_interval(descriptor)?;
        let unit = RotationUnit::from_letter(letter).ok_or(XlogError::UnsupportedUnit(letter))?;
        if magnitude == 0 {
            return Err(XlogError::ZeroInterval);
        }
        Ok(Self { unit, magnitude, letter })
    }

    /// Time between two rotation boundaries.
    pub fn period(&self) -> Duration {
        Duration::seconds(self.unit.seconds() * i64::from(self.magnitude))
    }

    /// Number of rotated files to keep for the given retention period.
    ///
    /// Counted from the letter as written, so a lowercase unit keeps one file.
    pub fn backup_count(&self, retention_days: u32) -> XlogResult<usize> {
        backup_count(self.letter, self.magnitude, retention_days)
    }
}

/// Split an interval descriptor into its magnitude and unit letter.
///
/// The descriptor must end in exactly one alphabetic character preceded by
/// ASCII digits only.
pub fn parse_interval(descriptor: &str) -> XlogResult<(u32, char)> {
    let invalid = || XlogError::InvalidInterval(descriptor.to_string());

    let unit = match descriptor.chars().last() {
        Some(c) if c.is_alphabetic() => c,
        _ => return Err(invalid()),
    };

    let split = descriptor
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, tail) = descriptor.split_at(split);

    if digits.is_empty() || tail.chars().count() != 1 || !tail.chars().all(char::is_alphabetic) {
        return Err(invalid());
    }

    let magnitude = digits.parse::<u32>().map_err(|_| invalid())?;
    Ok((magnitude, unit))
}

/// Number of rotated files covering `retention_days` at the given interval.
///
/// Unit letters are matched exactly (`S`, `M`, `H`, `D`); any other letter
/// yields 1.
pub fn backup_count(unit: char, magnitude: u32, retention_days: u32) -> XlogResult<usize> {
    if magnitude == 0 {
        return Err(XlogError::ZeroInterval);
    }

    let retention = u64::from(retention_days);
    let magnitude = u64::from(magnitude);
    let count = match unit {
        'S' => retention * 86_400 / magnitude,
        'M' => retention * 1_440 / magnitude,
        'H' => retention * 24 / magnitude,
        'D' => retention / magnitude,
        _ => return Ok(1),
    };

    Ok(usize::try_from(count).unwrap_or(usize::MAX))
}
