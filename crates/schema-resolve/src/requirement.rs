//! Attribute requirement levels

use crate::{Error, Result};
use std::fmt;

/// How strongly an attribute is required, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirement {
    Optional,
    Recommended,
    Required,
}

impl Requirement {
    pub fn as_str(self) -> &'static str {
        match self {
            Requirement::Optional => "optional",
            Requirement::Recommended => "recommended",
            Requirement::Required => "required",
        }
    }

    /// Rank used to compare requirements; absent requirements rank 0.
    pub fn rank(self) -> u8 {
        match self {
            Requirement::Optional => 1,
            Requirement::Recommended => 2,
            Requirement::Required => 3,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "optional" => Ok(Requirement::Optional),
            "recommended" => Ok(Requirement::Recommended),
            "required" => Ok(Requirement::Required),
            other => Err(Error::UnknownRequirement(other.to_string())),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank of an optional requirement string.
pub fn requirement_to_rank(requirement: Option<&str>) -> Result<u8> {
    match requirement {
        None => Ok(0),
        Some(value) => Requirement::parse(value).map(Requirement::rank),
    }
}

/// Requirement string for a rank; rank 0 means no requirement.
pub fn rank_to_requirement(rank: u8) -> Result<Option<&'static str>> {
    match rank {
        0 => Ok(None),
        1 => Ok(Some(Requirement::Optional.as_str())),
        2 => Ok(Some(Requirement::Recommended.as_str())),
        3 => Ok(Some(Requirement::Required.as_str())),
        other => Err(Error::UnknownRank(other)),
    }
}
