//! Audible marketplace regions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// An Audible marketplace. Each maps to the TLD of its API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Ca,
    Uk,
    Au,
    Fr,
    De,
    Jp,
    It,
    In,
    Es,
    Br,
}

impl Region {
    pub const ALL: [Region; 11] = [
        Region::Us,
        Region::Ca,
        Region::Uk,
        Region::Au,
        Region::Fr,
        Region::De,
        Region::Jp,
        Region::It,
        Region::In,
        Region::Es,
        Region::Br,
    ];

    /// Region code as used in query strings (`us`, `uk`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Ca => "ca",
            Region::Uk => "uk",
            Region::Au => "au",
            Region::Fr => "fr",
            Region::De => "de",
            Region::Jp => "jp",
            Region::It => "it",
            Region::In => "in",
            Region::Es => "es",
            Region::Br => "br",
        }
    }

    /// Top-level domain suffix for `api.audible<tld>`.
    pub fn tld(self) -> &'static str {
        match self {
            Region::Us => ".com",
            Region::Ca => ".ca",
            Region::Uk => ".co.uk",
            Region::Au => ".com.au",
            Region::Fr => ".fr",
            Region::De => ".de",
            Region::Jp => ".co.jp",
            Region::It => ".it",
            Region::In => ".in",
            Region::Es => ".es",
            Region::Br => ".com.br",
        }
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Region::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or_else(|| Error::InvalidRegion(s.to_string()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
