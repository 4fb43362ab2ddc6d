use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AqmsError;

/// Jurisdictions participating in the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "BD")]
    Bangladesh,
    #[serde(rename = "IN")]
    India,
}

impl Country {
    pub const ALL: [Country; 2] = [Country::Bangladesh, Country::India];

    /// ISO 3166 alpha-2 code
    pub fn code(&self) -> &'static str {
        match self {
            Country::Bangladesh => "BD",
            Country::India => "IN",
        }
    }

    /// The other side of the border
    pub fn neighbor(&self) -> Self {
        match self {
            Country::Bangladesh => Country::India,
            Country::India => Country::Bangladesh,
        }
    }

    /// Monitored city for this jurisdiction
    pub fn city(&self) -> City {
        match self {
            Country::Bangladesh => City::Dhaka,
            Country::India => City::Kolkata,
        }
    }

    /// Agency credited on measurements from government stations
    pub fn source_agency(&self) -> &'static str {
        match self {
            Country::Bangladesh => "Department of Environment, Bangladesh",
            Country::India => "Central Pollution Control Board, India",
        }
    }

    /// Language used for public-facing alert text
    pub fn regional_language(&self) -> Language {
        match self {
            Country::Bangladesh => Language::Bengali,
            Country::India => Language::Hindi,
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Country {
    type Err = AqmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BD" | "BANGLADESH" => Ok(Country::Bangladesh),
            "IN" | "INDIA" => Ok(Country::India),
            other => Err(AqmsError::Validation(format!("unknown country: {}", other))),
        }
    }
}

/// Monitored cities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum City {
    Dhaka,
    Kolkata,
}

impl City {
    pub const ALL: [City; 2] = [City::Dhaka, City::Kolkata];

    pub fn name(&self) -> &'static str {
        match self {
            City::Dhaka => "Dhaka",
            City::Kolkata => "Kolkata",
        }
    }

    pub fn country(&self) -> Country {
        match self {
            City::Dhaka => Country::Bangladesh,
            City::Kolkata => Country::India,
        }
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for City {
    type Err = AqmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dhaka" => Ok(City::Dhaka),
            "kolkata" | "calcutta" => Ok(City::Kolkata),
            other => Err(AqmsError::Validation(format!("unknown city: {}", other))),
        }
    }
}

/// Alert message languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Bengali,
    Hindi,
}
