//! The closed set of market sectors used as regression targets.
//!
//! [`Sector::ALL`] is the one list every component iterates: corpus parsing,
//! the model bank, the predictor, and the result summary all see sectors in
//! the same order.

use serde::{Deserialize, Serialize};

/// One of the eleven market sectors.
///
/// The derived `Ord` follows declaration order, which is also the order of
/// [`Sector::ALL`]. Ranking ties are broken by this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    CommunicationServices,
    ConsumerDiscretionary,
    ConsumerStaples,
    Energy,
    Financials,
    HealthCare,
    Industrials,
    InformationTechnology,
    Materials,
    RealEstate,
    Utilities,
}

impl Sector {
    /// Every sector, in canonical order.
    pub const ALL: [Sector; 11] = [
        Self::CommunicationServices,
        Self::ConsumerDiscretionary,
        Self::ConsumerStaples,
        Self::Energy,
        Self::Financials,
        Self::HealthCare,
        Self::Industrials,
        Self::InformationTechnology,
        Self::Materials,
        Self::RealEstate,
        Self::Utilities,
    ];

    /// Name used in the corpus, artifact file names, and `result.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommunicationServices => "communication_services",
            Self::ConsumerDiscretionary => "consumer_discretionary",
            Self::ConsumerStaples => "consumer_staples",
            Self::Energy => "energy",
            Self::Financials => "financials",
            Self::HealthCare => "health_care",
            Self::Industrials => "industrials",
            Self::InformationTechnology => "information_technology",
            Self::Materials => "materials",
            Self::RealEstate => "real_estate",
            Self::Utilities => "utilities",
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|sector| sector.as_str() == s)
            .ok_or_else(|| format!("unknown sector: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for sector in Sector::ALL {
            let parsed: Sector = sector.as_str().parse().unwrap();
            assert_eq!(parsed, sector);
        }
        assert!("crypto".parse::<Sector>().is_err());
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&Sector::InformationTechnology).unwrap();
        assert_eq!(json, "\"information_technology\"");
    }

    #[test]
    fn ord_follows_canonical_order() {
        let mut sorted = Sector::ALL;
        sorted.sort();
        assert_eq!(sorted, Sector::ALL);
    }
}
