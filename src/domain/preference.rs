use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Interest an association expresses for a single bike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    NotInterested = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Tier {
    /// Allocation passes, strongest interest first. `NotInterested` never takes part.
    pub const PASSES: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Points moved by a contest decided at this tier.
    pub fn weight(self) -> f64 {
        f64::from(self.value())
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tier::NotInterested),
            1 => Ok(Tier::Low),
            2 => Ok(Tier::Medium),
            3 => Ok(Tier::High),
            other => Err(format!("tier must be between 0 and 3, got {}", other)),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.value()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// A validated preference submission of one association for one recovery date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub tiers: BTreeMap<String, Tier>,
    #[serde(rename = "number_of_needed_bikes", default, skip_serializing_if = "Option::is_none")]
    pub requested_quota: Option<usize>,
}

impl Preference {
    pub fn tier_for(&self, bike_id: &str) -> Tier {
        self.tiers
            .get(bike_id)
            .copied()
            .unwrap_or(Tier::NotInterested)
    }

    /// An absent quota means "as many as there are".
    pub fn effective_quota(&self, total_bikes: usize) -> usize {
        self.requested_quota.unwrap_or(total_bikes)
    }

    pub fn count_at(&self, tier: Tier) -> usize {
        self.tiers.values().filter(|t| **t == tier).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_conversion() {
        assert_eq!(Tier::try_from(3).unwrap(), Tier::High);
        assert_eq!(Tier::try_from(0).unwrap(), Tier::NotInterested);
        assert!(Tier::try_from(4).is_err());
        assert_eq!(u8::from(Tier::Medium), 2);
        assert_eq!(Tier::Low.weight(), 1.0);
    }

    #[test]
    fn test_passes_skip_not_interested() {
        assert!(!Tier::PASSES.contains(&Tier::NotInterested));
        assert_eq!(Tier::PASSES[0], Tier::High);
    }

    #[test]
    fn test_missing_bike_means_not_interested() {
        let mut preference = Preference::default();
        preference.tiers.insert("B1".to_string(), Tier::High);

        assert_eq!(preference.tier_for("B1"), Tier::High);
        assert_eq!(preference.tier_for("B2"), Tier::NotInterested);
    }

    #[test]
    fn test_effective_quota_defaults_to_total() {
        let mut preference = Preference::default();
        assert_eq!(preference.effective_quota(12), 12);

        preference.requested_quota = Some(0);
        assert_eq!(preference.effective_quota(12), 0);
    }

    #[test]
    fn test_serialized_form() {
        let mut preference = Preference {
            requested_quota: Some(2),
            ..Default::default()
        };
        preference.tiers.insert("B1".to_string(), Tier::Medium);

        let json = serde_json::to_value(&preference).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tiers": {"B1": 2}, "number_of_needed_bikes": 2})
        );

        let bad = serde_json::json!({"tiers": {"B1": 9}});
        assert!(serde_json::from_value::<Preference>(bad).is_err());
    }
}
