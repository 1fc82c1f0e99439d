// Plangate core - plan catalog, feature entitlement resolution, usage validation
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod catalog;
mod features;
mod limits;
mod validator;

pub use catalog::{Plan, PlanId, Price};
pub use features::{
    ActivationAction, ActivationEvent, ApiLimits, FeatureCategory, FeatureDefinition,
    FeatureProfile, TeamLimits, feature_catalog, resolve_features, validate_feature_catalog,
};
pub use limits::{Limit, LimitSet};
pub use validator::{ActionKind, RemainingUsage, Usage, UsageEvent, Verdict, validate_usage};

// Error Types
#[derive(Error, Debug)]
pub enum EntitlementError {
    #[error("Unknown tier: {0}")]
    UnknownTier(String),
    #[error("Feature '{feature}' depends on unknown feature '{dependency}'")]
    UnknownDependency { feature: String, dependency: String },
}

pub type Result<T> = std::result::Result<T, EntitlementError>;

// Subscription tiers, ordered lowest to highest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Professional,
    Business,
    Enterprise,
    Custom,
}

impl Tier {
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Free => 0,
            Tier::Professional => 1,
            Tier::Business => 2,
            Tier::Enterprise => 3,
            Tier::Custom => 4,
        }
    }

    /// Base limits scale with the tier.
    pub fn limit_multiplier(&self) -> Limit {
        match self {
            Tier::Free => Limit::Limited(1),
            Tier::Professional => Limit::Limited(5),
            Tier::Business => Limit::Limited(25),
            Tier::Enterprise => Limit::Limited(100),
            Tier::Custom => Limit::Unlimited,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Professional => "professional",
            Tier::Business => "business",
            Tier::Enterprise => "enterprise",
            Tier::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Result<Tier> {
        match s {
            "free" => Ok(Tier::Free),
            "professional" => Ok(Tier::Professional),
            "business" => Ok(Tier::Business),
            "enterprise" => Ok(Tier::Enterprise),
            "custom" => Ok(Tier::Custom),
            other => Err(EntitlementError::UnknownTier(other.to_string())),
        }
    }

    pub fn ai_credits(&self) -> Limit {
        match self {
            Tier::Free => Limit::Limited(0),
            Tier::Professional => Limit::Limited(100),
            Tier::Business => Limit::Limited(500),
            Tier::Enterprise => Limit::Limited(2000),
            Tier::Custom => Limit::Unlimited,
        }
    }

    pub fn api_limits(&self) -> ApiLimits {
        match self {
            Tier::Free => ApiLimits {
                calls_per_minute: Limit::Limited(10),
                calls_per_month: Limit::Limited(100),
            },
            Tier::Professional => ApiLimits {
                calls_per_minute: Limit::Limited(100),
                calls_per_month: Limit::Limited(1000),
            },
            Tier::Business => ApiLimits {
                calls_per_minute: Limit::Limited(500),
                calls_per_month: Limit::Limited(10000),
            },
            Tier::Enterprise | Tier::Custom => ApiLimits {
                calls_per_minute: Limit::Unlimited,
                calls_per_month: Limit::Unlimited,
            },
        }
    }

    pub fn team_limits(&self) -> TeamLimits {
        match self {
            Tier::Free => TeamLimits {
                max_members: Limit::Limited(1),
                max_workspaces: Limit::Limited(1),
            },
            Tier::Professional => TeamLimits {
                max_members: Limit::Limited(5),
                max_workspaces: Limit::Limited(3),
            },
            Tier::Business => TeamLimits {
                max_members: Limit::Limited(25),
                max_workspaces: Limit::Limited(10),
            },
            Tier::Enterprise | Tier::Custom => TeamLimits {
                max_members: Limit::Unlimited,
                max_workspaces: Limit::Unlimited,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Free.rank() < Tier::Professional.rank());
        assert!(Tier::Enterprise.rank() < Tier::Custom.rank());
        assert!(Tier::Free < Tier::Custom);
    }

    #[test]
    fn test_tier_parse_roundtrip() {
        for tier in [
            Tier::Free,
            Tier::Professional,
            Tier::Business,
            Tier::Enterprise,
            Tier::Custom,
        ] {
            assert_eq!(Tier::parse(tier.as_str()).unwrap(), tier);
        }
        assert!(matches!(
            Tier::parse("platinum"),
            Err(EntitlementError::UnknownTier(_))
        ));
    }

    #[test]
    fn test_custom_tier_is_unlimited() {
        assert_eq!(Tier::Custom.limit_multiplier(), Limit::Unlimited);
        assert_eq!(Tier::Custom.ai_credits(), Limit::Unlimited);
    }
}
