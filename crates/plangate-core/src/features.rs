//! Feature entitlement resolution.
//!
//! Each feature in the static catalog names the minimum tier that grants it
//! and the features it depends on. Resolution first marks candidates (tier
//! rank qualifies, or the feature was bought as an addon), then iterates to
//! a fixpoint disabling any candidate whose dependencies are not all
//! enabled. The fixpoint makes chained dependencies deterministic no matter
//! how the catalog is ordered.

use crate::limits::Limit;
use crate::{EntitlementError, Result, Tier};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    Core,
    Ai,
    Collaboration,
    Enterprise,
    Industry,
}

/// Static feature definition; same lifecycle as the plan catalog.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: FeatureCategory,
    /// Minimum tier that grants the feature without an addon purchase.
    pub tier: Tier,
    pub dependencies: &'static [&'static str],
    /// Base limits, scaled by the tier multiplier at resolution time.
    pub base_limits: &'static [(&'static str, u64)],
}

pub fn feature_catalog() -> &'static [FeatureDefinition] {
    FEATURE_CATALOG
}

const FEATURE_CATALOG: &[FeatureDefinition] = &[
    // Core
    FeatureDefinition {
        id: "basic_ocr",
        name: "Basic OCR",
        category: FeatureCategory::Core,
        tier: Tier::Free,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "metadata_extraction",
        name: "Metadata Extraction",
        category: FeatureCategory::Core,
        tier: Tier::Free,
        dependencies: &[],
        base_limits: &[("imagesPerSession", 5)],
    },
    FeatureDefinition {
        id: "unlimited_processing",
        name: "Unlimited Processing",
        category: FeatureCategory::Core,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "batch_processing",
        name: "Batch Processing",
        category: FeatureCategory::Core,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[("batchSize", 100)],
    },
    // AI
    FeatureDefinition {
        id: "advanced_ai",
        name: "Advanced AI Analysis",
        category: FeatureCategory::Ai,
        tier: Tier::Business,
        dependencies: &["unlimited_processing"],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "custom_ai_training",
        name: "Custom AI Training",
        category: FeatureCategory::Ai,
        tier: Tier::Enterprise,
        dependencies: &[],
        base_limits: &[("modelsPerMonth", 5)],
    },
    FeatureDefinition {
        id: "unlimited_ai_training",
        name: "Unlimited AI Training",
        category: FeatureCategory::Ai,
        tier: Tier::Custom,
        dependencies: &["custom_ai_training"],
        base_limits: &[],
    },
    // Collaboration
    FeatureDefinition {
        id: "team_collaboration",
        name: "Team Collaboration",
        category: FeatureCategory::Collaboration,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[("maxMembers", 5)],
    },
    FeatureDefinition {
        id: "advanced_collaboration",
        name: "Advanced Collaboration",
        category: FeatureCategory::Collaboration,
        tier: Tier::Business,
        dependencies: &["team_collaboration"],
        base_limits: &[("maxMembers", 25)],
    },
    FeatureDefinition {
        id: "unlimited_collaboration",
        name: "Unlimited Collaboration",
        category: FeatureCategory::Collaboration,
        tier: Tier::Enterprise,
        dependencies: &["advanced_collaboration"],
        base_limits: &[],
    },
    // Enterprise
    FeatureDefinition {
        id: "white_label",
        name: "White Label",
        category: FeatureCategory::Enterprise,
        tier: Tier::Enterprise,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "sso_integration",
        name: "SSO Integration",
        category: FeatureCategory::Enterprise,
        tier: Tier::Enterprise,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "on_premise_deployment",
        name: "On-Premise Deployment",
        category: FeatureCategory::Enterprise,
        tier: Tier::Custom,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "dedicated_infrastructure",
        name: "Dedicated Infrastructure",
        category: FeatureCategory::Enterprise,
        tier: Tier::Custom,
        dependencies: &[],
        base_limits: &[],
    },
    // Industry addons
    FeatureDefinition {
        id: "legal_ai_package",
        name: "Legal AI Package",
        category: FeatureCategory::Industry,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "healthcare_ai_package",
        name: "Healthcare AI Package",
        category: FeatureCategory::Industry,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "financial_ai_package",
        name: "Financial AI Package",
        category: FeatureCategory::Industry,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[],
    },
    FeatureDefinition {
        id: "insurance_ai_package",
        name: "Insurance AI Package",
        category: FeatureCategory::Industry,
        tier: Tier::Professional,
        dependencies: &[],
        base_limits: &[],
    },
];

/// Catalog sanity check, run once at startup. A dependency naming a feature
/// that does not exist is a configuration error, not a request-time error.
pub fn validate_feature_catalog() -> Result<()> {
    let ids: BTreeSet<&str> = FEATURE_CATALOG.iter().map(|f| f.id).collect();
    for feature in FEATURE_CATALOG {
        for dep in feature.dependencies {
            if !ids.contains(dep) {
                return Err(EntitlementError::UnknownDependency {
                    feature: feature.id.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLimits {
    pub calls_per_minute: Limit,
    pub calls_per_month: Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLimits {
    pub max_members: Limit,
    pub max_workspaces: Limit,
}

/// Everything a tier + addon set entitles a client to. Derived data:
/// recomputed and replaced whole on any tier or addon change, never
/// partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureProfile {
    pub tier: Tier,
    pub addons: BTreeSet<String>,
    pub resolved_features: BTreeSet<String>,
    /// Scaled caps merged across enabled features; where two features name
    /// the same cap the more permissive value wins.
    pub limits: BTreeMap<String, Limit>,
    pub ai_credits: Limit,
    pub api_limits: ApiLimits,
    pub team_limits: TeamLimits,
}

impl FeatureProfile {
    pub fn is_enabled(&self, feature_id: &str) -> bool {
        self.resolved_features.contains(feature_id)
    }

    pub fn limit(&self, key: &str) -> Option<Limit> {
        self.limits.get(key).copied()
    }

    /// Activation/deactivation events between two profiles, for server-side
    /// audit logs.
    pub fn diff(&self, next: &FeatureProfile) -> Vec<ActivationEvent> {
        let mut events = Vec::new();
        for id in &next.resolved_features {
            if !self.resolved_features.contains(id) {
                events.push(ActivationEvent {
                    feature_id: id.clone(),
                    action: ActivationAction::Activate,
                    reason: format!("Tier change to {}", next.tier.as_str()),
                });
            }
        }
        for id in &self.resolved_features {
            if !next.resolved_features.contains(id) {
                events.push(ActivationEvent {
                    feature_id: id.clone(),
                    action: ActivationAction::Deactivate,
                    reason: format!("Tier change to {}", next.tier.as_str()),
                });
            }
        }
        events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationAction {
    Activate,
    Deactivate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationEvent {
    pub feature_id: String,
    pub action: ActivationAction,
    pub reason: String,
}

/// Resolve the feature set a tier plus explicit addons enables.
pub fn resolve_features(tier: Tier, addons: &[String]) -> FeatureProfile {
    let addon_set: BTreeSet<String> = addons.iter().cloned().collect();

    // Candidates by tier rank or explicit addon.
    let mut enabled: BTreeSet<&str> = FEATURE_CATALOG
        .iter()
        .filter(|f| tier.rank() >= f.tier.rank() || addon_set.contains(f.id))
        .map(|f| f.id)
        .collect();

    // Iterate to fixpoint: drop candidates with unmet dependencies. A
    // feature is never enabled through a disabled chain, regardless of
    // declaration order.
    loop {
        let dropped: Vec<&str> = FEATURE_CATALOG
            .iter()
            .filter(|f| enabled.contains(f.id))
            .filter(|f| f.dependencies.iter().any(|dep| !enabled.contains(dep)))
            .map(|f| f.id)
            .collect();
        if dropped.is_empty() {
            break;
        }
        for id in dropped {
            enabled.remove(id);
        }
    }

    let multiplier = tier.limit_multiplier();
    let mut limits: BTreeMap<String, Limit> = BTreeMap::new();
    for feature in FEATURE_CATALOG.iter().filter(|f| enabled.contains(f.id)) {
        for (key, base) in feature.base_limits {
            let scaled = Limit::Limited(*base).scaled_by(multiplier);
            limits
                .entry((*key).to_string())
                .and_modify(|existing| *existing = existing.most_permissive(scaled))
                .or_insert(scaled);
        }
    }

    FeatureProfile {
        tier,
        addons: addon_set,
        resolved_features: enabled.into_iter().map(str::to_string).collect(),
        limits,
        ai_credits: tier.ai_credits(),
        api_limits: tier.api_limits(),
        team_limits: tier.team_limits(),
    }
}
