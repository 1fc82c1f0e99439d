//! Usage validation: decides whether a declared action is permitted under a
//! plan. Pure over the catalog; the caller supplies the plan id as the
//! client declared it and an unknown id comes back as a business rejection
//! (`valid: false`), never an error.

use crate::catalog::{Plan, PlanId};
use crate::limits::Limit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action kinds a client can declare. Adding a kind here forces the match
/// in `validate_usage` to be extended, so there is no string fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Upload,
    Batch,
    Priority,
    AdvancedExport,
    UnlimitedPdf,
    ApiAccess,
    WhiteLabel,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<ActionKind> {
        match s {
            "upload" => Some(ActionKind::Upload),
            "batch" => Some(ActionKind::Batch),
            "priority" => Some(ActionKind::Priority),
            "advanced_export" => Some(ActionKind::AdvancedExport),
            "unlimited_pdf" => Some(ActionKind::UnlimitedPdf),
            "api_access" => Some(ActionKind::ApiAccess),
            "white_label" => Some(ActionKind::WhiteLabel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Upload => "upload",
            ActionKind::Batch => "batch",
            ActionKind::Priority => "priority",
            ActionKind::AdvancedExport => "advanced_export",
            ActionKind::UnlimitedPdf => "unlimited_pdf",
            ActionKind::ApiAccess => "api_access",
            ActionKind::WhiteLabel => "white_label",
        }
    }
}

/// Client-declared usage, as it arrives on the wire. The action type stays
/// a string until validation so an unknown action is rejected with a
/// decision, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Usage {
    pub action_type: Option<String>,
    pub image_count: Option<u64>,
    pub batch_size: Option<u64>,
}

/// One inbound request's usage claim, resolved against its origin. Lives
/// only for the current decision and the rolling fraud window.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub plan_type: String,
    pub action_type: Option<String>,
    pub image_count: Option<u64>,
    pub batch_size: Option<u64>,
    pub client_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RemainingUsage {
    #[serde(rename_all = "camelCase")]
    Uploads { uploads: Limit },
    #[serde(rename_all = "camelCase")]
    Batch { max_batch_size: Limit },
}

/// The decision returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub valid: bool,
    pub details: String,
    pub remaining_usage: Option<RemainingUsage>,
}

impl Verdict {
    fn rejected(details: impl Into<String>) -> Verdict {
        Verdict {
            valid: false,
            details: details.into(),
            remaining_usage: None,
        }
    }

    fn flag(allowed: bool, granted: &str, denied: &str) -> Verdict {
        Verdict {
            valid: allowed,
            details: if allowed { granted } else { denied }.to_string(),
            remaining_usage: None,
        }
    }
}

/// Dispatch a usage claim to its action-specific rule.
pub fn validate_usage(plan_type: &str, usage: &Usage) -> Verdict {
    let Some(plan) = Plan::lookup(plan_type) else {
        return Verdict::rejected("Invalid plan type");
    };

    let action = match usage.action_type.as_deref() {
        Some(s) => match ActionKind::parse(s) {
            Some(action) => action,
            None => return Verdict::rejected(format!("Unknown action type: {s}")),
        },
        None => return Verdict::rejected("Unknown action type: none given"),
    };

    match action {
        ActionKind::Upload => validate_upload(&plan, usage.image_count.unwrap_or(1)),
        ActionKind::Batch => validate_batch(&plan, usage.batch_size.unwrap_or(1)),
        ActionKind::Priority => Verdict::flag(
            plan.limits.priority,
            "Priority processing available",
            "Priority processing not available on this plan",
        ),
        // Deliberately loose: any paid plan or batch-capable plan qualifies.
        // Flagged for product review, kept as shipped.
        ActionKind::AdvancedExport => Verdict::flag(
            plan.price_cents.is_paid() || plan.limits.batch_processing,
            "Advanced exports available",
            "Advanced exports require paid plan",
        ),
        ActionKind::UnlimitedPdf => Verdict::flag(
            plan.limits.pdf_exports == Some(Limit::Unlimited),
            "Unlimited PDF generation available",
            "Unlimited PDF requires higher plan",
        ),
        ActionKind::ApiAccess => Verdict::flag(
            plan.limits.api_access,
            "API access available",
            "API access requires Teams or Enterprise plan",
        ),
        ActionKind::WhiteLabel => Verdict::flag(
            plan.id == PlanId::Enterprise || plan.limits.api_access,
            "White label available",
            "White label requires Enterprise plan",
        ),
    }
}

fn validate_upload(plan: &Plan, image_count: u64) -> Verdict {
    // Free sessions cap hard at imagesPerSession.
    if plan.id == PlanId::Free {
        let cap = plan
            .limits
            .images_per_session
            .unwrap_or(Limit::Limited(0));
        let remaining = cap.remaining_after(image_count);
        return upload_verdict(remaining);
    }

    // Paid plans: any unlimited sentinel means no cap.
    let daily_unlimited = plan.limits.daily_photos == Some(Limit::Unlimited);
    let session_unlimited = plan.limits.images_per_session == Some(Limit::Unlimited);
    if daily_unlimited || session_unlimited {
        return Verdict {
            valid: true,
            details: "Unlimited uploads".to_string(),
            remaining_usage: Some(RemainingUsage::Uploads {
                uploads: Limit::Unlimited,
            }),
        };
    }

    let cap = plan
        .limits
        .images_per_session
        .unwrap_or(Limit::Limited(50));
    upload_verdict(cap.remaining_after(image_count))
}

fn upload_verdict(remaining: Limit) -> Verdict {
    let valid = remaining != Limit::Limited(0);
    Verdict {
        valid,
        details: if valid {
            "Upload allowed".to_string()
        } else {
            "Session limit exceeded".to_string()
        },
        remaining_usage: Some(RemainingUsage::Uploads { uploads: remaining }),
    }
}

fn validate_batch(plan: &Plan, batch_size: u64) -> Verdict {
    if !plan.limits.batch_processing {
        return Verdict::rejected("Batch processing not available on this plan");
    }

    let max = plan.limits.batch_size.unwrap_or(Limit::Unlimited);
    if !max.allows(batch_size) {
        return Verdict {
            valid: false,
            details: format!("Batch size {batch_size} exceeds limit of {max}"),
            remaining_usage: Some(RemainingUsage::Batch {
                max_batch_size: max,
            }),
        };
    }

    Verdict {
        valid: true,
        details: "Batch processing allowed".to_string(),
        remaining_usage: Some(RemainingUsage::Batch {
            max_batch_size: max,
        }),
    }
}
