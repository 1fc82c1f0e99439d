//! Static plan catalog. Loaded once, never mutated at runtime; an unknown
//! plan id is a client error handled by the validator, never a crash.

use crate::limits::{Limit, LimitSet};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Free,
    Daypass,
    Weekpass,
    Starter,
    Pro,
    Teams,
    Enterprise,
}

impl PlanId {
    pub fn parse(s: &str) -> Option<PlanId> {
        match s {
            "free" => Some(PlanId::Free),
            "daypass" => Some(PlanId::Daypass),
            "weekpass" => Some(PlanId::Weekpass),
            "starter" => Some(PlanId::Starter),
            "pro" => Some(PlanId::Pro),
            "teams" => Some(PlanId::Teams),
            "enterprise" => Some(PlanId::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Daypass => "daypass",
            PlanId::Weekpass => "weekpass",
            PlanId::Starter => "starter",
            PlanId::Pro => "pro",
            PlanId::Teams => "teams",
            PlanId::Enterprise => "enterprise",
        }
    }
}

/// Plan price in cents, or negotiated per customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Price {
    Cents(u32),
    Custom,
}

impl Price {
    pub fn is_paid(&self) -> bool {
        match self {
            Price::Cents(c) => *c > 0,
            Price::Custom => true,
        }
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Price::Cents(c) => serializer.serialize_u32(*c),
            Price::Custom => serializer.serialize_str("custom"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: PlanId,
    pub price_cents: Price,
    pub session_based: bool,
    pub limits: LimitSet,
}

impl Plan {
    /// Pure catalog lookup; `None` for unknown ids.
    pub fn lookup(plan_id: &str) -> Option<Plan> {
        PlanId::parse(plan_id).map(Plan::for_id)
    }

    pub fn all() -> Vec<Plan> {
        [
            PlanId::Free,
            PlanId::Daypass,
            PlanId::Weekpass,
            PlanId::Starter,
            PlanId::Pro,
            PlanId::Teams,
            PlanId::Enterprise,
        ]
        .into_iter()
        .map(Plan::for_id)
        .collect()
    }

    pub fn for_id(id: PlanId) -> Plan {
        match id {
            PlanId::Free => Plan {
                id,
                price_cents: Price::Cents(0),
                session_based: false,
                limits: LimitSet {
                    images_per_session: Some(Limit::Limited(5)),
                    pdf_exports: Some(Limit::Limited(2)),
                    data_exports: Some(Limit::Limited(1)),
                    comparisons: Some(Limit::Limited(3)),
                    batch_processing: false,
                    batch_size: Some(Limit::Limited(1)),
                    ..LimitSet::default()
                },
            },
            PlanId::Daypass => Plan {
                id,
                price_cents: Price::Cents(299),
                session_based: true,
                limits: LimitSet {
                    daily_photos: Some(Limit::Unlimited),
                    batch_size: Some(Limit::Limited(10)),
                    priority: false,
                    ..LimitSet::default()
                },
            },
            PlanId::Weekpass => Plan {
                id,
                price_cents: Price::Cents(999),
                session_based: true,
                limits: LimitSet {
                    daily_photos: Some(Limit::Unlimited),
                    batch_size: Some(Limit::Limited(25)),
                    priority: true,
                    ..LimitSet::default()
                },
            },
            PlanId::Starter => Plan {
                id,
                price_cents: Price::Cents(499),
                session_based: false,
                limits: LimitSet {
                    images_per_session: Some(Limit::Limited(25)),
                    pdf_exports: Some(Limit::Limited(5)),
                    data_exports: Some(Limit::Limited(3)),
                    comparisons: Some(Limit::Limited(10)),
                    batch_processing: true,
                    batch_size: Some(Limit::Limited(25)),
                    ..LimitSet::default()
                },
            },
            PlanId::Pro => Plan {
                id,
                price_cents: Price::Cents(999),
                session_based: false,
                limits: LimitSet {
                    images_per_session: Some(Limit::Limited(50)),
                    pdf_exports: Some(Limit::Unlimited),
                    data_exports: Some(Limit::Unlimited),
                    comparisons: Some(Limit::Unlimited),
                    batch_processing: true,
                    batch_size: Some(Limit::Limited(100)),
                    ..LimitSet::default()
                },
            },
            PlanId::Teams => Plan {
                id,
                price_cents: Price::Cents(4900),
                session_based: false,
                limits: LimitSet {
                    images_per_session: Some(Limit::Unlimited),
                    batch_processing: true,
                    batch_size: Some(Limit::Unlimited),
                    api_access: true,
                    ..LimitSet::default()
                },
            },
            PlanId::Enterprise => Plan {
                id,
                price_cents: Price::Custom,
                session_based: false,
                limits: LimitSet {
                    images_per_session: Some(Limit::Unlimited),
                    batch_processing: true,
                    batch_size: Some(Limit::Unlimited),
                    api_access: true,
                    priority: true,
                    ..LimitSet::default()
                },
            },
        }
    }
}
