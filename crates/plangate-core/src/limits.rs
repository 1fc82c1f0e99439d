//! Limit values with a single explicit `Unlimited` sentinel.
//!
//! The wire format uses `-1` for unlimited; older clients also sent
//! `Infinity`-derived values (`null` after JSON encoding) or the string
//! `"unlimited"`. All of those parse to `Limit::Unlimited` so the rest of
//! the engine only ever sees one representation.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A numeric cap, or no cap at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Limited(u64),
    Unlimited,
}

impl Limit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// Whether a request of `n` units fits under this limit.
    pub fn allows(&self, n: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Limited(max) => n <= *max,
        }
    }

    /// Remaining capacity after `used` units, saturating at zero.
    pub fn remaining_after(&self, used: u64) -> Limit {
        match self {
            Limit::Unlimited => Limit::Unlimited,
            Limit::Limited(max) => Limit::Limited(max.saturating_sub(used)),
        }
    }

    /// Scale a base limit by a tier multiplier. Unlimited on either side
    /// yields unlimited, never a numeric overflow.
    pub fn scaled_by(&self, multiplier: Limit) -> Limit {
        match (self, multiplier) {
            (Limit::Unlimited, _) | (_, Limit::Unlimited) => Limit::Unlimited,
            (Limit::Limited(base), Limit::Limited(m)) => Limit::Limited(base.saturating_mul(m)),
        }
    }

    /// The more permissive of two limits.
    pub fn most_permissive(&self, other: Limit) -> Limit {
        match (self, other) {
            (Limit::Unlimited, _) | (_, Limit::Unlimited) => Limit::Unlimited,
            (Limit::Limited(a), Limit::Limited(b)) => Limit::Limited((*a).max(b)),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Limited(n) => write!(f, "{n}"),
            Limit::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Limited(n) => serializer.serialize_u64(*n),
            Limit::Unlimited => serializer.serialize_i64(-1),
        }
    }
}

struct LimitVisitor;

impl<'de> Visitor<'de> for LimitVisitor {
    type Value = Limit;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative count, -1, null, or \"unlimited\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Limit, E> {
        Ok(Limit::Limited(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Limit, E> {
        if v < 0 {
            Ok(Limit::Unlimited)
        } else {
            Ok(Limit::Limited(v as u64))
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Limit, E> {
        if v < 0.0 || v.is_infinite() {
            Ok(Limit::Unlimited)
        } else {
            Ok(Limit::Limited(v as u64))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Limit, E> {
        match v {
            "unlimited" => Ok(Limit::Unlimited),
            other => other
                .parse::<u64>()
                .map(Limit::Limited)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<Limit, E> {
        Ok(Limit::Unlimited)
    }

    fn visit_none<E: de::Error>(self) -> Result<Limit, E> {
        Ok(Limit::Unlimited)
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Limit, D::Error> {
        deserializer.deserialize_any(LimitVisitor)
    }
}

/// Named caps attached to a plan. Fields absent from a plan definition stay
/// `None` and read as "this plan says nothing about that cap".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_per_session: Option<Limit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_photos: Option<Limit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_exports: Option<Limit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_exports: Option<Limit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparisons: Option<Limit>,
    pub batch_processing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<Limit>,
    pub api_access: bool,
    pub priority: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_and_remaining() {
        assert!(Limit::Limited(5).allows(5));
        assert!(!Limit::Limited(5).allows(6));
        assert!(Limit::Unlimited.allows(u64::MAX));
        assert_eq!(Limit::Limited(5).remaining_after(3), Limit::Limited(2));
        assert_eq!(Limit::Limited(5).remaining_after(9), Limit::Limited(0));
        assert_eq!(Limit::Unlimited.remaining_after(9), Limit::Unlimited);
    }

    #[test]
    fn test_scaling_never_overflows() {
        assert_eq!(
            Limit::Limited(100).scaled_by(Limit::Limited(5)),
            Limit::Limited(500)
        );
        assert_eq!(
            Limit::Limited(100).scaled_by(Limit::Unlimited),
            Limit::Unlimited
        );
        assert_eq!(
            Limit::Limited(u64::MAX).scaled_by(Limit::Limited(100)),
            Limit::Limited(u64::MAX)
        );
    }

    #[test]
    fn test_wire_sentinels_collapse_to_unlimited() {
        assert_eq!(serde_json::from_str::<Limit>("-1").unwrap(), Limit::Unlimited);
        assert_eq!(serde_json::from_str::<Limit>("null").unwrap(), Limit::Unlimited);
        assert_eq!(
            serde_json::from_str::<Limit>("\"unlimited\"").unwrap(),
            Limit::Unlimited
        );
        assert_eq!(serde_json::from_str::<Limit>("25").unwrap(), Limit::Limited(25));
        // Serialization is canonical: always -1
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Limit::Limited(5)).unwrap(), "5");
    }
}
