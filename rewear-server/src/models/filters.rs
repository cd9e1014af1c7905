//! List filters and query parameters

use std::str::FromStr;

use rewear_core::{ItemStatus, SwapStatus};
use serde::Deserialize;

use super::ValidationError;

/// Maximum rows a list endpoint returns
const MAX_LIMIT: u32 = 100;

/// Rows returned when no limit is given
const DEFAULT_LIMIT: u32 = MAX_LIMIT;

/// Row limit for list queries, clamped to 1..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimit(u32);

impl ListLimit {
    pub fn new(requested: Option<i64>) -> Self {
        match requested {
            None => Self(DEFAULT_LIMIT),
            Some(n) => Self(n.clamp(1, i64::from(MAX_LIMIT)) as u32),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for ListLimit {
    fn default() -> Self {
        Self(DEFAULT_LIMIT)
    }
}

/// Conjunction of optional item conditions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    /// Case-insensitive substring of title, description or brand
    pub search: Option<String>,
    pub owner_id: Option<String>,
    pub limit: Option<u32>,
}

impl ItemFilter {
    pub fn with_status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// True when `item` satisfies every condition except the limit.
    pub fn matches(&self, item: &super::Item) -> bool {
        if self.status.is_some_and(|s| s != item.status) {
            return false;
        }
        if self.category.as_deref().is_some_and(|c| c != item.category) {
            return false;
        }
        if self.owner_id.as_deref().is_some_and(|o| o != item.user_id) {
            return false;
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            let hit = |field: Option<&str>| {
                field.is_some_and(|f| f.to_lowercase().contains(&needle))
            };
            if !(hit(Some(item.title.as_str()))
                || hit(item.description.as_deref())
                || hit(item.brand.as_deref()))
            {
                return false;
            }
        }
        true
    }
}

/// GET /api/items query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl TryFrom<ItemQuery> for ItemFilter {
    type Error = ValidationError;

    /// Public browsing defaults to approved items.
    fn try_from(q: ItemQuery) -> Result<Self, Self::Error> {
        let status = match non_blank(q.status) {
            None => ItemStatus::Approved,
            Some(s) => parse_variant("status", &s)?,
        };

        Ok(Self {
            status: Some(status),
            category: non_blank(q.category),
            search: non_blank(q.search),
            owner_id: None,
            limit: Some(ListLimit::new(q.limit).get()),
        })
    }
}

/// Conjunction of optional swap conditions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapFilter {
    pub requester_id: Option<String>,
    pub owner_id: Option<String>,
    /// Matches swaps where this user is either party
    pub participant_id: Option<String>,
    pub status: Option<SwapStatus>,
}

impl SwapFilter {
    pub fn requested_by(user_id: impl Into<String>) -> Self {
        Self {
            requester_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn received_by(user_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn involving(user_id: impl Into<String>) -> Self {
        Self {
            participant_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, swap: &super::Swap) -> bool {
        self.requester_id.as_deref().map_or(true, |r| r == swap.requester_id)
            && self.owner_id.as_deref().map_or(true, |o| o == swap.owner_id)
            && self.participant_id.as_deref().map_or(true, |p| swap.involves(p))
            && self.status.map_or(true, |s| s == swap.status)
    }
}

/// Which side of a swap the caller is looking from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    Requested,
    Received,
}

impl FromStr for SwapDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "received" => Ok(Self::Received),
            other => Err(ValidationError::InvalidVariant {
                field: "type",
                value: other.to_owned(),
            }),
        }
    }
}

/// GET /api/swaps query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwapQuery {
    #[serde(rename = "type")]
    pub direction: Option<String>,
    pub status: Option<String>,
}

impl SwapQuery {
    /// Build the filter for `caller`; no direction means both.
    pub fn into_filter(self, caller: &str) -> Result<SwapFilter, ValidationError> {
        let mut filter = match non_blank(self.direction) {
            None => SwapFilter::involving(caller),
            Some(d) => match d.parse::<SwapDirection>()? {
                SwapDirection::Requested => SwapFilter::requested_by(caller),
                SwapDirection::Received => SwapFilter::received_by(caller),
            },
        };

        if let Some(s) = non_blank(self.status) {
            filter.status = Some(parse_variant("status", &s)?);
        }

        Ok(filter)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_variant<T: FromStr>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    value.parse::<T>().map_err(|_| ValidationError::InvalidVariant {
        field,
        value: value.to_owned(),
    })
}
