//! Request bodies and the validated values built from them
//!
//! Handlers deserialize the raw request type, then convert it with
//! `TryFrom` before touching the store. Nothing is written until every field
//! has passed.

use rewear_core::SwapType;
use serde::Deserialize;

use super::validation::{optional_text, required_text, ValidationError};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5_000;
const MAX_LABEL_LEN: usize = 64;
const MAX_BRAND_LEN: usize = 100;
const MAX_TAGS: usize = 20;
const MAX_TAG_LEN: usize = 40;
const MAX_IMAGES: usize = 10;
const MAX_URL_LEN: usize = 2_048;
const MAX_MESSAGE_LEN: usize = 1_000;
const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

pub const MIN_POINT_VALUE: i32 = 1;
pub const MAX_POINT_VALUE: i32 = 10_000;

/// POST /api/items body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub size: String,
    pub condition: String,
    pub brand: Option<String>,
    pub point_value: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A listing that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub size: String,
    pub condition: String,
    pub brand: Option<String>,
    pub point_value: i32,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

impl TryFrom<CreateItemRequest> for NewItem {
    type Error = ValidationError;

    fn try_from(req: CreateItemRequest) -> Result<Self, Self::Error> {
        let title = required_text("title", &req.title, MAX_TITLE_LEN)?;
        let description = optional_text(
            "description",
            req.description.as_deref(),
            MAX_DESCRIPTION_LEN,
        )?;
        let category = required_text("category", &req.category, MAX_LABEL_LEN)?;
        let size = required_text("size", &req.size, MAX_LABEL_LEN)?;
        let condition = required_text("condition", &req.condition, MAX_LABEL_LEN)?;
        let brand = optional_text("brand", req.brand.as_deref(), MAX_BRAND_LEN)?;

        if !(MIN_POINT_VALUE..=MAX_POINT_VALUE).contains(&req.point_value) {
            return Err(ValidationError::OutOfRange {
                field: "pointValue",
                min: MIN_POINT_VALUE.into(),
                max: MAX_POINT_VALUE.into(),
            });
        }

        let tags = text_list("tags", req.tags, MAX_TAGS, MAX_TAG_LEN)?;
        let images = text_list("images", req.images, MAX_IMAGES, MAX_URL_LEN)?;
        for url in &images {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::InvalidFormat {
                    field: "images",
                    reason: "image URLs must start with http:// or https://",
                });
            }
        }

        Ok(Self {
            title,
            description,
            category,
            size,
            condition,
            brand,
            point_value: req.point_value,
            tags,
            images,
        })
    }
}

/// Trim entries, drop blanks, then enforce count and length caps.
fn text_list(
    field: &'static str,
    values: Vec<String>,
    max_entries: usize,
    max_len: usize,
) -> Result<Vec<String>, ValidationError> {
    let values: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect();

    if values.len() > max_entries {
        return Err(ValidationError::TooMany {
            field,
            max: max_entries,
        });
    }
    if values.iter().any(|v| v.chars().count() > max_len) {
        return Err(ValidationError::TooLong { field, max: max_len });
    }
    Ok(values)
}

/// POST /api/swaps body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    pub item_id: i64,
    pub swap_type: String,
    /// Optional; when present it must name the item's owner
    pub owner_id: Option<String>,
    pub message: Option<String>,
}

/// A swap request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSwap {
    pub item_id: i64,
    pub swap_type: SwapType,
    pub expected_owner: Option<String>,
    pub message: Option<String>,
}

impl TryFrom<CreateSwapRequest> for NewSwap {
    type Error = ValidationError;

    fn try_from(req: CreateSwapRequest) -> Result<Self, Self::Error> {
        if req.item_id < 1 {
            return Err(ValidationError::InvalidFormat {
                field: "itemId",
                reason: "must be a positive integer",
            });
        }

        let swap_type = req.swap_type.parse::<SwapType>().map_err(|_| {
            ValidationError::InvalidVariant {
                field: "swapType",
                value: req.swap_type.clone(),
            }
        })?;

        let expected_owner = optional_text("ownerId", req.owner_id.as_deref(), MAX_LABEL_LEN * 4)?;
        let message = optional_text("message", req.message.as_deref(), MAX_MESSAGE_LEN)?;

        Ok(Self {
            item_id: req.item_id,
            swap_type,
            expected_owner,
            message,
        })
    }
}

/// PATCH body for swap and item status changes
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// PUT /api/auth/user body: profile claims forwarded by the identity provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Validated identity claims for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl UserClaims {
    pub fn new(id: &str, req: UpsertUserRequest) -> Result<Self, ValidationError> {
        let id = required_text("id", id, MAX_LABEL_LEN * 4)?;

        let email = optional_text("email", req.email.as_deref(), MAX_EMAIL_LEN)?;
        if let Some(ref e) = email {
            let valid = e
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
            if !valid {
                return Err(ValidationError::InvalidFormat {
                    field: "email",
                    reason: "must look like name@domain",
                });
            }
        }

        Ok(Self {
            id,
            email,
            first_name: optional_text("firstName", req.first_name.as_deref(), MAX_NAME_LEN)?,
            last_name: optional_text("lastName", req.last_name.as_deref(), MAX_NAME_LEN)?,
            profile_image_url: optional_text(
                "profileImageUrl",
                req.profile_image_url.as_deref(),
                MAX_URL_LEN,
            )?,
        })
    }

    /// Claims carrying only the subject id
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            first_name: None,
            last_name: None,
            profile_image_url: None,
        }
    }
}
