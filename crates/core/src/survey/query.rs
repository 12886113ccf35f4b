//! Paginated survey listings and their cache fingerprints.
//!
//! A [`SurveyQuery`] is what a client asks for. [`SurveyQuery::normalize`]
//! applies defaults and clamps and returns a [`NormalizedQuery`] whose
//! canonical signature hashes to a stable [`Fingerprint`]: two requests that
//! select the same page always share one cache entry.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::document::{Filter, FindOptions, SortKey, Status};
use crate::storage::StoreError;

pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 200;
pub const DEFAULT_SORT: &str = "-created_at";

/// Fields a listing may be ordered by.
pub const SORTABLE_FIELDS: [&str; 8] = [
    "created_at",
    "updated_at",
    "total_rating",
    "user_id",
    "staff_id",
    "reservation_id",
    "status",
    "platform",
];

/// Hex digest identifying a normalized listing query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already computed hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Equality filters of a survey listing. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Restricts to these reservations. An empty list matches nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_ids: Option<Vec<String>>,
}

impl SurveyFilter {
    fn normalized(self) -> Self {
        let non_blank = |s: Option<String>| {
            s.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            user_id: non_blank(self.user_id),
            staff_id: non_blank(self.staff_id),
            status: self.status,
            platform: non_blank(self.platform),
            reservation_ids: self.reservation_ids.map(|mut ids| {
                ids.sort();
                ids.dedup();
                ids
            }),
        }
    }

    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(user_id) = &self.user_id {
            filter = filter.eq("user_id", user_id.as_str());
        }
        if let Some(staff_id) = &self.staff_id {
            filter = filter.eq("staff_id", staff_id.as_str());
        }
        if let Some(status) = self.status {
            filter = filter.eq("status", status.as_str());
        }
        if let Some(platform) = &self.platform {
            filter = filter.eq("platform", platform.as_str());
        }
        if let Some(ids) = &self.reservation_ids {
            filter = filter.is_in("reservation_id", ids.iter().map(String::as_str));
        }
        filter
    }
}

/// A survey listing request as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyQuery {
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub filter: SurveyFilter,
}

impl SurveyQuery {
    /// Applies defaults and clamps.
    ///
    /// - `skip`: missing or negative becomes 0.
    /// - `limit`: missing or non-positive becomes 50; above 200 becomes 200.
    /// - `sort`: defaults to `-created_at`; must be `+field` or `-field`
    ///   with a sortable field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidFilter` for a malformed or unknown sort key.
    ///
    /// # Examples
    ///
    /// ```
    /// use mango_core::survey::SurveyQuery;
    ///
    /// let query = SurveyQuery { skip: Some(-3), limit: Some(10_000), ..Default::default() };
    /// let normalized = query.normalize().unwrap();
    /// assert_eq!((normalized.skip, normalized.limit), (0, 200));
    /// ```
    pub fn normalize(self) -> Result<NormalizedQuery, StoreError> {
        let skip = self.skip.map_or(0, |skip| skip.max(0) as u64);
        let limit = match self.limit {
            Some(limit) if limit > 0 => (limit as u64).min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };
        let raw_sort = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT);
        let sort = SortKey::parse(raw_sort)?;
        if !SORTABLE_FIELDS.contains(&sort.field.as_str()) {
            return Err(StoreError::InvalidFilter(format!(
                "surveys cannot be sorted by {:?}",
                sort.field
            )));
        }

        Ok(NormalizedQuery {
            skip,
            limit,
            sort,
            filter: self.filter.normalized(),
        })
    }
}

/// A listing query after defaults and clamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub skip: u64,
    pub limit: u64,
    pub sort: SortKey,
    pub filter: SurveyFilter,
}

impl NormalizedQuery {
    /// Canonical text form. Equal queries produce equal signatures.
    pub fn signature(&self) -> String {
        let filter = serde_json::to_string(&self.filter).unwrap_or_default();
        format!(
            "skip={};limit={};sort={};filter={}",
            self.skip,
            self.limit,
            self.sort.render(),
            filter
        )
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.signature().as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Filter selecting every survey the query counts.
    pub fn to_filter(&self) -> Filter {
        self.filter.to_filter()
    }

    pub fn find_options(&self) -> FindOptions {
        FindOptions::default()
            .with_skip(self.skip)
            .with_limit(self.limit)
            .with_sort(self.sort.clone())
    }
}
