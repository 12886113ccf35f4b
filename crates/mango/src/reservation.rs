//! Reservation lookup used to narrow survey listings.
//!
//! Surveys only know their reservation id. Filtering by reservation
//! metadata (hotel, dates, guest...) is delegated to a provider that turns
//! the criteria into the matching reservation ids.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use thiserror::Error;

/// Reservation metadata criteria, forwarded verbatim to the provider.
pub type ReservationCriteria = BTreeMap<String, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Reservation lookup request failed: {0}")]
    Request(String),
    #[error("Reservation lookup returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Reservation lookup returned an unexpected body: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ReservationError>;

/// Resolves reservation criteria to reservation ids.
#[async_trait]
pub trait ReservationFilter: Send + Sync {
    async fn reservation_ids(&self, criteria: &ReservationCriteria) -> Result<Vec<String>>;
}

/// Fixed criteria-to-ids table. Every criterion must match.
#[derive(Debug, Clone, Default)]
pub struct StaticReservationFilter {
    reservations: HashMap<String, ReservationCriteria>,
}

impl StaticReservationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservation(
        mut self,
        reservation_id: impl Into<String>,
        attributes: ReservationCriteria,
    ) -> Self {
        self.reservations.insert(reservation_id.into(), attributes);
        self
    }
}

#[async_trait]
impl ReservationFilter for StaticReservationFilter {
    async fn reservation_ids(&self, criteria: &ReservationCriteria) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .reservations
            .iter()
            .filter(|(_, attributes)| {
                criteria
                    .iter()
                    .all(|(key, value)| attributes.get(key) == Some(value))
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Looks reservations up over HTTP: `GET {base_url}/reservations?{criteria}`
/// must answer with a JSON array of reservation ids.
#[derive(Debug, Clone)]
pub struct HttpReservationFilter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReservationFilter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/reservations", self.base_url)
    }
}

#[async_trait]
impl ReservationFilter for HttpReservationFilter {
    async fn reservation_ids(&self, criteria: &ReservationCriteria) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint())
            .query(criteria)
            .send()
            .await
            .map_err(|e| ReservationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ReservationError::Status { status, body });
        }

        let ids: Vec<String> = response
            .json()
            .await
            .map_err(|e| ReservationError::Decode(e.to_string()))?;

        tracing::debug!(matches = ids.len(), "Reservation lookup completed");
        Ok(ids)
    }
}

/// Keeps the ids present in both lists; `None` on either side means "no
/// restriction".
pub fn intersect_ids(current: Option<Vec<String>>, allowed: Vec<String>) -> Vec<String> {
    match current {
        Some(current) => current
            .into_iter()
            .filter(|id| allowed.contains(id))
            .collect(),
        None => allowed,
    }
}
