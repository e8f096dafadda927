//! Pricing catalog.
//!
//! Read-mostly reference data: the list of plans shown on the pricing page.
//! Display order is a stated rule, not insertion order, because plans are
//! edited independently of how marketing wants them shown: popular plans
//! first, then ascending price, then ascending id.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use tsudoi_core::{CurrencyCode, PlanId, Price, UserId};

use crate::directory::{Action, DirectoryError, IdentityDirectory};
use crate::models::PricingPlan;
use crate::store::{self, Filter, Record, Store, StoreError};

/// Collection holding plan documents.
const PLANS: &str = "pricing_plans";

/// Errors surfaced by the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The referenced plan does not exist or is archived.
    #[error("plan not found: {0}")]
    NotFound(PlanId),

    /// Plan prices cannot be negative.
    #[error("plan price cannot be negative: {0}")]
    NegativePrice(Decimal),

    /// The acting user may not edit plans.
    #[error("user {0} is not authorized to manage plans")]
    Unauthorized(UserId),

    /// Store-layer failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DirectoryError> for CatalogError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::ProfileNotFound(user) => Self::Unauthorized(user),
            DirectoryError::Store(e) => Self::Store(e),
        }
    }
}

/// Input for creating a plan.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub features: Vec<String>,
    pub is_popular: bool,
}

/// Partial update for a plan; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct PlanPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub features: Option<Vec<String>>,
    pub is_popular: Option<bool>,
}

/// The plan body as persisted; the store assigns the id.
#[derive(Debug, Serialize, Deserialize)]
struct PlanDoc {
    name: String,
    description: String,
    price: Price,
    features: Vec<String>,
    #[serde(default)]
    is_popular: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// The pricing-plan catalog.
#[derive(Clone)]
pub struct PricingCatalog {
    store: Arc<dyn Store>,
    directory: IdentityDirectory,
    currency: CurrencyCode,
}

impl PricingCatalog {
    /// Create a catalog over the given store, pricing in `currency`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, directory: IdentityDirectory, currency: CurrencyCode) -> Self {
        Self {
            store,
            directory,
            currency,
        }
    }

    /// Active plans in display order: popular first, then price ascending,
    /// then id ascending.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<PricingPlan>, CatalogError> {
        let records = self.store.list(PLANS, &Filter::all()).await?;
        let mut plans = records
            .iter()
            .map(plan_from)
            .collect::<Result<Vec<_>, _>>()?;
        plans.retain(|p| !p.archived);
        plans.sort_by(|a, b| {
            b.is_popular
                .cmp(&a.is_popular)
                .then_with(|| a.price.amount.cmp(&b.price.amount))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(plans)
    }

    /// Fetch a single active plan.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for absent or archived plans, or a
    /// store error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: PlanId) -> Result<PricingPlan, CatalogError> {
        let record = self
            .store
            .get(PLANS, &id.as_i64().to_string())
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        let plan = plan_from(&record)?;
        if plan.archived {
            return Err(CatalogError::NotFound(id));
        }
        Ok(plan)
    }

    /// Create a plan. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NegativePrice`, or a store error.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, actor: &UserId, new: NewPlan) -> Result<PricingPlan, CatalogError> {
        self.require(actor).await?;
        if new.price.is_sign_negative() && !new.price.is_zero() {
            return Err(CatalogError::NegativePrice(new.price));
        }

        let now = Utc::now();
        let doc = PlanDoc {
            name: new.name,
            description: new.description,
            price: Price::new(new.price, self.currency),
            features: new.features,
            is_popular: new.is_popular,
            archived: false,
            created_at: Some(now),
            updated_at: Some(now),
        };

        let record = self.store.insert(PLANS, None, store::encode(&doc)?).await?;
        info!(plan_id = %record.id, "created plan");
        plan_from(&record)
    }

    /// Apply a partial update to a plan. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `NegativePrice`, or a store error
    /// (`Conflict` if a concurrent edit won).
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        actor: &UserId,
        id: PlanId,
        patch: PlanPatch,
    ) -> Result<PricingPlan, CatalogError> {
        self.require(actor).await?;
        if let Some(price) = patch.price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(CatalogError::NegativePrice(price));
            }
        }

        self.modify(id, |doc| {
            if let Some(name) = patch.name.clone() {
                doc.name = name;
            }
            if let Some(description) = patch.description.clone() {
                doc.description = description;
            }
            if let Some(price) = patch.price {
                doc.price = Price::new(price, self.currency);
            }
            if let Some(features) = patch.features.clone() {
                doc.features = features;
            }
            if let Some(is_popular) = patch.is_popular {
                doc.is_popular = is_popular;
            }
        })
        .await
    }

    /// Archive a plan, hiding it from the catalog without deleting its
    /// record. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, or a store error.
    #[instrument(skip(self))]
    pub async fn archive(&self, actor: &UserId, id: PlanId) -> Result<PricingPlan, CatalogError> {
        self.require(actor).await?;
        let plan = self.modify(id, |doc| doc.archived = true).await?;
        info!(plan_id = %id, "archived plan");
        Ok(plan)
    }

    async fn require(&self, actor: &UserId) -> Result<(), CatalogError> {
        if self.directory.authorize(actor, &Action::ManagePlans).await? {
            Ok(())
        } else {
            Err(CatalogError::Unauthorized(actor.clone()))
        }
    }

    async fn modify(
        &self,
        id: PlanId,
        apply: impl Fn(&mut PlanDoc),
    ) -> Result<PricingPlan, CatalogError> {
        let key = id.as_i64().to_string();
        let record = self
            .store
            .get(PLANS, &key)
            .await?
            .ok_or(CatalogError::NotFound(id))?;

        let mut doc: PlanDoc = store::decode(&record)?;
        apply(&mut doc);
        doc.updated_at = Some(Utc::now());

        let record = self
            .store
            .update(PLANS, &key, store::encode(&doc)?, record.version)
            .await?;
        plan_from(&record)
    }
}

fn plan_from(record: &Record) -> Result<PricingPlan, CatalogError> {
    let doc: PlanDoc = store::decode(record)?;
    let id = record.id.parse::<i64>().map_err(|_| {
        StoreError::Serialization(format!("non-numeric plan id {:?}", record.id))
    })?;
    Ok(PricingPlan {
        id: PlanId::new(id),
        name: doc.name,
        description: doc.description,
        price: doc.price,
        features: doc.features,
        is_popular: doc.is_popular,
        archived: doc.archived,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}
