//! Human-in-the-loop review lifecycle.
//!
//! Cards are created PENDING, listed per tenant, and resolved exactly once
//! by an operator. The store is a keyed abstraction behind a port so a
//! durable backend can replace the in-memory map without touching callers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::model::{ReviewCard, ReviewStatus, TenantId};

/// Errors surfaced by the review lifecycle.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("review '{0}' was not found")]
    NotFound(Uuid),
    #[error("review '{0}' is already resolved")]
    AlreadyResolved(Uuid),
    #[error("review decision must be approved or rejected")]
    InvalidDecision,
    #[error("review store error: {0}")]
    Store(String),
}

/// Keyed store for review cards, scoped per tenant.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, tenant_id: &TenantId, card: ReviewCard) -> Result<(), ReviewError>;
    async fn get(&self, tenant_id: &TenantId, review_id: Uuid) -> Option<ReviewCard>;
    async fn update(&self, tenant_id: &TenantId, card: ReviewCard) -> Result<(), ReviewError>;
    async fn pending(&self, tenant_id: &TenantId) -> Vec<ReviewCard>;
}

/// In-memory review store.
#[derive(Clone, Default)]
pub struct InMemoryReviewStore {
    cards: Arc<RwLock<HashMap<String, HashMap<Uuid, ReviewCard>>>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, tenant_id: &TenantId, card: ReviewCard) -> Result<(), ReviewError> {
        let mut cards = self.cards.write().await;
        cards
            .entry(tenant_id.as_str().to_string())
            .or_default()
            .insert(card.review_id, card);
        Ok(())
    }

    async fn get(&self, tenant_id: &TenantId, review_id: Uuid) -> Option<ReviewCard> {
        let cards = self.cards.read().await;
        cards
            .get(tenant_id.as_str())
            .and_then(|tenant_cards| tenant_cards.get(&review_id))
            .cloned()
    }

    async fn update(&self, tenant_id: &TenantId, card: ReviewCard) -> Result<(), ReviewError> {
        let mut cards = self.cards.write().await;
        let tenant_cards = cards
            .get_mut(tenant_id.as_str())
            .ok_or(ReviewError::NotFound(card.review_id))?;
        if !tenant_cards.contains_key(&card.review_id) {
            return Err(ReviewError::NotFound(card.review_id));
        }
        tenant_cards.insert(card.review_id, card);
        Ok(())
    }

    async fn pending(&self, tenant_id: &TenantId) -> Vec<ReviewCard> {
        let cards = self.cards.read().await;
        let mut pending: Vec<ReviewCard> = cards
            .get(tenant_id.as_str())
            .map(|tenant_cards| {
                tenant_cards
                    .values()
                    .filter(|card| card.status == ReviewStatus::Pending)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        pending.sort_by_key(|card| card.timestamp);
        pending
    }
}

/// Manages the human-in-the-loop review lifecycle.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ReviewStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// Service over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryReviewStore::new()))
    }

    /// Persist a new pending card.
    pub async fn create_review(
        &self,
        tenant_id: &TenantId,
        card: ReviewCard,
    ) -> Result<(), ReviewError> {
        info!(
            tenant_id = %tenant_id,
            review_id = %card.review_id,
            task_id = %card.task_id,
            reason = %card.reason,
            "review.created"
        );
        self.store.insert(tenant_id, card).await
    }

    /// All PENDING cards for the tenant, oldest first. Never returns
    /// another tenant's cards.
    pub async fn get_pending_reviews(&self, tenant_id: &TenantId) -> Vec<ReviewCard> {
        self.store.pending(tenant_id).await
    }

    /// Apply a human decision to a pending card.
    ///
    /// Resolving an already-resolved card fails: terminal cards are never
    /// mutated.
    pub async fn submit_decision(
        &self,
        tenant_id: &TenantId,
        review_id: Uuid,
        status: ReviewStatus,
        operator_id: &str,
    ) -> Result<ReviewCard, ReviewError> {
        if status == ReviewStatus::Pending {
            return Err(ReviewError::InvalidDecision);
        }

        let mut card = self
            .store
            .get(tenant_id, review_id)
            .await
            .ok_or(ReviewError::NotFound(review_id))?;
        if card.is_resolved() {
            return Err(ReviewError::AlreadyResolved(review_id));
        }

        card.status = status;
        card.operator_id = Some(operator_id.to_string());
        card.resolution_at = Some(chrono::Utc::now());
        self.store.update(tenant_id, card.clone()).await?;

        info!(
            tenant_id = %tenant_id,
            review_id = %review_id,
            status = %card.status,
            operator_id,
            "review.resolved"
        );
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReviewReason, TaskId};

    fn tenant() -> TenantId {
        TenantId::new("t_acme").unwrap()
    }

    fn card() -> ReviewCard {
        ReviewCard::new(
            TaskId::generate(),
            "res-1",
            ReviewReason::LowConfidence,
            "confidence score was 0.6",
        )
    }

    #[tokio::test]
    async fn test_create_and_list_pending() {
        let service = ReviewService::in_memory();
        let card = card();
        service.create_review(&tenant(), card.clone()).await.unwrap();

        let pending = service.get_pending_reviews(&tenant()).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].review_id, card.review_id);
    }

    #[tokio::test]
    async fn test_pending_reviews_are_tenant_scoped() {
        let service = ReviewService::in_memory();
        service.create_review(&tenant(), card()).await.unwrap();

        let other = TenantId::new("t_globex").unwrap();
        assert!(service.get_pending_reviews(&other).await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_decision_resolves_card() {
        let service = ReviewService::in_memory();
        let card = card();
        service.create_review(&tenant(), card.clone()).await.unwrap();

        let resolved = service
            .submit_decision(&tenant(), card.review_id, ReviewStatus::Approved, "op-123")
            .await
            .unwrap();

        assert_eq!(resolved.status, ReviewStatus::Approved);
        assert_eq!(resolved.operator_id.as_deref(), Some("op-123"));
        assert!(resolved.resolution_at.is_some());
        assert!(service.get_pending_reviews(&tenant()).await.is_empty());
    }

    #[tokio::test]
    async fn test_double_resolution_fails() {
        let service = ReviewService::in_memory();
        let card = card();
        service.create_review(&tenant(), card.clone()).await.unwrap();

        service
            .submit_decision(&tenant(), card.review_id, ReviewStatus::Rejected, "op-1")
            .await
            .unwrap();

        let second = service
            .submit_decision(&tenant(), card.review_id, ReviewStatus::Approved, "op-2")
            .await;
        assert!(matches!(second, Err(ReviewError::AlreadyResolved(_))));
    }

    #[tokio::test]
    async fn test_pending_is_not_a_decision() {
        let service = ReviewService::in_memory();
        let card = card();
        service.create_review(&tenant(), card.clone()).await.unwrap();

        let outcome = service
            .submit_decision(&tenant(), card.review_id, ReviewStatus::Pending, "op-1")
            .await;
        assert!(matches!(outcome, Err(ReviewError::InvalidDecision)));
    }

    #[tokio::test]
    async fn test_unknown_review_fails() {
        let service = ReviewService::in_memory();
        let outcome = service
            .submit_decision(&tenant(), Uuid::new_v4(), ReviewStatus::Approved, "op-1")
            .await;
        assert!(matches!(outcome, Err(ReviewError::NotFound(_))));
    }
}
