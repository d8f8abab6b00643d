pub mod memory;
pub mod models;
pub mod postgres;
pub mod seed;

use sqlx::PgPool;

use crate::error::Result;
use memory::MemoryStore;
use models::{
    ImpactSummary, NewReport, NewReward, NewTransaction, NewWasteLocation, NotificationRecord,
    ReportRecord, RewardHolder, RewardRecord, TransactionRecord, UserRecord, WasteLocationRecord,
};
use postgres::PgStore;

/// Durable storage for every table the service owns. Postgres in deployments,
/// the memory backend when no database is configured.
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    pub fn postgres(db_pool: PgPool) -> Self {
        Self::Postgres(PgStore::new(db_pool))
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }

    pub async fn find_or_create_user(&self, email: &str, name: &str) -> Result<UserRecord> {
        match self {
            Self::Postgres(store) => store.find_or_create_user(email, name).await,
            Self::Memory(store) => store.find_or_create_user(email, name).await,
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        match self {
            Self::Postgres(store) => store.get_user_by_email(email).await,
            Self::Memory(store) => store.get_user_by_email(email).await,
        }
    }

    pub async fn add_user_totals(
        &self,
        user_id: i64,
        points: i64,
        waste: f64,
        reports: i64,
    ) -> Result<()> {
        match self {
            Self::Postgres(store) => store.add_user_totals(user_id, points, waste, reports).await,
            Self::Memory(store) => store.add_user_totals(user_id, points, waste, reports).await,
        }
    }

    pub async fn insert_transaction(&self, tx: NewTransaction) -> Result<TransactionRecord> {
        match self {
            Self::Postgres(store) => store.insert_transaction(tx).await,
            Self::Memory(store) => store.insert_transaction(tx).await,
        }
    }

    pub async fn list_transactions(&self, user_id: i64) -> Result<Vec<TransactionRecord>> {
        match self {
            Self::Postgres(store) => store.list_transactions(user_id).await,
            Self::Memory(store) => store.list_transactions(user_id).await,
        }
    }

    pub async fn list_transactions_for_users(
        &self,
        user_ids: &[i64],
    ) -> Result<Vec<TransactionRecord>> {
        match self {
            Self::Postgres(store) => store.list_transactions_for_users(user_ids).await,
            Self::Memory(store) => store.list_transactions_for_users(user_ids).await,
        }
    }

    pub async fn insert_reward(&self, reward: NewReward) -> Result<RewardRecord> {
        match self {
            Self::Postgres(store) => store.insert_reward(reward).await,
            Self::Memory(store) => store.insert_reward(reward).await,
        }
    }

    pub async fn list_rewards(&self, user_id: i64) -> Result<Vec<RewardRecord>> {
        match self {
            Self::Postgres(store) => store.list_rewards(user_id).await,
            Self::Memory(store) => store.list_rewards(user_id).await,
        }
    }

    pub async fn reward_holders(&self) -> Result<Vec<RewardHolder>> {
        match self {
            Self::Postgres(store) => store.reward_holders().await,
            Self::Memory(store) => store.reward_holders().await,
        }
    }

    pub async fn insert_report(&self, report: NewReport) -> Result<ReportRecord> {
        match self {
            Self::Postgres(store) => store.insert_report(report).await,
            Self::Memory(store) => store.insert_report(report).await,
        }
    }

    pub async fn recent_reports(&self, limit: i64) -> Result<Vec<ReportRecord>> {
        match self {
            Self::Postgres(store) => store.recent_reports(limit).await,
            Self::Memory(store) => store.recent_reports(limit).await,
        }
    }

    pub async fn insert_notification(
        &self,
        user_id: i64,
        message: &str,
        kind: &str,
    ) -> Result<NotificationRecord> {
        match self {
            Self::Postgres(store) => store.insert_notification(user_id, message, kind).await,
            Self::Memory(store) => store.insert_notification(user_id, message, kind).await,
        }
    }

    pub async fn unread_notifications(&self, user_id: i64) -> Result<Vec<NotificationRecord>> {
        match self {
            Self::Postgres(store) => store.unread_notifications(user_id).await,
            Self::Memory(store) => store.unread_notifications(user_id).await,
        }
    }

    pub async fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<bool> {
        match self {
            Self::Postgres(store) => store.mark_notification_read(user_id, notification_id).await,
            Self::Memory(store) => store.mark_notification_read(user_id, notification_id).await,
        }
    }

    pub async fn list_waste_locations(&self) -> Result<Vec<WasteLocationRecord>> {
        match self {
            Self::Postgres(store) => store.list_waste_locations().await,
            Self::Memory(store) => store.list_waste_locations().await,
        }
    }

    pub async fn get_waste_location(&self, id: i64) -> Result<Option<WasteLocationRecord>> {
        match self {
            Self::Postgres(store) => store.get_waste_location(id).await,
            Self::Memory(store) => store.get_waste_location(id).await,
        }
    }

    pub async fn count_waste_locations(&self) -> Result<i64> {
        match self {
            Self::Postgres(store) => store.count_waste_locations().await,
            Self::Memory(store) => store.count_waste_locations().await,
        }
    }

    pub async fn insert_waste_locations(&self, locations: Vec<NewWasteLocation>) -> Result<usize> {
        match self {
            Self::Postgres(store) => store.insert_waste_locations(locations).await,
            Self::Memory(store) => store.insert_waste_locations(locations).await,
        }
    }

    pub async fn assign_waste_location(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WasteLocationRecord>> {
        match self {
            Self::Postgres(store) => store.assign_waste_location(id, user_id).await,
            Self::Memory(store) => store.assign_waste_location(id, user_id).await,
        }
    }

    pub async fn complete_waste_location(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WasteLocationRecord>> {
        match self {
            Self::Postgres(store) => store.complete_waste_location(id, user_id).await,
            Self::Memory(store) => store.complete_waste_location(id, user_id).await,
        }
    }

    pub async fn impact_summary(&self) -> Result<ImpactSummary> {
        match self {
            Self::Postgres(store) => store.impact_summary().await,
            Self::Memory(store) => store.impact_summary().await,
        }
    }
}
