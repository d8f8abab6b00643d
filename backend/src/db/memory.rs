use chrono::Utc;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::db::models::{
    ImpactSummary, NewReport, NewReward, NewTransaction, NewWasteLocation, NotificationRecord,
    ReportRecord, RewardHolder, RewardRecord, TaskStatus, TransactionRecord, UserRecord,
    WasteLocationRecord,
};
use crate::error::{Result, RewardsError};

/// Process-local tables with the same semantics as the Postgres schema.
/// Ordering "newest first" falls back to id order since ids are monotonic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    next_id: AtomicI64,
    users: DashMap<i64, UserRecord>,
    user_ids_by_email: DashMap<String, i64>,
    transactions: DashMap<i64, TransactionRecord>,
    rewards: DashMap<i64, RewardRecord>,
    reports: DashMap<i64, ReportRecord>,
    notifications: DashMap<i64, NotificationRecord>,
    waste_locations: DashMap<i64, WasteLocationRecord>,
}

impl Tables {
    // one sequence shared by every table keeps ids unique and increasing
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn newest_first<T, F>(map: &DashMap<i64, T>, keep: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let mut rows: Vec<(i64, T)> = map
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| (*entry.key(), entry.value().clone()))
        .collect();
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    rows.into_iter().map(|(_, row)| row).collect()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_or_create_user(&self, email: &str, name: &str) -> Result<UserRecord> {
        let tables = &self.tables;
        let id = *tables
            .user_ids_by_email
            .entry(email.to_string())
            .or_insert_with(|| {
                let id = tables.next_id();
                tables.users.insert(
                    id,
                    UserRecord {
                        id,
                        email: email.to_string(),
                        name: name.to_string(),
                        total_points: 0,
                        total_waste: 0.0,
                        total_reports: 0,
                        created_at: Utc::now(),
                    },
                );
                id
            });

        self.tables
            .users
            .get(&id)
            .map(|user| user.clone())
            .ok_or_else(|| RewardsError::Internal(format!("user index points at missing row {id}")))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let id = match self.tables.user_ids_by_email.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.tables.users.get(&id).map(|user| user.clone()))
    }

    pub async fn add_user_totals(
        &self,
        user_id: i64,
        points: i64,
        waste: f64,
        reports: i64,
    ) -> Result<()> {
        let mut user = self
            .tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RewardsError::NotFound(format!("user {user_id}")))?;

        user.total_points = user.total_points.saturating_add(points);
        user.total_waste += waste;
        user.total_reports = user.total_reports.saturating_add(reports);
        Ok(())
    }

    fn require_user(&self, user_id: i64) -> Result<()> {
        if self.tables.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(RewardsError::Database(format!(
                "foreign key violation: user {user_id} does not exist"
            )))
        }
    }

    pub async fn insert_transaction(&self, tx: NewTransaction) -> Result<TransactionRecord> {
        self.require_user(tx.user_id)?;

        let id = self.tables.next_id();
        let record = TransactionRecord {
            id,
            user_id: tx.user_id,
            kind: tx.kind.as_str().to_string(),
            amount: tx.amount,
            description: tx.description,
            created_at: Utc::now(),
        };
        self.tables.transactions.insert(id, record.clone());
        Ok(record)
    }

    pub async fn list_transactions(&self, user_id: i64) -> Result<Vec<TransactionRecord>> {
        Ok(newest_first(&self.tables.transactions, |tx| tx.user_id == user_id))
    }

    pub async fn list_transactions_for_users(
        &self,
        user_ids: &[i64],
    ) -> Result<Vec<TransactionRecord>> {
        let wanted: HashSet<i64> = user_ids.iter().copied().collect();
        Ok(newest_first(&self.tables.transactions, |tx| wanted.contains(&tx.user_id)))
    }

    pub async fn insert_reward(&self, reward: NewReward) -> Result<RewardRecord> {
        self.require_user(reward.user_id)?;

        let id = self.tables.next_id();
        let record = RewardRecord {
            id,
            user_id: reward.user_id,
            points: reward.points,
            level: reward.level,
            name: reward.name,
            description: reward.description,
            collection_info: reward.collection_info,
            created_at: Utc::now(),
        };
        self.tables.rewards.insert(id, record.clone());
        Ok(record)
    }

    pub async fn list_rewards(&self, user_id: i64) -> Result<Vec<RewardRecord>> {
        Ok(newest_first(&self.tables.rewards, |reward| reward.user_id == user_id))
    }

    pub async fn reward_holders(&self) -> Result<Vec<RewardHolder>> {
        let holder_ids: HashSet<i64> = self
            .tables
            .rewards
            .iter()
            .map(|reward| reward.user_id)
            .collect();

        let mut holders: Vec<RewardHolder> = holder_ids
            .into_iter()
            .filter_map(|user_id| {
                self.tables.users.get(&user_id).map(|user| RewardHolder {
                    user_id,
                    user_name: user.name.clone(),
                })
            })
            .collect();
        holders.sort_by_key(|holder| holder.user_id);
        Ok(holders)
    }

    pub async fn insert_report(&self, report: NewReport) -> Result<ReportRecord> {
        self.require_user(report.user_id)?;

        let id = self.tables.next_id();
        let record = ReportRecord {
            id,
            user_id: report.user_id,
            location: report.location,
            latitude: report.latitude,
            longitude: report.longitude,
            waste_type: report.waste_type,
            amount: report.amount,
            image_url: report.image_url,
            created_at: Utc::now(),
        };
        self.tables.reports.insert(id, record.clone());
        Ok(record)
    }

    pub async fn recent_reports(&self, limit: i64) -> Result<Vec<ReportRecord>> {
        let mut reports = newest_first(&self.tables.reports, |_| true);
        reports.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(reports)
    }

    pub async fn insert_notification(
        &self,
        user_id: i64,
        message: &str,
        kind: &str,
    ) -> Result<NotificationRecord> {
        self.require_user(user_id)?;

        let id = self.tables.next_id();
        let record = NotificationRecord {
            id,
            user_id,
            message: message.to_string(),
            kind: kind.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        self.tables.notifications.insert(id, record.clone());
        Ok(record)
    }

    pub async fn unread_notifications(&self, user_id: i64) -> Result<Vec<NotificationRecord>> {
        Ok(newest_first(&self.tables.notifications, |n| {
            n.user_id == user_id && !n.read
        }))
    }

    pub async fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<bool> {
        match self.tables.notifications.get_mut(&notification_id) {
            Some(mut notification) if notification.user_id == user_id => {
                notification.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn list_waste_locations(&self) -> Result<Vec<WasteLocationRecord>> {
        let mut locations = newest_first(&self.tables.waste_locations, |_| true);
        locations.reverse();
        Ok(locations)
    }

    pub async fn get_waste_location(&self, id: i64) -> Result<Option<WasteLocationRecord>> {
        Ok(self.tables.waste_locations.get(&id).map(|l| l.clone()))
    }

    pub async fn count_waste_locations(&self) -> Result<i64> {
        Ok(self.tables.waste_locations.len() as i64)
    }

    pub async fn insert_waste_locations(&self, locations: Vec<NewWasteLocation>) -> Result<usize> {
        let count = locations.len();
        for location in locations {
            let id = self.tables.next_id();
            let now = Utc::now();
            self.tables.waste_locations.insert(
                id,
                WasteLocationRecord {
                    id,
                    latitude: location.latitude,
                    longitude: location.longitude,
                    title: location.title,
                    description: location.description,
                    waste_type: location.waste_type,
                    difficulty: location.difficulty.as_str().to_string(),
                    points: location.points,
                    status: TaskStatus::Available.as_str().to_string(),
                    assigned_to: None,
                    completed_by: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Ok(count)
    }

    pub async fn assign_waste_location(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WasteLocationRecord>> {
        let mut location = match self.tables.waste_locations.get_mut(&id) {
            Some(location) => location,
            None => return Ok(None),
        };

        if location.status != TaskStatus::Available.as_str() {
            return Ok(None);
        }

        location.status = TaskStatus::Assigned.as_str().to_string();
        location.assigned_to = Some(user_id);
        location.updated_at = Utc::now();
        Ok(Some(location.clone()))
    }

    pub async fn complete_waste_location(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WasteLocationRecord>> {
        let mut location = match self.tables.waste_locations.get_mut(&id) {
            Some(location) => location,
            None => return Ok(None),
        };

        if location.is_completed() {
            return Ok(None);
        }

        location.status = TaskStatus::Completed.as_str().to_string();
        location.completed_by = Some(user_id);
        location.updated_at = Utc::now();
        Ok(Some(location.clone()))
    }

    pub async fn impact_summary(&self) -> Result<ImpactSummary> {
        let mut summary = ImpactSummary::default();

        for user in self.tables.users.iter() {
            summary.total_points += user.total_points;
            summary.total_waste += user.total_waste;
            summary.total_reports += user.total_reports;
            summary.total_users += 1;
        }

        let mut waste_types = BTreeMap::new();
        for report in self.tables.reports.iter() {
            *waste_types.entry(report.waste_type.clone()).or_insert(0) += 1;
        }
        summary.waste_types = waste_types;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{Difficulty, TransactionKind};

    #[tokio::test]
    async fn same_email_returns_same_user() {
        let store = MemoryStore::new();
        let first = store.find_or_create_user("a@example.com", "Ada").await.unwrap();
        let second = store.find_or_create_user("a@example.com", "Someone Else").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Ada");
    }

    #[tokio::test]
    async fn transactions_require_existing_user() {
        let store = MemoryStore::new();
        let result = store
            .insert_transaction(NewTransaction {
                user_id: 42,
                kind: TransactionKind::EarnedReport,
                amount: 10,
                description: "orphan".to_string(),
            })
            .await;

        assert!(matches!(result, Err(RewardsError::Database(_))));
    }

    #[tokio::test]
    async fn transactions_listed_newest_first() {
        let store = MemoryStore::new();
        let user = store.find_or_create_user("b@example.com", "Bo").await.unwrap();

        for amount in [10, 20, 30] {
            store
                .insert_transaction(NewTransaction {
                    user_id: user.id,
                    kind: TransactionKind::EarnedReport,
                    amount,
                    description: format!("earned {amount}"),
                })
                .await
                .unwrap();
        }

        let amounts: Vec<i64> = store
            .list_transactions(user.id)
            .await
            .unwrap()
            .iter()
            .map(|tx| tx.amount)
            .collect();
        assert_eq!(amounts, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = store.find_or_create_user("c@example.com", "Cy").await.unwrap();
        let other = store.find_or_create_user("d@example.com", "Di").await.unwrap();
        let note = store.insert_notification(owner.id, "hi", "reward").await.unwrap();

        assert!(!store.mark_notification_read(other.id, note.id).await.unwrap());
        assert_eq!(store.unread_notifications(owner.id).await.unwrap().len(), 1);

        assert!(store.mark_notification_read(owner.id, note.id).await.unwrap());
        assert!(store.unread_notifications(owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn task_lifecycle_guards_status() {
        let store = MemoryStore::new();
        let user = store.find_or_create_user("e@example.com", "Eve").await.unwrap();
        store
            .insert_waste_locations(vec![NewWasteLocation {
                latitude: 1.0,
                longitude: 2.0,
                title: "Task".to_string(),
                description: "desc".to_string(),
                waste_type: "Plastic".to_string(),
                difficulty: Difficulty::Hard,
                points: 50,
            }])
            .await
            .unwrap();
        let task = store.list_waste_locations().await.unwrap().remove(0);

        let assigned = store.assign_waste_location(task.id, user.id).await.unwrap().unwrap();
        assert_eq!(assigned.assigned_to, Some(user.id));
        assert!(store.assign_waste_location(task.id, user.id).await.unwrap().is_none());

        let done = store.complete_waste_location(task.id, user.id).await.unwrap().unwrap();
        assert!(done.is_completed());
        assert!(store.complete_waste_location(task.id, user.id).await.unwrap().is_none());
    }
}
