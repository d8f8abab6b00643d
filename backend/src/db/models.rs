use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::points::ledger::LedgerEntry;
use crate::points::{Difficulty, TransactionKind};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub name: String,
    // counters only ever move additively, the ledger stays authoritative for balances
    pub total_points: i64,
    pub total_waste: f64,
    pub total_reports: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry for TransactionRecord {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn amount(&self) -> i64 {
        self.amount
    }
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RewardRecord {
    pub id: i64,
    pub user_id: i64,
    pub points: i64,
    pub level: i64,
    pub name: String,
    pub description: Option<String>,
    pub collection_info: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReward {
    pub user_id: i64,
    pub points: i64,
    pub level: i64,
    pub name: String,
    pub description: Option<String>,
    pub collection_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportRecord {
    pub id: i64,
    pub user_id: i64,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: i64,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Available,
    Assigned,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Available => "available",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WasteLocationRecord {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub description: String,
    pub waste_type: String,
    pub difficulty: String,
    pub points: i64,
    pub status: String,
    pub assigned_to: Option<i64>,
    pub completed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WasteLocationRecord {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed.as_str()
    }

    // rows written outside the service may carry anything, treat unknown as the medium tier
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty.parse().unwrap_or(Difficulty::Medium)
    }
}

#[derive(Debug, Clone)]
pub struct NewWasteLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub description: String,
    pub waste_type: String,
    pub difficulty: Difficulty,
    pub points: i64,
}

/// One row per user that has at least one reward snapshot.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RewardHolder {
    pub user_id: i64,
    pub user_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub total_points: i64,
    pub total_waste: f64,
    pub total_reports: i64,
    pub total_users: i64,
    pub waste_types: BTreeMap<String, i64>,
}
