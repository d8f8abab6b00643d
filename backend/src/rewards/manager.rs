use serde::Serialize;
use std::collections::HashMap;

use crate::classifier::{Expectation, GeminiClient, ImageInput, Strictness, Verification};
use crate::db::models::{
    NewReport, NewReward, NewTransaction, ReportRecord, RewardHolder, RewardRecord,
    TransactionRecord, UserRecord, WasteLocationRecord,
};
use crate::db::Store;
use crate::error::{Result, RewardsError};
use crate::points::formula::{leading_amount, loose_amount};
use crate::points::ledger::{Contender, Standing};
use crate::points::{
    balance, checked_points, derive_difficulty, level_for_points, rank_leaderboard, Difficulty,
    TransactionKind,
};
use crate::rewards::catalog::{self, Coupon};

const ANONYMOUS_NAME: &str = "Anonymous";
const REWARD_NOTIFICATION: &str = "reward";

#[derive(Debug, Clone)]
pub struct ReportInput {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub waste_type: String,
    pub amount: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportOutcome {
    pub report: ReportRecord,
    pub difficulty: Difficulty,
    pub points_earned: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct CollectionOutcome {
    pub task: WasteLocationRecord,
    pub verification: Verification,
    pub verified: bool,
    pub points_earned: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct RedemptionOutcome {
    pub coupon: Coupon,
    pub transaction: TransactionRecord,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct RewardsSummary {
    pub balance: i64,
    pub transactions: Vec<TransactionRecord>,
    pub rewards: Vec<RewardRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    #[serde(flatten)]
    pub standing: Standing,
    pub is_current_user: bool,
}

fn award_for(difficulty: Difficulty, amount: f64) -> Result<i64> {
    checked_points(difficulty, amount).ok_or_else(|| {
        RewardsError::InvalidInput(format!("quantity {amount} is too large to award"))
    })
}

pub struct RewardsManager {
    store: Store,
    classifier: GeminiClient,
}

impl RewardsManager {
    pub fn new(store: Store, classifier: GeminiClient) -> Self {
        Self { store, classifier }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn classifier(&self) -> &GeminiClient {
        &self.classifier
    }

    pub async fn current_user(&self, email: &str, name: Option<&str>) -> Result<UserRecord> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Anonymous User");
        self.store.find_or_create_user(email, name).await
    }

    /// Every balance shown anywhere comes from here.
    pub async fn balance(&self, user_id: i64) -> Result<i64> {
        let transactions = self.store.list_transactions(user_id).await?;
        Ok(balance(&transactions))
    }

    pub async fn summary(&self, user_id: i64) -> Result<RewardsSummary> {
        let transactions = self.store.list_transactions(user_id).await?;
        let rewards = self.store.list_rewards(user_id).await?;

        Ok(RewardsSummary {
            balance: balance(&transactions),
            transactions,
            rewards,
        })
    }

    pub async fn record_report(&self, user_id: i64, input: ReportInput) -> Result<ReportOutcome> {
        if input.location.trim().is_empty() {
            return Err(RewardsError::InvalidInput("location is required".to_string()));
        }
        if !input.latitude.is_finite() || !input.longitude.is_finite() {
            return Err(RewardsError::InvalidInput("coordinates are required".to_string()));
        }

        let amount = loose_amount(&input.amount);
        let difficulty = derive_difficulty(amount);
        // checked before anything is written so a rejected award leaves no report behind
        let points = award_for(difficulty, amount)?;

        tracing::debug!(
            "Report by user {}: {:?} -> {} kg, {:?}, {} points",
            user_id, input.amount, amount, difficulty, points
        );

        let description = format!("Reported {} of {} waste", input.amount, input.waste_type);

        let report = self
            .store
            .insert_report(NewReport {
                user_id,
                location: input.location,
                latitude: input.latitude,
                longitude: input.longitude,
                waste_type: input.waste_type,
                amount: input.amount,
                image_url: input.image_url,
            })
            .await?;

        // sequential writes, not one database transaction
        self.store.add_user_totals(user_id, points, amount, 1).await?;
        self.award(
            user_id,
            TransactionKind::EarnedReport,
            points,
            description,
            "Points earned from waste reporting",
            format!("You've earned {points} points for reporting waste!"),
        )
        .await?;

        Ok(ReportOutcome {
            report,
            difficulty,
            points_earned: points,
            balance: self.balance(user_id).await?,
        })
    }

    pub async fn recent_reports(&self, limit: i64) -> Result<Vec<ReportRecord>> {
        self.store.recent_reports(limit.clamp(1, 100)).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<WasteLocationRecord>> {
        self.store.list_waste_locations().await
    }

    pub async fn claim_task(&self, user_id: i64, task_id: i64) -> Result<WasteLocationRecord> {
        let task = self.require_task(task_id).await?;

        match self.store.assign_waste_location(task.id, user_id).await? {
            Some(task) => {
                tracing::info!("Task {} assigned to user {}", task.id, user_id);
                Ok(task)
            }
            None => Err(RewardsError::Conflict(format!(
                "task {} is already {}",
                task.id, task.status
            ))),
        }
    }

    pub async fn complete_collection(
        &self,
        user_id: i64,
        task_id: i64,
        image: &ImageInput,
    ) -> Result<CollectionOutcome> {
        let task = self.require_task(task_id).await?;
        if task.is_completed() {
            return Err(RewardsError::Conflict(format!("task {} is already completed", task.id)));
        }
        if task.assigned_to.is_some_and(|owner| owner != user_id) {
            return Err(RewardsError::Conflict(format!(
                "task {} is claimed by another user",
                task.id
            )));
        }

        let difficulty = task.difficulty();
        let expectation = Expectation {
            waste_type: Some(task.waste_type.clone()),
            difficulty: Some(difficulty),
        };

        let verification = self
            .classifier
            .verify(image, &expectation, Strictness::Lenient)
            .await?;

        if !verification.passed() {
            tracing::info!(
                "Collection of task {} by user {} not verified (confidence {})",
                task.id, user_id, verification.confidence
            );
            return Ok(CollectionOutcome {
                task,
                verification,
                verified: false,
                points_earned: 0,
                balance: self.balance(user_id).await?,
            });
        }

        let amount = leading_amount(&verification.quantity);
        let points = award_for(difficulty, amount)?;

        let task = self
            .store
            .complete_waste_location(task.id, user_id)
            .await?
            .ok_or_else(|| RewardsError::Conflict(format!("task {task_id} is already completed")))?;

        self.store.add_user_totals(user_id, points, amount, 0).await?;
        self.award(
            user_id,
            TransactionKind::EarnedCollect,
            points,
            format!("Collected waste at {}", task.title),
            "Points earned from waste collection",
            format!("You've earned {points} points for collecting waste!"),
        )
        .await?;

        Ok(CollectionOutcome {
            task,
            verification,
            verified: true,
            points_earned: points,
            balance: self.balance(user_id).await?,
        })
    }

    /// Check-then-append with no lock: two concurrent redemptions can both
    /// pass the balance check.
    pub async fn redeem(&self, user_id: i64, coupon_id: u32) -> Result<RedemptionOutcome> {
        let coupon = catalog::find(coupon_id)
            .ok_or_else(|| RewardsError::NotFound(format!("coupon {coupon_id}")))?;

        let available = self.balance(user_id).await?;
        if available < coupon.cost {
            return Err(RewardsError::InsufficientBalance(available, coupon.cost));
        }

        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                kind: TransactionKind::Redeemed,
                amount: coupon.cost,
                description: format!("Redeemed {}", coupon.name),
            })
            .await?;

        tracing::info!("User {} redeemed coupon {} for {} points", user_id, coupon.id, coupon.cost);

        Ok(RedemptionOutcome {
            coupon: *coupon,
            transaction,
            balance: self.balance(user_id).await?,
        })
    }

    pub async fn leaderboard(&self, current: &UserRecord) -> Result<Vec<LeaderboardRow>> {
        let mut holders = self.store.reward_holders().await?;

        if !holders.iter().any(|h| h.user_id == current.id) {
            holders.push(RewardHolder {
                user_id: current.id,
                user_name: current.name.clone(),
            });
        }

        let user_ids: Vec<i64> = holders.iter().map(|h| h.user_id).collect();
        let mut by_user: HashMap<i64, Vec<TransactionRecord>> = HashMap::new();
        for tx in self.store.list_transactions_for_users(&user_ids).await? {
            by_user.entry(tx.user_id).or_default().push(tx);
        }

        let no_transactions = Vec::new();
        let contenders = holders
            .into_iter()
            .map(|holder| Contender {
                points: balance(by_user.get(&holder.user_id).unwrap_or(&no_transactions)),
                user_id: holder.user_id,
                user_name: if holder.user_name.trim().is_empty() {
                    ANONYMOUS_NAME.to_string()
                } else {
                    holder.user_name
                },
            })
            .collect();

        Ok(rank_leaderboard(contenders)
            .into_iter()
            .map(|standing| LeaderboardRow {
                is_current_user: standing.user_id == current.id,
                standing,
            })
            .collect())
    }

    async fn require_task(&self, task_id: i64) -> Result<WasteLocationRecord> {
        self.store
            .get_waste_location(task_id)
            .await?
            .ok_or_else(|| RewardsError::NotFound(format!("collection task {task_id}")))
    }

    async fn award(
        &self,
        user_id: i64,
        kind: TransactionKind,
        points: i64,
        description: String,
        reward_description: &str,
        notification: String,
    ) -> Result<()> {
        self.store
            .insert_transaction(NewTransaction {
                user_id,
                kind,
                amount: points,
                description,
            })
            .await?;

        self.store
            .insert_reward(NewReward {
                user_id,
                points,
                level: level_for_points(points),
                name: "Points Reward".to_string(),
                description: Some(reward_description.to_string()),
                collection_info: "Automatically collected".to_string(),
            })
            .await?;

        self.store
            .insert_notification(user_id, &notification, REWARD_NOTIFICATION)
            .await?;

        tracing::info!("Awarded {} points ({}) to user {}", points, kind, user_id);
        Ok(())
    }
}
