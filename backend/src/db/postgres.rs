use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

use crate::db::models::{
    ImpactSummary, NewReport, NewReward, NewTransaction, NewWasteLocation, NotificationRecord,
    ReportRecord, RewardHolder, RewardRecord, TaskStatus, TransactionRecord, UserRecord,
    WasteLocationRecord,
};
use crate::error::{Result, RewardsError};

#[derive(Clone)]
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }

    pub async fn find_or_create_user(&self, email: &str, name: &str) -> Result<UserRecord> {
        // the no-op update makes RETURNING yield the existing row on conflict
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO public.users (email, name)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"SELECT * FROM public.users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }

    pub async fn add_user_totals(
        &self,
        user_id: i64,
        points: i64,
        waste: f64,
        reports: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE public.users
            SET total_points = LEAST(GREATEST(total_points::NUMERIC + $1, -9223372036854775808), 9223372036854775807)::BIGINT,
                total_waste = total_waste + $2,
                total_reports = total_reports + $3
            WHERE id = $4
            "#,
        )
        .bind(points)
        .bind(waste)
        .bind(reports)
        .bind(user_id)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RewardsError::NotFound(format!("user {user_id}")));
        }

        Ok(())
    }

    pub async fn insert_transaction(&self, tx: NewTransaction) -> Result<TransactionRecord> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO public.transactions (user_id, type, amount, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.kind.as_str())
        .bind(tx.amount)
        .bind(&tx.description)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(record)
    }

    pub async fn list_transactions(&self, user_id: i64) -> Result<Vec<TransactionRecord>> {
        let transactions = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM public.transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(transactions)
    }

    pub async fn list_transactions_for_users(
        &self,
        user_ids: &[i64],
    ) -> Result<Vec<TransactionRecord>> {
        let transactions = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM public.transactions
            WHERE user_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(transactions)
    }

    pub async fn insert_reward(&self, reward: NewReward) -> Result<RewardRecord> {
        let record = sqlx::query_as::<_, RewardRecord>(
            r#"
            INSERT INTO public.rewards (user_id, points, level, name, description, collection_info)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(reward.user_id)
        .bind(reward.points)
        .bind(reward.level)
        .bind(&reward.name)
        .bind(&reward.description)
        .bind(&reward.collection_info)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(record)
    }

    pub async fn list_rewards(&self, user_id: i64) -> Result<Vec<RewardRecord>> {
        let rewards = sqlx::query_as::<_, RewardRecord>(
            r#"
            SELECT * FROM public.rewards
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rewards)
    }

    pub async fn reward_holders(&self) -> Result<Vec<RewardHolder>> {
        let holders = sqlx::query_as::<_, RewardHolder>(
            r#"
            SELECT u.id AS user_id, u.name AS user_name
            FROM public.users u
            WHERE EXISTS (SELECT 1 FROM public.rewards r WHERE r.user_id = u.id)
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(holders)
    }

    pub async fn insert_report(&self, report: NewReport) -> Result<ReportRecord> {
        let record = sqlx::query_as::<_, ReportRecord>(
            r#"
            INSERT INTO public.reports (
                user_id,
                location,
                latitude,
                longitude,
                waste_type,
                amount,
                image_url
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(report.user_id)
        .bind(&report.location)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(&report.waste_type)
        .bind(&report.amount)
        .bind(&report.image_url)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(record)
    }

    pub async fn recent_reports(&self, limit: i64) -> Result<Vec<ReportRecord>> {
        let reports = sqlx::query_as::<_, ReportRecord>(
            r#"
            SELECT * FROM public.reports
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(reports)
    }

    pub async fn insert_notification(
        &self,
        user_id: i64,
        message: &str,
        kind: &str,
    ) -> Result<NotificationRecord> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO public.notifications (user_id, message, type)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(kind)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(record)
    }

    pub async fn unread_notifications(&self, user_id: i64) -> Result<Vec<NotificationRecord>> {
        let notifications = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT * FROM public.notifications
            WHERE user_id = $1 AND read = FALSE
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE public.notifications SET read = TRUE WHERE id = $1 AND user_id = $2"#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_waste_locations(&self) -> Result<Vec<WasteLocationRecord>> {
        let locations = sqlx::query_as::<_, WasteLocationRecord>(
            r#"SELECT * FROM public.waste_locations ORDER BY id"#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(locations)
    }

    pub async fn get_waste_location(&self, id: i64) -> Result<Option<WasteLocationRecord>> {
        let location = sqlx::query_as::<_, WasteLocationRecord>(
            r#"SELECT * FROM public.waste_locations WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(location)
    }

    pub async fn count_waste_locations(&self) -> Result<i64> {
        let row = sqlx::query(r#"SELECT COUNT(*)::BIGINT AS count FROM public.waste_locations"#)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(row.try_get::<i64, _>("count")?)
    }

    pub async fn insert_waste_locations(&self, locations: Vec<NewWasteLocation>) -> Result<usize> {
        let mut tx = self.db_pool.begin().await?;

        for location in &locations {
            sqlx::query(
                r#"
                INSERT INTO public.waste_locations (
                    latitude,
                    longitude,
                    title,
                    description,
                    waste_type,
                    difficulty,
                    points
                )
                VALUES ($1,$2,$3,$4,$5,$6,$7)
                "#,
            )
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(&location.title)
            .bind(&location.description)
            .bind(&location.waste_type)
            .bind(location.difficulty.as_str())
            .bind(location.points)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(locations.len())
    }

    pub async fn assign_waste_location(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WasteLocationRecord>> {
        let location = sqlx::query_as::<_, WasteLocationRecord>(
            r#"
            UPDATE public.waste_locations
            SET status = $1, assigned_to = $2, updated_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(TaskStatus::Assigned.as_str())
        .bind(user_id)
        .bind(id)
        .bind(TaskStatus::Available.as_str())
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(location)
    }

    pub async fn complete_waste_location(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<WasteLocationRecord>> {
        let location = sqlx::query_as::<_, WasteLocationRecord>(
            r#"
            UPDATE public.waste_locations
            SET status = $1, completed_by = $2, updated_at = NOW()
            WHERE id = $3 AND status <> $1
            RETURNING *
            "#,
        )
        .bind(TaskStatus::Completed.as_str())
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(location)
    }

    pub async fn impact_summary(&self) -> Result<ImpactSummary> {
        // cast to BIGINT because SUM returns NUMERIC which sqlx won't decode into i64
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(total_points), 0)::BIGINT AS total_points,
                COALESCE(SUM(total_waste), 0)::DOUBLE PRECISION AS total_waste,
                COALESCE(SUM(total_reports), 0)::BIGINT AS total_reports,
                COUNT(*)::BIGINT AS total_users
            FROM public.users
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        let type_rows = sqlx::query(
            r#"
            SELECT waste_type, COUNT(*)::BIGINT AS count
            FROM public.reports
            GROUP BY waste_type
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let mut waste_types = BTreeMap::new();
        for type_row in type_rows {
            waste_types.insert(
                type_row.try_get::<String, _>("waste_type")?,
                type_row.try_get::<i64, _>("count")?,
            );
        }

        Ok(ImpactSummary {
            total_points: row.try_get("total_points")?,
            total_waste: row.try_get("total_waste")?,
            total_reports: row.try_get("total_reports")?,
            total_users: row.try_get("total_users")?,
            waste_types,
        })
    }
}
