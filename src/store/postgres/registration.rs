// 报名表操作

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::{RegistrationWithSession, VisitRegistration, VisitSession};
use crate::store::{StoreError, StoreResult};

use super::session::SessionRow;

/// visit_registrations 表的行结构
#[derive(Debug, FromRow)]
struct RegistrationRow {
    id: String,
    session_id: String,
    user_id: String,
    name: String,
    cellphone: String,
    visitors: i32,
    remark: Option<String>,
    status: String,
    cancel_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for VisitRegistration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(VisitRegistration {
            status: row.status.parse().map_err(StoreError::Backend)?,
            id: row.id,
            session_id: row.session_id,
            user_id: row.user_id,
            name: row.name,
            cellphone: row.cellphone,
            visitors: row.visitors,
            remark: row.remark,
            timestamp: row.created_at,
            cancel_reason: row.cancel_reason,
            cancelled_at: row.cancelled_at,
        })
    }
}

/// 报名与场次的联合查询结果
#[derive(Debug, FromRow)]
struct JoinedRow {
    #[sqlx(flatten)]
    registration: RegistrationRow,
    s_date: String,
    s_time: String,
    s_total_seats: i32,
    s_remaining_seats: i32,
    s_sort_order: i32,
    s_status: String,
}

impl TryFrom<JoinedRow> for RegistrationWithSession {
    type Error = StoreError;

    fn try_from(row: JoinedRow) -> Result<Self, Self::Error> {
        let session = VisitSession::try_from(SessionRow {
            id: row.registration.session_id.clone(),
            date: row.s_date,
            time: row.s_time,
            total_seats: row.s_total_seats,
            remaining_seats: row.s_remaining_seats,
            sort_order: row.s_sort_order,
            status: row.s_status,
        })?;
        Ok(RegistrationWithSession {
            registration: VisitRegistration::try_from(row.registration)?,
            session,
        })
    }
}

const REGISTRATION_COLUMNS: &str = "id, session_id, user_id, name, cellphone, visitors, remark, \
     status, cancel_reason, cancelled_at, created_at";

/// 报名数据库操作
pub struct RegistrationOperation;

impl RegistrationOperation {
    /// 查找同一场次同一用户的有效报名，用于防止重复报名
    pub async fn find_confirmed(
        conn: &mut PgConnection,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<VisitRegistration>> {
        let query = format!(
            "SELECT {} FROM visit_registrations \
             WHERE session_id = $1 AND user_id = $2 AND status = 'confirmed' \
             LIMIT 1",
            REGISTRATION_COLUMNS
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(VisitRegistration::try_from).transpose()
    }

    pub async fn insert(
        conn: &mut PgConnection,
        registration: &VisitRegistration,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO visit_registrations (
                id, session_id, user_id, name, cellphone, visitors, remark,
                status, cancel_reason, cancelled_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&registration.id)
        .bind(&registration.session_id)
        .bind(&registration.user_id)
        .bind(&registration.name)
        .bind(&registration.cellphone)
        .bind(registration.visitors)
        .bind(&registration.remark)
        .bind(registration.status.as_str())
        .bind(&registration.cancel_reason)
        .bind(registration.cancelled_at)
        .bind(registration.timestamp)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 读取并锁定报名行
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: &str,
    ) -> StoreResult<Option<VisitRegistration>> {
        let query = format!(
            "SELECT {} FROM visit_registrations WHERE id = $1 FOR UPDATE",
            REGISTRATION_COLUMNS
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(VisitRegistration::try_from).transpose()
    }

    pub async fn mark_cancelled(
        conn: &mut PgConnection,
        id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<VisitRegistration> {
        let query = format!(
            "UPDATE visit_registrations \
             SET status = 'cancelled', cancel_reason = $2, cancelled_at = $3 \
             WHERE id = $1 \
             RETURNING {}",
            REGISTRATION_COLUMNS
        );
        let row = sqlx::query_as::<_, RegistrationRow>(&query)
            .bind(id)
            .bind(reason)
            .bind(at)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| StoreError::RegistrationNotFound(id.to_string()))?;

        VisitRegistration::try_from(row)
    }

    /// 用户全部有效报名及对应场次，最新的在前
    pub async fn list_confirmed_by_user(
        pool: &PgPool,
        user_id: &str,
    ) -> StoreResult<Vec<RegistrationWithSession>> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            r#"
            SELECT
                r.id, r.session_id, r.user_id, r.name, r.cellphone, r.visitors, r.remark,
                r.status, r.cancel_reason, r.cancelled_at, r.created_at,
                s.date AS s_date,
                s.time AS s_time,
                s.total_seats AS s_total_seats,
                s.remaining_seats AS s_remaining_seats,
                s.sort_order AS s_sort_order,
                s.status AS s_status
            FROM visit_registrations r
            JOIN visit_sessions s ON s.id = r.session_id
            WHERE r.user_id = $1 AND r.status = 'confirmed'
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(RegistrationWithSession::try_from)
            .collect()
    }
}
