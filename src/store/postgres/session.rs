// 场次表操作

use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::{SessionStatus, VisitSession};
use crate::store::{StoreError, StoreResult};

/// visit_sessions 表的行结构
#[derive(Debug, FromRow)]
pub(super) struct SessionRow {
    pub id: String,
    pub date: String,
    pub time: String,
    pub total_seats: i32,
    pub remaining_seats: i32,
    pub sort_order: i32,
    pub status: String,
}

impl TryFrom<SessionRow> for VisitSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(VisitSession {
            status: row.status.parse().map_err(StoreError::Backend)?,
            id: row.id,
            date: row.date,
            time: row.time,
            total_seats: row.total_seats,
            remaining_seats: row.remaining_seats,
            order: row.sort_order,
        })
    }
}

/// 场次数据库操作
pub struct SessionOperation;

impl SessionOperation {
    /// 开放中的场次，按日期、排序键升序
    pub async fn list_open(pool: &PgPool) -> StoreResult<Vec<VisitSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, date, time, total_seats, remaining_seats, sort_order, status
            FROM visit_sessions
            WHERE status = 'open'
            ORDER BY date ASC, sort_order ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(VisitSession::try_from).collect()
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> StoreResult<Option<VisitSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, date, time, total_seats, remaining_seats, sort_order, status
            FROM visit_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(VisitSession::try_from).transpose()
    }

    /// 读取并锁定场次行
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: &str,
    ) -> StoreResult<Option<VisitSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, date, time, total_seats, remaining_seats, sort_order, status
            FROM visit_sessions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(VisitSession::try_from).transpose()
    }

    /// 条件更新剩余名额：结果不得低于 0，增加时不超过总名额
    pub async fn update_remaining_seats(
        conn: &mut PgConnection,
        id: &str,
        delta: i32,
    ) -> StoreResult<VisitSession> {
        let updated = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE visit_sessions
            SET remaining_seats = LEAST(remaining_seats + $2, total_seats)
            WHERE id = $1 AND remaining_seats + $2 >= 0
            RETURNING id, date, time, total_seats, remaining_seats, sort_order, status
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = updated {
            return VisitSession::try_from(row);
        }

        // 没有行被更新：场次不存在或名额不足
        match Self::find_for_update(conn, id).await? {
            Some(session) => Err(StoreError::Capacity {
                requested: -delta,
                remaining: session.remaining_seats,
            }),
            None => Err(StoreError::SessionNotFound(id.to_string())),
        }
    }

    /// 插入场次，ID 已存在时不做任何修改。返回新增行数。
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        session: &VisitSession,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO visit_sessions (
                id, date, time, total_seats, remaining_seats, sort_order, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&session.id)
        .bind(&session.date)
        .bind(&session.time)
        .bind(session.total_seats)
        .bind(session.remaining_seats)
        .bind(session.order)
        .bind(session.status.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_status(
        pool: &PgPool,
        id: &str,
        status: SessionStatus,
    ) -> StoreResult<Option<VisitSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE visit_sessions
            SET status = $2
            WHERE id = $1
            RETURNING id, date, time, total_seats, remaining_seats, sort_order, status
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?;

        row.map(VisitSession::try_from).transpose()
    }
}
