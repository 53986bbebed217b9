use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use hoplink_core::store::Result;
use hoplink_core::{
    ClickEvent, Link, LinkMetaUpdate, LinkStore, ListQuery, ShortCode, SortBy, SortOrder,
    StoreError,
};

/// MySQL implementation of the [`LinkStore`] contract.
///
/// Soft delete clears the `active` column; rows are never removed, so
/// click events stay joinable against their link for historical
/// reporting. The primary key on `code` (and the unique key on `alias`)
/// is the uniqueness arbiter for concurrent allocators: a duplicate
/// insert maps to [`StoreError::Conflict`].
///
/// Schema lives in `migrations/0001_init.sql`.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn parse_timestamp(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|e| StoreError::InvalidData(format!("invalid timestamp '{}': {e}", seconds)))
}

fn parse_opt_timestamp(seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds.map(parse_timestamp).transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

const LINK_COLUMNS: &str = "code, destination, alias, custom_domain, created_at, expires_at, \
                            active, clicks, last_accessed_at, tags, qr_artifact";

fn row_to_link(row: &MySqlRow) -> Result<Link> {
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let destination: String = row.try_get("destination").map_err(map_sqlx_error)?;
    let alias: Option<String> = row.try_get("alias").map_err(map_sqlx_error)?;
    let custom_domain: Option<String> = row.try_get("custom_domain").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let active: bool = row.try_get("active").map_err(map_sqlx_error)?;
    let clicks: u64 = row.try_get("clicks").map_err(map_sqlx_error)?;
    let last_accessed_at: Option<i64> = row.try_get("last_accessed_at").map_err(map_sqlx_error)?;
    let tags_json: String = row.try_get("tags").map_err(map_sqlx_error)?;
    let qr_artifact: Option<Vec<u8>> = row.try_get("qr_artifact").map_err(map_sqlx_error)?;

    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| StoreError::InvalidData(format!("invalid tags payload: {e}")))?;

    Ok(Link {
        code: ShortCode::new_unchecked(code),
        destination,
        alias,
        custom_domain,
        created_at: parse_timestamp(created_at)?,
        expires_at: parse_opt_timestamp(expires_at)?,
        active,
        clicks,
        last_accessed_at: parse_opt_timestamp(last_accessed_at)?,
        tags,
        qr_artifact,
    })
}

#[async_trait]
impl LinkStore for MySqlStore {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE code = ? LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn find_by_alias_or_code(&self, value: &str) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE code = ? OR alias = ? LIMIT 1"
        ))
        .bind(value)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn find_by_destination(&self, destination: &str) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE destination = ? AND active = 1 LIMIT 1"
        ))
        .bind(destination)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn insert_unique(&self, link: Link) -> Result<()> {
        let tags_json = serde_json::to_string(&link.tags)
            .map_err(|e| StoreError::InvalidData(format!("unserializable tags: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO links (code, destination, alias, custom_domain, created_at, \
             expires_at, active, clicks, last_accessed_at, tags, qr_artifact) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(link.code.as_str())
        .bind(&link.destination)
        .bind(&link.alias)
        .bind(&link.custom_domain)
        .bind(link.created_at.as_second())
        .bind(link.expires_at.map(|ts| ts.as_second()))
        .bind(link.active)
        .bind(link.clicks)
        .bind(link.last_accessed_at.map(|ts| ts.as_second()))
        .bind(tags_json)
        .bind(&link.qr_artifact)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict(link.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_active_flag(&self, code: &ShortCode, active: bool) -> Result<()> {
        sqlx::query("UPDATE links SET active = ? WHERE code = ?")
            .bind(active)
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_meta(&self, code: &ShortCode, meta: LinkMetaUpdate) -> Result<()> {
        let tags_json = meta
            .tags
            .map(|tags| serde_json::to_string(&tags))
            .transpose()
            .map_err(|e| StoreError::InvalidData(format!("unserializable tags: {e}")))?;

        sqlx::query(
            "UPDATE links SET tags = COALESCE(?, tags), \
             custom_domain = COALESCE(?, custom_domain) WHERE code = ?",
        )
        .bind(tags_json)
        .bind(meta.custom_domain)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<()> {
        sqlx::query("UPDATE links SET clicks = clicks + 1, last_accessed_at = ? WHERE code = ?")
            .bind(now_unix_seconds())
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn append_click_event(&self, code: &ShortCode, event: ClickEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO click_events (code, ts, ip, user_agent, referrer, device, browser, \
             os, country) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(code.as_str())
        .bind(event.timestamp.as_second())
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(&event.referrer)
        .bind(&event.device)
        .bind(&event.browser)
        .bind(&event.os)
        .bind(&event.country)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_click_events(
        &self,
        code: &ShortCode,
        since: Timestamp,
    ) -> Result<Vec<ClickEvent>> {
        let rows = sqlx::query(
            "SELECT ts, ip, user_agent, referrer, device, browser, os, country \
             FROM click_events WHERE code = ? AND ts >= ? ORDER BY ts ASC",
        )
        .bind(code.as_str())
        .bind(since.as_second())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let ts: i64 = row.try_get("ts").map_err(map_sqlx_error)?;
                Ok(ClickEvent {
                    timestamp: parse_timestamp(ts)?,
                    ip: row.try_get("ip").map_err(map_sqlx_error)?,
                    user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
                    referrer: row.try_get("referrer").map_err(map_sqlx_error)?,
                    device: row.try_get("device").map_err(map_sqlx_error)?,
                    browser: row.try_get("browser").map_err(map_sqlx_error)?,
                    os: row.try_get("os").map_err(map_sqlx_error)?,
                    country: row.try_get("country").map_err(map_sqlx_error)?,
                })
            })
            .collect()
    }

    async fn count_active(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM links WHERE active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let n: i64 = row.try_get("n").map_err(map_sqlx_error)?;
        Ok(n as u64)
    }

    async fn list_active(&self, query: ListQuery) -> Result<Vec<Link>> {
        // Sort column and direction come from a closed enum, never from
        // user input, so string assembly is safe here.
        let sort_column = match query.sort_by {
            SortBy::CreatedAt => "created_at",
            SortBy::Clicks => "clicks",
        };
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let mut sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE active = 1");
        if query.tag.is_some() {
            sql.push_str(" AND JSON_CONTAINS(tags, JSON_QUOTE(?))");
        }
        sql.push_str(&format!(
            " ORDER BY {sort_column} {direction}, code ASC LIMIT ? OFFSET ?"
        ));

        let mut q = sqlx::query(&sql);
        if let Some(tag) = &query.tag {
            q = q.bind(tag);
        }
        let rows = q
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_link).collect()
    }

    async fn next_sequence(&self, namespace: &str) -> Result<u64> {
        // LAST_INSERT_ID(expr) makes the post-increment value readable
        // from the statement result without a second round-trip.
        let result = sqlx::query(
            "INSERT INTO counters (name, seq) VALUES (?, LAST_INSERT_ID(1)) \
             ON DUPLICATE KEY UPDATE seq = LAST_INSERT_ID(seq + 1)",
        )
        .bind(namespace)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.last_insert_id())
    }
}
