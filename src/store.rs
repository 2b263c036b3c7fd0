//! SQLite-backed status store.
//!
//! The store owns the connection pool shared by the reprocessing engine and
//! the status reporter. One `Store` is constructed per process invocation
//! and passed by reference; nothing here is ambient global state.

use chrono::Utc;
use sqlx::{
    sqlite::{
        SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqliteLockingMode,
        SqlitePoolOptions,
    },
    SqlitePool,
};
use tokio_stream::StreamExt;

use crate::{
    config::Config,
    error::Error,
    message::{MessageStatus, QueueMessage, ReplaySelection, StatusRow},
};

#[derive(Clone)]
pub struct Store {
    db: SqlitePool,
}

impl Store {
    pub async fn connect() -> Result<Self, Error> {
        Self::connect_with(Config::default()).await
    }

    pub async fn connect_with(config: Config) -> Result<Self, Error> {
        let opts = SqliteConnectOptions::new()
            .filename(config.db_path())
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .locking_mode(SqliteLockingMode::Normal)
            .optimize_on_close(true, None)
            .auto_vacuum(SqliteAutoVacuum::Full);

        let pool = SqlitePoolOptions::new().connect_with(opts).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { db: pool })
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Fetch the messages matching a selection, in whatever order the store
    /// returns them. No ORDER BY is applied; callers must not assume FIFO.
    ///
    /// The id filter is bound as text: SQLite's affinity rules match `'42'`
    /// against an integer id while non-numeric ids match nothing.
    pub async fn find_messages(
        &self,
        selection: &ReplaySelection,
    ) -> Result<Vec<QueueMessage>, Error> {
        let mut stream = sqlx::query_as(
            "SELECT id, topic_name, body FROM queue_message \
             WHERE ($1 IS NULL OR id = $1) AND ($2 IS NULL OR topic_name = $2)",
        )
        .bind(selection.message_id.as_deref())
        .bind(selection.topic_name.as_deref())
        .fetch(&self.db);

        let mut messages = Vec::new();

        while let Some(res) = stream.next().await.transpose()? {
            messages.push(res);
        }

        Ok(messages)
    }

    /// Current status code of a message: the latest status row, or `None`
    /// for a message that never got one.
    pub async fn current_status(&self, message_id: i64) -> Result<Option<i64>, Error> {
        Ok(sqlx::query_scalar(
            "SELECT status FROM queue_message_status \
             WHERE message_id = $1 ORDER BY updated_at DESC, id DESC LIMIT 1",
        )
        .bind(message_id)
        .fetch_optional(&self.db)
        .await?)
    }

    /// Rewrite every status row of a message. The engine only ever calls
    /// this with `Complete`; all other transitions belong to the external
    /// workers.
    pub async fn set_status(&self, message_id: i64, status: MessageStatus) -> Result<(), Error> {
        sqlx::query("UPDATE queue_message_status SET status = $1, updated_at = $2 WHERE message_id = $3")
            .bind(status.code())
            .bind(Utc::now())
            .bind(message_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    pub async fn mark_complete(&self, message_id: i64) -> Result<(), Error> {
        self.set_status(message_id, MessageStatus::Complete).await
    }

    /// Message/status join for the reporter. Left join: messages without a
    /// status row come back with NULL status and timestamp. Store order.
    pub async fn status_rows(&self, selection: &ReplaySelection) -> Result<Vec<StatusRow>, Error> {
        let mut stream = sqlx::query_as(
            "SELECT qm.id, qm.topic_name, qms.status, qms.updated_at \
             FROM queue_message AS qm \
             LEFT JOIN queue_message_status AS qms ON qms.message_id = qm.id \
             WHERE ($1 IS NULL OR qm.id = $1) AND ($2 IS NULL OR qm.topic_name = $2)",
        )
        .bind(selection.message_id.as_deref())
        .bind(selection.topic_name.as_deref())
        .fetch(&self.db);

        let mut rows = Vec::new();

        while let Some(res) = stream.next().await.transpose()? {
            rows.push(res);
        }

        Ok(rows)
    }

    /// Seed a message. Enqueueing is owned by the external producer; this
    /// exists for embedders and tests, not for the command surface.
    pub async fn insert_message(
        &self,
        topic: impl AsRef<str>,
        body: impl AsRef<str>,
    ) -> Result<i64, Error> {
        Ok(sqlx::query_scalar(
            "INSERT INTO queue_message (topic_name, body) VALUES ($1, $2) RETURNING id",
        )
        .bind(topic.as_ref())
        .bind(body.as_ref())
        .fetch_one(&self.db)
        .await?)
    }

    /// Seed a status row for a message.
    pub async fn insert_status(
        &self,
        message_id: i64,
        status: MessageStatus,
    ) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO queue_message_status (message_id, status, updated_at) VALUES ($1, $2, $3)",
        )
        .bind(message_id)
        .bind(status.code())
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Seed a raw status code, bypassing the known set. Tests use this to
    /// exercise the `?` rendering path.
    pub async fn insert_status_code(&self, message_id: i64, code: i64) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO queue_message_status (message_id, status, updated_at) VALUES ($1, $2, $3)",
        )
        .bind(message_id)
        .bind(code)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
