//! PostgreSQL excuse store

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use excuse_core::validation::start_of_day;
use excuse_core::{Excuse, ExcuseError, ExcuseFilter, ExcuseStore, Stats};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Postgres, QueryBuilder};

const SELECT_EXCUSES: &str =
    "SELECT id, text, category, language, severity, created_at, rating FROM excuses";

const RANDOM_EXCUSE: &str = "SELECT id, text, category, language, severity, created_at, rating \
     FROM excuses ORDER BY RANDOM() LIMIT 1";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(
            "Connecting to PostgreSQL at {}:{}/{} as {}",
            config.host,
            config.port,
            config.name,
            config.user
        );

        let ssl_mode: PgSslMode = config
            .ssl_mode
            .parse()
            .with_context(|| format!("Invalid SSL mode: {}", config.ssl_mode))?;

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name)
            .ssl_mode(ssl_mode);

        Self::connect_with(options, config.max_connections).await
    }

    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open database connection")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Failed to ping database")?;

        tracing::info!("PostgreSQL connection established, ensuring schema...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to create excuses table")?;

        tracing::info!("Database initialization complete");

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS excuses (
                id VARCHAR(50) PRIMARY KEY,
                text TEXT NOT NULL,
                category VARCHAR(50) NOT NULL,
                language VARCHAR(10) NOT NULL,
                severity VARCHAR(20) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL,
                rating INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// `SELECT ... [WHERE ...]` with a bound parameter for each supplied filter
fn select_matching(filter: &ExcuseFilter) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new(SELECT_EXCUSES);

    let columns = [
        ("category", filter.category.as_deref()),
        ("language", filter.language.as_deref()),
        ("severity", filter.severity.as_deref()),
    ];

    let mut first = true;
    for (column, value) in columns {
        let Some(value) = value else { continue };
        query.push(if first { " WHERE " } else { " AND " });
        query
            .push("LOWER(")
            .push(column)
            .push(") = LOWER(")
            .push_bind(value)
            .push(")");
        first = false;
    }

    query
}

fn list_query(filter: &ExcuseFilter, limit: usize) -> QueryBuilder<'_, Postgres> {
    let mut query = select_matching(filter);
    query
        .push(" ORDER BY rating DESC, created_at DESC, id ASC LIMIT ")
        .push_bind(limit as i64);
    query
}

fn database_error(e: sqlx::Error) -> ExcuseError {
    ExcuseError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl ExcuseStore for PostgresStore {
    async fn get_random_excuse(&self) -> excuse_core::Result<Option<Excuse>> {
        let row: Option<ExcuseRow> = sqlx::query_as(RANDOM_EXCUSE)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_excuses(
        &self,
        filter: &ExcuseFilter,
        limit: usize,
    ) -> excuse_core::Result<Vec<Excuse>> {
        let rows: Vec<ExcuseRow> = list_query(filter, limit)
            .build_query_as::<ExcuseRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        tracing::debug!("Listed {} excuses", rows.len());
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn create_excuse(&self, excuse: &Excuse) -> excuse_core::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO excuses (id, text, category, language, severity, created_at, rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&excuse.id)
        .bind(&excuse.text)
        .bind(&excuse.category)
        .bind(&excuse.language)
        .bind(&excuse.severity)
        .bind(excuse.created_at)
        .bind(excuse.rating)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ExcuseError::DuplicateId(excuse.id.clone())
            } else {
                database_error(e)
            }
        })?;

        Ok(())
    }

    async fn rate_excuse(&self, id: &str, delta: i32) -> excuse_core::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE excuses SET rating = rating + $1
            WHERE id = $2
            "#,
        )
        .bind(delta)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(ExcuseError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn get_stats(&self) -> excuse_core::Result<Stats> {
        // Three independent statements; under concurrent writes the numbers
        // may not agree with each other.
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM excuses")
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)?;

        let most_popular: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT LOWER(category) FROM excuses
            GROUP BY LOWER(category)
            ORDER BY COUNT(*) DESC, LOWER(category) ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        let (today,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM excuses WHERE created_at >= $1")
                .bind(start_of_day(Utc::now()))
                .fetch_one(&self.pool)
                .await
                .map_err(database_error)?;

        Ok(Stats::new(
            total,
            most_popular.map(|(category,)| category),
            today,
        ))
    }

    async fn import_excuses(&self, excuses: Vec<Excuse>) -> excuse_core::Result<usize> {
        let mut written = 0;

        for excuse in &excuses {
            let result = sqlx::query(
                r#"
                INSERT INTO excuses (id, text, category, language, severity, created_at, rating)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&excuse.id)
            .bind(&excuse.text)
            .bind(&excuse.category)
            .bind(&excuse.language)
            .bind(&excuse.severity)
            .bind(excuse.created_at)
            .bind(excuse.rating)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

            written += result.rows_affected() as usize;
        }

        if written < excuses.len() {
            tracing::debug!(
                "Skipped {} seed excuses that already exist",
                excuses.len() - written
            );
        }

        Ok(written)
    }
}

// Helper struct for sqlx query_as
#[derive(sqlx::FromRow)]
struct ExcuseRow {
    id: String,
    text: String,
    category: String,
    language: String,
    severity: String,
    created_at: chrono::DateTime<chrono::Utc>,
    rating: i32,
}

impl From<ExcuseRow> for Excuse {
    fn from(r: ExcuseRow) -> Self {
        Excuse {
            id: r.id,
            text: r.text,
            category: r.category,
            language: r.language,
            severity: r.severity,
            created_at: r.created_at,
            rating: r.rating,
        }
    }
}
