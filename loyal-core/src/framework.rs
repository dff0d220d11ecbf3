use sqlx::PgPool;

/// Runs the SQL commands in `entities` against a pool.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
