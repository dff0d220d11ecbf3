use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
/// Register a login. Returns `None` if the login is already taken.
pub struct InsertUser {
    pub login: String,
    pub password_hash: String,
}

impl Processor<InsertUser> for DatabaseProcessor {
    type Output = Option<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertUser")]
    async fn process(&self, insert: InsertUser) -> Result<Option<i64>, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (login) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(insert.login)
        .bind(insert.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }
}

#[derive(Debug, Clone)]
pub struct GetUserByLogin {
    pub login: String,
}

impl Processor<GetUserByLogin> for DatabaseProcessor {
    type Output = Option<UserCredentials>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserByLogin")]
    async fn process(&self, query: GetUserByLogin) -> Result<Option<UserCredentials>, sqlx::Error> {
        let user = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, login, password_hash
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(query.login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
