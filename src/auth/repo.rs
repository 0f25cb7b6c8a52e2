use crate::auth::repo_types::User;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email, password_hash,
                   reset_token, reset_token_expires, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Registration uniqueness check: true if either the email or the
    /// username is already taken.
    pub async fn email_or_username_taken(
        db: &PgPool,
        email: &str,
        username: &str,
    ) -> anyhow::Result<bool> {
        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE email = $1 OR username = $2
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(existing.is_some())
    }

    /// Create a new user with hashed password. Reset fields start absent.
    pub async fn create(
        db: &PgPool,
        username: &str,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, first_name, last_name, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, first_name, last_name, email, password_hash,
                      reset_token, reset_token_expires, created_at
            "#,
        )
        .bind(username)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Find the user holding an unexpired reset token. A wrong token and an
    /// expired one both come back as `None`.
    pub async fn find_by_valid_reset_token(
        db: &PgPool,
        token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, first_name, last_name, email, password_hash,
                   reset_token, reset_token_expires, created_at
            FROM users
            WHERE reset_token = $1 AND reset_token_expires > now()
            LIMIT 1
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Store a reset token and its expiry, overwriting any prior token.
    pub async fn set_reset_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $1, reset_token_expires = $2
            WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Overwrite the password hash and clear the reset-token pair in one
    /// statement, so a consumed token can never be replayed.
    pub async fn reset_password(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_token_expires = NULL
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }
}

// These run against a per-test database that sqlx creates and migrates from
// ./migrations; they cover the invariants the SQL itself enforces.
#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration as TimeDuration;

    async fn seed_user(db: &PgPool) -> User {
        User::create(db, "alice", "Alice", "Smith", "a@x.com", "argon2-hash")
            .await
            .expect("create user")
    }

    #[sqlx::test]
    async fn reset_token_is_found_while_valid(db: PgPool) {
        let user = seed_user(&db).await;
        let expires = OffsetDateTime::now_utc() + TimeDuration::hours(1);
        User::set_reset_token(&db, user.id, "tok-valid", expires)
            .await
            .expect("store token");

        let found = User::find_by_valid_reset_token(&db, "tok-valid")
            .await
            .expect("lookup");
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[sqlx::test]
    async fn consumed_reset_token_cannot_be_replayed(db: PgPool) {
        let user = seed_user(&db).await;
        let expires = OffsetDateTime::now_utc() + TimeDuration::hours(1);
        User::set_reset_token(&db, user.id, "tok-once", expires)
            .await
            .expect("store token");

        User::reset_password(&db, user.id, "new-argon2-hash")
            .await
            .expect("consume token");

        // The pair is cleared, so the same token no longer matches anything,
        // even though its expiry has not passed.
        let replay = User::find_by_valid_reset_token(&db, "tok-once")
            .await
            .expect("lookup");
        assert!(replay.is_none());

        let user = User::find_by_email(&db, "a@x.com")
            .await
            .expect("lookup")
            .expect("user exists");
        assert_eq!(user.password_hash, "new-argon2-hash");
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expires.is_none());
    }

    #[sqlx::test]
    async fn expired_reset_token_is_rejected(db: PgPool) {
        let user = seed_user(&db).await;
        let expires = OffsetDateTime::now_utc() - TimeDuration::seconds(1);
        User::set_reset_token(&db, user.id, "tok-stale", expires)
            .await
            .expect("store token");

        // Never consumed, but past expiry: same outcome as a wrong token.
        let found = User::find_by_valid_reset_token(&db, "tok-stale")
            .await
            .expect("lookup");
        assert!(found.is_none());
    }

    #[sqlx::test]
    async fn newer_token_overwrites_prior(db: PgPool) {
        let user = seed_user(&db).await;
        let expires = OffsetDateTime::now_utc() + TimeDuration::hours(1);
        User::set_reset_token(&db, user.id, "tok-old", expires)
            .await
            .expect("store first token");
        User::set_reset_token(&db, user.id, "tok-new", expires)
            .await
            .expect("store second token");

        assert!(User::find_by_valid_reset_token(&db, "tok-old")
            .await
            .expect("lookup")
            .is_none());
        assert!(User::find_by_valid_reset_token(&db, "tok-new")
            .await
            .expect("lookup")
            .is_some());
    }

    #[sqlx::test]
    async fn uniqueness_check_matches_email_or_username(db: PgPool) {
        seed_user(&db).await;

        assert!(User::email_or_username_taken(&db, "a@x.com", "other")
            .await
            .expect("check email"));
        assert!(User::email_or_username_taken(&db, "other@x.com", "alice")
            .await
            .expect("check username"));
        assert!(!User::email_or_username_taken(&db, "other@x.com", "other")
            .await
            .expect("check free"));
    }
}
