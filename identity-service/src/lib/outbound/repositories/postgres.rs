use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::AuthRepository;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::PersonName;
use crate::domain::identity::models::PhoneNumber;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::RoleId;
use crate::domain::identity::models::RoleName;
use crate::domain::identity::models::Username;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;

pub struct PostgresAuthRepository {
    pool: PgPool,
}

impl PostgresAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct IdentityRow {
    id: i64,
    name: String,
    lastname: String,
    username: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    role_id: Option<i64>,
    role_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = AuthError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let role = match (row.role_id, row.role_name) {
            (Some(id), Some(name)) => Some(Role {
                id: RoleId(id),
                name: name.parse::<RoleName>()?,
            }),
            _ => None,
        };

        Ok(Identity {
            id: IdentityId(row.id),
            name: PersonName::new(row.name, "name")?,
            lastname: PersonName::new(row.lastname, "lastname")?,
            username: Username::new(row.username)?,
            email: EmailAddress::new(row.email)?,
            phone: row.phone.map(PhoneNumber::new).transpose()?,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    jti: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: SessionId(row.id),
            identity_id: IdentityId(row.user_id),
            jti: row.jti,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: i64,
    name: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = AuthError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Role {
            id: RoleId(row.id),
            name: row.name.parse()?,
        })
    }
}

fn database_error(e: sqlx::Error) -> AuthError {
    AuthError::DatabaseError(e.to_string())
}

#[async_trait]
impl AuthRepository for PostgresAuthRepository {
    async fn find_identity_by_id(&self, id: IdentityId) -> Result<Option<Identity>, AuthError> {
        sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT u.id, u.name, u.lastname, u.username, u.email, u.phone, u.password_hash,
                   u.role_id, r.name AS role_name, u.created_at, u.updated_at
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .map(Identity::try_from)
        .transpose()
    }

    async fn find_identity_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Identity>, AuthError> {
        sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT u.id, u.name, u.lastname, u.username, u.email, u.phone, u.password_hash,
                   u.role_id, r.name AS role_name, u.created_at, u.updated_at
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .map(Identity::try_from)
        .transpose()
    }

    async fn find_identity_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Identity>, AuthError> {
        sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT u.id, u.name, u.lastname, u.username, u.email, u.phone, u.password_hash,
                   u.role_id, r.name AS role_name, u.created_at, u.updated_at
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .map(Identity::try_from)
        .transpose()
    }

    async fn email_exists(&self, email: &EmailAddress) -> Result<bool, AuthError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn username_exists(&self, username: &Username) -> Result<bool, AuthError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn phone_exists(&self, phone: &PhoneNumber) -> Result<bool, AuthError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE phone = $1)")
            .bind(phone.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn create_identity(&self, identity: NewIdentity) -> Result<Identity, AuthError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            WITH inserted AS (
                INSERT INTO users (name, lastname, username, email, phone, password_hash, role_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT i.id, i.name, i.lastname, i.username, i.email, i.phone, i.password_hash,
                   i.role_id, r.name AS role_name, i.created_at, i.updated_at
            FROM inserted i
            LEFT JOIN roles r ON r.id = i.role_id
            "#,
        )
        .bind(identity.name.as_str())
        .bind(identity.lastname.as_str())
        .bind(identity.username.as_str())
        .bind(identity.email.as_str())
        .bind(identity.phone.as_ref().map(PhoneNumber::as_str))
        .bind(&identity.password_hash)
        .bind(identity.role_id.map(|id| id.0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    match db_err.constraint() {
                        Some("users_email_key") => return AuthError::EmailAlreadyRegistered,
                        Some("users_username_key") => {
                            return AuthError::UsernameAlreadyRegistered
                        }
                        Some("users_phone_key") => return AuthError::PhoneAlreadyRegistered,
                        _ => {}
                    }
                }
            }
            database_error(e)
        })?;

        Identity::try_from(row)
    }

    async fn find_role_by_name(&self, name: RoleName) -> Result<Option<Role>, AuthError> {
        sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .map(Role::try_from)
            .transpose()
    }

    async fn upsert_role(&self, name: RoleName, description: &str) -> Result<Role, AuthError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (name, description)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            RETURNING id, name
            "#,
        )
        .bind(name.as_str())
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        Role::try_from(row)
    }

    async fn find_active_session(
        &self,
        identity_id: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, jti, created_at, expires_at, revoked_at
            FROM sessions
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(identity_id.0)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(Session::from))
    }

    async fn find_session_by_jti(&self, jti: &str) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, jti, created_at, expires_at, revoked_at
            FROM sessions
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(Session::from))
    }

    async fn create_session(
        &self,
        session: NewSession,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // Concurrent logins for one identity queue up on this row lock.
        let owner: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(session.identity_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(database_error)?;

        if owner.is_none() {
            return Err(AuthError::NotFound(format!(
                "identity {}",
                session.identity_id
            )));
        }

        let active: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM sessions
            WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(session.identity_id.0)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        if active.is_some() {
            return Err(AuthError::ActiveSessionExists);
        }

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (user_id, jti, created_at, expires_at)
            VALUES ($1, $2, clock_timestamp(), $3)
            RETURNING id, user_id, jti, created_at, expires_at, revoked_at
            "#,
        )
        .bind(session.identity_id.0)
        .bind(&session.jti)
        .bind(session.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        Ok(Session::from(row))
    }

    async fn revoke_session(
        &self,
        jti: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions
            SET revoked_at = COALESCE(revoked_at, $2)
            WHERE jti = $1
            RETURNING id, user_id, jti, created_at, expires_at, revoked_at
            "#,
        )
        .bind(jti)
        .bind(revoked_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(Session::from))
    }
}
