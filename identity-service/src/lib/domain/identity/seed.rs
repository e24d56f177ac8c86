use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::AuthRepository;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::PersonName;
use crate::domain::identity::models::RoleName;
use crate::domain::identity::models::Username;

/// Bootstrap administrator created at startup when configured.
#[derive(Clone)]
pub struct ServiceAccount {
    pub username: Username,
    pub email: EmailAddress,
    pub password: String,
}

impl ServiceAccount {
    /// Validate the configured account fields.
    ///
    /// # Errors
    /// * `InvalidUsername` / `InvalidEmail` - Malformed configuration
    pub fn parse(username: &str, email: &str, password: &str) -> Result<Self, AuthError> {
        Ok(Self {
            username: Username::new(username)?,
            email: EmailAddress::new(email)?,
            password: password.to_string(),
        })
    }
}

/// Upsert every role in [`RoleName::ALL`] with its description.
///
/// A failing role is logged and skipped; returns how many roles were ensured.
pub async fn ensure_default_roles<R>(repository: &R) -> usize
where
    R: AuthRepository,
{
    tracing::info!("Seeding default roles");

    let mut ensured = 0;
    for name in RoleName::ALL {
        match repository.upsert_role(name, name.description()).await {
            Ok(role) => {
                tracing::debug!(role = %name, role_id = %role.id, "Role ensured");
                ensured += 1;
            }
            Err(e) => tracing::error!(role = %name, error = %e, "Failed to ensure role"),
        }
    }

    tracing::info!(ensured, total = RoleName::ALL.len(), "Role seeding completed");
    ensured
}

/// Create the service account unless its email or username is already taken.
///
/// Existing accounts are never updated.
///
/// # Returns
/// The created identity, or `None` when an account already exists
///
/// # Errors
/// * `Credential` - Password hashing failed
/// * `DatabaseError` - Database operation failed
pub async fn ensure_service_account<R>(
    repository: &R,
    authenticator: &auth::Authenticator,
    account: &ServiceAccount,
) -> Result<Option<Identity>, AuthError>
where
    R: AuthRepository,
{
    if repository.email_exists(&account.email).await?
        || repository.username_exists(&account.username).await?
    {
        tracing::info!(
            username = %account.username,
            email = %account.email,
            "Service account already exists, skipping creation"
        );
        return Ok(None);
    }

    let role_id = match repository.find_role_by_name(RoleName::SuperAdmin).await? {
        Some(role) => Some(role.id),
        None => {
            tracing::warn!(
                role = RoleName::SuperAdmin.as_str(),
                "Role missing, creating service account without role"
            );
            None
        }
    };

    let password_hash = authenticator.hash_password(&account.password)?;

    let identity = repository
        .create_identity(NewIdentity {
            name: PersonName::new("Service", "name")?,
            lastname: PersonName::new("Admin", "lastname")?,
            username: account.username.clone(),
            email: account.email.clone(),
            phone: None,
            password_hash,
            role_id,
        })
        .await?;

    tracing::info!(
        identity_id = %identity.id,
        username = %identity.username,
        "Service account created"
    );

    Ok(Some(identity))
}
