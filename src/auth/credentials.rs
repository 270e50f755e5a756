//! Credential store backing the login form

use sqlx::SqlitePool;

use super::password::PasswordService;
use crate::config::{SeedConfig, DEFAULT_ADMIN_PASSWORD};
use crate::db::{initialize_schema, UserRepository};
use crate::error::{AppError, Result};

/// Verifies login attempts against the `users` table.
#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
    /// Hash checked for unknown usernames so every attempt costs one Argon2 verification
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Result<Self> {
        let dummy_hash = PasswordService::hash("upload-portal-dummy-password")?;
        Ok(Self { pool, dummy_hash })
    }

    /// Ensure the schema and, if enabled, the seeded account exist.
    ///
    /// Safe to call repeatedly; an existing account is never touched.
    pub async fn initialize(&self, seed: &SeedConfig) -> Result<()> {
        initialize_schema(&self.pool).await?;

        if !seed.enabled {
            tracing::info!("Default account seeding disabled");
            return Ok(());
        }

        let repo = UserRepository::new(&self.pool);
        if repo.find_by_username(&seed.username).await?.is_some() {
            tracing::debug!(username = %seed.username, "Default account already present");
            return Ok(());
        }

        let hash = hash_blocking(seed.password.clone()).await?;
        if repo.insert_if_absent(&seed.username, &hash).await? {
            tracing::info!(username = %seed.username, "Seeded default account");
            if seed.password == DEFAULT_ADMIN_PASSWORD {
                tracing::warn!(
                    username = %seed.username,
                    "Default account uses the built-in password; set ADMIN_PASSWORD or SEED_ADMIN=false"
                );
            }
        }

        Ok(())
    }

    /// Check a username/password pair.
    ///
    /// Unknown usernames and wrong passwords both yield `Ok(false)`.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool> {
        let user = UserRepository::new(&self.pool)
            .find_by_username(username)
            .await?;

        let (hash, known) = match user {
            Some(user) => (user.password_hash, true),
            None => (self.dummy_hash.clone(), false),
        };

        let matches = verify_blocking(password.to_owned(), hash).await?;
        Ok(known && matches)
    }

    /// Number of stored accounts
    pub async fn count_users(&self) -> Result<i64> {
        UserRepository::new(&self.pool).count().await
    }
}

async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || PasswordService::hash(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || PasswordService::verify(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_support::setup_test_db;

    async fn seeded_store() -> CredentialStore {
        let pool = setup_test_db().await;
        let store = CredentialStore::new(pool).unwrap();
        store.initialize(&Config::default().seed).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialize_seeds_exactly_one_admin() {
        let store = seeded_store().await;
        store.initialize(&Config::default().seed).await.unwrap();
        store.initialize(&Config::default().seed).await.unwrap();

        assert_eq!(store.count_users().await.unwrap(), 1);

        let admin = UserRepository::new(&store.pool)
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(admin.password_hash, "admin123");
        assert!(admin.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_verify_outcomes() {
        let store = seeded_store().await;

        assert!(store.verify("admin", "admin123").await.unwrap());
        assert!(!store.verify("admin", "wrong").await.unwrap());
        assert!(!store.verify("nouser", "anything").await.unwrap());
        // The dummy hash must not open a door for unknown users
        assert!(!store
            .verify("nouser", "upload-portal-dummy-password")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_seeding_disabled() {
        let pool = setup_test_db().await;
        let store = CredentialStore::new(pool).unwrap();
        let mut seed = Config::default().seed;
        seed.enabled = false;

        store.initialize(&seed).await.unwrap();

        assert_eq!(store.count_users().await.unwrap(), 0);
        assert!(!store.verify("admin", "admin123").await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_seed_password() {
        let pool = setup_test_db().await;
        let store = CredentialStore::new(pool).unwrap();
        let mut seed = Config::default().seed;
        seed.password = "correct horse".to_string();

        store.initialize(&seed).await.unwrap();

        assert!(store.verify("admin", "correct horse").await.unwrap());
        assert!(!store.verify("admin", "admin123").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_costs_a_full_verification() {
        let store = seeded_store().await;
        let rounds = 4;

        // Warm up the pool and the blocking thread pool
        store.verify("admin", "wrong").await.unwrap();
        store.verify("nouser", "wrong").await.unwrap();

        let started = std::time::Instant::now();
        for _ in 0..rounds {
            assert!(!store.verify("admin", "wrong").await.unwrap());
        }
        let wrong_password = started.elapsed();

        let started = std::time::Instant::now();
        for _ in 0..rounds {
            assert!(!store.verify("nouser", "wrong").await.unwrap());
        }
        let unknown_user = started.elapsed();

        // A skipped Argon2 run would make the unknown path orders of magnitude faster
        assert!(
            unknown_user * 3 >= wrong_password && wrong_password * 3 >= unknown_user,
            "wrong password took {:?}, unknown user took {:?}",
            wrong_password,
            unknown_user
        );
    }
}
