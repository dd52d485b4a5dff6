use tracing::{error, info, instrument};

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{Credential, UserRecord};
use crate::config::{LegacyPasswords, HASH_COST};

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    bcrypt::hash(plain, HASH_COST).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        anyhow::anyhow!(e.to_string())
    })
}

/// Checks `presented` against the stored credential of `user`.
///
/// Unmigrated records only match the legacy table entry for their email;
/// emails outside the table never match. A stored hash that bcrypt cannot
/// parse is logged and treated as a mismatch.
pub fn verify_password(presented: &str, user: &UserRecord, legacy: &LegacyPasswords) -> bool {
    match &user.credential {
        Credential::Unmigrated => legacy
            .login_password(&user.email)
            .is_some_and(|expected| expected == presented),
        Credential::Hashed(hash) => match bcrypt::verify(presented, hash) {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, user_id = %user.id, "bcrypt parse hash error");
                false
            }
        },
    }
}

/// Hashes the legacy password of every unmigrated record. Returns how many
/// records were migrated; already hashed records are left alone.
#[instrument(skip_all)]
pub async fn migrate_legacy_passwords(
    store: &dyn UserStore,
    legacy: &LegacyPasswords,
) -> anyhow::Result<usize> {
    let mut migrated = 0;
    for user in store.list_all().await? {
        if user.credential != Credential::Unmigrated {
            continue;
        }
        let hash = hash_password(legacy.migration_password(&user.email))?;
        if store.migrate_credential(user.id, &hash).await? {
            info!(user_id = %user.id, email = %user.email, "password hashed");
            migrated += 1;
        }
    }
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserStore;
    use crate::auth::repo_types::Role;
    use uuid::Uuid;

    fn record(email: &str, credential: Credential) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: "Someone".into(),
            role: Role::Student,
            credential,
            is_active: true,
            last_login: None,
        }
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let legacy = LegacyPasswords::demo();
        let hash = hash_password("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(hash.starts_with("$2b$10$"));
        let user = record("a@example.com", Credential::Hashed(hash));
        assert!(verify_password("Secur3P@ssw0rd!", &user, &legacy));
        assert!(!verify_password("wrong-password", &user, &legacy));
    }

    #[test]
    fn hashing_salts_every_call() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unmigrated_seed_account_matches_only_its_default() {
        let legacy = LegacyPasswords::demo();
        let admin = record("admin@eduflows.com", Credential::Unmigrated);
        assert!(verify_password("admin123", &admin, &legacy));
        assert!(!verify_password("prof123", &admin, &legacy));
        assert!(!verify_password("", &admin, &legacy));
    }

    #[test]
    fn unmigrated_unknown_email_never_matches() {
        let legacy = LegacyPasswords::demo();
        let user = record("stranger@eduflows.com", Credential::Unmigrated);
        assert!(!verify_password("password123", &user, &legacy));
        assert!(!verify_password("temp", &user, &legacy));
    }

    #[test]
    fn unmigrated_login_disabled_rejects_defaults() {
        let mut legacy = LegacyPasswords::demo();
        legacy.login_enabled = false;
        let admin = record("admin@eduflows.com", Credential::Unmigrated);
        assert!(!verify_password("admin123", &admin, &legacy));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let legacy = LegacyPasswords::demo();
        let user = record("a@example.com", Credential::Hashed("not-a-valid-hash".into()));
        assert!(!verify_password("anything", &user, &legacy));
    }

    #[tokio::test]
    async fn migration_hashes_unmigrated_and_is_idempotent() {
        let legacy = LegacyPasswords::demo();
        let store = MemoryUserStore::new();
        let prof = store.seed_unmigrated("prof@eduflows.com", "Prof", "professor").await;
        let other = store.seed_unmigrated("other@eduflows.com", "Other", "student").await;

        assert_eq!(migrate_legacy_passwords(&store, &legacy).await.unwrap(), 2);

        let prof_after = store.get(prof.id).await.unwrap();
        let other_after = store.get(other.id).await.unwrap();
        assert!(verify_password("prof123", &prof_after, &legacy));
        assert!(verify_password("password123", &other_after, &legacy));

        assert_eq!(migrate_legacy_passwords(&store, &legacy).await.unwrap(), 0);
        let prof_again = store.get(prof.id).await.unwrap();
        assert_eq!(prof_again.credential, prof_after.credential);
    }
}
