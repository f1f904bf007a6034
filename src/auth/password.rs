use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    // Compared against when an email is unknown so both login failures cost one verify.
    static ref DUMMY_HASH: Option<String> = hash_password("pitchlink-timing-equalizer").ok();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Hash on the blocking pool so the async workers keep serving requests.
pub async fn hash_offloaded(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain)).await?
}

pub async fn verify_offloaded(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

/// Burn one verification against the dummy hash; the outcome is discarded.
pub async fn verify_against_dummy(plain: String) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || burn_one_hash(&plain, DUMMY_HASH.as_deref())).await?;
    Ok(())
}

/// Without a dummy hash a fresh hash costs the same argon2 work as a verify.
fn burn_one_hash(plain: &str, dummy: Option<&str>) {
    match dummy {
        Some(hash) => {
            let _ = verify_password(plain, hash);
        }
        None => {
            error!("dummy hash unavailable; hashing instead");
            let _ = hash_password(plain);
        }
    }
}

/// Compute the dummy hash ahead of the first unknown-email login.
pub fn prime_dummy_hash() {
    lazy_static::initialize(&DUMMY_HASH);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, password);
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("kickoff-at-three").unwrap();
        let b = hash_password("kickoff-at-three").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn offloaded_variants_agree_with_sync_ones() {
        let hash = hash_offloaded("penalty-spot".into()).await.unwrap();
        assert!(verify_offloaded("penalty-spot".into(), hash.clone()).await.unwrap());
        assert!(!verify_offloaded("offside".into(), hash).await.unwrap());
        verify_against_dummy("whatever".into()).await.unwrap();
    }

    #[test]
    fn dummy_hash_is_a_parseable_argon2_hash() {
        let hash = DUMMY_HASH.as_deref().expect("dummy hash built");
        assert!(PasswordHash::new(hash).is_ok());
        assert!(!verify_password("whatever", hash).unwrap());
    }

    #[test]
    fn missing_dummy_hash_still_does_argon2_work() {
        let started = std::time::Instant::now();
        burn_one_hash("whatever", None);
        let without = started.elapsed();

        let hash = hash_password("reference").unwrap();
        let started = std::time::Instant::now();
        let _ = verify_password("whatever", &hash);
        let verify = started.elapsed();

        assert!(without * 4 >= verify, "fallback {without:?} vs verify {verify:?}");
    }
}
