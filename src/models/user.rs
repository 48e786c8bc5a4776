//! Site users: sign-up with hashed passwords and sign-in into the session.

use crate::config::EntityConfig;
use crate::error::AppError;
use crate::service::{as_text, Executor, Repository, ValidationErrors};
use crate::session::Session;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Column used to look users up at sign-in.
pub const LOGIN_COLUMN: &str = "email";
pub const ADMIN: &str = "admin";

const INVALID_CREDENTIALS: &str = "Invalid Credentials";
const PASSWORD_MISMATCH: &str = "Passwords do not match";

pub struct User {
    repo: Repository,
}

impl User {
    pub fn entity() -> EntityConfig {
        EntityConfig::new("users")
            .with_allowed_columns(["fullname", "phone", "email", "password"])
            .with_insert_rule("fullname", &["alpha_space", "required"])
            .with_insert_rule("password", &["not_less_than_8_chars", "required"])
            .with_insert_rule("email", &["unique", "email", "required"])
            .with_update_rule("fullname", &["alpha_space", "required"])
            .with_update_rule("password", &["not_less_than_8_chars", "required"])
            .with_update_rule("email", &["unique", "email", "required"])
            .with_cast("id", "bigint")
    }

    pub fn new(executor: Arc<dyn Executor>) -> Self {
        User {
            repo: Repository::new(executor, Self::entity()),
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut Repository {
        &mut self.repo
    }

    pub fn errors(&self) -> &ValidationErrors {
        self.repo.errors()
    }

    /// Validate and create an account. Returns true when the row was inserted and the
    /// caller should continue to sign-in.
    pub async fn signup(&mut self, data: &Map<String, Value>) -> Result<bool, AppError> {
        if !self.repo.validate(data).await {
            return Ok(false);
        }
        let password = data.get("password").map(as_text).unwrap_or_default();
        let confirm = data.get("password2").map(as_text).unwrap_or_default();
        if password != confirm {
            let errors = self.repo.errors_mut();
            errors.set("password", PASSWORD_MISMATCH);
            errors.set("password2", PASSWORD_MISMATCH);
            return Ok(false);
        }

        let mut row = data.clone();
        row.insert("password".into(), Value::String(hash_password(password).await?));
        let inserted = self.repo.insert(&row).await?;
        tracing::info!(email = %data.get("email").map(as_text).unwrap_or_default(), inserted, "user signed up");
        Ok(inserted > 0)
    }

    /// Check credentials and authenticate `session`. Returns the route to continue to:
    /// `dash` for admins, `home` for everyone else. On failure the login column carries
    /// the error.
    pub async fn signin(&mut self, data: &Map<String, Value>, session: &mut Session) -> Option<&'static str> {
        let login = data.get(LOGIN_COLUMN).cloned().unwrap_or(Value::Null);
        let password = data.get("password").map(as_text).unwrap_or_default();

        let row = self
            .repo
            .first(&[(LOGIN_COLUMN.to_string(), login)], &[])
            .await;
        let hash = row
            .as_ref()
            .and_then(|r| r.get("password"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let verified = match hash {
            Some(hash) => verify_password(password, hash).await,
            None => false,
        };
        let Some(mut row) = row.filter(|_| verified) else {
            self.repo.errors_mut().set(LOGIN_COLUMN, INVALID_CREDENTIALS);
            return None;
        };

        row.remove("password");
        let admin = row.get("usertype").and_then(Value::as_str) == Some(ADMIN);
        session.auth(row);
        tracing::info!(admin, "user signed in");
        Some(if admin { "dash" } else { "home" })
    }
}

/// bcrypt on the blocking pool; it holds a core for hundreds of milliseconds.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "stored password hash unreadable");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "password check task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::executor::scripted::{Reply, ScriptedExecutor};
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn form(password2: &str) -> Map<String, Value> {
        obj(json!({
            "fullname": "Ada Lovelace",
            "email": "ada@example.com",
            "password": "engines1843",
            "password2": password2,
        }))
    }

    #[tokio::test]
    async fn signup_hashes_password_and_inserts_allowed_columns() {
        let exec = Arc::new(ScriptedExecutor::new().rows(vec![]).reply(Reply::Affected(1)));
        let mut user = User::new(exec.clone());
        assert!(user.signup(&form("engines1843")).await.unwrap());

        let log = exec.log();
        assert_eq!(log.len(), 2);
        let insert = &log[1];
        assert!(insert.sql.starts_with("INSERT INTO users"));
        assert!(!insert.sql.contains("password2"));
        let hash = insert.param("password").and_then(Value::as_str).unwrap();
        assert!(bcrypt::verify("engines1843", hash).unwrap());
    }

    #[tokio::test]
    async fn signup_rejects_mismatched_passwords() {
        let exec = Arc::new(ScriptedExecutor::new().rows(vec![]));
        let mut user = User::new(exec.clone());
        assert!(!user.signup(&form("engines1844")).await.unwrap());
        assert_eq!(user.repo().error("password"), PASSWORD_MISMATCH);
        assert_eq!(user.repo().error("password2"), PASSWORD_MISMATCH);
        assert_eq!(exec.log().len(), 1);
    }

    #[tokio::test]
    async fn signup_stops_on_validation_errors() {
        let exec = Arc::new(ScriptedExecutor::new().rows(vec![json!({"id": 1})]));
        let mut user = User::new(exec.clone());
        assert!(!user.signup(&form("engines1843")).await.unwrap());
        assert_eq!(user.repo().error("email"), "Email should be unique");
        assert_eq!(exec.log().len(), 1);
    }

    #[tokio::test]
    async fn signin_routes_by_user_type_and_hides_the_hash() {
        let hash = bcrypt::hash("engines1843", 4).unwrap();
        let exec = Arc::new(ScriptedExecutor::new().rows(vec![
            json!({"id": 7, "email": "ada@example.com", "password": hash, "usertype": "admin"}),
        ]));
        let mut user = User::new(exec);
        let mut session = Session::default();
        let next = user
            .signin(&obj(json!({"email": "ada@example.com", "password": "engines1843"})), &mut session)
            .await;
        assert_eq!(next, Some("dash"));
        assert!(session.is_logged_in());
        assert!(session.user_field("password").is_none());
        assert_eq!(session.user_field("id"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn signin_failures_share_one_message() {
        let hash = bcrypt::hash("engines1843", 4).unwrap();
        let exec = Arc::new(
            ScriptedExecutor::new()
                .rows(vec![json!({"id": 7, "password": hash, "usertype": "user"})])
                .rows(vec![]),
        );
        let mut user = User::new(exec);
        let mut session = Session::default();

        let wrong = obj(json!({"email": "ada@example.com", "password": "nope"}));
        assert_eq!(user.signin(&wrong, &mut session).await, None);
        assert_eq!(user.errors().get("email"), INVALID_CREDENTIALS);

        let unknown = obj(json!({"email": "who@example.com", "password": "engines1843"}));
        assert_eq!(user.signin(&unknown, &mut session).await, None);
        assert_eq!(user.errors().get("email"), INVALID_CREDENTIALS);
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn password_hashing_leaves_the_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        let ticker = tokio::spawn(async move {
            loop {
                t.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            }
        });

        let hash = hash_password("engines1843".into()).await.unwrap();
        ticker.abort();
        assert!(ticks.load(Ordering::SeqCst) > 0);
        assert!(verify_password("engines1843".into(), hash.clone()).await);
        assert!(!verify_password("engines1844".into(), hash).await);
        assert!(!verify_password("x".into(), "not-a-hash".into()).await);
    }

    #[test]
    fn entity_config_is_valid() {
        crate::config::validate_entity(&User::entity()).unwrap();
    }
}
