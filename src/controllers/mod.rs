//! Site controllers and the registry the front controller dispatches through.

mod dash;
mod home;
mod logout;
mod not_found;
mod signin;
mod signup;

pub use dash::Dash;
pub use home::Home;
pub use logout::Logout;
pub use not_found::NotFound;
pub use signin::Signin;
pub use signup::Signup;

use crate::dispatch::{ControllerRegistry, NOT_FOUND};
use crate::error::AppError;

/// Every controller the site serves.
pub fn default_registry() -> ControllerRegistry {
    ControllerRegistry::new()
        .controller("Home", || Box::new(Home))
        .controller("Signin", || Box::new(Signin))
        .controller("Signup", || Box::new(Signup))
        .controller("Logout", || Box::new(Logout))
        .controller(NOT_FOUND, || Box::new(NotFound))
        .nested("Dash", || Box::new(Dash))
}

pub(crate) fn missing(controller: &str, action: &str) -> AppError {
    AppError::MissingAction {
        controller: controller.into(),
        action: action.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::dispatch::RequestContext;
    use crate::service::executor::scripted::ScriptedExecutor;
    use axum::http::{header, Method, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn ctx(exec: ScriptedExecutor) -> (Arc<ScriptedExecutor>, RequestContext) {
        let exec = Arc::new(exec);
        let ctx = RequestContext::new(exec.clone(), Arc::new(Settings::default()));
        (exec, ctx)
    }

    fn sign_in_as(ctx: &mut RequestContext, usertype: &str) {
        ctx.session
            .auth(json!({"id": 1, "usertype": usertype}).as_object().cloned().unwrap());
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn dash_redirects_non_admins() {
        let (exec, mut ctx) = ctx(ScriptedExecutor::new());
        sign_in_as(&mut ctx, "user");
        let res = default_registry().dispatch(Some("dash/users"), &mut ctx).await.unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(location(&res), "/signin");
        assert!(exec.log().is_empty());
    }

    #[tokio::test]
    async fn dash_index_shows_user_total() {
        let (exec, mut ctx) = ctx(ScriptedExecutor::new().rows(vec![json!({"total": 12})]));
        sign_in_as(&mut ctx, "admin");
        let res = default_registry().dispatch(Some("dash"), &mut ctx).await.unwrap();
        let v = json_body(res).await;
        assert_eq!(v["data"]["total_users"], 12);
        assert_eq!(exec.log()[0].sql, "SELECT COUNT(*) AS total FROM users");
    }

    #[tokio::test]
    async fn dash_users_pages_from_the_path() {
        let (exec, mut ctx) = ctx(
            ScriptedExecutor::new().rows(vec![json!({"id": 11, "email": "a@b.co", "password": "$2b$..."})]),
        );
        sign_in_as(&mut ctx, "admin");
        let res = default_registry().dispatch(Some("dash/users/2"), &mut ctx).await.unwrap();
        let v = json_body(res).await;
        assert!(exec.log()[0].sql.ends_with("LIMIT 10 OFFSET 10"));
        assert_eq!(v["data"]["rows"][0]["id"], 11);
        assert!(v["data"]["rows"][0].get("password").is_none());
        assert_eq!((v["data"]["prev_page"].clone(), v["data"]["next_page"].clone()), (json!(1), json!(3)));
        assert_eq!(v["meta"]["count"], 1);
    }

    #[tokio::test]
    async fn logout_clears_the_user() {
        let (_, mut ctx) = ctx(ScriptedExecutor::new());
        sign_in_as(&mut ctx, "admin");
        let res = default_registry().dispatch(Some("logout"), &mut ctx).await.unwrap();
        assert_eq!(location(&res), "/home");
        assert!(!ctx.session.is_logged_in());
    }

    #[tokio::test]
    async fn failed_signin_renders_the_form_with_errors() {
        let (_, mut ctx) = ctx(ScriptedExecutor::new().rows(vec![]));
        ctx.method = Method::POST;
        ctx.form = json!({"email": "x@y.co", "password": "whatever1"}).as_object().cloned().unwrap();
        let res = default_registry().dispatch(Some("signin"), &mut ctx).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["data"]["view"], "signin");
        assert_eq!(v["data"]["errors"]["email"], "Invalid Credentials");
    }

    #[tokio::test]
    async fn signin_get_does_not_query() {
        let (exec, mut ctx) = ctx(ScriptedExecutor::new());
        let v = json_body(default_registry().dispatch(Some("signin"), &mut ctx).await.unwrap()).await;
        assert_eq!(v["data"]["page_title"], "Sign In");
        assert!(exec.log().is_empty());
    }

    #[tokio::test]
    async fn dash_upload_stores_images_and_rejects_others() {
        use crate::upload::UploadedFile;
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            upload_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let mut ctx = RequestContext::new(Arc::new(ScriptedExecutor::new()), Arc::new(settings));
        sign_in_as(&mut ctx, "admin");
        ctx.method = Method::POST;
        let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        ctx.files.insert(
            "image".into(),
            UploadedFile {
                file_name: "cat.png".into(),
                content_type: Some("image/png".into()),
                bytes: png.to_vec().into(),
            },
        );
        let v = json_body(default_registry().dispatch(Some("dash/upload"), &mut ctx).await.unwrap()).await;
        let stored = v["data"]["file"].as_str().unwrap();
        assert!(stored.ends_with("cat.png"));
        assert_eq!(v["data"]["message"], "Image uploaded");

        ctx.files.insert(
            "image".into(),
            UploadedFile {
                file_name: "cat.gif".into(),
                content_type: None,
                bytes: png.to_vec().into(),
            },
        );
        let v = json_body(default_registry().dispatch(Some("dash/upload"), &mut ctx).await.unwrap()).await;
        assert!(v["data"].get("file").is_none());
        assert!(v["data"]["errors"]["image"].as_str().unwrap().starts_with("Only jpg"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn strays_get_the_not_found_page() {
        let (_, mut ctx) = ctx(ScriptedExecutor::new());
        let res = default_registry().dispatch(Some("nowhere/at/all"), &mut ctx).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = json_body(res).await;
        assert_eq!(v["data"]["view"], "404");
        assert_eq!(v["data"]["path"], "nowhere/at/all");
    }
}
