//! Drives the full router over an in-memory users table.

use andromeda_mvc::sql::QueryBuf;
use andromeda_mvc::{app, default_registry, AppError, AppState, Executor, Row, Settings};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct MemoryUsers {
    rows: Mutex<Vec<Row>>,
}

impl MemoryUsers {
    fn param<'a>(q: &'a QueryBuf, name: &str) -> Option<&'a Value> {
        q.params.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

#[async_trait]
impl Executor for MemoryUsers {
    async fn fetch(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        if q.sql == "SELECT 1" {
            return Ok(vec![json!({"?column?": 1}).as_object().cloned().unwrap()]);
        }
        if q.sql.starts_with("SELECT * FROM users WHERE email = :email") {
            let email = Self::param(q, "email").cloned().unwrap_or(Value::Null);
            let rows = self.rows.lock().unwrap();
            return Ok(rows.iter().filter(|r| r.get("email") == Some(&email)).cloned().collect());
        }
        Err(AppError::Query(format!("unexpected statement: {}", q.sql)))
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        if !q.sql.starts_with("INSERT INTO users") {
            return Err(AppError::Query(format!("unexpected statement: {}", q.sql)));
        }
        let mut rows = self.rows.lock().unwrap();
        let mut row: Row = q.params.iter().cloned().collect();
        row.insert("id".into(), json!(rows.len() + 1));
        row.insert("usertype".into(), json!("user"));
        rows.push(row);
        Ok(1)
    }
}

fn state() -> (Arc<MemoryUsers>, AppState) {
    let users = Arc::new(MemoryUsers::default());
    let state = AppState::new(users.clone(), default_registry(), Settings::default()).unwrap();
    (users, state)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    req.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    req.body(Body::from(body.to_string())).unwrap()
}

fn session_cookie(res: &Response) -> String {
    let raw = res.headers()[header::SET_COOKIE].to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

fn location(res: &Response) -> &str {
    res.headers()[header::LOCATION].to_str().unwrap()
}

async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn operational_routes_answer() {
    let (_, state) = state();
    let res = app(state.clone()).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app(state).oneshot(get("/ready", None)).await.unwrap();
    assert_eq!(json_body(res).await["database"], "ok");
}

#[tokio::test]
async fn route_comes_from_url_parameter_or_path() {
    let (_, state) = state();
    let v = json_body(app(state.clone()).oneshot(get("/", None)).await.unwrap()).await;
    assert_eq!(v["data"]["view"], "home");

    let v = json_body(app(state.clone()).oneshot(get("/?url=signup", None)).await.unwrap()).await;
    assert_eq!(v["data"]["page_title"], "Sign Up");

    let v = json_body(app(state.clone()).oneshot(get("/signin", None)).await.unwrap()).await;
    assert_eq!(v["data"]["page_title"], "Sign In");

    let res = app(state).oneshot(get("/?url=missing/page", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["data"]["view"], "404");
}

#[tokio::test]
async fn signup_signin_and_logout() {
    let (users, state) = state();

    let res = app(state.clone())
        .oneshot(post_form(
            "/?url=signup",
            "fullname=Ada+Lovelace&email=ada%40example.com&password=engines1843&password2=engines1843",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/signin");
    let cookie = session_cookie(&res);
    {
        let rows = users.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_ne!(rows[0]["password"], "engines1843");
        assert!(rows[0].get("password2").is_none());
    }

    let v = json_body(app(state.clone()).oneshot(get("/signin", Some(&cookie))).await.unwrap()).await;
    assert_eq!(v["data"]["message"], "Account created, please sign in");

    let res = app(state.clone())
        .oneshot(post_form("/signin", "email=ada%40example.com&password=wrong-one", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["data"]["errors"]["email"], "Invalid Credentials");

    let res = app(state.clone())
        .oneshot(post_form("/signin", "email=ada%40example.com&password=engines1843", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&res), "/home");

    let v = json_body(app(state.clone()).oneshot(get("/home", Some(&cookie))).await.unwrap()).await;
    assert_eq!(v["data"]["user"]["fullname"], "Ada Lovelace");
    assert!(v["data"]["user"].get("password").is_none());

    let res = app(state.clone()).oneshot(get("/dash", Some(&cookie))).await.unwrap();
    assert_eq!(location(&res), "/signin");

    let res = app(state.clone()).oneshot(get("/logout", Some(&cookie))).await.unwrap();
    assert_eq!(location(&res), "/home");
    let v = json_body(app(state).oneshot(get("/home", Some(&cookie))).await.unwrap()).await;
    assert_eq!(v["data"]["user"], Value::Null);
}

#[tokio::test]
async fn signup_reports_every_failing_rule() {
    let (users, state) = state();
    let res = app(state)
        .oneshot(post_form(
            "/signup",
            "fullname=R2D2&email=not-an-email&password=short&password2=short",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let errors = json_body(res).await["data"]["errors"].clone();
    assert_eq!(errors["fullname"], "Fullname should only contain alphabetical letters & spaces");
    assert_eq!(errors["email"], "Invalid email address");
    assert_eq!(errors["password"], "Password should be 8 or more characters");
    assert!(users.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_browsing_stores_no_sessions() {
    let (_, state) = state();
    for uri in ["/", "/signin", "/signup", "/?url=missing/page", "/dash"] {
        let res = app(state.clone()).oneshot(get(uri, None)).await.unwrap();
        assert!(res.headers().get(header::SET_COOKIE).is_none(), "{uri}");
    }
    let res = app(state.clone()).oneshot(get("/home", Some("sid=made-up"))).await.unwrap();
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn explicit_index_action_reaches_the_page() {
    let (_, state) = state();
    let v = json_body(app(state.clone()).oneshot(get("/signin/index", None)).await.unwrap()).await;
    assert_eq!(v["data"]["view"], "signin");
    let v = json_body(app(state).oneshot(get("/?url=signup/index", None)).await.unwrap()).await;
    assert_eq!(v["data"]["page_title"], "Sign Up");
}
