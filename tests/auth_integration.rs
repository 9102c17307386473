use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use tokenkeeper::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, Settings, StorageBackend,
};
use tokenkeeper::session::SessionController;
use tokenkeeper::startup::run;
use tokenkeeper::store::{InMemoryCredentialStore, InMemoryRevocationStore};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

fn test_settings(port: u16) -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port,
            storage: StorageBackend::Memory,
            hash_cost: 4,
        },
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        },
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let sessions = SessionController::build(
        &test_settings(port),
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(InMemoryRevocationStore::new()),
    );
    let server = run(listener, sessions).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn post_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn get_secret(&self, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/secret", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register(&self, username: &str, password: &str) -> Value {
        let response = self
            .post_json(
                "/registration",
                &json!({"username": username, "password": password, "role": "user"}),
            )
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing string field {} in {}", field, body))
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_200_with_token_pair() {
    let app = spawn_app().await;

    let body = app.register("alice", "pw1").await;

    assert_eq!(str_field(&body, "message"), "User alice was created");
    assert!(!str_field(&body, "id").is_empty());
    assert_ne!(
        str_field(&body, "access_token"),
        str_field(&body, "refresh_token")
    );
}

#[tokio::test]
async fn register_returns_409_for_duplicate_username() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;

    let response = app
        .post_json(
            "/registration",
            &json!({"username": "alice", "password": "other", "role": "user"}),
        )
        .await;
    assert_eq!(409, response.status().as_u16(),
        "Should reject duplicate username with 409 Conflict");

    let users: Value = app
        .client
        .get(&format!("{}/users", &app.address))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(users["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn register_usernames_are_case_sensitive() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    app.register("Alice", "pw1").await;
}

#[tokio::test]
async fn register_returns_400_for_missing_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({"password": "pw1"}), "missing username"),
        (json!({"username": "alice"}), "missing password"),
        (json!({"username": "", "password": "pw1"}), "blank username"),
        (json!({"username": "alice", "password": ""}), "blank password"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in test_cases {
        let response = app.post_json("/registration", &body).await;
        assert_eq!(400, response.status().as_u16(),
            "Should reject request: {}", reason);
    }
}

#[tokio::test]
async fn register_defaults_role_and_keeps_names() {
    let app = spawn_app().await;

    let response = app
        .post_json(
            "/registration",
            &json!({
                "username": "bob",
                "password": "pw1",
                "firstName": "Bob",
                "lastName": "Builder"
            }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let login: Value = app
        .post_json("/login", &json!({"username": "bob", "password": "pw1"}))
        .await
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(str_field(&login, "role"), "user");
    assert_eq!(str_field(&login, "firstName"), "Bob");
    assert_eq!(str_field(&login, "lastName"), "Builder");
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app().await;
    let registered = app.register("alice", "pw1").await;

    let response = app
        .post_json("/login", &json!({"username": "alice", "password": "pw1"}))
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(str_field(&body, "id"), str_field(&registered, "id"));
    assert_eq!(str_field(&body, "username"), "alice");
    assert_eq!(str_field(&body, "role"), "user");
    assert!(body.get("firstName").is_some());
    assert!(body.get("lastName").is_some());
    assert_ne!(
        str_field(&body, "jwtToken"),
        str_field(&registered, "access_token")
    );
    assert!(!str_field(&body, "jwtRefreshToken").is_empty());
}

#[tokio::test]
async fn login_failures_are_indistinguishable_401s() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;

    let wrong_password = app
        .post_json("/login", &json!({"username": "alice", "password": "wrong"}))
        .await;
    let no_such_user = app
        .post_json("/login", &json!({"username": "mallory", "password": "pw1"}))
        .await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, no_such_user.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = no_such_user.json().await.unwrap();
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["code"], b["code"]);
}

// --- Protected Routes Tests ---

#[tokio::test]
async fn secret_requires_access_token() {
    let app = spawn_app().await;
    let tokens = app.register("alice", "pw1").await;

    let response = app.get_secret(str_field(&tokens, "access_token")).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([{"id": 12, "uid": 32}]));

    let response = app
        .client
        .get(&format!("{}/secret", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = app.get_secret("not.a.token").await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = spawn_app().await;
    let tokens = app.register("alice", "pw1").await;
    let access = str_field(&tokens, "access_token");
    let refresh = str_field(&tokens, "refresh_token");

    assert_eq!(401, app.get_secret(refresh).await.status().as_u16());
    assert_eq!(401, app.post_with_token("/logout/access", refresh).await.status().as_u16());
    assert_eq!(401, app.post_with_token("/token/refresh", access).await.status().as_u16());
    assert_eq!(401, app.post_with_token("/logout/refresh", access).await.status().as_u16());
}

// --- Session Lifecycle Tests ---

#[tokio::test]
async fn full_session_lifecycle() {
    let app = spawn_app().await;

    let registered = app.register("alice", "pw1").await;

    let response = app
        .post_json("/login", &json!({"username": "alice", "password": "wrong"}))
        .await;
    assert_eq!(401, response.status().as_u16());

    let login: Value = app
        .post_json("/login", &json!({"username": "alice", "password": "pw1"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(str_field(&login, "id"), str_field(&registered, "id"));

    let access = str_field(&registered, "access_token");
    let refresh = str_field(&registered, "refresh_token");

    let response = app.post_with_token("/logout/access", access).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(str_field(&body, "message"), "Access token has been revoked");

    assert_eq!(401, app.get_secret(access).await.status().as_u16());

    // A revoked token cannot be logged out again.
    assert_eq!(401, app.post_with_token("/logout/access", access).await.status().as_u16());

    let response = app.post_with_token("/token/refresh", refresh).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let new_access = str_field(&body, "jwtRefreshToken");
    assert_eq!(200, app.get_secret(new_access).await.status().as_u16());

    // The login session is independent of the registration session.
    assert_eq!(200, app.get_secret(str_field(&login, "jwtToken")).await.status().as_u16());
}

#[tokio::test]
async fn refresh_token_reuse_mints_distinct_access_tokens() {
    let app = spawn_app().await;
    let tokens = app.register("alice", "pw1").await;
    let refresh = str_field(&tokens, "refresh_token");

    let first: Value = app
        .post_with_token("/token/refresh", refresh)
        .await
        .json()
        .await
        .unwrap();
    let second: Value = app
        .post_with_token("/token/refresh", refresh)
        .await
        .json()
        .await
        .unwrap();

    let first = str_field(&first, "jwtRefreshToken");
    let second = str_field(&second, "jwtRefreshToken");
    assert_ne!(first, second);

    // Revoking one minted access token leaves the other alone.
    assert_eq!(200, app.post_with_token("/logout/access", first).await.status().as_u16());
    assert_eq!(401, app.get_secret(first).await.status().as_u16());
    assert_eq!(200, app.get_secret(second).await.status().as_u16());
}

#[tokio::test]
async fn logout_refresh_stops_refreshing() {
    let app = spawn_app().await;
    let tokens = app.register("alice", "pw1").await;
    let access = str_field(&tokens, "access_token");
    let refresh = str_field(&tokens, "refresh_token");

    let response = app.post_with_token("/logout/refresh", refresh).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(str_field(&body, "message"), "Refresh token has been revoked");

    assert_eq!(401, app.post_with_token("/token/refresh", refresh).await.status().as_u16());
    assert_eq!(401, app.post_with_token("/logout/refresh", refresh).await.status().as_u16());
    assert_eq!(200, app.get_secret(access).await.status().as_u16());
}

// --- User Administration Tests ---

#[tokio::test]
async fn users_listing_hides_password_hashes() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    app.register("bob", "pw2").await;

    let body: Value = app
        .client
        .get(&format!("{}/users", &app.address))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("Failed to parse response");

    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        assert!(user.get("password").is_none());
        assert!(user.get("passwordHash").is_none());
        assert!(user.get("username").is_some());
    }
}

#[tokio::test]
async fn delete_users_removes_everyone() {
    let app = spawn_app().await;
    app.register("alice", "pw1").await;
    app.register("bob", "pw2").await;

    let response = app
        .client
        .delete(&format!("{}/users", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(str_field(&body, "message"), "2 row(s) deleted");

    let response = app
        .post_json("/login", &json!({"username": "alice", "password": "pw1"}))
        .await;
    assert_eq!(401, response.status().as_u16());

    // The username is free again.
    app.register("alice", "pw1").await;
}
