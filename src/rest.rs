//! REST API layer using Axum.
//!
//! - `GET /`         create a namespace and issue its first key
//! - `PUT /get_key`  issue another key for an existing namespace (`db` field,
//!                   JSON or urlencoded form)
//! - `GET /health`   liveness, no remote calls

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, put},
    Form, Json, Router,
};
use std::sync::Arc;

use crate::error::ProvisionError;
use crate::models::{FetchKeyRequest, HealthResponse, NamespaceCreated};
use crate::provision::{FetchOutcome, Provisioner};

/// Plain-text reply for a namespace that is malformed or not readable
pub const INVALID_DB_NAME: &str = "Invalid db name!";

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
#[derive(Clone)]
pub struct AppState {
    provisioner: Arc<Provisioner>,
}

/// `PUT /get_key` body, accepted as JSON or as a urlencoded form
pub struct KeyRequest(pub FetchKeyRequest);

#[async_trait]
impl<S> FromRequest<S> for KeyRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<FetchKeyRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        } else {
            let Form(body) = Form::<FetchKeyRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        }
    }
}

/// Create Axum router over a configured provisioner
pub fn create_router(provisioner: Provisioner) -> Router {
    let state = Arc::new(AppState {
        provisioner: Arc::new(provisioner),
    });

    Router::new()
        .route("/", get(create_namespace_handler))
        .route("/get_key", put(get_key_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn create_namespace_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NamespaceCreated>, ProvisionError> {
    state.provisioner.create_namespace().await.map(Json)
}

async fn get_key_handler(
    State(state): State<Arc<AppState>>,
    KeyRequest(payload): KeyRequest,
) -> Result<Response, ProvisionError> {
    let response = match state.provisioner.fetch_key(&payload.db).await? {
        FetchOutcome::Issued(credential) => Json(credential).into_response(),
        FetchOutcome::UnknownNamespace => INVALID_DB_NAME.into_response(),
    };
    Ok(response)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        login: state.provisioner.login().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AdminCredentials;
    use crate::cloudant::CloudantClient;
    use crate::config::RemoteConfig;
    use crate::models::IssuedCredential;
    use crate::provision::tests::FakeAccount;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use mockito::{Matcher, Server};
    use std::time::Duration;
    use tower::ServiceExt; // For .oneshot() testing

    fn fake_router(fake: &Arc<FakeAccount>, attempts: u32) -> Router {
        create_router(Provisioner::new(fake.clone(), attempts))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec()
    }

    fn get_key_request(content_type: &str, body: &str) -> Request<Body> {
        Request::builder()
            .uri("/get_key")
            .method(Method::PUT)
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let fake = Arc::new(FakeAccount::default());
        let response = fake_router(&fake, 1)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .expect("health request");
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.login, "alice");
    }

    #[tokio::test]
    async fn test_create_namespace_returns_flat_credential() {
        let fake = Arc::new(FakeAccount::with_create_script(&[412, 201]));
        let response = fake_router(&fake, 4)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("create request");
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        let created = fake.created.lock().unwrap();
        assert_eq!(body["db_name"], created[0].as_str());
        assert_eq!(body["key"], "k1");
        assert_eq!(body["password"], "p1");
        assert_eq!(body["login"], "alice");
    }

    #[tokio::test]
    async fn test_create_namespace_exhausted_is_503() {
        let fake = Arc::new(FakeAccount::with_create_script(&[412, 412]));
        let response = fake_router(&fake, 2)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("create request");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], "names_exhausted");
    }

    #[tokio::test]
    async fn test_get_key_accepts_json_and_form() {
        let fake = Arc::new(FakeAccount::with_existing("dbshared"));
        let app = fake_router(&fake, 1);

        let json = app
            .clone()
            .oneshot(get_key_request("application/json", r#"{"db":"dbshared"}"#))
            .await
            .unwrap();
        assert_eq!(json.status(), StatusCode::OK);
        let first: IssuedCredential = serde_json::from_slice(&body_bytes(json).await).unwrap();

        let form = app
            .oneshot(get_key_request("application/x-www-form-urlencoded", "db=dbshared"))
            .await
            .unwrap();
        assert_eq!(form.status(), StatusCode::OK);
        let second: IssuedCredential = serde_json::from_slice(&body_bytes(form).await).unwrap();

        assert_eq!(first.login, "alice");
        assert_ne!(first.key, second.key);
    }

    #[tokio::test]
    async fn test_get_key_unknown_db_is_plain_text() {
        let fake = Arc::new(FakeAccount::default());
        let response = fake_router(&fake, 1)
            .oneshot(get_key_request("application/json", r#"{"db":"dbMISSING"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_bytes(response).await, INVALID_DB_NAME.as_bytes());
        assert_eq!(*fake.keys_generated.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_key_missing_field_is_rejected() {
        let fake = Arc::new(FakeAccount::default());
        let response = fake_router(&fake, 1)
            .oneshot(get_key_request("application/json", r#"{"name":"dbshared"}"#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_get_key_refused_grant_is_502() {
        let fake = Arc::new(FakeAccount {
            refuse_grants: true,
            ..FakeAccount::with_existing("dbshared")
        });
        let response = fake_router(&fake, 1)
            .oneshot(get_key_request("application/json", r#"{"db":"dbshared"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], "permission_grant_failed");
    }

    fn cloudant_router(server: &Server) -> Router {
        let config = RemoteConfig {
            admin: AdminCredentials::new("alice", "secret"),
            account_url: server.url(),
            api_url: format!("{}/api", server.url()),
            timeout: Duration::from_secs(5),
        };
        let client = CloudantClient::new(config).expect("client");
        create_router(Provisioner::new(Arc::new(client), 4))
    }

    #[tokio::test]
    async fn test_end_to_end_create_against_mock_cloudant() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("PUT", Matcher::Regex(r"^/db[0-9a-f]{20}$".to_string()))
            .with_status(201)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;
        let generate = server
            .mock("POST", "/api/generate_api_key")
            .with_status(201)
            .with_body(r#"{"password":"p1","ok":true,"key":"k1"}"#)
            .expect(1)
            .create_async()
            .await;
        let grant = server
            .mock("POST", "/api/set_permissions")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r"database=alice%2Fdb[0-9a-f]{20}".to_string()),
                Matcher::Regex("username=k1".to_string()),
                Matcher::Regex("roles=_reader&roles=_writer".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let response = cloudant_router(&server)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        let db_name = body["db_name"].as_str().unwrap().to_string();
        assert!(db_name.starts_with("db") && db_name.len() == 22);
        assert_eq!(
            body,
            serde_json::json!({"db_name": db_name, "key": "k1", "password": "p1", "login": "alice"})
        );

        create.assert_async().await;
        generate.assert_async().await;
        grant.assert_async().await;
    }

    #[tokio::test]
    async fn test_end_to_end_get_key_missing_db_against_mock_cloudant() {
        let mut server = Server::new_async().await;
        let lookup = server
            .mock("GET", "/dbmissing")
            .with_status(404)
            .with_body(r#"{"error":"not_found","reason":"Database does not exist."}"#)
            .expect(1)
            .create_async()
            .await;
        let generate = server
            .mock("POST", "/api/generate_api_key")
            .expect(0)
            .create_async()
            .await;

        let response = cloudant_router(&server)
            .oneshot(get_key_request("application/json", r#"{"db":"dbmissing"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, INVALID_DB_NAME.as_bytes());

        lookup.assert_async().await;
        generate.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_key_lookup_failure_is_502_not_invalid_name() {
        let fake = Arc::new(FakeAccount {
            fail_exists: true,
            ..FakeAccount::with_existing("dbshared")
        });
        let response = fake_router(&fake, 1)
            .oneshot(get_key_request("application/json", r#"{"db":"dbshared"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], "remote_error");
        assert_eq!(*fake.keys_generated.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_generate_failure_after_create_against_mock_cloudant() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("PUT", Matcher::Regex(r"^/db[0-9a-f]{20}$".to_string()))
            .with_status(201)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;
        let generate = server
            .mock("POST", "/api/generate_api_key")
            .with_status(500)
            .with_body(r#"{"error":"internal"}"#)
            .expect(1)
            .create_async()
            .await;
        let grant = server
            .mock("POST", "/api/set_permissions")
            .expect(0)
            .create_async()
            .await;

        let response = cloudant_router(&server)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], "remote_error");
        assert_eq!(body["error"]["message"], "generate_api_key returned HTTP 500");

        create.assert_async().await;
        generate.assert_async().await;
        grant.assert_async().await;
    }
}
