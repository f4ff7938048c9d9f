//! End-to-end tests driving the OAuth router: login, consent, code exchange,
//! refresh, revocation and userinfo.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;
use url::Url;

use studio_auth::oauth::pkce::{PkceChallengeMethod, derive_challenge, generate_verifier};
use studio_auth::oauth::{ClientRegistration, RegisteredClient};
use studio_auth::storage::{ClientStorage, UserStorage};
use studio_auth::token::{AccessTokenClaims, TokenProfile};
use studio_auth::{
    AesGcmTokenCipher, AuthConfig, AuthResult, AuthState, AuthStores, ExternalIdentity,
    IdentityProvider, InMemoryAuthStorage, JwtService, OAuthService, SigningKeyPair, router,
};

const ISSUER: &str = "https://auth.example.com";
const WEBSITE: &str = "https://docs.example.com";
const REDIRECT: &str = "https://docs.example.com/__nuxt_studio/auth/sso";
const PROVIDER_AUTHORIZE: &str = "https://idp.test/authorize";

struct FakeGithub;

#[async_trait]
impl IdentityProvider for FakeGithub {
    fn name(&self) -> &'static str {
        "github"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("{PROVIDER_AUTHORIZE}?state={state}")
    }

    async fn exchange(&self, code: &str) -> AuthResult<ExternalIdentity> {
        if code != "good-code" {
            return Err(studio_auth::AuthError::identity_provider(
                "github",
                "bad_verification_code",
            ));
        }
        Ok(ExternalIdentity {
            provider_id: "583231".to_string(),
            email: Some("octocat@example.com".to_string()),
            name: "The Octocat".to_string(),
            avatar: Some("https://avatars.example.com/583231".to_string()),
            provider_token: Some("gho_provider_token".to_string()),
        })
    }
}

fn jwt_service() -> Arc<JwtService> {
    static JWT: OnceLock<Arc<JwtService>> = OnceLock::new();
    JWT.get_or_init(|| {
        Arc::new(JwtService::new(
            SigningKeyPair::generate_rsa("key-1").unwrap(),
            ISSUER,
        ))
    })
    .clone()
}

struct TestApp {
    router: Router,
    client: RegisteredClient,
    storage: Arc<InMemoryAuthStorage>,
}

impl TestApp {
    async fn new() -> Self {
        let storage = Arc::new(InMemoryAuthStorage::new());
        let client = ClientRegistration {
            name: "Docs".to_string(),
            website_url: WEBSITE.to_string(),
            preview_url_pattern: Some("https://*.vercel.app".to_string()),
            ..Default::default()
        }
        .build()
        .unwrap();
        ClientStorage::create(storage.as_ref(), &client.client)
            .await
            .unwrap();

        let config = AuthConfig {
            issuer: ISSUER.to_string(),
            ..Default::default()
        };
        let service = OAuthService::new(
            config,
            AuthStores::from_backend(storage.clone()),
            jwt_service(),
            Arc::new(AesGcmTokenCipher::new("integration-password")),
        );
        let state = AuthState::new(service, storage.clone(), Arc::new(FakeGithub));

        Self {
            router: router(state),
            client,
            storage,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    fn client_id(&self) -> &str {
        &self.client.client.id
    }

    /// Runs authorize → login → consent and returns the issued code.
    async fn obtain_code(&self, challenge: &str) -> String {
        let response = self
            .send(get(&authorize_uri(self.client_id(), challenge), None))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/login");
        let cookie = session_cookie(&response);

        let response = self.send(get("/auth/github", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let provider_url = Url::parse(&location(&response)).unwrap();
        let login_state = query_param(&provider_url, "state").unwrap();

        let response = self
            .send(get(
                &format!("/auth/github?code=good-code&state={login_state}"),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/authorize");
        let cookie = session_cookie(&response);

        let response = self
            .send(post_json(
                "/oauth/authorize",
                json!({ "approved": true }),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
        assert_eq!(redirect.path(), "/__nuxt_studio/auth/sso");
        assert_eq!(query_param(&redirect, "state").as_deref(), Some("xyz"));
        query_param(&redirect, "code").unwrap()
    }

    fn code_exchange(&self, code: &str, verifier: &str) -> Request<Body> {
        post_form(
            "/oauth/token",
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", REDIRECT),
                ("code_verifier", verifier),
                ("client_id", self.client_id()),
                ("client_secret", &self.client.client_secret),
            ],
        )
    }
}

fn authorize_uri(client_id: &str, challenge: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", REDIRECT)
        .append_pair("state", "xyz")
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("nonce", "n-0S6")
        .finish();
    format!("/oauth/authorize?{query}")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_form(uri: &str, params: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn location(response: &Response<Body>) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

fn session_cookie(response: &Response<Body>) -> String {
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_full_authorization_code_flow() {
    let app = TestApp::new().await;
    let verifier = generate_verifier();
    let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);

    let code = app.obtain_code(&challenge).await;

    // Exchange the code.
    let response = app.send(app.code_exchange(&code, &verifier)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    let tokens = json_body(response).await;
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "openid profile email git:github");
    assert!(tokens["id_token"].is_string());
    let access_token = tokens["access_token"].as_str().unwrap().to_string();
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();

    // The code is single-use.
    let response = app.send(app.code_exchange(&code, &verifier)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_grant");

    // Userinfo returns the profile and the decrypted provider token.
    let response = app.send(bearer("/oauth/userinfo", &access_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let info = json_body(response).await;
    assert_eq!(info["email"], "octocat@example.com");
    assert_eq!(info["name"], "The Octocat");
    assert_eq!(info["github_token"], "gho_provider_token");
    assert_eq!(info["git_provider"], "github");

    // Refresh.
    let refresh = post_form(
        "/oauth/token",
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
            ("client_id", app.client_id()),
            ("client_secret", &app.client.client_secret),
        ],
    );
    let response = app.send(refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = json_body(response).await;
    assert!(refreshed["access_token"].is_string());

    // Revoke the refresh token.
    let revoke = post_form(
        "/oauth/revoke",
        &[
            ("token", &refresh_token),
            ("client_id", app.client_id()),
            ("client_secret", &app.client.client_secret),
        ],
    );
    let response = app.send(revoke).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({}));

    // Revoking it again still succeeds.
    let revoke_again = post_form(
        "/oauth/revoke",
        &[
            ("token", &refresh_token),
            ("client_id", app.client_id()),
            ("client_secret", &app.client.client_secret),
        ],
    );
    let response = app.send(revoke_again).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({}));

    // The revoked token no longer refreshes.
    let refresh = post_form(
        "/oauth/token",
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", &refresh_token),
            ("client_id", app.client_id()),
            ("client_secret", &app.client.client_secret),
        ],
    );
    let response = app.send(refresh).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_description"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn test_concurrent_redemption_issues_one_token() {
    let app = TestApp::new().await;
    let verifier = generate_verifier();
    let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);
    let code = app.obtain_code(&challenge).await;

    let (first, second) = tokio::join!(
        app.send(app.code_exchange(&code, &verifier)),
        app.send(app.code_exchange(&code, &verifier)),
    );

    let mut statuses = [first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);
}

#[tokio::test]
async fn test_wrong_verifier_is_rejected() {
    let app = TestApp::new().await;
    let verifier = generate_verifier();
    let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);
    let code = app.obtain_code(&challenge).await;

    let response = app
        .send(app.code_exchange(&code, &generate_verifier()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_grant");
    assert_eq!(body["error_description"], "Invalid or expired authorization code");
}

#[tokio::test]
async fn test_consent_denied() {
    let app = TestApp::new().await;
    let challenge = derive_challenge(&generate_verifier(), PkceChallengeMethod::S256);

    let response = app
        .send(get(&authorize_uri(app.client_id(), &challenge), None))
        .await;
    let cookie = session_cookie(&response);
    let response = app.send(get("/auth/github", Some(&cookie))).await;
    let login_state = query_param(&Url::parse(&location(&response)).unwrap(), "state").unwrap();
    let response = app
        .send(get(
            &format!("/auth/github?code=good-code&state={login_state}"),
            Some(&cookie),
        ))
        .await;
    let cookie = session_cookie(&response);

    let response = app
        .send(post_json(
            "/oauth/authorize",
            json!({ "approved": false }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let redirect = Url::parse(json_body(response).await["redirectUrl"].as_str().unwrap()).unwrap();
    assert_eq!(query_param(&redirect, "error").as_deref(), Some("access_denied"));
    assert_eq!(
        query_param(&redirect, "error_description").as_deref(),
        Some("User denied the authorization request")
    );
    assert_eq!(query_param(&redirect, "state").as_deref(), Some("xyz"));
    assert!(query_param(&redirect, "code").is_none());

    // The pending request was consumed.
    let response = app
        .send(post_json(
            "/oauth/authorize",
            json!({ "approved": true }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_consent_requires_login() {
    let app = TestApp::new().await;
    let response = app
        .send(post_json("/oauth/authorize", json!({ "approved": true }), None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_authorize_rejects_foreign_redirect() {
    let app = TestApp::new().await;
    let challenge = derive_challenge(&generate_verifier(), PkceChallengeMethod::S256);
    let uri = authorize_uri(app.client_id(), &challenge).replace(
        "docs.example.com",
        "evil.com",
    );

    let response = app.send(get(&uri, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert_eq!(json_body(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_authorize_requires_pkce() {
    let app = TestApp::new().await;
    let uri = format!(
        "/oauth/authorize?response_type=code&client_id={}&redirect_uri={}&state=xyz",
        app.client_id(),
        REDIRECT
    );

    let response = app.send(get(&uri, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_request");
}

#[tokio::test]
async fn test_login_state_mismatch_redirects_to_login_error() {
    let app = TestApp::new().await;
    let response = app.send(get("/auth/github", None)).await;
    let cookie = session_cookie(&response);

    let response = app
        .send(get("/auth/github?code=good-code&state=forged", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?error=github_auth_failed");
}

#[tokio::test]
async fn test_login_without_pending_request_lands_on_dashboard() {
    let app = TestApp::new().await;
    let response = app.send(get("/auth/github", None)).await;
    let cookie = session_cookie(&response);
    let login_state = query_param(&Url::parse(&location(&response)).unwrap(), "state").unwrap();

    let response = app
        .send(get(
            &format!("/auth/github?code=good-code&state={login_state}"),
            Some(&cookie),
        ))
        .await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_login_rotates_session_cookie() {
    let app = TestApp::new().await;
    let verifier = generate_verifier();
    let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);

    // A cookie obtained before login, as one planted in the browser would be.
    let response = app
        .send(get(&authorize_uri(app.client_id(), &challenge), None))
        .await;
    let planted = session_cookie(&response);

    let response = app.send(get("/auth/github", Some(&planted))).await;
    let login_state = query_param(&Url::parse(&location(&response)).unwrap(), "state").unwrap();

    let response = app
        .send(get(
            &format!("/auth/github?code=good-code&state={login_state}"),
            Some(&planted),
        ))
        .await;
    assert_eq!(location(&response), "/authorize");
    let after_login = session_cookie(&response);
    assert_ne!(after_login, planted);

    // The pre-login id is gone: it neither consents nor carries the request.
    let response = app
        .send(post_json(
            "/oauth/authorize",
            json!({ "approved": true }),
            Some(&planted),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(get(&authorize_uri(app.client_id(), &challenge), Some(&planted)))
        .await;
    assert_eq!(location(&response), "/login");

    // The rotated cookie holds the login and the pending request.
    let response = app
        .send(post_json(
            "/oauth/authorize",
            json!({ "approved": true }),
            Some(&after_login),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["redirectUrl"].is_string());
}

#[tokio::test]
async fn test_token_requires_client_credentials() {
    let app = TestApp::new().await;
    let response = app
        .send(post_form(
            "/oauth/token",
            &[("grant_type", "authorization_code"), ("code", "x")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_client");
    assert_eq!(body["error_description"], "Client credentials required");
}

#[tokio::test]
async fn test_token_accepts_basic_auth() {
    let app = TestApp::new().await;
    let verifier = generate_verifier();
    let code = app
        .obtain_code(&derive_challenge(&verifier, PkceChallengeMethod::S256))
        .await;

    use base64::Engine;
    let basic = base64::engine::general_purpose::STANDARD.encode(format!(
        "{}:{}",
        app.client_id(),
        app.client.client_secret
    ));
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "authorization_code")
        .append_pair("code", &code)
        .append_pair("redirect_uri", REDIRECT)
        .append_pair("code_verifier", &verifier)
        .finish();
    let request = Request::builder()
        .method("POST")
        .uri("/oauth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, format!("Basic {basic}"))
        .body(Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_grant_type() {
    let app = TestApp::new().await;
    let response = app
        .send(post_form(
            "/oauth/token",
            &[
                ("grant_type", "password"),
                ("client_id", app.client_id()),
                ("client_secret", &app.client.client_secret),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn test_userinfo_without_token() {
    let app = TestApp::new().await;
    let response = app.send(get("/oauth/userinfo", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_token");
    assert_eq!(body["error_description"], "Missing or invalid access token");
}

#[tokio::test]
async fn test_userinfo_rejects_expired_token() {
    let app = TestApp::new().await;
    let verifier = generate_verifier();
    let challenge = derive_challenge(&verifier, PkceChallengeMethod::S256);
    let code = app.obtain_code(&challenge).await;
    let response = app.send(app.code_exchange(&code, &verifier)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = app
        .storage
        .find_by_provider_id_or_email("583231", "octocat@example.com")
        .await
        .unwrap()
        .unwrap();
    let profile = TokenProfile {
        name: user.name.clone(),
        email: user.email.clone(),
        picture: user.avatar.clone(),
    };
    // Issued an hour ago, expired one second ago.
    let claims = AccessTokenClaims::builder(ISSUER, user.id.to_string(), app.client_id())
        .scope("openid profile email git:github")
        .profile(&profile)
        .issued_at(OffsetDateTime::now_utc() - time::Duration::seconds(3601))
        .expires_in_seconds(3600)
        .build();
    let expired = jwt_service().sign(&claims).unwrap();

    let response = app.send(bearer("/oauth/userinfo", &expired)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Bearer error=\"invalid_token\""
    );
    assert_eq!(
        json_body(response).await["error_description"],
        "Token is invalid or expired"
    );
}

#[tokio::test]
async fn test_revoke_requires_token() {
    let app = TestApp::new().await;
    let response = app
        .send(post_form(
            "/oauth/revoke",
            &[
                ("client_id", app.client_id()),
                ("client_secret", &app.client.client_secret),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error_description"], "Missing token parameter");
}

#[tokio::test]
async fn test_revoke_unknown_token_succeeds() {
    let app = TestApp::new().await;
    let response = app
        .send(post_form(
            "/oauth/revoke",
            &[
                ("token", "never-issued"),
                ("client_id", app.client_id()),
                ("client_secret", &app.client.client_secret),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({}));
}

#[tokio::test]
async fn test_discovery_and_jwks() {
    let app = TestApp::new().await;

    let response = app
        .send(get("/.well-known/openid-configuration", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );
    let doc = json_body(response).await;
    assert_eq!(doc["issuer"], ISSUER);
    assert_eq!(doc["token_endpoint"], "https://auth.example.com/oauth/token");
    assert_eq!(doc["code_challenge_methods_supported"], json!(["S256"]));

    let response = app.send(get("/.well-known/jwks.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let jwks = json_body(response).await;
    assert_eq!(jwks["keys"][0]["kid"], "key-1");
    assert_eq!(jwks["keys"][0]["alg"], "RS256");
}
