use std::sync::Arc;

use serde_json::json;

use storegate_api::app::SessionBootstrap;
use storegate_api::{build_app, AppState};
use storegate_auth::{Capability, InMemoryCapabilityTable};
use storegate_core::session::keys;
use storegate_core::{InMemorySessionStore, RoleId, Session, SessionStore};
use storegate_engine::FragmentPipeline;
use storegate_i18n::I18nResolver;
use storegate_observability::MemoryDiagnosticLog;

struct TestServer {
    base_url: String,
    sessions: Arc<InMemorySessionStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Build the same router as prod, but bind to an ephemeral port, with an
    /// in-memory diagnostic sink and a handle onto the session store so
    /// tests can seed logins.
    async fn spawn(languages_root: &std::path::Path, table: InMemoryCapabilityTable) -> Self {
        let i18n = I18nResolver::new(languages_root).with_whitelist("Categories", ["de"]);
        let pipeline = Arc::new(FragmentPipeline::new(
            Arc::new(SessionBootstrap),
            Arc::new(table),
            i18n,
            Arc::new(MemoryDiagnosticLog::new()),
        ));

        let sessions = Arc::new(InMemorySessionStore::new());
        let state = AppState {
            pipeline,
            sessions: sessions.clone(),
        };
        let app = build_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            sessions,
            handle,
        }
    }

    /// Seed a logged-in session and return its cookie value.
    fn login(&self, session_id: &str, user: serde_json::Value) -> String {
        let mut session = Session::new(session_id);
        session.set(keys::USER, user);
        self.sessions.save(&session);
        format!("sid={session_id}")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn write_translations(root: &std::path::Path, lang: &str, title: &str) {
    let dir = root.join("Categories");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{lang}.json")),
        json!({"strings": {"categories": {"title": title}}}).to_string(),
    )
    .unwrap();
}

/// Rows exist for role 1 only, so other callers are configured-denied.
fn staff_table() -> InMemoryCapabilityTable {
    let table = InMemoryCapabilityTable::new();
    table.grant(RoleId::new(1), "categories", Capability::ViewAll);
    table.grant(RoleId::new(1), "categories", Capability::EditAll);
    table
}

#[tokio::test]
async fn guest_ajax_request_gets_structured_401_not_html() {
    let languages = tempfile::tempdir().unwrap();
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/admin/categories", srv.base_url))
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "access_denied");
    assert_eq!(body["resource"], "categories");
}

#[tokio::test]
async fn guest_standalone_request_gets_denial_page_with_shell() {
    let languages = tempfile::tempdir().unwrap();
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let res = reqwest::Client::new()
        .get(format!("{}/admin/categories", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    let html = res.text().await.unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("access-denied"));
    assert!(!html.contains("class=\"categories\""));
}

#[tokio::test]
async fn permitted_staff_get_the_full_page() {
    let languages = tempfile::tempdir().unwrap();
    write_translations(languages.path(), "en", "Categories");
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let cookie = srv.login("s-staff", json!({"id": 7, "username": "staff", "role_id": 1}));
    let res = reqwest::Client::new()
        .get(format!("{}/admin/categories", srv.base_url))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("<h1>Categories</h1>"));
    assert!(html.contains("csrf_token"));
    assert!(html.contains("class=\"edit\""));
}

#[tokio::test]
async fn ajax_request_returns_body_without_shell() {
    let languages = tempfile::tempdir().unwrap();
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let cookie = srv.login("s-staff", json!({"id": 7, "username": "staff", "role_id": 1}));
    let res = reqwest::Client::new()
        .get(format!("{}/admin/categories", srv.base_url))
        .header("Cookie", cookie)
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(!html.contains("<!DOCTYPE html>"));
    assert!(html.contains("class=\"categories\""));
}

#[tokio::test]
async fn management_permission_unlocks_edit_without_scoped_rows() {
    let languages = tempfile::tempdir().unwrap();
    // Empty table: unconfigured, so the tenant-view fallback applies.
    let srv = TestServer::spawn(languages.path(), InMemoryCapabilityTable::new()).await;

    let cookie = srv.login(
        "s-manager",
        json!({
            "id": 9,
            "username": "manager",
            "role_id": 3,
            "permissions": ["categories.manage"],
        }),
    );
    let res = reqwest::Client::new()
        .get(format!("{}/admin/categories", srv.base_url))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("class=\"edit\""));
    assert!(html.contains("class=\"delete\""));
}

#[tokio::test]
async fn non_whitelisted_language_falls_back_to_english() {
    let languages = tempfile::tempdir().unwrap();
    write_translations(languages.path(), "en", "Categories");
    write_translations(languages.path(), "de", "Kategorien");
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let cookie = srv.login("s-staff", json!({"id": 7, "username": "staff", "role_id": 1}));
    let client = reqwest::Client::new();

    let html = client
        .get(format!("{}/admin/categories?lang=de", srv.base_url))
        .header("Cookie", cookie.clone())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<h1>Kategorien</h1>"));

    // "xx" is not whitelisted: English, transparently, with no error.
    let res = client
        .get(format!("{}/admin/categories?lang=xx", srv.base_url))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("<h1>Categories</h1>"));
}

#[tokio::test]
async fn csrf_token_is_stable_across_requests_in_one_session() {
    let languages = tempfile::tempdir().unwrap();
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let cookie = srv.login("s-staff", json!({"id": 7, "username": "staff", "role_id": 1}));
    let client = reqwest::Client::new();

    let extract_token = |html: &str| -> String {
        let marker = "name=\"csrf_token\" value=\"";
        let start = html.find(marker).unwrap() + marker.len();
        html[start..start + 64].to_owned()
    };

    let first = client
        .get(format!("{}/admin/categories", srv.base_url))
        .header("Cookie", cookie.clone())
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let second = client
        .get(format!("{}/admin/categories", srv.base_url))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(extract_token(&first), extract_token(&second));
}

#[tokio::test]
async fn new_visitors_receive_a_session_cookie() {
    let languages = tempfile::tempdir().unwrap();
    let srv = TestServer::spawn(languages.path(), staff_table()).await;

    let res = reqwest::Client::new()
        .get(format!("{}/admin/categories", srv.base_url))
        .send()
        .await
        .unwrap();

    let set_cookie = res.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with("sid="));
    assert!(set_cookie.contains("HttpOnly"));
}
