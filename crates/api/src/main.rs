use std::sync::Arc;

use storegate_api::{build_app, AppState};
use storegate_api::app::SessionBootstrap;
use storegate_auth::{Capability, InMemoryCapabilityTable};
use storegate_core::{InMemorySessionStore, RoleId};
use storegate_engine::FragmentPipeline;
use storegate_i18n::I18nResolver;
use storegate_observability::FileDiagnosticLog;

#[tokio::main]
async fn main() {
    storegate_observability::init();

    let diag_path = std::env::var("DIAGNOSTIC_LOG")
        .unwrap_or_else(|_| "storegate-diagnostic.log".to_string());
    let languages_root =
        std::env::var("LANGUAGES_ROOT").unwrap_or_else(|_| "languages".to_string());

    let i18n = I18nResolver::new(languages_root).with_whitelist("Categories", ["en", "de"]);

    // Starter permission rows; real deployments put their database-backed
    // table behind the same seam.
    let table = Arc::new(InMemoryCapabilityTable::new());
    table.grant(RoleId::new(1), "categories", Capability::ViewAll);
    table.grant(RoleId::new(1), "categories", Capability::Create);
    table.grant(RoleId::new(1), "categories", Capability::EditAll);

    let pipeline = Arc::new(FragmentPipeline::new(
        Arc::new(SessionBootstrap),
        table,
        i18n,
        Arc::new(FileDiagnosticLog::new(diag_path)),
    ));

    let state = AppState {
        pipeline,
        sessions: Arc::new(InMemorySessionStore::new()),
    };

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind 0.0.0.0:8080");

    tracing::info!("listening on {}", listener.local_addr().expect("local addr"));

    axum::serve(listener, app).await.expect("server error");
}
