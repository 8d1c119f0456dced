//! Router construction and fragment serving.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use storegate_auth::IdentityHints;
use storegate_core::{Session, SessionStore};
use storegate_engine::{Fragment, FragmentContext, FragmentPipeline, OutputCapture};

use crate::meta::{request_meta, ParentRenderedHeader};
use crate::respond::{engine_error_to_response, rendered_to_response};

const SESSION_COOKIE: &str = "sid";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FragmentPipeline>,
    pub sessions: Arc<dyn SessionStore>,
}

/// Bootstrap unit for deployments where login flows write the session
/// directly: it contributes no hints, so identity resolution falls through
/// to the session record.
pub struct SessionBootstrap;

impl storegate_engine::BootstrapUnit for SessionBootstrap {
    fn name(&self) -> &str {
        "session-bootstrap"
    }

    fn run(
        &self,
        _session: &mut Session,
        _out: &mut OutputCapture,
    ) -> anyhow::Result<IdentityHints> {
        Ok(IdentityHints::default())
    }
}

/// Demo fragment: the categories CRUD table. The body is deliberately
/// minimal; it exists to exercise the pipeline end to end.
pub struct CategoriesFragment;

impl Fragment for CategoriesFragment {
    fn resource(&self) -> &str {
        "categories"
    }

    fn module(&self) -> &str {
        "Categories"
    }

    fn render(&self, ctx: &FragmentContext) -> anyhow::Result<String> {
        let title = ctx.translations.get("categories.title", "Categories");
        let mut html = format!(
            "<section class=\"categories\">\n<h1>{title}</h1>\n\
             <input type=\"hidden\" name=\"csrf_token\" value=\"{}\">\n",
            ctx.csrf_token
        );
        if ctx.capabilities.create {
            html.push_str("<button class=\"create\">+</button>\n");
        }
        if ctx.capabilities.can_edit() {
            html.push_str("<button class=\"edit\">edit</button>\n");
        }
        if ctx.capabilities.can_delete() {
            html.push_str("<button class=\"delete\">delete</button>\n");
        }
        html.push_str("</section>");
        Ok(html)
    }
}

pub fn build_app(state: AppState) -> Router {
    let categories: Arc<dyn Fragment> = Arc::new(CategoriesFragment);

    Router::new()
        .route(
            "/admin/categories",
            get(move |State(state): State<AppState>, req: Request| {
                let fragment = categories.clone();
                async move { serve_fragment(state, fragment, "/admin/categories", req).await }
            }),
        )
        .with_state(state)
}

/// Serve one fragment request: load the session, run the pipeline, persist
/// the session, map the result.
pub async fn serve_fragment(
    state: AppState,
    fragment: Arc<dyn Fragment>,
    script_path: &str,
    req: Request,
) -> Response {
    let (parts, _body) = req.into_parts();
    let parent_rendered_header = parts.extensions.get::<ParentRenderedHeader>().is_some();
    let meta = request_meta(&parts.headers, &parts.uri, script_path, parent_rendered_header);

    let (mut session, new_session_id) = match session_id_from(&parts.headers) {
        Some(id) => match state.sessions.load(&id) {
            Some(session) => (session, None),
            None => (Session::new(id), None),
        },
        None => {
            let id = uuid::Uuid::now_v7().to_string();
            (Session::new(id.clone()), Some(id))
        }
    };

    let result = state
        .pipeline
        .assemble(&meta, &mut session, fragment.as_ref());
    state.sessions.save(&session);

    let mut response = match result {
        Ok(rendered) => rendered_to_response(rendered),
        Err(err) => engine_error_to_response(err),
    };

    if let Some(id) = new_session_id {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = cookie.parse() {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }

    response
}

fn session_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == SESSION_COOKIE && !value.is_empty()).then(|| value.to_owned())
        })
}
