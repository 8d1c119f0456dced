//! Fragment output assembly.
//!
//! Orchestrates the whole pre-render pipeline — classification, defensive
//! bootstrap, identity, capabilities, translations, CSRF — then renders the
//! fragment body and assembles the final response without ever letting a
//! stray error or JSON payload reach the HTML stream.

use std::sync::Arc;

use serde_json::json;

use storegate_auth::{
    evaluate, get_or_create_token, resolve_identity, CallerIdentity, CapabilitySource,
    CsrfToken, ResourceCapabilitySet,
};
use storegate_core::{EngineError, EngineResult, RequestId, Session};
use storegate_i18n::{I18nResolver, TranslationTree};
use storegate_observability::DiagnosticSink;

use crate::{
    classify, load_defensively, BootstrapResult, BootstrapUnit, RequestMeta, RequestMode,
    ShellTracker,
};

/// The shared page chrome wrapped around standalone fragments.
#[derive(Debug, Clone)]
pub struct ShellChrome {
    pub open: String,
    pub close: String,
}

impl Default for ShellChrome {
    fn default() -> Self {
        Self {
            open: concat!(
                "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">",
                "<title>Admin</title></head>\n<body>\n<main class=\"fragment\">\n"
            )
            .to_owned(),
            close: "\n</main>\n</body>\n</html>\n".to_owned(),
        }
    }
}

/// Everything a fragment body render gets to see.
#[derive(Debug)]
pub struct FragmentContext {
    pub request_id: RequestId,
    pub mode: RequestMode,
    pub identity: CallerIdentity,
    pub capabilities: ResourceCapabilitySet,
    pub translations: TranslationTree,
    pub csrf_token: CsrfToken,
}

/// A fragment page body. The body itself is plain templated HTML; all the
/// interesting work happened before `render` is called.
pub trait Fragment: Send + Sync {
    /// Resource name capabilities are evaluated against (e.g. `"brands"`).
    fn resource(&self) -> &str;

    /// Translation module name (e.g. `"Brands"`).
    fn module(&self) -> &str;

    fn render(&self, ctx: &FragmentContext) -> anyhow::Result<String>;
}

/// Final assembled response.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedResponse {
    /// HTML output (full page or bare fragment body).
    Page { status: u16, html: String },
    /// Structured denial for non-standalone consumers.
    Denied { status: u16, body: serde_json::Value },
}

impl RenderedResponse {
    pub fn status(&self) -> u16 {
        match self {
            RenderedResponse::Page { status, .. } => *status,
            RenderedResponse::Denied { status, .. } => *status,
        }
    }
}

/// The per-request pipeline, wired once at startup and shared by every
/// fragment route.
pub struct FragmentPipeline {
    bootstrap: Arc<dyn BootstrapUnit>,
    capabilities: Arc<dyn CapabilitySource>,
    i18n: I18nResolver,
    diag: Arc<dyn DiagnosticSink>,
    chrome: ShellChrome,
}

impl FragmentPipeline {
    pub fn new(
        bootstrap: Arc<dyn BootstrapUnit>,
        capabilities: Arc<dyn CapabilitySource>,
        i18n: I18nResolver,
        diag: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            bootstrap,
            capabilities,
            i18n,
            diag,
            chrome: ShellChrome::default(),
        }
    }

    pub fn with_chrome(mut self, chrome: ShellChrome) -> Self {
        self.chrome = chrome;
        self
    }

    /// Run the full pipeline for one request.
    ///
    /// The only hard failures are CSRF entropy exhaustion and shell-state
    /// misuse; everything else degrades to a documented fallback inside.
    pub fn assemble(
        &self,
        meta: &RequestMeta,
        session: &mut Session,
        fragment: &dyn Fragment,
    ) -> EngineResult<RenderedResponse> {
        let decision = classify(meta);
        let request_id = RequestId::new();

        let span = tracing::info_span!(
            "fragment",
            %request_id,
            resource = fragment.resource(),
            mode = ?decision.mode,
        );
        let _entered = span.enter();

        let boot = load_defensively(self.bootstrap.as_ref(), session, self.diag.as_ref());
        let hints = boot.hints();
        let identity = resolve_identity(session, &hints);

        let capabilities = evaluate(self.capabilities.as_ref(), fragment.resource(), &identity);

        let language = meta
            .lang
            .as_deref()
            .or(identity.preferred_language.as_deref())
            .unwrap_or(self.i18n.default_language())
            .to_owned();
        let translations = self.i18n.load(fragment.module(), &language);

        let csrf_token = get_or_create_token(session)
            .map_err(|e| EngineError::CsrfGeneration(e.to_string()))?;

        if !capabilities.can_view() && !identity.is_super_admin {
            return self.deny(&decision, &identity, fragment.resource(), &translations, request_id);
        }

        let ctx = FragmentContext {
            request_id,
            mode: decision.mode,
            identity,
            capabilities,
            translations,
            csrf_token,
        };

        let (mut status, body) = match fragment.render(&ctx) {
            Ok(body) => (200, body),
            Err(err) => {
                self.diag
                    .record(&format!("fragment body render failed: {err:#}"));
                tracing::error!(resource = fragment.resource(), error = %err, "body render failed");
                (
                    500,
                    error_block(ctx.translations.get(
                        "server_error",
                        "A server error occurred. Please try again later.",
                    )),
                )
            }
        };
        if boot.needs_banner() && !decision.render_shell {
            // Banner only ships with a full shell; the failure is already in
            // the diagnostic log for non-shell modes.
            tracing::debug!("bootstrap banner suppressed for shell-less response");
        }

        let html = if decision.render_shell {
            self.assemble_shell(&boot, &ctx.translations, &body, &mut status)?
        } else {
            let mut out = String::new();
            if let Some(text) = boot.passthrough_text() {
                out.push_str(text);
            }
            out.push_str(&body);
            out
        };

        Ok(RenderedResponse::Page { status, html })
    }

    /// Wrap the body in the page shell, deciding what to do with whatever the
    /// bootstrap run captured.
    fn assemble_shell(
        &self,
        boot: &BootstrapResult,
        translations: &TranslationTree,
        body: &str,
        status: &mut u16,
    ) -> EngineResult<String> {
        let mut tracker = ShellTracker::new();
        let mut html = String::new();

        tracker.open()?;
        html.push_str(&self.chrome.open);

        tracker.buffer_body()?;
        if boot.needs_banner() {
            tracker.substitute_error()?;
            html.push_str(&error_block(translations.get(
                "server_error",
                "A server error occurred. Please try again later.",
            )));
            if *status == 200 {
                // Page still renders, but not cleanly.
                tracing::warn!("serving shell with substituted error banner");
            }
        } else {
            tracker.flush()?;
            if let Some(text) = boot.passthrough_text() {
                html.push_str(text);
            }
        }

        html.push_str(body);

        tracker.close()?;
        html.push_str(&self.chrome.close);

        Ok(html)
    }

    /// Short-circuit for callers that may not view the resource. The
    /// protected body is never rendered.
    fn deny(
        &self,
        decision: &crate::ModeDecision,
        identity: &CallerIdentity,
        resource: &str,
        translations: &TranslationTree,
        request_id: RequestId,
    ) -> EngineResult<RenderedResponse> {
        let authenticated = identity.is_authenticated();
        let status = if authenticated { 403 } else { 401 };

        tracing::info!(
            resource,
            caller = %identity.id,
            status,
            "access denied"
        );

        if decision.mode != RequestMode::Standalone {
            return Ok(RenderedResponse::Denied {
                status,
                body: json!({
                    "error": "access_denied",
                    "resource": resource,
                    "authenticated": authenticated,
                    "request_id": request_id.to_string(),
                }),
            });
        }

        let message = translations.get(
            "access_denied",
            "You do not have permission to view this page.",
        );
        let block = format!(
            "<div class=\"access-denied\" role=\"alert\">{}</div>",
            escape_html(message)
        );

        let html = if decision.render_shell {
            let mut tracker = ShellTracker::new();
            let mut html = String::new();
            tracker.open()?;
            html.push_str(&self.chrome.open);
            tracker.buffer_body()?;
            tracker.flush()?;
            html.push_str(&block);
            tracker.close()?;
            html.push_str(&self.chrome.close);
            html
        } else {
            block
        };

        Ok(RenderedResponse::Page { status, html })
    }
}

fn error_block(message: &str) -> String {
    format!(
        "<div class=\"error-banner\" role=\"alert\">{}</div>",
        escape_html(message)
    )
}

/// Minimal HTML escaping for text interpolated into error/denial blocks.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
