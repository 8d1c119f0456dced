//! Request mode classification.
//!
//! Pure function of immutable request metadata; computed once per request
//! and never revisited.

use serde::Serialize;

/// How the fragment is being consumed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// The user navigated to the fragment directly; it owns the whole page.
    Standalone,
    /// Requested via XMLHttpRequest; the caller swaps the body into the DOM.
    AjaxFragment,
    /// Included inside another page (iframe, panel, or server-side include).
    Embedded,
}

/// Classification result: the mode plus whether the shared page shell must
/// be rendered around the fragment body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ModeDecision {
    pub mode: RequestMode,
    pub render_shell: bool,
}

/// The request metadata the classifier inspects. Assembled once by the HTTP
/// boundary; immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Raw `X-Requested-With` header value, if present.
    pub requested_with: Option<String>,
    /// The `embedded` flag was passed and truthy.
    pub embedded: bool,
    /// Parsed `standalone` flag: `Some(false)` is an explicit embed request,
    /// `Some(true)` forces standalone.
    pub standalone: Option<bool>,
    /// The `_standalone` debugging marker was passed and truthy.
    pub force_standalone_marker: bool,
    /// Path the user actually requested.
    pub entry_path: String,
    /// Path of the fragment currently executing.
    pub script_path: String,
    /// A parent page already emitted the page header this request.
    pub parent_rendered_header: bool,
    /// Requested UI language (`lang` query field), if any.
    pub lang: Option<String>,
}

impl RequestMeta {
    pub fn is_xhr(&self) -> bool {
        self.requested_with
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    /// Explicit "open this fragment as a page" override, for manually
    /// debugging fragment URLs. Beats AJAX detection.
    pub fn force_standalone(&self) -> bool {
        self.standalone == Some(true) || self.force_standalone_marker
    }

    /// Explicit embed request (`embedded` flag or `standalone=0`).
    pub fn explicit_embed(&self) -> bool {
        self.embedded || self.standalone == Some(false)
    }

    /// The executing fragment is the script the user directly requested.
    pub fn is_direct_request(&self) -> bool {
        !self.script_path.is_empty() && self.script_path == self.entry_path
    }
}

/// Classify the request.
///
/// Precedence:
/// 1. force-standalone override;
/// 2. explicit embed flags;
/// 3. AJAX header;
/// 4. direct request ⇒ standalone;
/// 5. otherwise a sub-include ⇒ embedded.
///
/// The "parent already rendered header" sentinel suppresses the shell
/// unconditionally (duplicate-header prevention wins over everything,
/// including force-standalone).
pub fn classify(meta: &RequestMeta) -> ModeDecision {
    let mode = if meta.force_standalone() {
        RequestMode::Standalone
    } else if meta.explicit_embed() {
        RequestMode::Embedded
    } else if meta.is_xhr() {
        RequestMode::AjaxFragment
    } else if meta.is_direct_request() {
        RequestMode::Standalone
    } else {
        RequestMode::Embedded
    };

    let render_shell = !meta.parent_rendered_header && mode == RequestMode::Standalone;

    ModeDecision { mode, render_shell }
}
