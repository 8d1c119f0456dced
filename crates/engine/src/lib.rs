//! `storegate-engine` — the fragment request pipeline.
//!
//! Everything an admin fragment runs before emitting a byte of HTML:
//! request-mode classification, defensive bootstrap execution, identity and
//! capability resolution, and final output assembly with leak containment.

pub mod assemble;
pub mod bootstrap;
pub mod capture;
pub mod request;

pub use assemble::{
    Fragment, FragmentContext, FragmentPipeline, RenderedResponse, ShellChrome,
};
pub use bootstrap::{load_defensively, BootstrapResult, BootstrapUnit, LeakedJson};
pub use capture::{OutputCapture, ShellState, ShellTracker};
pub use request::{classify, ModeDecision, RequestMeta, RequestMode};
