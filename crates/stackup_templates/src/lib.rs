//! # stackup_templates
//!
//! Manifest template rendering for stackup.
//!
//! The manifest is an opaque text template containing a fixed set of
//! literal placeholder markers. Rendering substitutes every occurrence of
//! every bound placeholder, then scans the output for leftover placeholder
//! syntax: a survivor is a hard error, never a silent pass-through. A
//! binding with no occurrence in the template is tolerated with a warning,
//! since templates evolve independently of caller bindings.

pub mod error;
pub mod renderer;

pub use error::{TemplateError, TemplateResult};
pub use renderer::{
    PlaceholderBindings, Rendered, TemplateRenderer, ADMIN_PASSWORD, ADMIN_TOKEN, CERT_BASE64,
    DOMAIN, KEY_BASE64, NAMESPACE,
};
