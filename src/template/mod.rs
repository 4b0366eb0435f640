//! Email template system.
//!
//! This module provides:
//! - Template definition with variable placeholders (`{{variable}}`)
//! - Placeholder extraction, substitution and completeness checks
//! - Simulation marker / educational disclaimer decoration
//! - Template repositories (in-memory and PostgreSQL) and the CRUD service
//!
//! # Example
//!
//! ```ignore
//! let variables: Variables = serde_json::from_value(json!({
//!     "name": "Ana",
//!     "amount": 10,
//!     "currency": "USD"
//! }))?;
//!
//! require_variables("Hi {{name}}<p>{{amount}} {{currency}}</p>", &variables)?;
//!
//! let rendered = render_email("<p>{{amount}} {{currency}}</p>", "Hi {{name}}", &variables);
//! assert_eq!(rendered.rendered_subject, "[SIMULATION] Hi Ana");
//! ```

mod compose;
mod extract;
mod postgres_store;
mod seed;
mod service;
mod store;
mod substitution;
mod types;

pub use compose::{
    add_simulation_prefix, append_disclaimer, render_email, RenderedEmail, EDUCATION_DISCLAIMER,
    SIMULATION_MARKER,
};
pub use extract::{extract_variables, require_variables, validate_variables, VariableCheck};
pub use postgres_store::PostgresTemplateRepository;
pub use seed::{sample_templates, seed_templates};
pub use service::TemplateService;
pub use store::{MemoryTemplateRepository, TemplateRepository};
pub use substitution::substitute_variables;
pub use types::{
    CreateTemplateRequest, PreviewRequest, Template, TemplateCategory, TemplateError,
    TemplateFilter, TemplateListResponse, TemplateResult, UpdateTemplateRequest, VariableValue,
    Variables,
};
