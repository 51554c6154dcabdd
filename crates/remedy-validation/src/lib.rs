//! # remedy-validation
//!
//! Schema checks for fix templates, the YAML documents that describe a
//! before/after transform for a mined pattern.
//!
//! Validation collects every violation in one pass rather than stopping at
//! the first, so authors see all problems at once.

mod template;
mod validator;

pub use template::{
    FixTemplate, LoadedTemplate, PrTemplate, RejectedTemplate, TemplateLibrary, TemplatePattern,
};
pub use validator::{TemplateValidator, ValidationOutcome, OPTIONAL_FIELDS, REQUIRED_FIELDS};
