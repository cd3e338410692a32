//! URI templates, template variables and the mapping registry.

mod registry;
mod uri_template;
mod variable;

pub use registry::TemplateRegistry;
pub use uri_template::{UriTemplate, is_valid_variable_name};
pub use variable::{TemplateVariable, TemplateVariables, VariableType};
