//! Template variables and their rendering.

use serde::Serialize;
use std::fmt;

/// The kind of a template variable, identified by its operator character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// `{name}` - required, substituted in place
    PathVariable,
    /// `{?name}` - optional, starts a query string
    RequestParam,
    /// `{&name}` - optional, continues an existing query string
    RequestParamContinued,
    /// `{/name}` - optional path segment
    Segment,
    /// `{#name}` - optional fragment
    Fragment,
}

impl VariableType {
    /// The operator character used in template syntax.
    pub fn key(&self) -> &'static str {
        match self {
            VariableType::PathVariable => "",
            VariableType::RequestParam => "?",
            VariableType::RequestParamContinued => "&",
            VariableType::Segment => "/",
            VariableType::Fragment => "#",
        }
    }

    /// Resolve a variable type from its operator character.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "" => Some(VariableType::PathVariable),
            "?" => Some(VariableType::RequestParam),
            "&" => Some(VariableType::RequestParamContinued),
            "/" => Some(VariableType::Segment),
            "#" => Some(VariableType::Fragment),
            _ => None,
        }
    }

    /// Whether a variable of this type may be left out at expansion time.
    pub fn is_optional(&self) -> bool {
        !matches!(self, VariableType::PathVariable)
    }

    /// Whether a variable of this type is rendered into the query string.
    pub fn is_request_param(&self) -> bool {
        matches!(
            self,
            VariableType::RequestParam | VariableType::RequestParamContinued
        )
    }

    /// Whether two variables can share a single `{…}` expression.
    pub fn can_be_combined_with(&self, other: VariableType) -> bool {
        *self == other || (self.is_request_param() && other.is_request_param())
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single variable of a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateVariable {
    name: String,
    #[serde(rename = "kind")]
    variable_type: VariableType,
    composite: bool,
}

impl TemplateVariable {
    pub fn new(name: impl Into<String>, variable_type: VariableType) -> Self {
        Self {
            name: name.into(),
            variable_type,
            composite: false,
        }
    }

    /// `{name}`
    pub fn path_variable(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::PathVariable)
    }

    /// `{?name}`
    pub fn request_parameter(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::RequestParam)
    }

    /// `{&name}`
    pub fn request_parameter_continued(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::RequestParamContinued)
    }

    /// `{/name}`
    pub fn segment(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Segment)
    }

    /// `{#name}`
    pub fn fragment(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Fragment)
    }

    /// Marks the variable as exploded (`{/name*}`): its value may span several
    /// path segments.
    pub fn composite(mut self) -> Self {
        self.composite = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable_type(&self) -> VariableType {
        self.variable_type
    }

    pub fn is_composite(&self) -> bool {
        self.composite
    }

    pub fn is_required(&self) -> bool {
        !self.variable_type.is_optional()
    }

    pub fn is_request_parameter(&self) -> bool {
        self.variable_type.is_request_param()
    }

    fn is_combinable(&self, other: &TemplateVariable) -> bool {
        self.variable_type.can_be_combined_with(other.variable_type)
    }

    fn rendered_name(&self) -> String {
        if self.composite {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for TemplateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}{}}}", self.variable_type.key(), self.rendered_name())
    }
}

/// An ordered list of template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TemplateVariables {
    variables: Vec<TemplateVariable>,
}

impl TemplateVariables {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(variables: Vec<TemplateVariable>) -> Self {
        Self { variables }
    }

    /// Returns a new list with the given variables appended.
    pub fn concat(&self, other: impl IntoIterator<Item = TemplateVariable>) -> Self {
        let mut variables = self.variables.clone();
        variables.extend(other);
        Self { variables }
    }

    pub fn push(&mut self, variable: TemplateVariable) {
        self.variables.push(variable);
    }

    pub fn as_slice(&self) -> &[TemplateVariable] {
        &self.variables
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TemplateVariable> {
        self.variables.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Render the variables as template expressions, merging adjacent
    /// combinable ones (`{?page,size}`).
    ///
    /// With `has_query` set, a leading request parameter continues the query
    /// string instead of starting one.
    pub fn render(&self, has_query: bool) -> String {
        let mut result = String::new();
        let mut previous: Option<&TemplateVariable> = None;

        for variable in &self.variables {
            match previous {
                None => {
                    let kind = match variable.variable_type {
                        VariableType::RequestParam if has_query => {
                            VariableType::RequestParamContinued
                        }
                        other => other,
                    };
                    result.push('{');
                    result.push_str(kind.key());
                }
                Some(prev) if !prev.is_combinable(variable) => {
                    result.push_str("}{");
                    result.push_str(variable.variable_type.key());
                }
                Some(_) => result.push(','),
            }

            result.push_str(&variable.rendered_name());
            previous = Some(variable);
        }

        if previous.is_some() {
            result.push('}');
        }

        result
    }
}

impl fmt::Display for TemplateVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl<'a> IntoIterator for &'a TemplateVariables {
    type Item = &'a TemplateVariable;
    type IntoIter = std::slice::Iter<'a, TemplateVariable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}

impl IntoIterator for TemplateVariables {
    type Item = TemplateVariable;
    type IntoIter = std::vec::IntoIter<TemplateVariable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.into_iter()
    }
}

impl FromIterator<TemplateVariable> for TemplateVariables {
    fn from_iter<I: IntoIterator<Item = TemplateVariable>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_rendering() {
        assert_eq!(TemplateVariable::path_variable("id").to_string(), "{id}");
        assert_eq!(TemplateVariable::request_parameter("page").to_string(), "{?page}");
        assert_eq!(TemplateVariable::segment("path").composite().to_string(), "{/path*}");
        assert_eq!(TemplateVariable::fragment("top").to_string(), "{#top}");
    }

    #[test]
    fn test_combines_request_parameters() {
        let variables = TemplateVariables::new(vec![
            TemplateVariable::request_parameter("page"),
            TemplateVariable::request_parameter_continued("size"),
            TemplateVariable::fragment("anchor"),
        ]);

        assert_eq!(variables.to_string(), "{?page,size}{#anchor}");
    }

    #[test]
    fn test_render_continues_existing_query() {
        let variables = TemplateVariables::new(vec![TemplateVariable::request_parameter("page")]);

        assert_eq!(variables.render(true), "{&page}");
        assert_eq!(variables.render(false), "{?page}");
    }

    #[test]
    fn test_empty_variables_render_nothing() {
        assert_eq!(TemplateVariables::none().to_string(), "");
    }

    #[test]
    fn test_requiredness() {
        assert!(TemplateVariable::path_variable("id").is_required());
        assert!(!TemplateVariable::request_parameter("page").is_required());
    }
}
