//! URI templates
//!
//! A small subset of RFC 6570 covering the expressions links are built from:
//! `{id}`, `{?page,size}`, `{&sort}`, `{/path*}` and `{#section}`.
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use waymark_core::template::UriTemplate;
//!
//! let template = UriTemplate::parse("/people/{id}{?page,size}")?;
//! let uri = template.expand(&HashMap::from([("id", "42"), ("page", "2")]))?;
//! assert_eq!(uri, "/people/42?page=2");
//! ```

use super::variable::{TemplateVariable, TemplateVariables, VariableType};
use crate::{Error, Result};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression(Vec<TemplateVariable>),
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
    variables: TemplateVariables,
}

impl UriTemplate {
    /// Parse a template string.
    pub fn parse(source: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut variables = TemplateVariables::none();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }

            let close = rest[open..]
                .find('}')
                .map(|offset| open + offset)
                .ok_or_else(|| Error::InvalidTemplate(format!("unclosed expression in {}", source)))?;

            let expression = parse_expression(&rest[open + 1..close], source)?;
            for variable in &expression {
                variables.push(variable.clone());
            }
            parts.push(Part::Expression(expression));

            rest = &rest[close + 1..];
        }

        if rest.contains('}') {
            return Err(Error::InvalidTemplate(format!(
                "unbalanced closing brace in {}",
                source
            )));
        }

        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
            variables,
        })
    }

    /// A template without any variables.
    pub fn literal(uri: impl Into<String>) -> Self {
        let source = uri.into();
        let parts = if source.is_empty() {
            Vec::new()
        } else {
            vec![Part::Literal(source.clone())]
        };

        Self {
            source,
            parts,
            variables: TemplateVariables::none(),
        }
    }

    /// Returns a new template with the given variables appended.
    ///
    /// Variables whose name already appears in the template are skipped.
    pub fn with(&self, additional: impl IntoIterator<Item = TemplateVariable>) -> Self {
        let additional: TemplateVariables = additional
            .into_iter()
            .filter(|candidate| !self.variables.iter().any(|v| v.name() == candidate.name()))
            .collect();

        if additional.is_empty() {
            return self.clone();
        }

        let mut result = self.clone();
        result.source.push_str(&additional.render(self.has_query()));
        for variable in additional {
            result.parts.push(Part::Expression(vec![variable.clone()]));
            result.variables.push(variable);
        }
        result
    }

    /// The literal prefix up to the first template expression.
    pub fn base_uri(&self) -> &str {
        match self.parts.first() {
            Some(Part::Literal(literal)) => literal,
            _ => "",
        }
    }

    pub fn variables(&self) -> &TemplateVariables {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.names()
    }

    pub fn is_templated(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Whether the literal parts already carry a query string.
    fn has_query(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Literal(literal) if literal.contains('?')))
    }

    /// Expand the template against the given values.
    ///
    /// Optional variables without a value are dropped; a missing path variable
    /// fails with [`Error::MissingTemplateVariable`].
    pub fn expand<K, V>(&self, values: &HashMap<K, V>) -> Result<String>
    where
        K: Borrow<str> + Eq + Hash,
        V: fmt::Display,
    {
        self.expand_with(|name| values.get(name).map(|value| value.to_string()))
    }

    /// Expand the template, looking values up through `lookup`.
    pub fn expand_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(self.source.len());

        for part in &self.parts {
            match part {
                Part::Literal(literal) => result.push_str(literal),
                Part::Expression(variables) => {
                    for variable in variables {
                        expand_variable(&mut result, variable, lookup(variable.name()))?;
                    }
                }
            }
        }

        Ok(result)
    }
}

fn expand_variable(out: &mut String, variable: &TemplateVariable, value: Option<String>) -> Result<()> {
    let Some(value) = value else {
        if variable.is_required() {
            return Err(Error::MissingTemplateVariable(variable.name().to_string()));
        }
        return Ok(());
    };

    match variable.variable_type() {
        VariableType::PathVariable => out.push_str(&urlencoding::encode(&value)),
        VariableType::RequestParam | VariableType::RequestParamContinued => {
            out.push(if out.contains('?') { '&' } else { '?' });
            out.push_str(&urlencoding::encode(variable.name()));
            out.push('=');
            out.push_str(&urlencoding::encode(&value));
        }
        VariableType::Segment if variable.is_composite() => {
            for segment in value.split('/').filter(|s| !s.is_empty()) {
                out.push('/');
                out.push_str(&urlencoding::encode(segment));
            }
        }
        VariableType::Segment => {
            out.push('/');
            out.push_str(&urlencoding::encode(&value));
        }
        VariableType::Fragment => {
            out.push('#');
            out.push_str(&urlencoding::encode(&value));
        }
    }

    Ok(())
}

fn parse_expression(expression: &str, source: &str) -> Result<Vec<TemplateVariable>> {
    let (kind, names) = match expression.chars().next() {
        Some(c @ ('?' | '&' | '/' | '#')) => (
            VariableType::from_key(&c.to_string()).unwrap_or(VariableType::PathVariable),
            &expression[1..],
        ),
        _ => (VariableType::PathVariable, expression),
    };

    names
        .split(',')
        .map(|raw| {
            let (name, composite) = match raw.strip_suffix('*') {
                Some(name) => (name, true),
                None => (raw, false),
            };

            if !is_valid_variable_name(name) {
                return Err(Error::InvalidTemplate(format!(
                    "invalid variable name '{}' in {}",
                    raw, source
                )));
            }

            let variable = TemplateVariable::new(name, kind);
            Ok(if composite { variable.composite() } else { variable })
        })
        .collect()
}

/// Whether `name` can be used as a template variable name.
pub fn is_valid_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_variable_char)
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '%')
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for UriTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_values() -> HashMap<&'static str, &'static str> {
        HashMap::new()
    }

    #[test]
    fn test_parse_collects_variables_in_order() {
        let template = UriTemplate::parse("/people/{id}/addresses{?page,size}{#top}").unwrap();

        assert_eq!(template.variable_names(), vec!["id", "page", "size", "top"]);
        assert_eq!(template.base_uri(), "/people/");
        assert!(template.is_templated());
    }

    #[test]
    fn test_parse_rejects_unclosed_expression() {
        let err = UriTemplate::parse("/people/{id").unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate(_)));
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        assert!(UriTemplate::parse("/people/{}").is_err());
        assert!(UriTemplate::parse("/people{?page,}").is_err());
    }

    #[test]
    fn test_expand_path_variables() {
        let template = UriTemplate::parse("/region/{regionId}/person/{name}").unwrap();
        let uri = template
            .expand(&HashMap::from([("regionId", "region1"), ("name", "mike")]))
            .unwrap();

        assert_eq!(uri, "/region/region1/person/mike");
    }

    #[test]
    fn test_expand_encodes_values() {
        let template = UriTemplate::parse("/search{?q}").unwrap();
        let uri = template.expand(&HashMap::from([("q", "Spring#\n")])).unwrap();

        assert_eq!(uri, "/search?q=Spring%23%0A");
    }

    #[test]
    fn test_expand_missing_required_variable_fails() {
        let template = UriTemplate::parse("/people/{id}").unwrap();
        let err = template.expand(&no_values()).unwrap_err();

        assert_eq!(err, Error::MissingTemplateVariable("id".to_string()));
    }

    #[test]
    fn test_expand_drops_missing_optional_variables() {
        let template = UriTemplate::parse("/people{?page,size}").unwrap();

        assert_eq!(template.expand(&no_values()).unwrap(), "/people");
        assert_eq!(
            template.expand(&HashMap::from([("size", 10)])).unwrap(),
            "/people?size=10"
        );
    }

    #[test]
    fn test_expand_continues_existing_query() {
        let template = UriTemplate::parse("/people?sort=name{&page}").unwrap();
        let uri = template.expand(&HashMap::from([("page", 2)])).unwrap();

        assert_eq!(uri, "/people?sort=name&page=2");
    }

    #[test]
    fn test_expand_composite_segment() {
        let template = UriTemplate::parse("/files{/path*}").unwrap();

        assert_eq!(
            template.expand(&HashMap::from([("path", "a/b c")])).unwrap(),
            "/files/a/b%20c"
        );
        assert_eq!(template.expand(&no_values()).unwrap(), "/files");
    }

    #[test]
    fn test_with_appends_new_variables_only() {
        let template = UriTemplate::parse("/people{?page}").unwrap();
        let extended = template.with([
            TemplateVariable::request_parameter("page"),
            TemplateVariable::request_parameter("size"),
        ]);

        assert_eq!(extended.variable_names(), vec!["page", "size"]);
        assert_eq!(extended.to_string(), "/people{?page}{?size}");
    }

    #[test]
    fn test_with_continues_literal_query() {
        let template = UriTemplate::literal("/people?sort=name");
        let extended = template.with([TemplateVariable::request_parameter("page")]);

        assert_eq!(extended.to_string(), "/people?sort=name{&page}");
        assert_eq!(
            extended.expand(&HashMap::from([("page", 3)])).unwrap(),
            "/people?sort=name&page=3"
        );
    }

    #[test]
    fn test_literal_template() {
        let template = UriTemplate::literal("/people");

        assert!(!template.is_templated());
        assert_eq!(template.expand(&no_values()).unwrap(), "/people");
    }
}
