//! Parsed URI mappings.
//!
//! A mapping is the raw template string declared on a handler, such as
//! `/region/{regionId}/person/{name}` or `/files/{*path}`. Ordinary variables
//! bind exactly one path segment (or one query parameter), catch-all variables
//! (`{*name}`) bind zero or more trailing segments.

use std::collections::HashMap;
use std::fmt;

const COMPOSITE_PREFIX: &str = "__composite-";
const COMPOSITE_SUFFIX: &str = "__";

/// A variable declared in a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingVariable {
    name: String,
    capturing: bool,
}

impl MappingVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capturing: false,
        }
    }

    pub fn capturing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capturing: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// The key the variable is substituted under in the stored mapping.
    pub fn key(&self) -> String {
        if self.capturing {
            format!("{}{}{}", COMPOSITE_PREFIX, self.name, COMPOSITE_SUFFIX)
        } else {
            self.name.clone()
        }
    }

    /// The substitution used when no argument supplied a value.
    pub fn absent_value(&self) -> VariableValue {
        if self.capturing {
            VariableValue::Expanded(String::new())
        } else {
            VariableValue::Skip
        }
    }
}

impl fmt::Display for MappingVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.capturing {
            write!(f, "{{*{}}}", self.name)
        } else {
            write!(f, "{{{}}}", self.name)
        }
    }
}

/// The value substituted for a mapping variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    /// Leave the variable in place, unexpanded.
    Skip,
    /// Substitute the given (already encoded) text.
    Expanded(String),
}

/// A parsed mapping: the (possibly rewritten) template string and its
/// variables in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriMapping {
    mapping: String,
    variables: Vec<MappingVariable>,
}

impl UriMapping {
    /// Parse a raw mapping.
    ///
    /// A catch-all token `/{*name}` is rewritten to `{__composite-name__}` so
    /// an absent value leaves no trailing slash behind.
    pub fn of(raw: &str) -> Self {
        let mut variables: Vec<MappingVariable> = Vec::new();

        for token in tokens(raw) {
            let variable = token.variable();
            if !variables.iter().any(|v| v.name == variable.name) {
                variables.push(variable);
            }
        }

        let mut mapping = raw.to_string();
        for variable in variables.iter().filter(|v| v.capturing) {
            let key = format!("{{{}}}", variable.key());
            let with_slash = format!("/{}", variable);
            mapping = if mapping.contains(&with_slash) {
                mapping.replace(&with_slash, &key)
            } else {
                mapping.replace(&variable.to_string(), &key)
            };
        }

        Self { mapping, variables }
    }

    pub fn mapping(&self) -> &str {
        &self.mapping
    }

    pub fn variables(&self) -> &[MappingVariable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&MappingVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn has_variables(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Substitute the given values, keyed by [`MappingVariable::key`].
    ///
    /// Variables without a value, or with [`VariableValue::Skip`], stay in the
    /// result as `{name}`.
    pub fn expand(&self, values: &HashMap<String, VariableValue>) -> String {
        let mut result = String::with_capacity(self.mapping.len());
        let mut last = 0;

        for token in tokens(&self.mapping) {
            result.push_str(&self.mapping[last..token.start]);
            last = token.end;

            let variable = self.lookup(token.name());
            let key = variable.map(|v| v.key()).unwrap_or_else(|| token.name().to_string());

            match values.get(&key) {
                Some(VariableValue::Expanded(value)) => result.push_str(value),
                _ => match variable {
                    Some(variable) if !variable.capturing => {
                        result.push('{');
                        result.push_str(variable.name());
                        result.push('}');
                    }
                    _ => result.push_str(&self.mapping[token.start..token.end]),
                },
            }
        }

        result.push_str(&self.mapping[last..]);
        result
    }

    fn lookup(&self, token_name: &str) -> Option<&MappingVariable> {
        self.variables.iter().find(|v| v.key() == token_name || v.name == token_name)
    }
}

impl fmt::Display for UriMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mapping)
    }
}

/// A `{…}` expression at brace depth zero.
struct Token<'a> {
    start: usize,
    end: usize,
    content: &'a str,
}

impl<'a> Token<'a> {
    /// Variable name without the catch-all marker or a regex constraint.
    fn name(&self) -> &'a str {
        let content = self.content.strip_prefix('*').unwrap_or(self.content);
        content.split(':').next().unwrap_or(content).trim()
    }

    fn variable(&self) -> MappingVariable {
        let name = self.name();
        if self.content.starts_with('*') {
            MappingVariable::capturing(name)
        } else if let Some(name) = name
            .strip_prefix(COMPOSITE_PREFIX)
            .and_then(|n| n.strip_suffix(COMPOSITE_SUFFIX))
        {
            MappingVariable::capturing(name)
        } else {
            MappingVariable::new(name)
        }
    }
}

fn tokens(source: &str) -> Vec<Token<'_>> {
    let mut result = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, c) in source.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = index;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let content = &source[start + 1..index];
                    if !content.is_empty() {
                        result.push(Token {
                            start,
                            end: index + 1,
                            content,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_variables_in_order() {
        let mapping = UriMapping::of("/region/{regionId}/person/{personName}");
        let names: Vec<_> = mapping.variables().iter().map(|v| v.name()).collect();

        assert_eq!(names, vec!["regionId", "personName"]);
        assert!(mapping.variables().iter().all(|v| !v.is_capturing()));
    }

    #[test]
    fn test_variable_names_are_unique() {
        let mapping = UriMapping::of("/{id}/copy/{id}");
        assert_eq!(mapping.variables().len(), 1);
    }

    #[test]
    fn test_rewrites_catch_all() {
        let mapping = UriMapping::of("/files/{*path}");

        assert_eq!(mapping.mapping(), "/files{__composite-path__}");
        assert!(mapping.variable("path").unwrap().is_capturing());
        assert_eq!(mapping.variable("path").unwrap().key(), "__composite-path__");
    }

    #[test]
    fn test_absent_values() {
        assert_eq!(
            MappingVariable::capturing("path").absent_value(),
            VariableValue::Expanded(String::new())
        );
        assert_eq!(MappingVariable::new("id").absent_value(), VariableValue::Skip);
    }

    #[test]
    fn test_expand_skips_ordinary_variables() {
        let mapping = UriMapping::of("/people/{id}/addresses/{type}");
        let values = HashMap::from([("type".to_string(), VariableValue::Expanded("home".to_string()))]);

        assert_eq!(mapping.expand(&values), "/people/{id}/addresses/home");
    }

    #[test]
    fn test_expand_catch_all() {
        let mapping = UriMapping::of("/files/{*path}");
        let absent = mapping.variable("path").unwrap().absent_value();

        let values = HashMap::from([("__composite-path__".to_string(), absent)]);
        assert_eq!(mapping.expand(&values), "/files");

        let values = HashMap::from([(
            "__composite-path__".to_string(),
            VariableValue::Expanded("/a/b".to_string()),
        )]);
        assert_eq!(mapping.expand(&values), "/files/a/b");
    }

    #[test]
    fn test_nested_braces_are_one_token() {
        let mapping = UriMapping::of("/items/{id:[0-9]{3}}");
        assert_eq!(mapping.variables(), &[MappingVariable::new("id")]);
    }

    #[test]
    fn test_reparsing_rewritten_mapping_keeps_catch_all() {
        let mapping = UriMapping::of("/files/{*path}");
        let reparsed = UriMapping::of(mapping.mapping());

        assert_eq!(reparsed.variables(), &[MappingVariable::capturing("path")]);
    }
}
