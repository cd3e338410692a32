//! Links and link builders.

use crate::affordance::Affordance;
use crate::template::{TemplateVariable, TemplateVariables, UriTemplate};
use crate::{Error, Result};
use serde::{Serialize, Serializer, ser::SerializeStruct};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

// ============================================================================
// Link Relation
// ============================================================================

/// The relation of a link to the resource that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkRelation(Cow<'static, str>);

impl LinkRelation {
    pub const SELF: LinkRelation = LinkRelation::iana("self");
    pub const NEXT: LinkRelation = LinkRelation::iana("next");
    pub const PREV: LinkRelation = LinkRelation::iana("prev");
    pub const FIRST: LinkRelation = LinkRelation::iana("first");
    pub const LAST: LinkRelation = LinkRelation::iana("last");
    pub const COLLECTION: LinkRelation = LinkRelation::iana("collection");
    pub const ITEM: LinkRelation = LinkRelation::iana("item");
    pub const EDIT: LinkRelation = LinkRelation::iana("edit");
    pub const RELATED: LinkRelation = LinkRelation::iana("related");

    const IANA: &'static [&'static str] = &[
        "self", "next", "prev", "first", "last", "collection", "item", "edit", "related",
    ];

    const fn iana(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn of(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the registered IANA relations above.
    pub fn is_iana(&self) -> bool {
        Self::IANA.iter().any(|rel| rel.eq_ignore_ascii_case(&self.0))
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LinkRelation {
    fn from(name: &str) -> Self {
        Self::of(name)
    }
}

impl From<String> for LinkRelation {
    fn from(name: String) -> Self {
        Self::of(name)
    }
}

impl Serialize for LinkRelation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// ============================================================================
// Link
// ============================================================================

/// A link: a (possibly templated) href, its relation and the operations it
/// affords.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    href: String,
    rel: LinkRelation,
    variables: TemplateVariables,
    affordances: Vec<Affordance>,
}

impl Link {
    /// A `self` link to `href`.
    ///
    /// Template expressions embedded in `href` (such as `{id}` left by an
    /// unbound path variable) become link variables. An href that is not a
    /// valid template is kept as a plain link; use [`Link::parse`] to reject it.
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        match UriTemplate::parse(&href) {
            Ok(template) => Self::with_template_variables(href, template.variables().clone()),
            Err(_) => Self::with_template_variables(href, TemplateVariables::none()),
        }
    }

    /// A `self` link to `href`, failing if `href` is not a valid template.
    pub fn parse(href: impl Into<String>) -> Result<Self> {
        let href = href.into();
        let variables = UriTemplate::parse(&href)?.variables().clone();
        Ok(Self::with_template_variables(href, variables))
    }

    fn with_template_variables(href: String, variables: TemplateVariables) -> Self {
        Self {
            href,
            rel: LinkRelation::SELF,
            variables,
            affordances: Vec::new(),
        }
    }

    pub fn of(href: impl Into<String>, rel: impl Into<LinkRelation>) -> Self {
        Self::new(href).with_rel(rel)
    }

    /// The concrete part of the link, without trailing optional variables.
    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn rel(&self) -> &LinkRelation {
        &self.rel
    }

    pub fn has_rel(&self, rel: &LinkRelation) -> bool {
        &self.rel == rel
    }

    /// All variables: those embedded in the href followed by the trailing
    /// optional ones.
    pub fn variables(&self) -> &TemplateVariables {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.names()
    }

    pub fn is_templated(&self) -> bool {
        !self.variables.is_empty()
    }

    pub fn affordances(&self) -> &[Affordance] {
        &self.affordances
    }

    pub fn with_rel(mut self, rel: impl Into<LinkRelation>) -> Self {
        self.rel = rel.into();
        self
    }

    pub fn with_self_rel(self) -> Self {
        self.with_rel(LinkRelation::SELF)
    }

    /// Append optional variables not yet present.
    pub fn with_variables(mut self, variables: impl IntoIterator<Item = TemplateVariable>) -> Self {
        for variable in variables {
            if !self.variables.iter().any(|v| v.name() == variable.name()) {
                self.variables.push(variable);
            }
        }
        self
    }

    pub fn with_affordances(mut self, affordances: impl IntoIterator<Item = Affordance>) -> Self {
        self.affordances.extend(affordances);
        self
    }

    /// Trailing variables not embedded in the href.
    fn trailing_variables(&self) -> TemplateVariables {
        let embedded = UriTemplate::parse(&self.href)
            .map(|t| t.variables().clone())
            .unwrap_or_default();

        self.variables
            .iter()
            .filter(|v| !embedded.iter().any(|e| e.name() == v.name()))
            .cloned()
            .collect()
    }

    /// The link's URI template: the href plus trailing optional variables.
    pub fn template(&self) -> Result<UriTemplate> {
        let template = UriTemplate::parse(&self.href)?;
        Ok(template.with(self.trailing_variables()))
    }

    /// Expand the template with the given values into a non-templated link.
    pub fn expand<K, V>(&self, values: &HashMap<K, V>) -> Result<Link>
    where
        K: Borrow<str> + Eq + Hash,
        V: fmt::Display,
    {
        let href = self.template()?.expand(values)?;
        Ok(self.with_href(href))
    }

    /// Expand with values looked up by name.
    pub fn expand_with<F>(&self, lookup: F) -> Result<Link>
    where
        F: Fn(&str) -> Option<String>,
    {
        let href = self.template()?.expand_with(lookup)?;
        Ok(self.with_href(href))
    }

    fn with_href(&self, href: String) -> Link {
        Link {
            href,
            rel: self.rel.clone(),
            variables: TemplateVariables::none(),
            affordances: self.affordances.clone(),
        }
    }

    /// Full template rendering, e.g. `/people{?page,size}`.
    pub fn to_template_string(&self) -> String {
        let trailing = self.trailing_variables();
        if trailing.is_empty() {
            return self.href.clone();
        }

        let has_query = self.href.contains('?');
        format!("{}{}", self.href, trailing.render(has_query))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>;rel=\"{}\"", self.to_template_string(), self.rel)
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let templated = self.is_templated();
        let mut state = serializer.serialize_struct("Link", if templated { 3 } else { 2 })?;
        state.serialize_field("rel", &self.rel)?;
        state.serialize_field("href", &self.to_template_string())?;
        if templated {
            state.serialize_field("templated", &true)?;
        }
        state.end()
    }
}

// ============================================================================
// Link Builder
// ============================================================================

/// The result of binding an invocation: a URI that can still be extended
/// before it becomes a [`Link`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkBuilder {
    uri: String,
    variables: TemplateVariables,
    affordances: Vec<Affordance>,
}

impl LinkBuilder {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            variables: TemplateVariables::none(),
            affordances: Vec::new(),
        }
    }

    pub(crate) fn with_parts(
        uri: String,
        variables: TemplateVariables,
        affordances: Vec<Affordance>,
    ) -> Self {
        Self {
            uri,
            variables,
            affordances,
        }
    }

    /// Append path segments.
    ///
    /// The value's `Display` rendering is split on `/`; every non-empty
    /// segment is percent-encoded and appended before any query string.
    pub fn slash(mut self, segment: impl fmt::Display) -> Self {
        let rendered = segment.to_string();
        let mut appended = String::new();
        for part in rendered.split('/').filter(|p| !p.is_empty()) {
            appended.push('/');
            appended.push_str(&urlencoding::encode(part));
        }

        if appended.is_empty() {
            return self;
        }

        let split = self.uri.find(['?', '#']).unwrap_or(self.uri.len());
        let (path, rest) = self.uri.split_at(split);
        let path = path.trim_end_matches('/');
        self.uri = format!("{}{}{}", path, appended, rest);
        self
    }

    /// The URI built so far, without trailing optional variables.
    pub fn to_uri_string(&self) -> String {
        self.uri.clone()
    }

    pub fn variables(&self) -> &TemplateVariables {
        &self.variables
    }

    pub fn affordances(&self) -> &[Affordance] {
        &self.affordances
    }

    pub fn with_rel(self, rel: impl Into<LinkRelation>) -> Link {
        Link::new(self.uri)
            .with_variables(self.variables)
            .with_affordances(self.affordances)
            .with_rel(rel)
    }

    pub fn with_self_rel(self) -> Link {
        self.with_rel(LinkRelation::SELF)
    }

    /// Expand right away, failing if a required variable is unbound.
    pub fn expand<K, V>(self, values: &HashMap<K, V>) -> Result<String>
    where
        K: Borrow<str> + Eq + Hash,
        V: fmt::Display,
    {
        self.with_self_rel()
            .expand(values)
            .map(|link| link.href)
    }

    /// The href as a [`http::Uri`].
    pub fn to_uri(&self) -> Result<http::Uri> {
        self.uri
            .parse()
            .map_err(|e: http::uri::InvalidUri| Error::InvalidTemplate(format!("{}: {}", self.uri, e)))
    }
}

impl fmt::Display for LinkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}
