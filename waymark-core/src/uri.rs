// Base URI prepended to built links

use crate::{Error, Result};
use http::Uri;
use std::fmt;

/// Scheme, authority and context path every link is resolved against.
///
/// The default base is empty, producing links relative to the server root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUri {
    scheme: Option<String>,
    authority: Option<String>,
    context_path: String,
}

impl BaseUri {
    /// Links relative to the server root (`/people/1`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a base such as `http://localhost:8080/api`.
    ///
    /// Query and fragment are ignored, a trailing slash is dropped.
    pub fn parse(base: &str) -> Result<Self> {
        let uri: Uri = base
            .parse()
            .map_err(|e: http::uri::InvalidUri| Error::InvalidBaseUri(format!("{}: {}", base, e)))?;

        if uri.scheme().is_some() != uri.authority().is_some() {
            return Err(Error::InvalidBaseUri(format!(
                "{}: scheme and host must be given together",
                base
            )));
        }

        Ok(Self {
            scheme: uri.scheme_str().map(str::to_string),
            authority: uri.authority().map(|a| a.as_str().to_string()),
            context_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Resolve an expanded mapping path against this base.
    pub fn resolve(&self, path: &str) -> String {
        let mut result = self.to_string();

        if !path.is_empty() && !path.starts_with(['/', '?', '#']) {
            result.push('/');
        }
        result.push_str(path);

        if result.is_empty() || (!self.is_absolute() && !result.starts_with('/')) {
            result.insert(0, '/');
        }

        result
    }
}

impl fmt::Display for BaseUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(scheme), Some(authority)) = (&self.scheme, &self.authority) {
            write!(f, "{}://{}", scheme, authority)?;
        }
        f.write_str(&self.context_path)
    }
}

impl std::str::FromStr for BaseUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
