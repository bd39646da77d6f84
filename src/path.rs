//! Endpoint path normalization against the single configured base URL.
//!
//! DESIGN
//! ======
//! Callers pass relative resource paths like `/admin/cashflow/overview`.
//! The [`ApiBase`] owns the origin and the API-root prefix, so anything a
//! caller smuggles in (an absolute backend URL, a repeated `/api` prefix,
//! doubled slashes) is stripped here before the request is built.

use std::fmt;

use reqwest::Url;

use crate::error::DispatchError;

// =============================================================================
// TYPES
// =============================================================================

/// A normalized relative path. Always starts with `/`, never carries a
/// scheme, host, API-root prefix, query, or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointPath(String);

impl EndpointPath {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configured backend base URL, split into origin and API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    origin: Url,
    root: Vec<String>,
}

// =============================================================================
// PARSING
// =============================================================================

impl ApiBase {
    /// Parse a base URL such as `https://crm.example.com/api`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] if the URL is not absolute
    /// `http`/`https`, has no host, or carries a query or fragment.
    pub fn parse(base_url: &str) -> Result<Self, DispatchError> {
        let trimmed = base_url.trim();
        let mut url =
            Url::parse(trimmed).map_err(|e| DispatchError::Config(format!("invalid base URL '{trimmed}': {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DispatchError::Config(format!("base URL must be http or https: {trimmed}")));
        }
        if url.host_str().is_none() {
            return Err(DispatchError::Config(format!("base URL has no host: {trimmed}")));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(DispatchError::Config(format!("base URL must not carry a query or fragment: {trimmed}")));
        }

        let root = url
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        url.set_path("/");

        Ok(Self { origin: url, root })
    }

    /// Origin without the API root, e.g. `https://crm.example.com/`.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// API root path, e.g. `/api`. Empty when the base URL has no path.
    #[must_use]
    pub fn root(&self) -> String {
        self.root.iter().fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(segment);
            acc
        })
    }

    // =========================================================================
    // NORMALIZATION
    // =========================================================================

    /// Normalize a caller-supplied path.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidPath`] for empty paths, paths with a
    /// query string or fragment, and paths with `.` or `..` segments. A
    /// backslash counts as a separator and `%2e` counts as a dot, matching
    /// how the URL parser reads them when the path is set.
    pub fn normalize(&self, raw: &str) -> Result<EndpointPath, DispatchError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DispatchError::InvalidPath("empty path".to_owned()));
        }

        let rest = strip_origin(trimmed);
        if rest.contains(['?', '#']) {
            return Err(DispatchError::InvalidPath(format!(
                "query strings and fragments are passed separately: {trimmed}"
            )));
        }

        let mut segments: Vec<&str> = rest.split(['/', '\\']).filter(|segment| !segment.is_empty()).collect();
        if let Some(bad) = segments.iter().find(|segment| is_dot_segment(segment)) {
            return Err(DispatchError::InvalidPath(format!("relative segment '{bad}' in {trimmed}")));
        }

        while !self.root.is_empty() && starts_with_root(&segments, &self.root) {
            segments.drain(..self.root.len());
        }

        Ok(EndpointPath(format!("/{}", segments.join("/"))))
    }

    /// Full request URL for an already-normalized path.
    #[must_use]
    pub fn resolve(&self, path: &EndpointPath) -> Url {
        let mut url = self.origin.clone();
        let root = self.root();
        if path.as_str() == "/" && !root.is_empty() {
            url.set_path(&root);
        } else {
            url.set_path(&format!("{root}{}", path.as_str()));
        }
        url
    }

    /// Normalize then resolve in one step.
    ///
    /// # Errors
    ///
    /// See [`ApiBase::normalize`].
    pub fn url_for(&self, raw: &str) -> Result<(EndpointPath, Url), DispatchError> {
        let path = self.normalize(raw)?;
        let url = self.resolve(&path);
        Ok((path, url))
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = self.origin.as_str().trim_end_matches('/');
        write!(f, "{origin}{}", self.root())
    }
}

/// Drop `scheme://authority` from an absolute URL, keeping the remainder.
fn strip_origin(raw: &str) -> &str {
    let has_scheme = |scheme: &str| raw.get(..scheme.len()).is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme));
    let scheme_len = if has_scheme("https://") {
        8
    } else if has_scheme("http://") {
        7
    } else {
        return raw;
    };

    let after = &raw[scheme_len..];
    match after.find(['/', '?', '#']) {
        Some(index) => &after[index..],
        None => "",
    }
}

/// `.` or `..` once `%2e` is decoded. The URL parser drops tab and newline
/// characters, so they are dropped here too.
fn is_dot_segment(segment: &str) -> bool {
    let decoded: String = segment
        .to_ascii_lowercase()
        .replace("%2e", ".")
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect();
    matches!(decoded.as_str(), "." | "..")
}

fn starts_with_root(segments: &[&str], root: &[String]) -> bool {
    segments.len() >= root.len() && segments.iter().zip(root).all(|(segment, root)| *segment == root.as_str())
}

#[cfg(test)]
#[path = "path_test.rs"]
mod tests;
