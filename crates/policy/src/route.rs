//! Route dispatch table.
//!
//! Maps `(method, path pattern)` to a [`SensitivityClass`] and an
//! application-defined endpoint descriptor. The table is assembled once at
//! startup and is read-only afterwards. Registration rejects any route that
//! could match a request another route already matches, so [`RouteTable::resolve`]
//! never has to choose between two entries.

use crate::{Error, Result, SensitivityClass};
use std::fmt;
use std::str::FromStr;

/// HTTP methods the table routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A path such as `/api/users/:id/block`. `:name` segments bind one
/// non-empty path segment each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        let Some(rest) = raw.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };

        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                if part.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                match part.strip_prefix(':') {
                    Some("") => return Err(invalid("placeholder without a name")),
                    Some(name) => {
                        let repeated = segments
                            .iter()
                            .any(|s| matches!(s, Segment::Param(n) if n == name));
                        if repeated {
                            return Err(invalid(&format!("placeholder ':{name}' repeated")));
                        }
                        segments.push(Segment::Param(name.to_string()));
                    }
                    None => segments.push(Segment::Literal(part.to_string())),
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a concrete path, binding placeholders by position.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.0.push((name.clone(), part.to_string())),
            }
        }
        Some(params)
    }

    /// True if some concrete path matches both patterns.
    fn overlaps(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Placeholder bindings from a resolved path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One registered route.
#[derive(Debug, Clone)]
pub struct Route<E> {
    pub method: Method,
    pub pattern: PathPattern,
    pub class: SensitivityClass,
    pub endpoint: E,
}

/// A route matched against a concrete request.
#[derive(Debug)]
pub struct Resolved<'a, E> {
    pub route: &'a Route<E>,
    pub params: Params,
}

/// Read-only route table.
#[derive(Debug, Clone)]
pub struct RouteTable<E> {
    routes: Vec<Route<E>>,
}

impl<E> RouteTable<E> {
    pub fn builder() -> RouteTableBuilder<E> {
        RouteTableBuilder { routes: Vec::new() }
    }

    /// Find the route for a concrete request path (no query string).
    pub fn resolve(&self, method: Method, path: &str) -> Option<Resolved<'_, E>> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| Resolved { route, params })
            })
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route<E>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Collects routes, rejecting conflicts as they are added.
#[derive(Debug)]
pub struct RouteTableBuilder<E> {
    routes: Vec<Route<E>>,
}

impl<E> RouteTableBuilder<E> {
    pub fn route(
        mut self,
        method: Method,
        pattern: &str,
        class: SensitivityClass,
        endpoint: E,
    ) -> Result<Self> {
        let pattern = PathPattern::parse(pattern)?;

        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.pattern.overlaps(&pattern))
        {
            return Err(Error::ConflictingRoute {
                method,
                pattern: pattern.raw,
                existing: existing.pattern.raw.clone(),
            });
        }

        self.routes.push(Route {
            method,
            pattern,
            class,
            endpoint,
        });
        Ok(self)
    }

    pub fn build(self) -> RouteTable<E> {
        RouteTable {
            routes: self.routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable<&'static str> {
        RouteTable::builder()
            .route(Method::Get, "/api/items", SensitivityClass::StandardGated, "list")
            .unwrap()
            .route(Method::Post, "/api/items", SensitivityClass::StandardGated, "create")
            .unwrap()
            .route(Method::Delete, "/api/items/:id", SensitivityClass::StandardGated, "delete")
            .unwrap()
            .route(
                Method::Patch,
                "/api/admin/users/:id/block",
                SensitivityClass::AdminOnly,
                "toggle",
            )
            .unwrap()
            .route(Method::Get, "/", SensitivityClass::Public, "root")
            .unwrap()
            .build()
    }

    #[test]
    fn test_resolve_by_method_and_path() {
        let table = table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.resolve(Method::Get, "/api/items").unwrap().route.endpoint, "list");
        assert_eq!(table.resolve(Method::Post, "/api/items").unwrap().route.endpoint, "create");
        assert!(table.resolve(Method::Put, "/api/items").is_none());
        assert!(table.resolve(Method::Get, "/api/other").is_none());
        assert_eq!(table.resolve(Method::Get, "/").unwrap().route.endpoint, "root");
    }

    #[test]
    fn test_resolve_binds_placeholders() {
        let table = table();
        let resolved = table.resolve(Method::Delete, "/api/items/42").unwrap();
        assert_eq!(resolved.route.endpoint, "delete");
        assert_eq!(resolved.params.get("id"), Some("42"));

        let resolved = table
            .resolve(Method::Patch, "/api/admin/users/7/block")
            .unwrap();
        assert_eq!(resolved.route.class, SensitivityClass::AdminOnly);
        assert_eq!(resolved.params.iter().collect::<Vec<_>>(), vec![("id", "7")]);
    }

    #[test]
    fn test_placeholder_requires_segment() {
        let table = table();
        assert!(table.resolve(Method::Delete, "/api/items/").is_none());
        assert!(table.resolve(Method::Delete, "/api/items").is_none());
        assert!(table.resolve(Method::Delete, "/api/items/1/extra").is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let err = RouteTable::builder()
            .route(Method::Get, "/api/items", SensitivityClass::Public, ())
            .unwrap()
            .route(Method::Get, "/api/items", SensitivityClass::AdminOnly, ())
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingRoute { .. }));
    }

    #[test]
    fn test_overlapping_placeholder_fails() {
        let err = RouteTable::builder()
            .route(Method::Get, "/api/users/:id", SensitivityClass::AdminOnly, ())
            .unwrap()
            .route(Method::Get, "/api/users/me", SensitivityClass::Public, ())
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingRoute { .. }));
    }

    #[test]
    fn test_same_pattern_different_method_is_fine() {
        let table = RouteTable::builder()
            .route(Method::Get, "/api/users/:id", SensitivityClass::AdminOnly, ())
            .unwrap()
            .route(Method::Delete, "/api/users/:id", SensitivityClass::AdminOnly, ())
            .unwrap()
            .build();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_patterns() {
        for raw in ["api/items", "/api//items", "/api/:", "/api/:id/x/:id", "/api/items/"] {
            assert!(
                matches!(PathPattern::parse(raw), Err(Error::InvalidPattern { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!(matches!(
            "OPTIONS".parse::<Method>(),
            Err(Error::UnsupportedMethod(_))
        ));
    }
}
