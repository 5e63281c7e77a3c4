pub mod trie;

use crate::context::Context;
use crate::error::{ServerError, ServerResult};
use crate::handler::{self, HandlerFunc};
use std::collections::HashMap;
use std::sync::Arc;
use trie::MethodTrees;

/// Outcome of a successful [`Router::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'r> {
    /// Registered pattern of the matched node; the key into the route table.
    pub pattern: &'r str,
    pub params: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct Router {
    roots: MethodTrees,
    /// method -> pattern -> handler
    handlers: HashMap<String, HashMap<String, HandlerFunc>>,
}

/// Splits a pattern or path into its non-empty segments, stopping after the
/// first catch-all.
pub fn split_pattern(pattern: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        segments.push(segment);
        if segment.starts_with('*') {
            break;
        }
    }
    segments
}

fn validate(method: &str, pattern: &str) -> ServerResult<()> {
    if !pattern.starts_with('/') {
        return Err(ServerError::InvalidPattern(pattern.to_owned()));
    }
    if method.is_empty() {
        return Err(ServerError::EmptyMethod);
    }
    let mut segments = pattern.split('/').filter(|s| !s.is_empty());
    if segments.by_ref().any(|s| s.starts_with('*')) && segments.next().is_some() {
        return Err(ServerError::CatchAllNotLast(pattern.to_owned()));
    }
    Ok(())
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(
        &mut self,
        method: &str,
        pattern: &str,
        handler: HandlerFunc,
    ) -> ServerResult<()> {
        validate(method, pattern)?;

        let segments = split_pattern(pattern);
        self.roots
            .get_or_create(method)
            .insert(pattern, &segments, 0);
        self.handlers
            .entry(method.to_owned())
            .or_default()
            .insert(pattern.to_owned(), handler);
        Ok(())
    }

    pub fn resolve(&self, method: &str, path: &str) -> Option<RouteMatch<'_>> {
        let search_segments = split_pattern(path);
        let root = self.roots.get(method)?;
        let node = root.search(&search_segments, 0)?;

        let mut params = HashMap::new();
        for (index, segment) in split_pattern(node.pattern()).into_iter().enumerate() {
            if let Some(name) = segment.strip_prefix(':') {
                if let Some(value) = search_segments.get(index) {
                    params.insert(name.to_owned(), (*value).to_owned());
                }
            } else if let Some(name) = segment.strip_prefix('*') {
                if !name.is_empty() {
                    let rest = search_segments.get(index..).unwrap_or_default();
                    params.insert(name.to_owned(), rest.join("/"));
                }
                break;
            }
        }

        Some(RouteMatch {
            pattern: node.pattern(),
            params,
        })
    }

    pub fn handler(&self, method: &str, pattern: &str) -> Option<&HandlerFunc> {
        self.handlers.get(method)?.get(pattern)
    }

    /// Registered `(method, pattern)` pairs, sorted.
    pub fn routes(&self) -> Vec<(&str, &str)> {
        let mut routes: Vec<(&str, &str)> = self
            .handlers
            .iter()
            .flat_map(|(method, patterns)| {
                patterns
                    .keys()
                    .map(move |pattern| (method.as_str(), pattern.as_str()))
            })
            .collect();
        routes.sort_unstable();
        routes
    }

    /// Puts the matched handler (or the not-found fallback) at the tail of the
    /// context's chain and runs the chain.
    pub(crate) fn handle(&self, ctx: &mut Context) {
        let resolved = self
            .resolve(ctx.method(), ctx.path())
            .and_then(|found| {
                let handler = self.handler(ctx.method(), found.pattern)?;
                Some((Arc::clone(handler), found.params))
            });

        match resolved {
            Some((handler, params)) => {
                ctx.set_params(params);
                ctx.push_handler(handler);
            }
            None => ctx.push_handler(handler::handler_func(handler::not_found)),
        }
        ctx.next();
    }
}
