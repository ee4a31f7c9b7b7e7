//! Hash-fragment routing.
//!
//! Patterns are matched against the whole path (the part of the fragment before `?`):
//!
//! - `:name` captures one or more characters other than `/`. Names consist of ASCII letters, digits and `_`.
//! - `*` matches any (possibly empty) run of characters, including `/`, and isn't captured.
//! - Everything else, including a `:` that isn't followed by a name, matches literally.
//!
//! Captures are greedy and backtrack, so `/:a-:b` splits `/x-y-z` into `a = "x-y"` and `b = "z"`.

use crate::{ConfigurationError, Result};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::trace;

/// What a route handler is called with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
	/// The fragment's path, `/` if empty.
	pub path: String,
	/// Captured parameters. Empty for the default handler.
	pub params: HashMap<String, String>,
	/// The fragment's query string, decoded. The last occurrence of a key wins.
	pub query: HashMap<String, String>,
}

pub(crate) type Handler = Rc<dyn Fn(&RouteContext)>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
	Literal(String),
	Parameter,
	Wildcard,
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
	source: String,
	tokens: Vec<Token>,
	names: Vec<String>,
}

impl RoutePattern {
	/// # Errors
	///
	/// [`ConfigurationError::InvalidRoutePattern`] iff `pattern` is empty or uses a parameter name twice.
	pub fn compile(pattern: &str) -> Result<Self, ConfigurationError> {
		let invalid = |reason| ConfigurationError::InvalidRoutePattern {
			pattern: pattern.to_owned(),
			reason,
		};
		if pattern.is_empty() {
			return Err(invalid("empty pattern"));
		}

		let mut tokens = Vec::new();
		let mut names = Vec::new();
		let mut literal = String::new();
		let mut chars = pattern.chars().peekable();
		while let Some(c) = chars.next() {
			match c {
				':' => {
					let mut name = String::new();
					while let Some(&c) = chars.peek() {
						if !is_name_char(c) {
							break;
						}
						name.push(c);
						chars.next();
					}
					if name.is_empty() {
						literal.push(':');
						continue;
					}
					if names.contains(&name) {
						return Err(invalid("duplicate parameter name"));
					}
					flush_literal(&mut tokens, &mut literal);
					tokens.push(Token::Parameter);
					names.push(name);
				}
				'*' => {
					flush_literal(&mut tokens, &mut literal);
					tokens.push(Token::Wildcard);
				}
				c => literal.push(c),
			}
		}
		flush_literal(&mut tokens, &mut literal);

		Ok(Self {
			source: pattern.to_owned(),
			tokens,
			names,
		})
	}

	#[must_use]
	pub fn source(&self) -> &str {
		&self.source
	}

	/// The parameter names, in order of appearance.
	#[must_use]
	pub fn param_names(&self) -> &[String] {
		&self.names
	}

	/// Matches the whole of `path`, returning the captured parameters on success.
	#[must_use]
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		let mut captures = Vec::with_capacity(self.names.len());
		if !match_tokens(&self.tokens, path, &mut captures) {
			return None;
		}
		debug_assert_eq!(captures.len(), self.names.len());
		Some(self.names.iter().cloned().zip(captures.into_iter().map(ToOwned::to_owned)).collect())
	}
}

fn is_name_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut String) {
	if !literal.is_empty() {
		tokens.push(Token::Literal(core::mem::take(literal)));
	}
}

fn match_tokens<'a>(tokens: &[Token], path: &'a str, captures: &mut Vec<&'a str>) -> bool {
	let (token, rest) = match tokens.split_first() {
		Some(split) => split,
		None => return path.is_empty(),
	};
	match token {
		Token::Literal(literal) => path.strip_prefix(literal.as_str()).map_or(false, |path| match_tokens(rest, path, captures)),
		Token::Parameter => {
			let segment = &path[..path.find('/').unwrap_or_else(|| path.len())];
			let mut ends: Vec<usize> = segment.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
			while let Some(end) = ends.pop() {
				captures.push(&path[..end]);
				if match_tokens(rest, &path[end..], captures) {
					return true;
				}
				captures.pop();
			}
			false
		}
		Token::Wildcard => {
			let mut starts: Vec<usize> = path.char_indices().map(|(i, _)| i).collect();
			starts.push(path.len());
			starts.into_iter().rev().any(|start| match_tokens(rest, &path[start..], captures))
		}
	}
}

/// Splits a location fragment (with or without its leading `#`) into path and decoded query.
#[must_use]
pub fn parse_location(hash: &str) -> (String, HashMap<String, String>) {
	let fragment = hash.strip_prefix('#').unwrap_or(hash);
	let (path, query) = fragment.split_once('?').unwrap_or((fragment, ""));
	let path = if path.is_empty() { "/" } else { path };
	let query = url::form_urlencoded::parse(query.as_bytes()).into_owned().collect();
	(path.to_owned(), query)
}

struct RouteDefinition {
	pattern: RoutePattern,
	handler: Handler,
}

/// The route registry.
#[derive(Default)]
pub(crate) struct Router {
	initialized: bool,
	routes: Vec<RouteDefinition>,
	default: Option<Handler>,
}

impl Router {
	/// Returns `true` exactly once.
	pub(crate) fn mark_initialized(&mut self) -> bool {
		!core::mem::replace(&mut self.initialized, true)
	}

	/// Registering a pattern again replaces its handler but keeps its original position.
	pub(crate) fn register(&mut self, pattern: RoutePattern, handler: Handler) {
		match self.routes.iter_mut().find(|route| route.pattern.source == pattern.source) {
			Some(existing) => {
				trace!(pattern = %pattern.source, "Replacing route handler.");
				existing.handler = handler;
			}
			None => {
				trace!(pattern = %pattern.source, position = self.routes.len(), "Registering route.");
				self.routes.push(RouteDefinition { pattern, handler });
			}
		}
	}

	pub(crate) fn set_default(&mut self, handler: Handler) {
		self.default = Some(handler);
	}

	pub(crate) fn len(&self) -> usize {
		self.routes.len()
	}

	/// The first matching route's handler and parameters, otherwise the default handler with no parameters.
	pub(crate) fn resolve(&self, path: &str) -> Option<(Handler, HashMap<String, String>)> {
		self.routes
			.iter()
			.find_map(|route| route.pattern.matches(path).map(|params| (route.handler.clone(), params)))
			.or_else(|| self.default.clone().map(|handler| (handler, HashMap::new())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn params(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
		let mut params: Vec<_> = RoutePattern::compile(pattern).unwrap().matches(path)?.into_iter().collect();
		params.sort();
		Some(params)
	}

	fn pairs(pairs: &[(&str, &str)]) -> Option<Vec<(String, String)>> {
		Some(pairs.iter().map(|&(k, v)| (k.to_owned(), v.to_owned())).collect())
	}

	#[test]
	fn literal_patterns_are_anchored() {
		assert_eq!(params("/a/b", "/a/b"), pairs(&[]));
		assert_eq!(params("/a/b", "/a/b/c"), None);
		assert_eq!(params("/a/b", "/x/a/b"), None);
		assert_eq!(params("/a.b", "/aXb"), None);
	}

	#[test]
	fn parameters_capture_one_segment() {
		assert_eq!(params("/user/:id", "/user/42"), pairs(&[("id", "42")]));
		assert_eq!(params("/user/:id", "/user/42/edit"), None);
		assert_eq!(params("/user/:id", "/user/"), None);
		assert_eq!(params("/:a/:b", "/x/y"), pairs(&[("a", "x"), ("b", "y")]));
		assert_eq!(params("/file/:name.json", "/file/report.json"), pairs(&[("name", "report")]));
		assert_eq!(params("/:a-:b", "/x-y-z"), pairs(&[("a", "x-y"), ("b", "z")]));
		assert_eq!(params("/ü/:x", "/ü/ä"), pairs(&[("x", "ä")]));
	}

	#[test]
	fn wildcards_span_segments() {
		assert_eq!(params("/docs/*", "/docs/a/b/c"), pairs(&[]));
		assert_eq!(params("/docs/*", "/docs/"), pairs(&[]));
		assert_eq!(params("*", "/anything"), pairs(&[]));
		assert_eq!(params("/*/:last", "/a/b/c"), pairs(&[("last", "c")]));
	}

	#[test]
	fn lone_colon_is_literal() {
		assert_eq!(params("/a:/b", "/a:/b"), pairs(&[]));
		assert_eq!(RoutePattern::compile("/a:/b").unwrap().param_names(), &[] as &[String]);
	}

	#[test]
	fn invalid_patterns() {
		assert!(matches!(RoutePattern::compile(""), Err(ConfigurationError::InvalidRoutePattern { .. })));
		assert!(matches!(RoutePattern::compile("/:id/:id"), Err(ConfigurationError::InvalidRoutePattern { .. })));
	}

	#[test]
	fn location_parsing() {
		let (path, query) = parse_location("");
		assert_eq!(path, "/");
		assert!(query.is_empty());

		let (path, query) = parse_location("#/search?q=a+b&page=2&q=c%20d");
		assert_eq!(path, "/search");
		assert_eq!(query.get("q").map(String::as_str), Some("c d"));
		assert_eq!(query.get("page").map(String::as_str), Some("2"));

		let (path, query) = parse_location("#?x=1");
		assert_eq!(path, "/");
		assert_eq!(query.get("x").map(String::as_str), Some("1"));
	}

	#[test]
	fn registration_order_and_overwrite() {
		let mut router = Router::default();
		let calls = Rc::new(core::cell::RefCell::new(Vec::new()));
		let handler = |name: &'static str| -> Handler {
			let calls = calls.clone();
			Rc::new(move |_: &RouteContext| calls.borrow_mut().push(name))
		};
		router.register(RoutePattern::compile("/x").unwrap(), handler("first"));
		router.register(RoutePattern::compile("*").unwrap(), handler("second"));
		router.register(RoutePattern::compile("/x").unwrap(), handler("replaced"));
		assert_eq!(router.len(), 2);

		let (handler, _) = router.resolve("/x").unwrap();
		handler(&RouteContext::default());
		let (handler, _) = router.resolve("/y").unwrap();
		handler(&RouteContext::default());
		assert_eq!(*calls.borrow(), ["replaced", "second"]);
	}

	#[test]
	fn default_handler() {
		let mut router = Router::default();
		router.register(RoutePattern::compile("/x").unwrap(), Rc::new(|_: &RouteContext| ()));
		assert!(router.resolve("/y").is_none());
		router.set_default(Rc::new(|_: &RouteContext| ()));
		let (_, params) = router.resolve("/y").unwrap();
		assert!(params.is_empty());
	}

	#[test]
	fn initializes_once() {
		let mut router = Router::default();
		assert!(router.mark_initialized());
		assert!(!router.mark_initialized());
	}
}
