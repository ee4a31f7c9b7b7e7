//! The selector subset understood by [`MemoryPlatform`](`super::MemoryPlatform`):
//! type and universal selectors, `#id`, `.class`, `[attr]`, `[attr=value]` (also `~=`, `^=`, `$=` and `*=`),
//! descendant and child combinators and comma-separated groups.
//!
//! Everything else is reported as [`Error::SelectorSyntax`], including valid CSS this subset doesn't support.

use super::document::Document;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOperator {
	Equals,
	Includes,
	Prefix,
	Suffix,
	Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeCondition {
	name: String,
	value: Option<(AttributeOperator, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
	/// Lowercase. [`None`] for `*` or when omitted.
	tag: Option<String>,
	ids: Vec<String>,
	classes: Vec<String>,
	attributes: Vec<AttributeCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
	/// Relation to the part on the left. [`None`] only for the first part.
	combinator: Option<Combinator>,
	compound: Compound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SelectorList(Vec<Vec<Part>>);

impl SelectorList {
	pub(super) fn parse(selector: &str) -> Result<Self> {
		Parser {
			source: selector,
			chars: selector.chars().collect(),
			pos: 0,
		}
		.parse_list()
	}

	pub(super) fn matches(&self, document: &Document, element: usize) -> bool {
		self.0.iter().any(|parts| matches_from(document, parts, parts.len() - 1, element))
	}
}

fn matches_from(document: &Document, parts: &[Part], index: usize, element: usize) -> bool {
	let part = &parts[index];
	if !part.compound.matches(document, element) {
		return false;
	}
	if index == 0 {
		return true;
	}
	match part.combinator {
		Some(Combinator::Child) => document.parent_element(element).map_or(false, |parent| matches_from(document, parts, index - 1, parent)),
		Some(Combinator::Descendant) | None => {
			let mut ancestor = document.parent_element(element);
			while let Some(current) = ancestor {
				if matches_from(document, parts, index - 1, current) {
					return true;
				}
				ancestor = document.parent_element(current);
			}
			false
		}
	}
}

impl Compound {
	fn matches(&self, document: &Document, element: usize) -> bool {
		let tag = match document.tag(element) {
			Some(tag) => tag,
			None => return false,
		};
		if self.tag.as_deref().map_or(false, |expected| expected != tag) {
			return false;
		}
		if !self.ids.iter().all(|id| document.attribute(element, "id") == Some(id.as_str())) {
			return false;
		}
		let classes = document.attribute(element, "class").unwrap_or_default();
		if !self.classes.iter().all(|class| classes.split_ascii_whitespace().any(|c| c == class)) {
			return false;
		}
		self.attributes.iter().all(|condition| {
			document.attribute(element, &condition.name).map_or(false, |actual| match &condition.value {
				None => true,
				Some((AttributeOperator::Equals, expected)) => actual == expected,
				Some((AttributeOperator::Includes, expected)) => actual.split_ascii_whitespace().any(|word| word == expected),
				Some((AttributeOperator::Prefix, expected)) => !expected.is_empty() && actual.starts_with(expected.as_str()),
				Some((AttributeOperator::Suffix, expected)) => !expected.is_empty() && actual.ends_with(expected.as_str()),
				Some((AttributeOperator::Substring, expected)) => !expected.is_empty() && actual.contains(expected.as_str()),
			})
		})
	}
}

struct Parser<'a> {
	source: &'a str,
	chars: Vec<char>,
	pos: usize,
}

impl Parser<'_> {
	fn error(&self, reason: impl Into<String>) -> Error {
		Error::selector_syntax(self.source, reason)
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn eat(&mut self, c: char) -> bool {
		if self.peek() == Some(c) {
			self.pos += 1;
			true
		} else {
			false
		}
	}

	/// Returns whether any whitespace was skipped.
	fn skip_whitespace(&mut self) -> bool {
		let start = self.pos;
		while self.peek().map_or(false, char::is_whitespace) {
			self.pos += 1;
		}
		self.pos != start
	}

	fn parse_list(&mut self) -> Result<SelectorList> {
		let mut groups = Vec::new();
		loop {
			self.skip_whitespace();
			groups.push(self.parse_chain()?);
			match self.peek() {
				None => break,
				Some(',') => self.pos += 1,
				Some(c) => return Err(self.error(format!("unexpected {:?} at {}", c, self.pos))),
			}
		}
		Ok(SelectorList(groups))
	}

	fn parse_chain(&mut self) -> Result<Vec<Part>> {
		let mut parts = vec![Part {
			combinator: None,
			compound: self.parse_compound()?,
		}];
		loop {
			let had_whitespace = self.skip_whitespace();
			let combinator = match self.peek() {
				None | Some(',') => break,
				Some('>') => {
					self.pos += 1;
					self.skip_whitespace();
					Combinator::Child
				}
				Some(c @ ('+' | '~')) => return Err(self.error(format!("unsupported combinator {:?}", c))),
				Some(_) if had_whitespace => Combinator::Descendant,
				Some(c) => return Err(self.error(format!("unexpected {:?} at {}", c, self.pos))),
			};
			parts.push(Part {
				combinator: Some(combinator),
				compound: self.parse_compound()?,
			});
		}
		Ok(parts)
	}

	fn parse_compound(&mut self) -> Result<Compound> {
		let start = self.pos;
		let mut compound = Compound::default();
		if !self.eat('*') && self.peek().map_or(false, is_ident_start) {
			compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
		}
		loop {
			match self.peek() {
				Some('#') => {
					self.pos += 1;
					compound.ids.push(self.parse_ident()?);
				}
				Some('.') => {
					self.pos += 1;
					compound.classes.push(self.parse_ident()?);
				}
				Some('[') => {
					self.pos += 1;
					compound.attributes.push(self.parse_attribute()?);
				}
				Some(':') => return Err(self.error("pseudo-classes are not supported")),
				_ => break,
			}
		}
		if self.pos == start {
			return Err(match self.peek() {
				Some(c) => self.error(format!("expected a selector but found {:?} at {}", c, self.pos)),
				None => self.error("expected a selector"),
			});
		}
		Ok(compound)
	}

	fn parse_ident(&mut self) -> Result<String> {
		if !self.peek().map_or(false, is_ident_start) {
			return Err(self.error(format!("expected an identifier at {}", self.pos)));
		}
		let start = self.pos;
		while self.peek().map_or(false, is_ident_char) {
			self.pos += 1;
		}
		Ok(self.chars[start..self.pos].iter().collect())
	}

	fn parse_attribute(&mut self) -> Result<AttributeCondition> {
		self.skip_whitespace();
		let name = self.parse_ident()?;
		self.skip_whitespace();
		let operator = match self.peek() {
			Some(']') => {
				self.pos += 1;
				return Ok(AttributeCondition { name, value: None });
			}
			Some('=') => {
				self.pos += 1;
				AttributeOperator::Equals
			}
			Some(c @ ('~' | '^' | '$' | '*')) => {
				self.pos += 1;
				if !self.eat('=') {
					return Err(self.error(format!("expected '=' after {:?}", c)));
				}
				match c {
					'~' => AttributeOperator::Includes,
					'^' => AttributeOperator::Prefix,
					'$' => AttributeOperator::Suffix,
					_ => AttributeOperator::Substring,
				}
			}
			_ => return Err(self.error(format!("malformed attribute selector at {}", self.pos))),
		};
		self.skip_whitespace();
		let value = match self.peek() {
			Some(quote @ ('"' | '\'')) => {
				self.pos += 1;
				let start = self.pos;
				while self.peek().map_or(false, |c| c != quote) {
					self.pos += 1;
				}
				if !self.eat(quote) {
					return Err(self.error("unterminated string"));
				}
				self.chars[start..self.pos - 1].iter().collect()
			}
			_ => self.parse_ident()?,
		};
		self.skip_whitespace();
		if !self.eat(']') {
			return Err(self.error("expected ']'"));
		}
		Ok(AttributeCondition {
			name,
			value: Some((operator, value)),
		})
	}
}

fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
	is_ident_start(c) || c.is_ascii_digit()
}
