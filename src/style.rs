//! `class` and `style` conveniences. These go through [`Node::attrs`] like any other write.

use crate::{node::Node, platform::Platform, Result};

impl<P: Platform> Node<P> {
	#[must_use]
	pub fn has_class(&self, class: &str) -> bool {
		self.attrs().get("class").map_or(false, |classes| classes.split_ascii_whitespace().any(|c| c == class))
	}

	/// # Errors
	///
	/// Iff the platform rejects the write.
	pub fn add_class(&self, class: &str) -> Result<()> {
		if self.has_class(class) {
			return Ok(());
		}
		let classes = self.attrs().get("class").unwrap_or_default();
		let classes = classes.trim();
		if classes.is_empty() {
			self.attrs().set("class", class)
		} else {
			self.attrs().set("class", &format!("{} {}", classes, class))
		}
	}

	/// # Errors
	///
	/// Iff the platform rejects the write.
	pub fn remove_class(&self, class: &str) -> Result<()> {
		if !self.has_class(class) {
			return Ok(());
		}
		let classes = self.attrs().get("class").unwrap_or_default();
		let remaining: Vec<&str> = classes.split_ascii_whitespace().filter(|&c| c != class).collect();
		self.attrs().set("class", &remaining.join(" "))
	}

	/// Returns whether `class` is present afterwards.
	///
	/// # Errors
	///
	/// Iff the platform rejects the write.
	pub fn toggle_class(&self, class: &str) -> Result<bool> {
		if self.has_class(class) {
			self.remove_class(class).map(|()| false)
		} else {
			self.add_class(class).map(|()| true)
		}
	}

	/// The inline style declaration for `property`, if any.
	#[must_use]
	pub fn style(&self, property: &str) -> Option<String> {
		let style = self.attrs().get("style")?;
		parse_declarations(&style).into_iter().rev().find(|(p, _)| *p == property).map(|(_, value)| value.to_owned())
	}

	/// Sets the inline style declaration for `property`, or removes it if `value` is empty.
	///
	/// The `style` attribute is removed once no declarations remain.
	///
	/// # Errors
	///
	/// Iff the platform rejects the write.
	pub fn set_style(&self, property: &str, value: &str) -> Result<()> {
		let style = self.attrs().get("style").unwrap_or_default();
		let mut declarations: Vec<(&str, &str)> = parse_declarations(&style).into_iter().filter(|(p, _)| *p != property).collect();
		let value = value.trim();
		if !value.is_empty() {
			declarations.push((property, value));
		}
		if declarations.is_empty() {
			self.attrs().remove("style")
		} else {
			let serialized: Vec<String> = declarations.iter().map(|(p, v)| format!("{}: {};", p, v)).collect();
			self.attrs().set("style", &serialized.join(" "))
		}
	}
}

fn parse_declarations(style: &str) -> Vec<(&str, &str)> {
	style
		.split(';')
		.filter_map(|declaration| {
			let (property, value) = declaration.split_once(':')?;
			let (property, value) = (property.trim(), value.trim());
			(!property.is_empty() && !value.is_empty()).then(|| (property, value))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::parse_declarations;

	#[test]
	fn declarations() {
		assert!(parse_declarations("").is_empty());
		assert_eq!(parse_declarations("color: red; margin:0 ;;broken; :x"), [("color", "red"), ("margin", "0")]);
		assert_eq!(parse_declarations("background: url(a:b)"), [("background", "url(a:b)")]);
	}
}
