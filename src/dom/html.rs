//! A small HTML fragment parser and serializer for [`mem::Document`](`super::mem::Document`).
//!
//! This covers what template markup needs, not the full HTML tree construction algorithm:
//! there is no implied end tag handling, no foster parenting and no named character references
//! beyond the few that are common in templates.

use super::{
	mem::{Document, NodeId},
	Dom, Namespace, NodeType,
};
use std::borrow::Cow;

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is taken as text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Of [`RAW_TEXT_ELEMENTS`], the ones where character references are *not* decoded.
const UNESCAPED_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(super) fn is_void(local_name: &str) -> bool {
	VOID_ELEMENTS.contains(&local_name)
}

/// Parses `html` and appends the resulting nodes to `parent`.
pub(super) fn parse_fragment(document: &Document, html: &str, parent: NodeId) {
	let namespace = match document.node_type(&parent) {
		NodeType::Element => document.namespace(&parent),
		_ => Namespace::Html,
	};
	let mut parser = Parser {
		document,
		source: html,
		position: 0,
		open: vec![(parent, namespace)],
	};
	parser.run();
}

struct Parser<'a> {
	document: &'a Document,
	source: &'a str,
	position: usize,
	open: Vec<(NodeId, Namespace)>,
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.source[self.position..]
	}

	fn current(&self) -> (NodeId, Namespace) {
		// The context node is never popped.
		self.open[self.open.len() - 1]
	}

	fn run(&mut self) {
		while self.position < self.source.len() {
			let rest = self.rest();
			if let Some(after) = rest.strip_prefix("<!--") {
				let (data, consumed) = match after.find("-->") {
					Some(end) => (&after[..end], 4 + end + 3),
					None => (after, rest.len()),
				};
				self.append_comment(data);
				self.position += consumed;
			} else if rest.starts_with("<?") {
				// Processing instructions are bogus comments that keep the `?`.
				self.bogus_comment(1);
			} else if rest.starts_with("<!") {
				self.bogus_comment(2);
			} else if let Some(after) = rest.strip_prefix("</") {
				match after.bytes().next() {
					Some(b) if b.is_ascii_alphabetic() => self.end_tag(),
					Some(b'>') => self.position += 3,
					Some(_) => self.bogus_comment(2),
					None => {
						self.append_text("</");
						self.position += 2;
					}
				}
			} else if rest.starts_with('<') && rest.as_bytes().get(1).map_or(false, u8::is_ascii_alphabetic) {
				self.start_tag();
			} else {
				let first = rest.chars().next().map_or(1, char::len_utf8);
				let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
				self.append_text(&decode(&rest[..end]));
				self.position += end;
			}
		}
	}

	/// Reads a comment from `skip` bytes after the current `<` up to the next `>`.
	fn bogus_comment(&mut self, skip: usize) {
		let rest = self.rest();
		let (data, consumed) = match rest.find('>') {
			Some(end) => (&rest[skip..end], end + 1),
			None => (&rest[skip..], rest.len()),
		};
		self.append_comment(data);
		self.position += consumed;
	}

	fn append(&mut self, node: NodeId) {
		let (parent, _) = self.current();
		self.document.append_child(parent, node);
	}

	fn append_comment(&mut self, data: &str) {
		let comment = self.document.create_comment(data);
		self.append(comment);
	}

	fn append_text(&mut self, text: &str) {
		if text.is_empty() {
			return;
		}
		let (parent, _) = self.current();
		if let Some(last) = self.document.children(parent).last() {
			if self.document.node_type(last) == NodeType::Text {
				let mut data = self.document.node_value(last);
				data.push_str(text);
				return self.document.set_node_value(last, &data);
			}
		}
		let node = self.document.create_text(text);
		self.append(node);
	}

	fn skip_whitespace(&mut self) {
		let rest = self.rest();
		self.position += rest.len() - rest.trim_start_matches(is_html_whitespace).len();
	}

	fn take_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
		let rest = self.rest();
		let end = rest.find(stop).unwrap_or(rest.len());
		self.position += end;
		&rest[..end]
	}

	fn start_tag(&mut self) {
		self.position += 1;
		let raw_name = self.take_until(|c| is_html_whitespace(c) || c == '/' || c == '>');

		let (_, parent_namespace) = self.current();
		let namespace = if raw_name.eq_ignore_ascii_case("svg") {
			Namespace::Svg
		} else if raw_name.eq_ignore_ascii_case("math") {
			Namespace::MathMl
		} else {
			parent_namespace
		};
		let local_name = match namespace {
			Namespace::Html => raw_name.to_ascii_lowercase(),
			Namespace::Svg | Namespace::MathMl if raw_name.eq_ignore_ascii_case("svg") || raw_name.eq_ignore_ascii_case("math") => raw_name.to_ascii_lowercase(),
			Namespace::Svg | Namespace::MathMl => raw_name.to_owned(),
		};
		let element = self.document.create_element(&local_name, namespace);

		let mut self_closing = false;
		loop {
			self.skip_whitespace();
			let rest = self.rest();
			match rest.chars().next() {
				None => break,
				Some('>') => {
					self.position += 1;
					break;
				}
				Some('/') => {
					self.position += 1;
					self_closing = self.rest().starts_with('>');
					continue;
				}
				Some(_) => (),
			}
			self_closing = false;

			// A leading `=` is part of the name.
			let first = rest.chars().next().map_or(0, char::len_utf8);
			self.position += first;
			let tail = self.take_until(|c| is_html_whitespace(c) || c == '/' || c == '>' || c == '=');
			let name = &rest[..first + tail.len()];

			self.skip_whitespace();
			let value = if self.rest().starts_with('=') {
				self.position += 1;
				self.skip_whitespace();
				match self.rest().chars().next() {
					Some(quote @ ('"' | '\'')) => {
						self.position += 1;
						let value = self.take_until(|c| c == quote);
						self.position = (self.position + 1).min(self.source.len());
						decode(value)
					}
					_ => decode(self.take_until(|c| is_html_whitespace(c) || c == '>')),
				}
			} else {
				Cow::Borrowed("")
			};

			let name = match namespace {
				Namespace::Html => Cow::Owned(name.to_ascii_lowercase()),
				Namespace::Svg | Namespace::MathMl => Cow::Borrowed(name),
			};
			if self.document.attribute(&element, &name).is_none() {
				self.document.set_attribute(&element, &name, &value);
			}
		}

		self.append(element);
		match namespace {
			Namespace::Html if is_void(&local_name) => (),
			Namespace::Html if RAW_TEXT_ELEMENTS.contains(&local_name.as_str()) => self.raw_text(element, &local_name),
			Namespace::Svg | Namespace::MathMl if self_closing => (),
			_ => {
				let child_namespace = if namespace == Namespace::Svg && local_name == "foreignObject" {
					Namespace::Html
				} else {
					namespace
				};
				self.open.push((element, child_namespace));
			}
		}
	}

	fn raw_text(&mut self, element: NodeId, local_name: &str) {
		let rest = self.rest();
		let end = find_end_tag(rest, local_name);
		let text = &rest[..end];
		if !text.is_empty() {
			let text = if UNESCAPED_TEXT_ELEMENTS.contains(&local_name) { Cow::Borrowed(text) } else { decode(text) };
			let node = self.document.create_text(&text);
			self.document.append_child(element, node);
		}
		self.position += end;
		if self.position < self.source.len() {
			let rest = self.rest();
			self.position += rest.find('>').map_or(rest.len(), |i| i + 1);
		}
	}

	fn end_tag(&mut self) {
		self.position += 2;
		let name = self.take_until(|c| is_html_whitespace(c) || c == '/' || c == '>');
		let rest = self.rest();
		self.position += rest.find('>').map_or(rest.len(), |i| i + 1);

		if let Some(index) = self.open.iter().skip(1).rposition(|(node, _)| self.document.local_name(node).eq_ignore_ascii_case(name)) {
			self.open.truncate(index + 1);
		}
	}
}

/// Finds `</name` followed by whitespace, `/` or `>`, ignoring ASCII case.
pub(crate) fn find_end_tag(text: &str, name: &str) -> usize {
	let bytes = text.as_bytes();
	let mut i = 0;
	while let Some(offset) = text[i..].find("</") {
		let start = i + offset;
		let name_start = start + 2;
		let name_end = name_start + name.len();
		if name_end <= bytes.len()
			&& bytes[name_start..name_end].eq_ignore_ascii_case(name.as_bytes())
			&& bytes.get(name_end).map_or(true, |&b| b == b'/' || b == b'>' || is_html_whitespace(b as char))
		{
			return start;
		}
		i = start + 2;
	}
	text.len()
}

pub(crate) fn is_html_whitespace(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Decodes numeric and a handful of named character references.
pub(crate) fn decode(text: &str) -> Cow<'_, str> {
	if !text.contains('&') {
		return Cow::Borrowed(text);
	}

	let mut decoded = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(ampersand) = rest.find('&') {
		decoded.push_str(&rest[..ampersand]);
		rest = &rest[ampersand..];
		match rest.find(';').and_then(|semicolon| Some((reference(&rest[1..semicolon])?, semicolon))) {
			Some((c, semicolon)) => {
				decoded.push(c);
				rest = &rest[semicolon + 1..];
			}
			None => {
				decoded.push('&');
				rest = &rest[1..];
			}
		}
	}
	decoded.push_str(rest);
	Cow::Owned(decoded)
}

fn reference(name: &str) -> Option<char> {
	Some(match name {
		"amp" => '&',
		"lt" => '<',
		"gt" => '>',
		"quot" => '"',
		"apos" => '\'',
		"nbsp" => '\u{A0}',
		_ => {
			let number = name.strip_prefix('#')?;
			let code = match number.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse().ok()?,
			};
			return char::from_u32(code).or(Some(char::REPLACEMENT_CHARACTER));
		}
	})
}

pub(super) fn serialize(document: &Document, node: NodeId, out: &mut String) {
	match document.node_type(&node) {
		NodeType::Element => {
			let local_name = document.local_name(&node);
			out.push('<');
			out.push_str(&local_name);
			for name in document.attribute_names(&node) {
				out.push(' ');
				out.push_str(&name);
				out.push_str("=\"");
				escape(&document.attribute(&node, &name).unwrap_or_default(), true, out);
				out.push('"');
			}
			out.push('>');
			if document.namespace(&node) == Namespace::Html && is_void(&local_name) {
				return;
			}
			let raw = document.namespace(&node) == Namespace::Html && UNESCAPED_TEXT_ELEMENTS.contains(&local_name.as_str());
			for child in document.children(node) {
				if raw && document.node_type(&child) == NodeType::Text {
					out.push_str(&document.node_value(&child));
				} else {
					serialize(document, child, out);
				}
			}
			out.push_str("</");
			out.push_str(&local_name);
			out.push('>');
		}
		NodeType::Text => escape(&document.node_value(&node), false, out),
		NodeType::Comment => {
			out.push_str("<!--");
			out.push_str(&document.node_value(&node));
			out.push_str("-->");
		}
		NodeType::Fragment | NodeType::Document => {
			for child in document.children(node) {
				serialize(document, child, out);
			}
		}
	}
}

fn escape(text: &str, attribute: bool, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'\u{A0}' => out.push_str("&nbsp;"),
			'"' if attribute => out.push_str("&quot;"),
			'<' if !attribute => out.push_str("&lt;"),
			'>' if !attribute => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn round_trip(html: &str) -> String {
		let document = Document::new();
		let fragment = document.create_fragment();
		parse_fragment(&document, html, fragment);
		document.inner_html(fragment)
	}

	#[test]
	fn elements_and_attributes() {
		assert_eq!(round_trip(r#"<DIV Class="a" id=b hidden><p>x</p></div>"#), r#"<div class="a" id="b" hidden=""><p>x</p></div>"#);
	}

	#[test]
	fn first_duplicate_attribute_wins() {
		assert_eq!(round_trip(r#"<a x="1" x="2"></a>"#), r#"<a x="1"></a>"#);
	}

	#[test]
	fn comments_and_bogus_comments() {
		assert_eq!(round_trip("<!-- a --><?pi><!doctype html></ 1>"), "<!-- a --><!--?pi--><!--doctype html--><!-- 1-->");
	}

	#[test]
	fn raw_text_elements() {
		assert_eq!(round_trip("<script>a < b && </p></script>"), "<script>a < b && </p></script>");
		assert_eq!(round_trip("<textarea><b>&amp;</textarea>"), "<textarea>&lt;b&gt;&amp;</textarea>");
		assert_eq!(round_trip("<title>x</TITLE >y"), "<title>x</title>y");
	}

	#[test]
	fn void_and_svg_elements() {
		assert_eq!(round_trip("<br><input value=1>x"), r#"<br><input value="1">x"#);
		let document = Document::new();
		let fragment = document.create_fragment();
		parse_fragment(&document, r#"<svg viewBox="0 0 1 1"><circle r="1"/><foreignObject/></svg>"#, fragment);
		let svg = document.children(fragment)[0];
		assert_eq!(document.namespace(&svg), Namespace::Svg);
		assert_eq!(document.attribute_names(&svg), ["viewBox"]);
		let children = document.children(svg);
		assert_eq!(children.len(), 2);
		assert_eq!(document.local_name(&children[1]), "foreignObject");
	}

	#[test]
	fn character_references() {
		assert_eq!(decode("a&lt;b&#62;&#x41;&bogus;&"), "a<b>A&bogus;&");
		assert_eq!(round_trip("1 < 2"), "1 &lt; 2");
	}

	#[test]
	fn unmatched_end_tags_are_ignored() {
		assert_eq!(round_trip("<b>x</i>y</b>z"), "<b>xy</b>z");
	}
}
