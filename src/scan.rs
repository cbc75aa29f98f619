//! Joins the static fragments of a template literal into one HTML string, with markers at each binding.
//!
//! The scanner is a state machine over five states. It only needs to know enough about HTML to tell
//! whether a binding sits in text, in an attribute value, inside a tag or inside a comment.

use crate::{template::ResultKind, Error};
use core::hash::{BuildHasher, Hasher};
use std::{collections::hash_map::RandomState, rc::Rc};
use tracing::{instrument, trace};

/// Appended to the names of attributes with bindings.
pub(crate) const BOUND_ATTRIBUTE_SUFFIX: &str = "$lit$";

thread_local! {
	static MARKER: Rc<str> = {
		let random = RandomState::new().build_hasher().finish() % 1_000_000_000;
		format!("lit${:09}$", random).into()
	};
}

/// The per-thread marker token, `lit$` followed by nine random digits and `$`.
pub(crate) fn marker() -> Rc<str> {
	MARKER.with(Rc::clone)
}

/// Parses as a bogus comment whose data is `?` + marker.
pub(crate) fn node_marker(marker: &str) -> String {
	format!("<?{}>", marker)
}

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
	/// Character data. With a pending raw text end tag, only that end tag is recognized.
	Text,
	/// Between a tag name and the closing `>`.
	Tag,
	DoubleQuoted,
	SingleQuoted,
	/// Until the terminator, which is `-->` for proper comments and `>` for bogus ones.
	Comment(&'static str),
}

/// Where the preceding binding sits relative to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributePosition {
	None,
	/// In element position, as in `<div ${x}>`.
	Element,
	/// Bound attribute whose name ends at this byte offset.
	NameEnd(usize),
}

#[derive(Debug)]
pub(crate) struct ScannedHtml {
	pub html: String,
	/// One entry per attribute or element binding, in binding order.
	/// Element bindings have no name.
	pub attr_names: Vec<Option<String>>,
}

struct Scanner<'a> {
	state: State,
	raw_text_end: Option<&'a str>,
	attribute: AttributePosition,
	attribute_name: &'a str,
}

/// Builds the HTML for `strings`, with the given `marker` at every boundary between two fragments.
#[instrument(skip(strings, marker))]
pub(crate) fn scan(strings: &[&str], kind: ResultKind, marker: &str) -> Result<ScannedHtml, Error> {
	let last = strings.len().saturating_sub(1);
	let mut attr_names = Vec::new();
	let mut html = String::new();
	if kind == ResultKind::Svg {
		html.push_str("<svg>");
	}

	let mut scanner = Scanner {
		state: State::Text,
		raw_text_end: None,
		attribute: AttributePosition::None,
		attribute_name: "",
	};
	for (i, s) in strings.iter().copied().enumerate().take(last) {
		scanner.attribute = AttributePosition::None;
		scanner.scan_fragment(s, i)?;

		let end = if scanner.state == State::Tag && strings[i + 1].starts_with("/>") { " " } else { "" };
		if scanner.state == State::Text && scanner.raw_text_end.is_none() {
			html.push_str(s);
			html.push_str(&node_marker(marker));
		} else if let AttributePosition::NameEnd(name_end) = scanner.attribute {
			attr_names.push(Some(scanner.attribute_name.to_owned()));
			html.push_str(&s[..name_end]);
			html.push_str(BOUND_ATTRIBUTE_SUFFIX);
			html.push_str(&s[name_end..]);
			html.push_str(marker);
			html.push_str(end);
		} else {
			html.push_str(s);
			html.push_str(marker);
			if scanner.attribute == AttributePosition::Element {
				attr_names.push(None);
				html.push_str(&i.to_string());
			} else {
				html.push_str(end);
			}
		}
		trace!(fragment = i, state = ?scanner.state, "Inserted marker.");
	}

	match strings.get(last) {
		Some(s) if !s.is_empty() => html.push_str(s),
		_ => html.push_str("<?>"),
	}
	if kind == ResultKind::Svg {
		html.push_str("</svg>");
	}
	Ok(ScannedHtml { html, attr_names })
}

impl<'a> Scanner<'a> {
	/// Runs the state machine over one fragment.
	fn scan_fragment(&mut self, s: &'a str, fragment: usize) -> Result<(), Error> {
		let mut index = 0;
		while index < s.len() {
			let next = match self.state {
				State::Text => match self.raw_text_end {
					Some(name) => self.raw_text(s, index, name),
					None => self.text(s, index, fragment)?,
				},
				State::Tag => self.tag(s, index),
				State::DoubleQuoted => s[index..].find('"').map(|i| {
					self.state = State::Tag;
					index + i + 1
				}),
				State::SingleQuoted => s[index..].find('\'').map(|i| {
					self.state = State::Tag;
					index + i + 1
				}),
				State::Comment(terminator) => s[index..].find(terminator).map(|i| {
					self.state = State::Text;
					index + i + terminator.len()
				}),
			};
			match next {
				Some(next) => index = next,
				None => break,
			}
		}
		Ok(())
	}

	fn text(&mut self, s: &'a str, from: usize, fragment: usize) -> Result<Option<usize>, Error> {
		let mut search = from;
		while let Some(offset) = s[search..].find('<') {
			let open = search + offset;
			let after = &s[open + 1..];
			if after.starts_with("!--") {
				self.state = State::Comment("-->");
				return Ok(Some(open + 4));
			}
			let mut chars = after.chars();
			match (chars.next(), chars.next()) {
				(Some('/'), Some(c)) if !c.is_ascii_alphabetic() => {
					self.state = State::Comment(">");
					return Ok(Some(open + 2 + c.len_utf8()));
				}
				(None, _) | (Some('/'), None) => return Err(Error::DynamicTagName { fragment }),
				_ => (),
			}
			let name_start = usize::from(after.starts_with('/'));
			if after[name_start..].starts_with(|c: char| c.is_ascii_alphabetic()) {
				let name_len = after[name_start..].find(|c: char| c == '>' || c.is_whitespace()).unwrap_or(after.len() - name_start);
				let name = &after[..name_start + name_len];
				if name_start == 0 {
					self.raw_text_end = RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(name)).then_some(name);
				}
				self.state = State::Tag;
				return Ok(Some(open + 1 + name.len()));
			}
			search = open + 1;
		}
		Ok(None)
	}

	fn raw_text(&mut self, s: &str, from: usize, name: &str) -> Option<usize> {
		let haystack = &s.as_bytes()[from..];
		let needle_len = 2 + name.len();
		(0..haystack.len()).find_map(|i| {
			let candidate = haystack.get(i..i + needle_len)?;
			(candidate.starts_with(b"</") && candidate[2..].eq_ignore_ascii_case(name.as_bytes())).then(|| {
				self.state = State::Tag;
				self.raw_text_end = None;
				from + i + needle_len
			})
		})
	}

	fn tag(&mut self, s: &'a str, from: usize) -> Option<usize> {
		let bytes = s.as_bytes();
		for position in from..bytes.len() {
			match bytes[position] {
				b'>' => {
					self.state = State::Text;
					self.attribute = AttributePosition::None;
					return Some(position + 1);
				}
				b if is_tag_space(b) => {
					let name_start = position + 1;
					if name_start == bytes.len() {
						self.attribute = AttributePosition::Element;
						return Some(name_start);
					}
					if let Some(next) = self.attribute_assignment(s, name_start) {
						return Some(next);
					}
				}
				_ => (),
			}
		}
		// A binding right after a name without `=` sits in attribute name position.
		self.attribute = AttributePosition::None;
		None
	}

	/// Matches `name`, optional spaces, `=`, optional spaces and then at most the first character of the value.
	fn attribute_assignment(&mut self, s: &'a str, name_start: usize) -> Option<usize> {
		let bytes = s.as_bytes();
		let name_len = s[name_start..].find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '=' | '/')).unwrap_or(s.len() - name_start);
		if name_len == 0 {
			return None;
		}
		let name_end = name_start + name_len;

		let mut i = name_end;
		while i < bytes.len() && is_tag_space(bytes[i]) {
			i += 1;
		}
		if bytes.get(i) != Some(&b'=') {
			return None;
		}
		i += 1;
		while i < bytes.len() && is_tag_space(bytes[i]) {
			i += 1;
		}

		self.state = State::Tag;
		match s[i..].chars().next() {
			Some('"') => {
				self.state = State::DoubleQuoted;
				i += 1;
			}
			Some('\'') => {
				self.state = State::SingleQuoted;
				i += 1;
			}
			Some(c) if !(is_tag_space_char(c) || matches!(c, '`' | '<' | '>' | '=')) => i += c.len_utf8(),
			_ => (),
		}
		self.attribute = AttributePosition::NameEnd(name_end);
		self.attribute_name = &s[name_start..name_end];
		Some(i)
	}
}

fn is_tag_space(b: u8) -> bool {
	matches!(b, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

fn is_tag_space_char(c: char) -> bool {
	u8::try_from(c).map_or(false, is_tag_space)
}
