#![allow(dead_code)]

use lit_dom::dom::{
	mem::{Document, NodeId},
	Dom, Namespace,
};

/// A document with a `<body>` to render into.
pub fn setup() -> (Document, NodeId) {
	let document = Document::new();
	let body = document.create_element("body", Namespace::Html);
	document.append_child(document.root(), body);
	(document, body)
}

/// The inner HTML of `node` without comments, which is where binding markers live.
pub fn markup(document: &Document, node: NodeId) -> String {
	let mut html = document.inner_html(node);
	while let Some(start) = html.find("<!--") {
		let end = html[start..].find("-->").map_or(html.len(), |end| start + end + 3);
		html.replace_range(start..end, "");
	}
	html
}
