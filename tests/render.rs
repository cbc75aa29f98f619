use lit_dom::{
	dom::{mem::Document, Dom, Namespace, NodeType},
	html, render, svg, Error, Literal, RenderOptions, ResultKind, TemplateResult, Value,
};

mod common;
use common::{markup, setup};

fn greeting(name: impl Into<Value<Document>>) -> TemplateResult<Document> {
	let name: Value<Document> = name.into();
	html!("<p>Hello, {}!</p>", name)
}

fn options() -> RenderOptions<Document> {
	RenderOptions::default()
}

#[test]
fn renders_and_updates_text_in_place() {
	let (document, body) = setup();

	render(&document, greeting("World"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, World!</p>");
	let p = document.query(body, "p").unwrap();
	let text = document.children(p)[2];
	assert_eq!(document.node_value(&text), "World");

	render(&document, greeting("Ferris"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, Ferris!</p>");
	assert_eq!(document.query(body, "p"), Some(p));
	assert_eq!(document.children(p)[2], text);
	assert_eq!(document.node_value(&text), "Ferris");
}

#[test]
fn falsy_primitives_are_visible() {
	let (document, body) = setup();

	render(&document, greeting(0), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, 0!</p>");
	render(&document, greeting(false), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, false!</p>");
	render(&document, greeting(1.5), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, 1.5!</p>");
}

#[test]
fn null_empty_and_nothing_clear() {
	let (document, body) = setup();

	let cleared: [Value<Document>; 4] = [Value::Null, Value::from(""), Value::Nothing, Value::from(None::<&str>)];
	for cleared in cleared {
		render(&document, greeting("x"), &body, options()).unwrap();
		assert_eq!(markup(&document, body), "<p>Hello, x!</p>");
		render(&document, greeting(cleared), &body, options()).unwrap();
		assert_eq!(markup(&document, body), "<p>Hello, !</p>");
		let p = document.query(body, "p").unwrap();
		// The two static text nodes around the marker comment.
		assert_eq!(document.children(p).len(), 3);
	}
}

#[test]
fn no_change_keeps_the_committed_value() {
	let (document, body) = setup();

	render(&document, greeting("x"), &body, options()).unwrap();
	render(&document, greeting(Value::NoChange), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, x!</p>");
}

#[test]
fn same_template_keeps_its_elements() {
	let (document, body) = setup();
	let card = |title: &str, class: &str| html!("<section><h1>{}</h1><div class={}></div></section>", title, class);

	render(&document, card("a", "x"), &body, options()).unwrap();
	let section = document.query(body, "section").unwrap();
	let h1 = document.query(section, "h1").unwrap();

	render(&document, card("b", "y"), &body, options()).unwrap();
	assert_eq!(document.query(body, "section"), Some(section));
	assert_eq!(document.query(section, "h1"), Some(h1));
	assert_eq!(markup(&document, body), r#"<section><h1>b</h1><div class="y"></div></section>"#);
}

#[test]
fn different_template_replaces_the_content() {
	let (document, body) = setup();
	let view = |bold: bool, text: &str| -> TemplateResult<Document> {
		if bold {
			html!("<b>{}</b>", text)
		} else {
			html!("<i>{}</i>", text)
		}
	};

	render(&document, view(true, "a"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<b>a</b>");
	let b = document.query(body, "b").unwrap();

	render(&document, view(false, "a"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<i>a</i>");
	assert_eq!(document.parent_node(&b), None);

	render(&document, view(true, "c"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<b>c</b>");
	assert_ne!(document.query(body, "b"), Some(b));
}

#[test]
fn nested_templates_update_in_place() {
	let (document, body) = setup();
	let inner = |text: &str| html!("<span>{}</span>", text);
	let outer = |text: &str| html!("<div>{}</div>", inner(text));

	render(&document, outer("a"), &body, options()).unwrap();
	let span = document.query(body, "span").unwrap();
	render(&document, outer("b"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div><span>b</span></div>");
	assert_eq!(document.query(body, "span"), Some(span));
}

#[test]
fn lists_reuse_items_by_position() {
	let (document, body) = setup();
	let list = |items: &[&str]| html!("<ul>{}</ul>", items.iter().map(|item| html!("<li>{}</li>", *item)).collect::<Value<Document>>());

	render(&document, list(&["a", "b", "c"]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>a</li><li>b</li><li>c</li></ul>");
	let ul = document.query(body, "ul").unwrap();
	let first = document.query(ul, "li").unwrap();

	render(&document, list(&["x"]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>x</li></ul>");
	assert_eq!(document.query(ul, "li"), Some(first));

	render(&document, list(&["x", "y"]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>x</li><li>y</li></ul>");

	render(&document, list(&[]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul></ul>");
}

#[test]
fn lists_of_primitives() {
	let (document, body) = setup();
	render(&document, greeting(vec![1, 2, 3]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, 123!</p>");
}

#[test]
fn nodes_are_inserted_as_they_are() {
	let (document, body) = setup();
	let em = document.create_element("em", Namespace::Html);
	document.append_child(em, document.create_text("node"));

	render(&document, greeting(Value::Node(em)), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, <em>node</em>!</p>");

	render(&document, greeting("text"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, text!</p>");
	assert_eq!(document.parent_node(&em), None);
}

#[test]
fn bindings_in_raw_text_elements() {
	let (document, body) = setup();
	let style = |color: &str| html!("<style>p {{ color: {}; }}</style>", color);

	render(&document, style("red"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<style>p { color: red; }</style>");
	render(&document, style("blue"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<style>p { color: blue; }</style>");
}

#[test]
fn svg_content_has_the_svg_namespace() {
	let (document, body) = setup();
	let circle = |r: f64| svg!("<circle r={}></circle>", r);

	render(&document, html!("<svg>{}</svg>", circle(2.0)), &body, options()).unwrap();
	let circle = document.query(body, "circle").unwrap();
	assert_eq!(document.namespace(&circle), Namespace::Svg);
	assert_eq!(document.attribute(&circle, "r").as_deref(), Some("2"));
}

#[test]
fn render_before_creates_independent_roots() {
	let (document, body) = setup();
	let hr = document.create_element("hr", Namespace::Html);
	document.append_child(body, hr);

	render(&document, html!("<b>{}</b>", "x"), &body, options().render_before(hr)).unwrap();
	render(&document, html!("<i>{}</i>", "y"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<b>x</b><hr><i>y</i>");

	let before = |text: &str| html!("<b>{}</b>", text);
	render(&document, before("z"), &body, options().render_before(hr)).unwrap();
	assert_eq!(markup(&document, body), "<b>z</b><hr><i>y</i>");
}

#[test]
fn containers_must_hold_children() {
	let document = Document::new();
	let text = document.create_text("text");
	assert_eq!(
		render(&document, greeting("x"), &text, options()).unwrap_err(),
		Error::InvalidContainer { found: "text node" }
	);

	let fragment = document.create_fragment();
	render(&document, greeting("x"), &fragment, options()).unwrap();
	assert_eq!(markup(&document, fragment), "<p>Hello, x!</p>");
}

#[test]
fn untagged_literals_are_refused() {
	static UNTAGGED: Literal = Literal::untagged("<p>{}</p>", ResultKind::Html);
	let (document, body) = setup();
	let result = TemplateResult::new(&UNTAGGED, vec![Value::from("<script>alert(1)</script>")]);
	assert_eq!(render(&document, result, &body, options()).unwrap_err(), Error::UntaggedLiteral);
	assert_eq!(markup(&document, body), "");
}

#[test]
fn value_count_must_match() {
	let (document, body) = setup();
	let result = TemplateResult::new(greeting("x").literal(), vec![]);
	assert_eq!(
		render(&document, result, &body, options()).unwrap_err(),
		Error::ValueCount { expected: 1, found: 0 }
	);
}

#[test]
fn dynamic_tag_names_are_refused() {
	let (document, body) = setup();
	assert_eq!(
		render(&document, html!("<{}></div>", "div"), &body, options()).unwrap_err(),
		Error::DynamicTagName { fragment: 0 }
	);
}

#[test]
fn bindings_in_template_elements_are_refused() {
	let (document, body) = setup();
	assert_eq!(
		render(&document, html!("<template><p>{}</p></template>", "x"), &body, options()).unwrap_err(),
		Error::BindingInTemplate
	);
}

#[test]
fn bindings_in_comments_are_ignored() {
	let (document, body) = setup();
	render(&document, html!("<!-- {} --><p>{}</p>", "ignored", "shown"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>shown</p>");
}

#[test]
fn detached_parts_report_an_error() {
	let (document, body) = setup();
	render(&document, greeting("x"), &body, options()).unwrap();

	for child in document.children(body) {
		document.remove_child(&body, &child);
	}
	assert_eq!(render(&document, greeting("y"), &body, options()).unwrap_err(), Error::DetachedPart);
}

#[test]
fn shrinking_lists_remove_trailing_items() {
	let (document, body) = setup();
	let list = |items: &[u32]| html!("<ul>{}</ul>", items.iter().map(|item| html!("<li>{}</li>", *item)).collect::<Value<Document>>());
	let items = |document: &Document| {
		let ul = document.query(body, "ul").unwrap();
		document.children(ul).into_iter().filter(|child| document.node_type(child) == NodeType::Element).collect::<Vec<_>>()
	};

	render(&document, list(&[1, 2, 3]), &body, options()).unwrap();
	let before = items(&document);
	assert_eq!(before.len(), 3);

	render(&document, list(&[1, 2]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>1</li><li>2</li></ul>");
	assert_eq!(items(&document), before[..2]);
	assert_eq!(document.parent_node(&before[2]), None);
}

#[test]
fn creation_scopes_create_template_content() {
	let (document, body) = setup();
	let scope = Document::new();

	render(&document, greeting("scoped"), &body, options().creation_scope(scope.clone())).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, scoped!</p>");
	assert_eq!(scope.node_count(), 1);
	let p = document.query(body, "p").unwrap();

	render(&document, greeting("again"), &body, options().creation_scope(scope.clone())).unwrap();
	assert_eq!(markup(&document, body), "<p>Hello, again!</p>");
	assert_eq!(document.query(body, "p"), Some(p));

	render(&document, html!("<b>{}</b>", greeting("nested")), &body, options().creation_scope(scope.clone())).unwrap();
	assert_eq!(markup(&document, body), "<b><p>Hello, nested!</p></b>");
	assert_eq!(scope.node_count(), 1);
}

#[test]
fn released_documents_stay_bounded() {
	let (document, body) = setup();
	let view = |bold: bool| -> TemplateResult<Document> {
		if bold {
			html!("<b>{}</b>", "x")
		} else {
			html!("<i>{}</i>", "x")
		}
	};

	render(&document, view(true), &body, options()).unwrap();
	render(&document, view(false), &body, options()).unwrap();
	document.release_detached();
	let settled = document.node_count();

	for bold in [true, false, true, false] {
		render(&document, view(bold), &body, options()).unwrap();
	}
	assert!(document.node_count() > settled);
	assert!(document.release_detached() > 0);
	assert_eq!(document.node_count(), settled);
	assert_eq!(markup(&document, body), "<i>x</i>");
}

#[test]
fn textarea_bindings_render_as_text() {
	let (document, body) = setup();
	render(&document, html!("<textarea>{}</textarea><p>{}</p>", "a", "b"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<textarea>a</textarea><p>b</p>");
}

#[test]
fn unlocated_bindings_report_an_error() {
	let (document, body) = setup();
	let error = render(&document, html!("<div a=xy{}></div>", "v"), &body, options()).unwrap_err();
	assert_eq!(error, Error::UnlocatedBindings { expected: 1, found: 0 });
}
