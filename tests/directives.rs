use lit_dom::{
	directive,
	directives::{class_map, guard, if_defined, live, ref_, repeat, style_map, unsafe_html, unsafe_svg, until, Pending, Ref},
	dom::{
		mem::{Document, NodeId},
		Dom, Namespace, NodeType,
	},
	html, render, Directive, DirectiveResult, Error, PartHandle, PartInfo, PartRef, RenderOptions, TemplateResult, Value,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

mod common;
use common::{markup, setup};

fn options() -> RenderOptions<Document> {
	RenderOptions::default()
}

type Log = Rc<RefCell<Vec<&'static str>>>;

/// Renders its text and records the lifecycle calls it receives.
struct Tracker {
	log: Option<Log>,
}

impl Tracker {
	fn push(&self, entry: &'static str) {
		if let Some(log) = &self.log {
			log.borrow_mut().push(entry);
		}
	}
}

impl Directive<Document> for Tracker {
	type Args = (Log, &'static str);

	fn new(_: &PartInfo) -> Result<Self, Error> {
		Ok(Self { log: None })
	}

	fn render(&mut self, (_, text): Self::Args) -> Value<Document> {
		text.into()
	}

	fn update(&mut self, _: &mut PartRef<'_, Document>, (log, text): Self::Args) -> Result<Value<Document>, Error> {
		self.log = Some(log);
		self.push("update");
		Ok(text.into())
	}

	fn disconnected(&mut self) {
		self.push("disconnected");
	}

	fn reconnected(&mut self) {
		self.push("reconnected");
	}
}

fn track(log: &Log, text: &'static str) -> DirectiveResult<Document> {
	directive::<Document, Tracker>((log.clone(), text))
}

#[test]
fn directives_keep_their_instance_across_renders() {
	let (document, body) = setup();
	let log = Log::default();
	let view = |text| html!("<p>{}</p>", track(&log, text));

	render(&document, view("a"), &body, options()).unwrap();
	render(&document, view("b"), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>b</p>");
	assert_eq!(*log.borrow(), ["update", "update"]);
}

#[test]
fn replacing_a_directive_disconnects_it() {
	let (document, body) = setup();
	let log = Log::default();
	let view = |value: Value<Document>| html!("<p>{}</p>", value);

	render(&document, view(track(&log, "tracked").into()), &body, options()).unwrap();
	render(&document, view("plain".into()), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>plain</p>");
	assert_eq!(*log.borrow(), ["update", "disconnected"]);
}

#[test]
fn clearing_a_template_disconnects_its_directives() {
	let (document, body) = setup();
	let log = Log::default();
	let outer = |inner: Value<Document>| html!("<div>{}</div>", inner);

	render(&document, outer(html!("<p>{}</p>", track(&log, "nested")).into()), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div><p>nested</p></div>");

	render(&document, outer(Value::Nothing), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div></div>");
	assert_eq!(*log.borrow(), ["update", "disconnected"]);
}

#[test]
fn roots_toggle_the_connection_of_their_directives() {
	let (document, body) = setup();
	let log = Log::default();

	let root = render(&document, html!("<p>{}</p>", track(&log, "x")), &body, options()).unwrap();
	assert!(root.is_connected());

	root.set_connected(false).unwrap();
	root.set_connected(false).unwrap();
	assert!(!root.is_connected());
	root.set_connected(true).unwrap();
	root.handle().set_connected(false).unwrap();
	assert!(!root.is_connected());

	assert_eq!(*log.borrow(), ["update", "disconnected", "reconnected", "disconnected"]);
}

#[test]
fn roots_can_start_disconnected() {
	let (document, body) = setup();
	let log = Log::default();

	let root = render(&document, html!("<p>{}</p>", track(&log, "x")), &body, options().is_connected(false)).unwrap();
	assert!(!root.is_connected());
	root.set_connected(true).unwrap();
	assert_eq!(*log.borrow(), ["update", "reconnected"]);
}

type HandleSlot = Rc<RefCell<Option<PartHandle<Document>>>>;

/// Renders "pending" and hands out a handle to its part.
struct Capture;

impl Directive<Document> for Capture {
	type Args = HandleSlot;

	fn new(_: &PartInfo) -> Result<Self, Error> {
		Ok(Self)
	}

	fn render(&mut self, _: HandleSlot) -> Value<Document> {
		"pending".into()
	}

	fn update(&mut self, part: &mut PartRef<'_, Document>, slot: HandleSlot) -> Result<Value<Document>, Error> {
		*slot.borrow_mut() = Some(part.handle());
		Ok(self.render(slot))
	}
}

#[test]
fn handles_set_values_later() {
	let (document, body) = setup();
	let slot = HandleSlot::default();

	render(&document, html!("<p>{}</p>", directive::<Document, Capture>(slot.clone())), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>pending</p>");

	let handle = slot.borrow().clone().unwrap();
	assert!(handle.is_connected());
	handle.set_value("later").unwrap();
	assert_eq!(markup(&document, body), "<p>later</p>");
	assert_eq!(handle.set_connected(false).unwrap_err(), Error::NotRootPart);

	render(&document, Value::Nothing, &body, options()).unwrap();
	assert!(!handle.is_connected());
	handle.set_value("too late").unwrap();
	assert_eq!(markup(&document, body), "");
}

/// Tries to push a value while its own render is still running.
struct Eager;

impl Directive<Document> for Eager {
	type Args = ();

	fn new(_: &PartInfo) -> Result<Self, Error> {
		Ok(Self)
	}

	fn render(&mut self, (): ()) -> Value<Document> {
		Value::Nothing
	}

	fn update(&mut self, part: &mut PartRef<'_, Document>, (): ()) -> Result<Value<Document>, Error> {
		part.handle().set_value("now")?;
		Ok(Value::Nothing)
	}
}

#[test]
fn handles_refuse_reentrant_updates() {
	let (document, body) = setup();
	let result = render(&document, html!("<p>{}</p>", directive::<Document, Eager>(())), &body, options());
	assert_eq!(result.unwrap_err(), Error::Reentrant);
}

#[test]
fn guard_skips_unchanged_dependencies() {
	let (document, body) = setup();
	let calls = Rc::new(Cell::new(0));
	let view = |dependencies: Vec<u32>| {
		let calls = calls.clone();
		html!(
			"<p>{}</p>",
			guard(dependencies, move || {
				calls.set(calls.get() + 1);
				Value::from(calls.get())
			}),
		)
	};

	render(&document, view(vec![1, 2]), &body, options()).unwrap();
	render(&document, view(vec![1, 2]), &body, options()).unwrap();
	assert_eq!(calls.get(), 1);
	assert_eq!(markup(&document, body), "<p>1</p>");

	render(&document, view(vec![1, 3]), &body, options()).unwrap();
	assert_eq!(calls.get(), 2);
	assert_eq!(markup(&document, body), "<p>2</p>");
}

#[test]
fn if_defined_removes_missing_attributes() {
	let (document, body) = setup();
	let title = |value: Option<&str>| html!("<div title={}></div>", if_defined(value));

	render(&document, title(Some("a")), &body, options()).unwrap();
	assert_eq!(markup(&document, body), r#"<div title="a"></div>"#);

	render(&document, title(None), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div></div>");
}

#[test]
fn live_compares_against_the_element() {
	let (document, body) = setup();
	let input = |value: &str| html!("<input .value={} placeholder={}>", live(value), live(value));

	render(&document, input("a"), &body, options()).unwrap();
	let element = document.query(body, "input").unwrap();
	assert!(document.property(&element, "value").is_same(&Value::from("a")));

	document.set_property(&element, "value", Value::from("typed"));
	document.set_attribute(&element, "placeholder", "changed");
	render(&document, input("a"), &body, options()).unwrap();
	assert!(document.property(&element, "value").is_same(&Value::from("a")));
	assert_eq!(document.attribute(&element, "placeholder").as_deref(), Some("a"));
}

#[test]
fn live_refuses_child_bindings() {
	let (document, body) = setup();
	let error = render(&document, html!("<p>{}</p>", live("x")), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "live", .. }));
}

#[test]
fn refs_follow_the_element() {
	let (document, body) = setup();
	let input = Ref::<Document>::new();
	let view = |show: bool| -> Value<Document> {
		if show {
			html!("<div><input {}></div>", ref_(&input)).into()
		} else {
			Value::Nothing
		}
	};

	let root = render(&document, view(true), &body, options()).unwrap();
	let element = document.query(body, "input");
	assert!(element.is_some());
	assert_eq!(input.value(), element);

	root.set_connected(false).unwrap();
	assert_eq!(input.value(), None);
	root.set_connected(true).unwrap();
	assert_eq!(input.value(), element);

	render(&document, view(false), &body, options()).unwrap();
	assert_eq!(input.value(), None);
}

#[test]
fn refs_refuse_other_bindings() {
	let (document, body) = setup();
	let target = Ref::<Document>::new();
	let error = render(&document, html!("<p>{}</p>", ref_(&target)), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "ref", .. }));
}

fn list(items: &[(u32, &str)]) -> TemplateResult<Document> {
	html!(
		"<ul>{}</ul>",
		repeat(items.iter().copied(), |(id, _), _| *id, |(_, name), _| html!("<li>{}</li>", *name).into()),
	)
}

fn list_items(document: &Document, body: NodeId) -> Vec<NodeId> {
	let ul = document.query(body, "ul").unwrap();
	document.children(ul).into_iter().filter(|child| document.node_type(child) == NodeType::Element).collect()
}

#[test]
fn repeat_moves_items_by_key() {
	let (document, body) = setup();

	render(&document, list(&[(1, "a"), (2, "b"), (3, "c")]), &body, options()).unwrap();
	let before = list_items(&document, body);

	render(&document, list(&[(3, "c"), (1, "a"), (2, "b")]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>c</li><li>a</li><li>b</li></ul>");
	assert_eq!(list_items(&document, body), [before[2], before[0], before[1]]);
}

#[test]
fn repeat_removes_and_inserts_in_place() {
	let (document, body) = setup();

	render(&document, list(&[(1, "a"), (2, "b"), (3, "c")]), &body, options()).unwrap();
	let before = list_items(&document, body);

	render(&document, list(&[(1, "a"), (3, "c")]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>a</li><li>c</li></ul>");
	assert_eq!(list_items(&document, body), [before[0], before[2]]);

	render(&document, list(&[(1, "a"), (4, "d"), (3, "c")]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>a</li><li>d</li><li>c</li></ul>");
	let after = list_items(&document, body);
	assert_eq!((after[0], after[2]), (before[0], before[2]));
	assert!(!before.contains(&after[1]));
}

#[test]
fn repeat_updates_items_that_keep_their_key() {
	let (document, body) = setup();

	render(&document, list(&[(1, "a"), (2, "b")]), &body, options()).unwrap();
	let before = list_items(&document, body);

	render(&document, list(&[(1, "A"), (2, "B")]), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<ul><li>A</li><li>B</li></ul>");
	assert_eq!(list_items(&document, body), before);
}

fn class_tokens(document: &Document, element: NodeId) -> Vec<String> {
	let mut tokens: Vec<String> = document.attribute(&element, "class").unwrap_or_default().split_whitespace().map(str::to_owned).collect();
	tokens.sort();
	tokens
}

#[test]
fn class_map_toggles_classes() {
	let (document, body) = setup();
	let view = |classes: &[(&'static str, bool)]| html!("<div class=\"aa {} bb\"></div>", class_map(classes.iter().copied()));

	render(&document, view(&[("foo", true), ("bar", false), ("aa", true)]), &body, options()).unwrap();
	let div = document.query(body, "div").unwrap();
	assert_eq!(class_tokens(&document, div), ["aa", "aa", "bb", "foo"]);

	document.set_attribute(&div, "class", "aa bb foo external");
	render(&document, view(&[("foo", false), ("bar", true), ("aa", false)]), &body, options()).unwrap();
	assert_eq!(class_tokens(&document, div), ["aa", "bar", "bb", "external"]);

	render(&document, view(&[]), &body, options()).unwrap();
	assert_eq!(class_tokens(&document, div), ["aa", "bb", "external"]);
}

#[test]
fn class_map_refuses_other_attributes() {
	let (document, body) = setup();
	let error = render(&document, html!("<div title={}></div>", class_map([("a", true)])), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "class_map", .. }));

	let (document, body) = setup();
	let error = render(&document, html!("<div class=\"{} {}\"></div>", class_map([("a", true)]), "b"), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "class_map", .. }));
}

#[test]
fn style_map_sets_and_removes_declarations() {
	let (document, body) = setup();
	let view = |styles: &[(&'static str, Option<&'static str>)]| html!("<div style=\"display: block; {}\"></div>", style_map(styles.iter().copied()));

	render(&document, view(&[("height", Some("5px")), ("marginTop", Some("2px")), ("color", None)]), &body, options()).unwrap();
	let div = document.query(body, "div").unwrap();
	assert_eq!(document.attribute(&div, "style").as_deref(), Some("display: block; height:5px;margin-top:2px;"));

	render(&document, view(&[("height", None), ("marginTop", Some("3px")), ("color", Some("red"))]), &body, options()).unwrap();
	assert_eq!(document.attribute(&div, "style").as_deref(), Some("display: block; margin-top: 3px; color: red;"));

	render(&document, view(&[("--gap", Some("1em"))]), &body, options()).unwrap();
	assert_eq!(document.attribute(&div, "style").as_deref(), Some("display: block; --gap: 1em;"));
}

#[test]
fn style_map_refuses_other_attributes() {
	let (document, body) = setup();
	let error = render(&document, html!("<p>{}</p>", style_map([("color", Some("red"))])), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "style_map", .. }));
}

#[test]
fn unsafe_html_renders_markup() {
	let (document, body) = setup();
	let view = |value: Value<Document>| html!("<div>{}</div>", unsafe_html(value));

	render(&document, view("<b>a</b>c".into()), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div><b>a</b>c</div>");
	let b = document.query(body, "b").unwrap();

	render(&document, view("<b>a</b>c".into()), &body, options()).unwrap();
	assert_eq!(document.query(body, "b"), Some(b));

	render(&document, view("<i>d</i>".into()), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div><i>d</i></div>");
	assert_eq!(document.parent_node(&b), None);

	render(&document, view(Value::Nothing), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div></div>");

	render(&document, view(Value::Null), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div></div>");

	render(&document, view("<i>d</i>".into()), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<div><i>d</i></div>");
}

#[test]
fn unsafe_svg_creates_svg_elements() {
	let (document, body) = setup();
	render(&document, html!("<svg>{}</svg>", unsafe_svg(r#"<circle r="1"></circle>"#)), &body, options()).unwrap();
	let circle = document.query(body, "circle").unwrap();
	assert_eq!(document.namespace(&circle), Namespace::Svg);
	assert_eq!(document.parent_node(&circle), document.query(body, "svg"));
}

#[test]
fn unsafe_html_refuses_other_values_and_bindings() {
	let (document, body) = setup();
	let error = render(&document, html!("<div>{}</div>", unsafe_html(1)), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "unsafe_html", .. }));

	let (document, body) = setup();
	let error = render(&document, html!("<div title={}></div>", unsafe_html("<b></b>")), &body, options()).unwrap_err();
	assert!(matches!(error, Error::Directive { directive: "unsafe_html", .. }));
}

#[test]
fn until_renders_values_by_priority() {
	let (document, body) = setup();
	let first = Pending::<Document>::new();
	let second = Pending::<Document>::new();
	let view = || html!("<p>{}</p>", until([first.clone().into(), second.clone().into(), Value::from("loading")]));

	render(&document, view(), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>loading</p>");

	second.resolve("second");
	assert_eq!(markup(&document, body), "<p>second</p>");

	first.resolve("first");
	assert_eq!(markup(&document, body), "<p>first</p>");

	render(&document, view(), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p>first</p>");
}

#[test]
fn until_ignores_lower_priority_values() {
	let (document, body) = setup();
	let first = Pending::<Document>::new();
	let second = Pending::<Document>::new();

	render(&document, html!("<p>{}</p>", until([first.clone().into(), second.clone().into()])), &body, options()).unwrap();
	assert_eq!(markup(&document, body), "<p></p>");

	first.resolve("first");
	second.resolve("second");
	assert_eq!(markup(&document, body), "<p>first</p>");
}

#[test]
fn until_drops_values_it_no_longer_lists() {
	let (document, body) = setup();
	let stale = Pending::<Document>::new();

	render(&document, html!("<p>{}</p>", until([stale.clone().into(), Value::from("a")])), &body, options()).unwrap();
	render(&document, html!("<p>{}</p>", until([Value::from("b")])), &body, options()).unwrap();
	stale.resolve("stale");
	assert_eq!(markup(&document, body), "<p>b</p>");
}
