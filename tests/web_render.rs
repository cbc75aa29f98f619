#![cfg(all(target_arch = "wasm32", feature = "web"))]

use lit_dom::{dom::web::WebDom, html, render, Listener, RenderOptions, TemplateResult, Value};
use std::{cell::Cell, rc::Rc, sync::Once};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Element, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INITIALIZED: Once = Once::new();

fn setup() -> (WebDom, Element) {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let container = document.create_element("div").unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	(WebDom::new(document), container)
}

fn greeting(name: &str) -> TemplateResult<WebDom> {
	html!("<p class={}>Hello, {}!</p>", name.to_lowercase(), name)
}

#[wasm_bindgen_test]
fn text_and_attributes_update_in_place() {
	let (dom, container) = setup();
	let node: &web_sys::Node = &container;

	render(&dom, greeting("World"), node, RenderOptions::default()).unwrap();
	let p = container.query_selector("p").unwrap().unwrap();
	assert_eq!(p.text_content().as_deref(), Some("Hello, World!"));
	assert_eq!(p.get_attribute("class").as_deref(), Some("world"));

	render(&dom, greeting("Ferris"), node, RenderOptions::default()).unwrap();
	assert_eq!(container.query_selector("p").unwrap(), Some(p.clone()));
	assert_eq!(p.text_content().as_deref(), Some("Hello, Ferris!"));
	assert_eq!(p.get_attribute("class").as_deref(), Some("ferris"));
}

#[wasm_bindgen_test]
fn click() {
	let (dom, container) = setup();
	let node: &web_sys::Node = &container;
	let view = |listener: Value<WebDom>| html!("<button @click={}>Go</button>", listener);
	let clicks = Rc::new(Cell::new(0));
	let listener = {
		let clicks = clicks.clone();
		Listener::<WebDom>::new(move |event| {
			assert_eq!(event.type_(), "click");
			clicks.set(clicks.get() + 1);
		})
	};

	render(&dom, view(listener.into()), node, RenderOptions::default()).unwrap();
	let button: HtmlElement = container.query_selector("button").unwrap().unwrap().dyn_into().unwrap();
	assert_eq!(clicks.get(), 0);
	button.click();
	assert_eq!(clicks.get(), 1);

	render(&dom, view(Value::Nothing), node, RenderOptions::default()).unwrap();
	assert_eq!(container.query_selector("button").unwrap(), Some(button.clone().into()));
	button.click();
	assert_eq!(clicks.get(), 1);
}

#[wasm_bindgen_test]
fn null_and_nothing_properties_stay_distinct() {
	let (dom, container) = setup();
	let node: &web_sys::Node = &container;
	let view = |value: Value<WebDom>| html!("<div .payload={}></div>", value);

	render(&dom, view(Value::Null), node, RenderOptions::default()).unwrap();
	let div = container.query_selector("div").unwrap().unwrap();
	assert!(js_sys::Reflect::get(&div, &"payload".into()).unwrap().is_null());

	render(&dom, view(Value::Nothing), node, RenderOptions::default()).unwrap();
	assert!(js_sys::Reflect::get(&div, &"payload".into()).unwrap().is_undefined());
}

#[wasm_bindgen_test]
fn removed_containers_can_be_released() {
	let (dom, container) = setup();
	let node: &web_sys::Node = &container;
	render(&dom, greeting("World"), node, RenderOptions::default()).unwrap();

	container.remove();
	assert!(dom.release_disconnected() >= 1);
	assert_eq!(dom.release_disconnected(), 0);
}
