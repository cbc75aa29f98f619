use crate::{
	directive::{directive, Directive, DirectiveResult, PartInfo, PartRef, PartType},
	dom::Dom,
	Error, PartKey, Value,
};
use core::hash::Hash;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{trace, trace_span};

/// Keyed list rendering. Items keep their DOM (and any state inside it) when they move.
pub struct Repeat<K> {
	keys: Option<Rc<[K]>>,
}

impl<D: Dom, K: Eq + Hash + Clone + 'static> Directive<D> for Repeat<K> {
	type Args = (Rc<[K]>, Rc<[Value<D>]>);

	fn new(part: &PartInfo) -> Result<Self, Error> {
		if part.part_type != PartType::Child {
			return Err(Error::directive("repeat", "can only be used in child position"));
		}
		Ok(Self { keys: None })
	}

	fn render(&mut self, (keys, values): Self::Args) -> Value<D> {
		self.keys = Some(keys);
		Value::List(values)
	}

	fn update(&mut self, part: &mut PartRef<'_, D>, (keys, values): Self::Args) -> Result<Value<D>, Error> {
		let span = trace_span!("repeat", items = values.len());
		let _enter = span.enter();

		let (Some(old_keys), Some(old_parts)) = (self.keys.clone(), part.committed_parts()) else {
			trace!("First render or the list was replaced.");
			return Ok(self.render((keys, values)));
		};
		if old_keys.len() != old_parts.len() {
			trace!("Committed parts don't match the known keys.");
			return Ok(self.render((keys, values)));
		}

		let new_parts = reconcile(part, &old_keys, old_parts, &keys, &values)?;
		self.keys = Some(keys);
		part.set_committed_parts(new_parts);
		Ok(Value::NoChange)
	}
}

/// Matches old and new items from both ends first, then falls back to key lookups for whatever is left in the middle.
fn reconcile<D: Dom, K: Eq + Hash>(part: &mut PartRef<'_, D>, old_keys: &[K], old_parts: Vec<PartKey>, new_keys: &[K], new_values: &[Value<D>]) -> Result<Vec<PartKey>, Error> {
	let mut old_parts: Vec<Option<PartKey>> = old_parts.into_iter().map(Some).collect();
	let mut new_parts: Vec<Option<PartKey>> = vec![None; new_values.len()];
	let mut new_key_to_index: Option<HashMap<&K, usize>> = None;
	let mut old_key_to_index: Option<HashMap<&K, usize>> = None;

	let (mut old_head, mut old_end) = (0, old_parts.len());
	let (mut new_head, mut new_end) = (0, new_values.len());

	while old_head < old_end && new_head < new_end {
		let (old_tail, new_tail) = (old_end - 1, new_end - 1);
		match (old_parts[old_head], old_parts[old_tail]) {
			(None, _) => old_head += 1,
			(_, None) => old_end -= 1,
			(Some(head), _) if old_keys[old_head] == new_keys[new_head] => {
				part.set_child_value(head, new_values[new_head].clone())?;
				new_parts[new_head] = Some(head);
				old_head += 1;
				new_head += 1;
			}
			(_, Some(tail)) if old_keys[old_tail] == new_keys[new_tail] => {
				part.set_child_value(tail, new_values[new_tail].clone())?;
				new_parts[new_tail] = Some(tail);
				old_end -= 1;
				new_end -= 1;
			}
			(Some(head), _) if old_keys[old_head] == new_keys[new_tail] => {
				part.set_child_value(head, new_values[new_tail].clone())?;
				part.move_part(head, new_parts.get(new_end).copied().flatten())?;
				new_parts[new_tail] = Some(head);
				old_head += 1;
				new_end -= 1;
			}
			(Some(head), Some(tail)) if old_keys[old_tail] == new_keys[new_head] => {
				part.set_child_value(tail, new_values[new_head].clone())?;
				part.move_part(tail, Some(head))?;
				new_parts[new_head] = Some(tail);
				old_end -= 1;
				new_head += 1;
			}
			(Some(head), Some(tail)) => {
				let new_key_to_index = new_key_to_index.get_or_insert_with(|| index_map(new_keys, new_head, new_end));
				let old_key_to_index = old_key_to_index.get_or_insert_with(|| index_map(old_keys, old_head, old_end));

				if !new_key_to_index.contains_key(&old_keys[old_head]) {
					part.remove_part(head);
					old_head += 1;
				} else if !new_key_to_index.contains_key(&old_keys[old_tail]) {
					part.remove_part(tail);
					old_end -= 1;
				} else {
					let old_index = old_key_to_index.get(&new_keys[new_head]).copied();
					match old_index.and_then(|old_index| old_parts[old_index].map(|old_part| (old_index, old_part))) {
						Some((old_index, old_part)) => {
							part.set_child_value(old_part, new_values[new_head].clone())?;
							part.move_part(old_part, Some(head))?;
							old_parts[old_index] = None;
							new_parts[new_head] = Some(old_part);
						}
						None => {
							let created = part.insert_part(Some(head))?;
							part.set_child_value(created, new_values[new_head].clone())?;
							new_parts[new_head] = Some(created);
						}
					}
					new_head += 1;
				}
			}
		}
	}

	while new_head < new_end {
		let created = part.insert_part(new_parts.get(new_end).copied().flatten())?;
		part.set_child_value(created, new_values[new_head].clone())?;
		new_parts[new_head] = Some(created);
		new_head += 1;
	}
	for old_part in old_parts[old_head..old_end].iter().flatten() {
		part.remove_part(*old_part);
	}

	Ok(new_parts.into_iter().flatten().collect())
}

fn index_map<K: Eq + Hash>(keys: &[K], start: usize, end: usize) -> HashMap<&K, usize> {
	(start..end).map(|i| (&keys[i], i)).collect()
}

/// Renders one item per entry of `items`, identified by `key`.
///
/// When the order changes, the DOM of each item is moved rather than re-rendered with another item's value.
///
/// ```
/// use lit_dom::{directives::repeat, dom::mem::Document, html, render, RenderOptions};
///
/// let document = Document::new();
/// let body = document.root();
/// let list = |items: &[(u32, &str)]| {
/// 	html!(
/// 		"<ul>{}</ul>",
/// 		repeat(items.iter().copied(), |(id, _), _| *id, |(_, name), _| html!("<li>{}</li>", *name).into()),
/// 	)
/// };
///
/// render(&document, list(&[(1, "a"), (2, "b")]), &body, RenderOptions::default())?;
/// let ul = document.query(body, "ul").unwrap();
/// let first = document.query(ul, "li").unwrap();
///
/// render(&document, list(&[(2, "b"), (1, "a")]), &body, RenderOptions::default())?;
/// assert_eq!(document.text_content(ul), "ba");
/// assert_eq!(document.text_content(first), "a");
/// # Ok::<(), lit_dom::Error>(())
/// ```
pub fn repeat<D: Dom, T, K: Eq + Hash + Clone + 'static>(
	items: impl IntoIterator<Item = T>,
	key: impl Fn(&T, usize) -> K,
	template: impl Fn(&T, usize) -> Value<D>,
) -> DirectiveResult<D> {
	let (keys, values): (Vec<K>, Vec<Value<D>>) = items.into_iter().enumerate().map(|(i, item)| (key(&item, i), template(&item, i))).unzip();
	directive::<D, Repeat<K>>((keys.into(), values.into()))
}
