//! Element helpers shared by directive processing, modules and code generation.

use reinhardt_compiler_ast::{Attr, Element, Handler};

use crate::diagnostics::{Diagnostics, Span};
use crate::platform::Platform;

/// Diagnostic range of a raw attribute.
pub fn attr_span(attr: &Attr) -> Span {
	Span {
		start: attr.start,
		end: attr.end,
	}
}

/// Range of the raw attribute `name`, if ranges were recorded.
pub fn raw_attr_span(el: &Element, name: &str) -> Span {
	el.raw_attrs_map.get(name).map_or(Span::at(el.start), attr_span)
}

/// Removes a binding named `name` and returns its expression.
///
/// `:name` and `v-bind:name` win over a static `name`, whose value is
/// returned quoted. Static values are skipped when `get_static` is off.
pub fn get_binding_attr(el: &mut Element, name: &str, get_static: bool) -> Option<String> {
	let dynamic = el
		.get_and_remove_attr(&format!(":{name}"), false)
		.filter(|value| !value.is_empty())
		.or_else(|| el.get_and_remove_attr(&format!("v-bind:{name}"), false));
	if let Some(value) = dynamic {
		return Some(value);
	}
	if get_static {
		return el
			.get_and_remove_attr(name, false)
			.map(|value| crate::util::quote(&value));
	}
	None
}

/// Whether `el` may render as a component rather than a platform element.
pub fn maybe_component(el: &Element, platform: &dyn Platform) -> bool {
	let bound_is = |key: &str| el.attrs_map.get(key).is_some_and(|value| !value.is_empty());
	el.component.is_some()
		|| bound_is(":is")
		|| bound_is("v-bind:is")
		|| !match el.attrs_map.get("is").filter(|value| !value.is_empty()) {
			Some(is) => platform.is_reserved_tag(is),
			None => platform.is_reserved_tag(&el.tag),
		}
}

fn prepend_marker(symbol: char, name: &str, dynamic: bool) -> String {
	if dynamic {
		format!("_p({name},\"{symbol}\")")
	} else {
		format!("{symbol}{name}")
	}
}

/// Registration of an event listener on an element.
#[derive(Debug, Clone, Default)]
pub struct HandlerSpec {
	pub modifiers: Vec<String>,
	/// Run before handlers already registered for the event
	pub important: bool,
	pub dynamic: bool,
	pub span: Span,
}

/// Adds a listener, folding the modifiers that only change the event name
/// (`capture`, `once`, `passive`, `native`, mouse buttons on `click`).
pub fn add_handler(
	el: &mut Element,
	name: &str,
	value: &str,
	spec: HandlerSpec,
	diagnostics: &mut Diagnostics,
) {
	let HandlerSpec {
		mut modifiers,
		important,
		dynamic,
		span,
	} = spec;
	let has = |modifiers: &[String], key: &str| modifiers.iter().any(|m| m == key);
	let take = |modifiers: &mut Vec<String>, key: &str| {
		let found = modifiers.iter().position(|m| m == key);
		if let Some(index) = found {
			modifiers.remove(index);
		}
		found.is_some()
	};

	if has(&modifiers, "prevent") && has(&modifiers, "passive") {
		diagnostics.warn(
			"passive and prevent can't be used together. Passive handler can't prevent default event.",
			span,
		);
	}

	let mut name = name.to_owned();
	if has(&modifiers, "right") {
		if dynamic {
			name = format!("({name})==='click'?'contextmenu':({name})");
		} else if name == "click" {
			name = "contextmenu".to_owned();
			take(&mut modifiers, "right");
		}
	} else if has(&modifiers, "middle") {
		if dynamic {
			name = format!("({name})==='click'?'mouseup':({name})");
		} else if name == "click" {
			name = "mouseup".to_owned();
		}
	}

	if take(&mut modifiers, "capture") {
		name = prepend_marker('!', &name, dynamic);
	}
	if take(&mut modifiers, "once") {
		name = prepend_marker('~', &name, dynamic);
	}
	if take(&mut modifiers, "passive") {
		name = prepend_marker('&', &name, dynamic);
	}
	let native = take(&mut modifiers, "native");

	let handler = Handler {
		value: value.trim().to_owned(),
		dynamic,
		modifiers,
		start: span.start,
		end: span.end,
	};
	let events = if native {
		&mut el.native_events
	} else {
		&mut el.events
	};
	let handlers = events.entry(name).or_default();
	if important {
		handlers.insert(0, handler);
	} else {
		handlers.push(handler);
	}
	el.plain = false;
}

/// Splits a model expression into the object and the key being assigned.
///
/// `a.b` gives `("a", Some("\"b\""))`, `a[b][c]` gives `("a[b]", Some("c"))`
/// and a bare identifier has no key.
pub fn parse_model(value: &str) -> (String, Option<String>) {
	let value = value.trim();
	let chars: Vec<char> = value.chars().collect();
	let len = chars.len();

	if !value.contains('[') || value.rfind(']').is_some_and(|index| index + 1 < value.len()) {
		return match value.rfind('.') {
			Some(index) => (value[..index].to_owned(), Some(format!("\"{}\"", &value[index + 1..]))),
			None => (value.to_owned(), None),
		};
	}

	let skip_string = |mut index: usize, quote: char| {
		index += 1;
		while index < len && chars[index] != quote {
			index += 1;
		}
		index
	};

	let mut index = 0;
	let mut open = 0;
	let mut close = len;
	while index < len {
		let c = chars[index];
		if c == '"' || c == '\'' {
			index = skip_string(index, c);
		} else if c == '[' {
			open = index;
			let mut depth = 0;
			while index < len {
				let c = chars[index];
				if c == '"' || c == '\'' {
					index = skip_string(index, c);
				} else if c == '[' {
					depth += 1;
				} else if c == ']' {
					depth -= 1;
					if depth == 0 {
						close = index;
						break;
					}
				}
				index += 1;
			}
		}
		index += 1;
	}

	let exp: String = chars[..open].iter().collect();
	let key: String = chars[(open + 1).min(close)..close].iter().collect();
	(exp, Some(key))
}

/// Code assigning `assignment` to the model expression `value`.
pub fn gen_assignment_code(value: &str, assignment: &str) -> String {
	match parse_model(value) {
		(_, None) => format!("{value}={assignment}"),
		(exp, Some(key)) => format!("$set({exp}, {key}, {assignment})"),
	}
}
