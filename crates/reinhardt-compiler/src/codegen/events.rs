//! Event handler code.
//!
//! A handler value is one of three shapes:
//!
//! - a method path (`onClick`, `a.b['c']`), passed through as the listener
//! - a function expression (`e => go(e)`), passed through as well
//! - an inline statement (`count++`, `go($event)`), wrapped in
//!   `function($event){...}`
//!
//! Modifiers always force the wrapper so guards can run before the handler.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use reinhardt_compiler_ast::Handler;

use crate::util::quote;

static FN_EXP: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^([\w$]+|\([^)]*?\))\s*=>|^function(?:\s+[\w$]+)?\s*\(")
		.expect("FN_EXP: invalid regex pattern")
});
static FN_INVOKE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\([^)]*?\);*$").expect("FN_INVOKE: invalid regex pattern"));
static SIMPLE_PATH: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r#"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\['[^']*?'\]|\["[^"]*?"\]|\[\d+\]|\[[A-Za-z_$][\w$]*\])*$"#,
	)
	.expect("SIMPLE_PATH: invalid regex pattern")
});

/// Key code(s) of a key alias.
fn key_code(key: &str) -> Option<&'static str> {
	Some(match key {
		"esc" => "27",
		"tab" => "9",
		"enter" => "13",
		"space" => "32",
		"up" => "38",
		"left" => "37",
		"right" => "39",
		"down" => "40",
		"delete" => "[8,46]",
		_ => return None,
	})
}

/// `KeyboardEvent.key` value(s) of a key alias.
fn key_name(key: &str) -> Option<&'static str> {
	Some(match key {
		"esc" => r#"["Esc","Escape"]"#,
		"tab" => r#""Tab""#,
		"enter" => r#""Enter""#,
		"space" => r#"[" ","Spacebar"]"#,
		"up" => r#"["Up","ArrowUp"]"#,
		"left" => r#"["Left","ArrowLeft"]"#,
		"right" => r#"["Right","ArrowRight"]"#,
		"down" => r#"["Down","ArrowDown"]"#,
		"delete" => r#"["Backspace","Delete","Del"]"#,
		_ => return None,
	})
}

fn guard(condition: &str) -> String {
	format!("if({condition})return null;")
}

fn modifier_code(modifier: &str) -> Option<String> {
	Some(match modifier {
		"stop" => "$event.stopPropagation();".to_owned(),
		"prevent" => "$event.preventDefault();".to_owned(),
		"self" => guard("$event.target !== $event.currentTarget"),
		"ctrl" => guard("!$event.ctrlKey"),
		"shift" => guard("!$event.shiftKey"),
		"alt" => guard("!$event.altKey"),
		"meta" => guard("!$event.metaKey"),
		"left" => guard("'button' in $event && $event.button !== 0"),
		"middle" => guard("'button' in $event && $event.button !== 1"),
		"right" => guard("'button' in $event && $event.button !== 2"),
		_ => return None,
	})
}

/// `on:{...}` or `nativeOn:{...}`. Dynamic event names go through `_d`.
pub fn gen_handlers(events: &IndexMap<String, Vec<Handler>>, native: bool) -> String {
	let prefix = if native { "nativeOn:" } else { "on:" };
	let mut static_handlers = Vec::new();
	let mut dynamic_handlers = Vec::new();
	for (name, handlers) in events {
		let code = gen_handler_list(handlers);
		match handlers.as_slice() {
			[handler] if handler.dynamic => dynamic_handlers.push(format!("{name},{code}")),
			_ => static_handlers.push(format!("\"{name}\":{code}")),
		}
	}
	let static_handlers = format!("{{{}}}", static_handlers.join(","));
	if dynamic_handlers.is_empty() {
		format!("{prefix}{static_handlers}")
	} else {
		format!("{prefix}_d({static_handlers},[{}])", dynamic_handlers.join(","))
	}
}

fn gen_handler_list(handlers: &[Handler]) -> String {
	match handlers {
		[] => "function(){}".to_owned(),
		[handler] => gen_handler(handler),
		_ => format!("[{}]", handlers.iter().map(gen_handler).collect::<Vec<_>>().join(",")),
	}
}

/// Listener code for one handler.
pub fn gen_handler(handler: &Handler) -> String {
	let value = handler.value.as_str();
	let is_method_path = SIMPLE_PATH.is_match(value);
	let is_function_expression = FN_EXP.is_match(value);
	let is_function_invocation = SIMPLE_PATH.is_match(&FN_INVOKE.replace(value, ""));

	if handler.modifiers.is_empty() {
		if is_method_path || is_function_expression {
			return value.to_owned();
		}
		if is_function_invocation {
			return format!("function($event){{return {value}}}");
		}
		return format!("function($event){{{value}}}");
	}

	let mut guards = String::new();
	let mut keys = Vec::new();
	for modifier in &handler.modifiers {
		if let Some(code) = modifier_code(modifier) {
			guards.push_str(&code);
			if key_code(modifier).is_some() {
				keys.push(modifier.as_str());
			}
		} else if modifier == "exact" {
			let unset: Vec<String> = ["ctrl", "shift", "alt", "meta"]
				.into_iter()
				.filter(|key| !handler.modifiers.iter().any(|m| m == key))
				.map(|key| format!("$event.{key}Key"))
				.collect();
			guards.push_str(&guard(&unset.join("||")));
		} else {
			keys.push(modifier.as_str());
		}
	}

	let mut code = String::new();
	if !keys.is_empty() {
		code.push_str(&gen_key_filter(&keys));
	}
	code.push_str(&guards);
	let handler_code = if is_method_path {
		format!("return {value}.apply(null, arguments)")
	} else if is_function_expression {
		format!("return ({value}).apply(null, arguments)")
	} else if is_function_invocation {
		format!("return {value}")
	} else {
		value.to_owned()
	};
	format!("function($event){{{code}{handler_code}}}")
}

/// Keyboard filters only apply to key events.
fn gen_key_filter(keys: &[&str]) -> String {
	let filters: Vec<String> = keys.iter().map(|key| gen_filter_code(key)).collect();
	format!("if(!$event.type.indexOf('key')&&{})return null;", filters.join("&&"))
}

fn gen_filter_code(key: &str) -> String {
	let digits: String = key.chars().take_while(char::is_ascii_digit).collect();
	if let Ok(code) = digits.parse::<u32>()
		&& code != 0
	{
		return format!("$event.keyCode!=={code}");
	}
	format!(
		"_k($event.keyCode,{},{},$event.key,{})",
		quote(key),
		key_code(key).unwrap_or("undefined"),
		key_name(key).unwrap_or("undefined")
	)
}
