//! Platform transformation modules
//!
//! A module hooks into three points of element processing and contributes
//! to the generated data object:
//!
//! 1. `pre_transform_node` right after an element is created, before any
//!    directive is read. It may replace the element with another node.
//! 2. `transform_node` while the element's attributes are processed.
//! 3. `post_transform_node` once the element is closed.
//!
//! Modules also name the element keys they introduce that do not prevent
//! static hoisting.

mod class;
mod model;
mod style;

use std::sync::Arc;

use reinhardt_compiler_ast::{Element, NodeId};

use crate::parser::ParseContext;

pub use class::ClassModule;
pub use model::{InputBranch, ModelModule, expand_input_branch};
pub use style::{StyleModule, parse_style_text};

pub trait Module: Send + Sync {
	/// Element keys that may be present on a static element.
	fn static_keys(&self) -> &'static [&'static str] {
		&[]
	}

	/// Returns the node that replaces `id`, if any.
	fn pre_transform_node(&self, _cx: &mut ParseContext<'_>, _id: NodeId) -> Option<NodeId> {
		None
	}

	fn transform_node(&self, _cx: &mut ParseContext<'_>, _id: NodeId) {}

	fn post_transform_node(&self, _cx: &mut ParseContext<'_>, _id: NodeId) {}

	/// Entries added to the element's data object, each ending with a comma.
	fn gen_data(&self, _el: &Element) -> String {
		String::new()
	}
}

/// Modules of the web platform.
pub fn web_modules() -> Vec<Arc<dyn Module>> {
	vec![Arc::new(ClassModule), Arc::new(StyleModule), Arc::new(ModelModule)]
}
