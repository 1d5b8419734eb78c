//! Node arena.

use serde::Serialize;

use crate::element::Element;

/// Index of a node in its [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Part of an interpolated text node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TextToken {
	/// Literal text between interpolations
	Literal(String),
	/// Expression source inside the delimiters
	Binding(String),
}

/// Text containing interpolations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionNode {
	/// Joined render expression, e.g. `"Hello "+_s(name)`
	pub expression: String,
	pub tokens: Vec<TextToken>,
	/// Source text
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
}

/// Plain text or a comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
	pub text: String,
	#[serde(rename = "isComment", skip_serializing_if = "std::ops::Not::not")]
	pub is_comment: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
}

impl TextNode {
	pub fn new(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			is_comment: false,
			start: None,
			end: None,
		}
	}

	pub fn comment(text: impl Into<String>) -> Self {
		Self {
			is_comment: true,
			..Self::new(text)
		}
	}
}

/// A template AST node.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AstNode {
	#[serde(rename = "1")]
	Element(Box<Element>),
	#[serde(rename = "2")]
	Expression(ExpressionNode),
	#[serde(rename = "3")]
	Text(TextNode),
}

impl AstNode {
	pub fn as_element(&self) -> Option<&Element> {
		match self {
			AstNode::Element(element) => Some(element),
			_ => None,
		}
	}

	pub fn as_element_mut(&mut self) -> Option<&mut Element> {
		match self {
			AstNode::Element(element) => Some(element),
			_ => None,
		}
	}

	pub fn is_element(&self) -> bool {
		matches!(self, AstNode::Element(_))
	}

	/// Static flag as decided by the optimizer. Text is always static,
	/// interpolated text never is.
	pub fn is_static(&self) -> bool {
		match self {
			AstNode::Element(element) => element.is_static,
			AstNode::Expression(_) => false,
			AstNode::Text(_) => true,
		}
	}

	pub fn start(&self) -> Option<usize> {
		match self {
			AstNode::Element(element) => element.start,
			AstNode::Expression(node) => node.start,
			AstNode::Text(node) => node.start,
		}
	}
}

/// Arena holding every node created while parsing one template.
///
/// Nodes detached from the tree (forbidden elements, conditional branches,
/// scoped slot definitions) stay in the arena and are reachable through the
/// fields that reference them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ast {
	nodes: Vec<AstNode>,
	root: Option<NodeId>,
}

impl Ast {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a node and returns its id.
	pub fn push(&mut self, node: AstNode) -> NodeId {
		self.nodes.push(node);
		NodeId(self.nodes.len() - 1)
	}

	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub fn set_root(&mut self, root: NodeId) {
		self.root = Some(root);
	}

	/// Root element, if the template produced one.
	pub fn root_element(&self) -> Option<&Element> {
		self.root.and_then(|id| self.element(id))
	}

	pub fn node(&self, id: NodeId) -> &AstNode {
		&self.nodes[id.0]
	}

	pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
		&mut self.nodes[id.0]
	}

	pub fn get(&self, id: NodeId) -> Option<&AstNode> {
		self.nodes.get(id.0)
	}

	pub fn element(&self, id: NodeId) -> Option<&Element> {
		self.nodes.get(id.0).and_then(AstNode::as_element)
	}

	pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
		self.nodes.get_mut(id.0).and_then(AstNode::as_element_mut)
	}

	/// Children of an element, empty for other nodes.
	pub fn children(&self, id: NodeId) -> Vec<NodeId> {
		self.element(id).map(|el| el.children.clone()).unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Depth-first pre-order walk from `id` through children, conditional
	/// branches and scoped slots.
	pub fn walk(&self, id: NodeId, f: &mut dyn FnMut(NodeId, &AstNode)) {
		let node = self.node(id);
		f(id, node);
		if let AstNode::Element(element) = node {
			for child in &element.children {
				self.walk(*child, f);
			}
			for condition in element.if_conditions.iter().skip(1) {
				self.walk(condition.block, f);
			}
			for slot in element.scoped_slots.values() {
				self.walk(*slot, f);
			}
		}
	}
}
