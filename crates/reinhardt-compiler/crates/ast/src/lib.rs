//! AST definitions for the template compiler.
//!
//! The parser produces an [`Ast`]: an arena of [`AstNode`]s addressed by
//! [`NodeId`]. Elements refer to their parent and children by id, so the
//! tree can be decorated in place by directive processors and the static
//! analyzer without shared mutable pointers.
//!
//! ## Main Types
//!
//! - [`Ast`] - node arena plus the root id
//! - [`AstNode`] - element, interpolated text or plain text/comment
//! - [`Element`] - an element with its raw attributes and every field
//!   extracted from directives
//! - [`IfCondition`] - one branch of an if/else-if/else chain
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reinhardt_compiler_ast::{Ast, AstNode, Attr, Element};
//!
//! let mut ast = Ast::new();
//! let root = ast.push(AstNode::Element(Box::new(Element::new("div", vec![Attr::new("id", "app")], None))));
//! ast.set_root(root);
//! ```

mod element;
mod node;

pub use element::{Attr, ComponentModel, Directive, Element, Handler, IfCondition, ScopedSlots};
pub use node::{Ast, AstNode, ExpressionNode, NodeId, TextNode, TextToken};
