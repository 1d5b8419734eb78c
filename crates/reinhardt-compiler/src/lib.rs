//! Template compiler
//!
//! Turns an HTML-like template into the source of a render function in four
//! stages:
//!
//! 1. [`html`]: a forgiving tokenizer that reports start tags, end tags,
//!    text and comments with byte spans.
//! 2. [`parser`]: builds the template [`Ast`] and reads directives
//!    (`v-if`, `v-for`, `v-slot`, bindings, events) into typed fields.
//! 3. [`optimizer`]: marks subtrees that never change.
//! 4. [`codegen`]: emits render code, hoisting static subtrees.
//!
//! [`compile`] runs all four. [`TemplateCompiler`] adds conversion of the
//! code into host functions and a cache.
//!
//! Problems in a template never abort compilation; they are collected as
//! [`Diagnostic`]s in development mode and dropped in production mode.
//!
//! ## Platforms
//!
//! Tag knowledge ([`Platform`]), attribute modules ([`Module`]) and
//! directive generators ([`DirectiveHandler`]) are supplied through
//! [`CompilerOptions`]. [`CompilerOptions::web`] wires the HTML platform.

pub mod code_frame;
pub mod codegen;
pub mod compile;
pub mod diagnostics;
pub mod directives;
pub mod error;
pub mod helpers;
pub mod html;
pub mod modules;
pub mod optimizer;
pub mod options;
pub mod parser;
pub mod platform;
pub mod text;
pub mod to_function;
pub mod util;

pub use code_frame::generate_code_frame;
pub use codegen::{CodegenResult, generate};
pub use compile::{CompiledResult, compile};
pub use diagnostics::{Diagnostic, Diagnostics, Span};
pub use directives::{BindObject, DirectiveContext, DirectiveHandler, web_directives};
pub use error::{FunctionGenerationError, FunctionResult};
pub use modules::{Module, web_modules};
pub use optimizer::optimize;
pub use options::{CompilerConfig, CompilerOptions, WhitespaceMode};
pub use parser::{ParseContext, parse};
pub use platform::{Platform, WebPlatform};
pub use reinhardt_compiler_ast::{Ast, AstNode, Element, NodeId};
pub use text::{Delimiters, ParsedText, parse_text};
pub use to_function::{CompiledFunctions, FunctionFactory, SourceFactory, TemplateCompiler};
