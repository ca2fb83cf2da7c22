//! Brewline: CoffeeScript code intelligence borrowed from the JavaScript
//! toolchain.
//!
//! The dialect compiler turns a CoffeeScript buffer into JavaScript plus a
//! source map; JavaScript tools check and complete that output; the results
//! are mapped back onto the CoffeeScript buffer.

pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod hash;
pub mod host;
pub mod logging;
pub mod lsp;
pub mod mapper;
pub mod pipeline;
pub mod sourcemap;
pub mod synthesize;
pub mod text;
pub mod vdoc;
pub mod verifier;

pub use compiler::{CompilationResult, CompilerFault, DialectCompiler};
pub use config::Config;
pub use diagnostic::Diagnostic;
pub use pipeline::Engine;
