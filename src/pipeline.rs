//! End-to-end compilation: source text to cleaned CPS

use log::debug;

use crate::codegen::cleanup::{Cleanup, RemovedDefinition};
use crate::codegen::convert::convert;
use crate::codegen::cps::Expression;
use crate::codegen::cps_transform::CPSTransformer;
use crate::errors::CompileError;
use crate::parser::{Parser, ParserOptions};

/// Options for a single compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Memoize term parses while backtracking
    pub memoize_terms: bool,
    /// Drop unused local bindings from the CPS output
    pub cleanup: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            memoize_terms: true,
            cleanup: true,
        }
    }
}

/// Runs parse, convert, transform and cleanup in order.
#[derive(Debug, Default)]
pub struct Pipeline {
    options: CompileOptions,
    removed: Vec<RemovedDefinition>,
}

/// Compile with default options
pub fn compile(source: &str) -> Result<Expression, CompileError> {
    Pipeline::default().compile(source)
}

impl Pipeline {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            removed: Vec::new(),
        }
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Definitions elided by cleanup during the last compilation
    pub fn removed(&self) -> &[RemovedDefinition] {
        &self.removed
    }

    pub fn compile(&mut self, source: &str) -> Result<Expression, CompileError> {
        self.removed.clear();
        let parser_options = ParserOptions {
            memoize_terms: self.options.memoize_terms,
        };
        let ast = Parser::with_options(source, parser_options).parse()?;
        let ir = convert(ast)?;
        let cps = CPSTransformer::new().transform(ir)?;
        if !self.options.cleanup {
            return Ok(cps);
        }
        let mut pass = Cleanup::new();
        let cleaned = pass.run(cps);
        self.removed = pass.removed().to_vec();
        debug!("cleanup removed {} definitions", self.removed.len());
        Ok(cleaned)
    }
}
