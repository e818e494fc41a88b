//! End-to-end compilation tests: source text to cleaned CPS

use pants::ast::Position;
use pants::codegen::cleanup::{Cleanup, RemovedDefinition};
use pants::codegen::cps::Identifier;
use pants::{compile, render_error, CompileError, CompileOptions, ErrorConfig, Pipeline};

// ============================================================================
// Helpers
// ============================================================================

fn compile_ok(source: &str) -> String {
    compile(source)
        .unwrap_or_else(|e| panic!("compile failed for {:?}: {}", source, e))
        .to_string()
}

fn compile_err(source: &str) -> CompileError {
    match compile(source) {
        Ok(exp) => panic!("expected error for {:?}, got {}", source, exp),
        Err(e) => e,
    }
}

// ============================================================================
// Cleanup
// ============================================================================

mod cleanup {
    use super::*;

    #[test]
    fn unused_local_is_dropped() {
        let mut pipeline = Pipeline::default();
        let exp = pipeline.compile("x = 1\nf. 2").unwrap();
        assert_eq!(
            exp.to_string(),
            "identity_cont_ = {|cps_3_| (k: -, d: cps_4_)\n  cps_4_(cps_3_) (k: -, d: -)\n};\n\
             cps_1_ = identity_cont_;\n\
             cps_2_ = halt_cont_;\n\
             f(2) (k: cps_1_, d: cps_2_)"
        );
        assert_eq!(
            pipeline.removed(),
            &[RemovedDefinition {
                name: Identifier::user("x", Position::new(1, 1)),
                pos: Position::new(1, 1),
            }]
        );
    }

    #[test]
    fn mutated_binding_is_kept() {
        let mut pipeline = Pipeline::default();
        let rendered = pipeline.compile("x = 1\nx := 2\nf. x").unwrap().to_string();
        assert!(rendered.contains("x = 1;\nx := 2;\nf(x)"), "{}", rendered);
        assert!(pipeline.removed().is_empty());
    }

    #[test]
    fn unused_function_is_dropped() {
        let rendered = compile_ok("g = {|a| a}\nf. 1");
        assert!(!rendered.contains("g ="), "{}", rendered);
    }

    #[test]
    fn cleanup_runs_inside_functions() {
        let rendered = compile_ok("g = {|a| unused = 1; a}\ng. 1");
        assert!(rendered.contains("g = {|a|"), "{}", rendered);
        assert!(!rendered.contains("unused"), "{}", rendered);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let raw = Pipeline::new(CompileOptions {
            cleanup: false,
            ..CompileOptions::default()
        })
        .compile("a = 1\nb = {|q| z = q; q}\nf. (c = 2; c)")
        .unwrap();
        let mut pass = Cleanup::new();
        let once = pass.run(raw);
        let removed = pass.removed().len();
        assert!(removed > 0);
        let twice = pass.run(once.clone());
        assert_eq!(once, twice);
        assert_eq!(pass.removed().len(), removed);
    }
}

// ============================================================================
// Options
// ============================================================================

mod options {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompileOptions::default();
        assert!(options.memoize_terms);
        assert!(options.cleanup);
        assert_eq!(Pipeline::default().options(), options);
    }

    #[test]
    fn memoization_does_not_change_output() {
        let source = "a = f(b, c:d)[0]\ng. (1; 2) {1: [3]} a";
        let memo = Pipeline::default().compile(source).unwrap();
        let plain = Pipeline::new(CompileOptions {
            memoize_terms: false,
            ..CompileOptions::default()
        })
        .compile(source)
        .unwrap();
        assert_eq!(memo, plain);
    }
}

// ============================================================================
// Errors
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn stage_is_reported() {
        let err = compile_err("{|a,b,c:3,d:4,q(opt)| 0}");
        assert!(matches!(err, CompileError::Parse(_)));
        assert_eq!(err.position(), Position::new(1, 16));
        assert_eq!(err.message(), "unexpected input for argument list");

        let err = compile_err("f. g. 1");
        assert!(matches!(err, CompileError::Conversion(_)));
        assert_eq!(err.kind(), "CONVERSION ERROR");
    }

    #[test]
    fn display_matches_the_stage_error() {
        let err = compile_err(".x := 3");
        assert_eq!(err.to_string(), "Error at line 1, column 4: unexpected input");
    }

    #[test]
    fn rendered_with_snippet() {
        let source = "x = 1\ny = (2";
        let err = compile_err(source);
        let rendered = render_error(&err, source, &ErrorConfig::default());
        assert_eq!(
            rendered,
            format!(
                "-- SYNTAX ERROR {}\n\n<input>:2:7\n\n\
                 Error at line 2, column 7: unexpected input at end of subexpression\n\n\
                 2 | y = (2\n          ^",
                "-".repeat(44)
            )
        );
    }
}
