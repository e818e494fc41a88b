//! AST → IR conversion tests
//!
//! Most tests compare the rendered IR, which names every intermediate
//! result. Synthesized names print with a trailing `_`.

use pants::ast::Position;
use pants::codegen::ir::{Expression, Identifier, Program, Value};
use pants::codegen::{convert, ConversionError};

// ============================================================================
// Helpers
// ============================================================================

fn convert_source(source: &str) -> Program {
    let ast = pants::parse(source).unwrap_or_else(|e| panic!("parse failed: {}", e));
    convert(ast).unwrap_or_else(|e| panic!("conversion failed: {}", e))
}

fn ir(source: &str) -> String {
    convert_source(source).to_string()
}

fn convert_err(source: &str) -> ConversionError {
    let ast = pants::parse(source).unwrap_or_else(|e| panic!("parse failed: {}", e));
    match convert(ast) {
        Ok(program) => panic!("expected conversion error, got {}", program),
        Err(e) => e,
    }
}

fn at(line: usize, col: usize) -> Position {
    Position::new(line, col)
}

// ============================================================================
// Calls
// ============================================================================

mod calls {
    use super::*;

    #[test]
    fn open_and_closed_calls_agree() {
        for source in ["x = { 3 }\nx.\n", "x = { 3 }\nx()\n", "x = { 3 }\nx."] {
            assert_eq!(ir(source), "x = {3};\nir_1_ = x()", "source: {:?}", source);
        }
    }

    #[test]
    fn positions_follow_the_source() {
        let program = convert_source("x = { 3 }\nx.");
        match &program.expressions[..] {
            [Expression::Assignment {
                assignee,
                local: true,
                pos,
                ..
            }, Expression::ReturnValue {
                assignee: result,
                callee,
                pos: call_pos,
                ..
            }] => {
                assert_eq!(assignee, &Identifier::user("x", at(1, 1)));
                assert_eq!(assignee.pos, at(1, 1));
                assert_eq!(*pos, at(1, 5));
                assert_eq!(result.pos, at(2, 2));
                assert_eq!(*call_pos, at(2, 2));
                assert_eq!(callee.pos(), at(2, 1));
            }
            other => panic!("unexpected IR {:?}", other),
        }
        assert_eq!(
            program.lastval,
            Value::variable(Identifier::synthesized("ir_1", at(2, 2)))
        );
    }

    #[test]
    fn left_and_right_arguments() {
        assert_eq!(ir("1 f. 2"), "ir_1_ = f(1; 2)");
        assert_eq!(ir("f. 1 2"), "ir_1_ = f(1, 2)");
        assert_eq!(ir("x <. 3"), "ir_1_ = <(x; 3)");
    }

    #[test]
    fn argument_kinds() {
        assert_eq!(
            ir("f(a, :(xs), b:c, ::(kw))"),
            "ir_1_ = f(a, :(xs), b:c, ::(kw))"
        );
    }

    #[test]
    fn call_on_function_literal() {
        let program = convert_source("{||}.");
        assert_eq!(program.to_string(), "ir_1_ = {null_};\nir_2_ = ir_1_()");
        assert_eq!(program.expressions[1].pos(), at(1, 5));
    }

    #[test]
    fn nested_calls_are_flattened() {
        assert_eq!(ir("f(g. 1)"), "ir_2_ = g(1);\nir_1_ = f(ir_2_)");
    }

    #[test]
    fn more_than_one_open_call_is_rejected() {
        let err = convert_err("f. g. 1");
        assert_eq!(err.pos(), at(1, 4));
        assert_eq!(
            err.to_string(),
            "Error at line 1, column 4: application has more than one open calls"
        );
    }
}

// ============================================================================
// Assignments
// ============================================================================

mod assignments {
    use super::*;

    #[test]
    fn field_mutation() {
        let program = convert_source("x.x := 3\n");
        assert_eq!(program.to_string(), "x.x = 3");
        assert!(matches!(
            &program.expressions[0],
            Expression::ObjectMutation { value: Value::Integer { value: 3, pos }, pos: mutation_pos, .. }
                if *pos == at(1, 8) && *mutation_pos == at(1, 1)
        ));
    }

    #[test]
    fn value_assignment() {
        let program = convert_source("x = 1");
        assert_eq!(program.to_string(), "x = 1");
        assert!(matches!(program.lastval, Value::Integer { value: 1, .. }));

        assert_eq!(ir("s = \"hi\""), "s = \"hi\"");
    }

    #[test]
    fn mutation_goes_through_a_temporary() {
        assert_eq!(ir("x := f."), "ir_1_ = f();\nx := ir_1_");
    }

    #[test]
    fn self_reference_is_predeclared() {
        assert_eq!(
            ir("f = {|n| f(n)}"),
            "f = null_;\nir_1_ = {|n|\n  ir_2_ = f(n);\n  ir_2_;\n};\nf := ir_1_"
        );
    }

    #[test]
    fn chained_assignment_shares_the_call() {
        assert_eq!(ir("a = b = f."), "b = f();\na = b");
    }
}

// ============================================================================
// Desugaring
// ============================================================================

mod desugaring {
    use super::*;

    #[test]
    fn index_lookup() {
        assert_eq!(ir("a[1]"), "ir_2_ = a.~index;\nir_1_ = ir_2_(1)");
    }

    #[test]
    fn index_update() {
        assert_eq!(ir("x[4] = 5"), "ir_1_ = x.~update;\nir_2_ = ir_1_(4, 5)");
    }

    #[test]
    fn field_lookup() {
        assert_eq!(ir("a.b"), "ir_1_ = a.b");
    }

    #[test]
    fn array_literal() {
        assert_eq!(ir("y = [1, f.]"), "ir_1_ = f();\ny = Array(1, ir_1_)");
    }

    #[test]
    fn dict_literal_updates_in_order() {
        assert_eq!(
            ir("d = {1: a, 2: b}"),
            "d = Dictionary();\nir_1_ = d.~update;\nir_2_ = ir_1_(1, a);\nir_2_ = ir_1_(2, b)"
        );
        assert_eq!(ir("d = {}"), "d = Dictionary()");
    }

    #[test]
    fn binding_subexpression_gets_a_scope() {
        assert_eq!(
            ir("(y = 1; y)"),
            "ir_1_ = {\n  y = 1;\n  y;\n};\nir_2_ = ir_1_()"
        );
    }

    #[test]
    fn plain_subexpression_is_inlined() {
        let program = convert_source("(f. 1; 2)");
        assert_eq!(program.to_string(), "ir_1_ = f(1)");
        assert!(matches!(program.lastval, Value::Integer { value: 2, .. }));
    }

    #[test]
    fn defaults_are_evaluated_outside() {
        assert_eq!(ir("g = {|a, b:f.| a}"), "ir_1_ = f();\ng = {|a, b:ir_1_|a}");
    }
}
