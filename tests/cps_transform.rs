//! CPS transformation tests
//!
//! Every program is wrapped in the same prelude: `identity_cont` is defined,
//! then the top-level computation continuation is bound to it and the
//! delimited continuation to `halt_cont`.

use pants::ast::Position;
use pants::codegen::cps::{Expression, Identifier, Value};
use pants::codegen::{convert, transform, CPSTransformer};

// ============================================================================
// Helpers
// ============================================================================

fn cps(source: &str) -> Expression {
    let ast = pants::parse(source).unwrap_or_else(|e| panic!("parse failed: {}", e));
    let ir = convert(ast).unwrap_or_else(|e| panic!("conversion failed: {}", e));
    transform(ir).unwrap_or_else(|e| panic!("transformation failed: {}", e))
}

fn render(source: &str) -> String {
    cps(source).to_string()
}

fn prelude(value: &str, delim: &str) -> String {
    format!(
        "identity_cont_ = {{|{v}| (k: -, d: {d})\n  {d}({v}) (k: -, d: -)\n}};\n\
         cps_1_ = identity_cont_;\n",
        v = value,
        d = delim
    )
}

fn user(name: &str) -> Identifier {
    Identifier::user(name, Position::default())
}

// ============================================================================
// Statement Lists
// ============================================================================

mod statements {
    use super::*;

    #[test]
    fn tail_call_uses_the_outer_continuations() {
        let expected = prelude("cps_3_", "cps_4_") + "cps_2_ = halt_cont_;\nf(1) (k: cps_1_, d: cps_2_)";
        assert_eq!(render("f. 1"), expected);
    }

    #[test]
    fn non_tail_call_gets_a_continuation() {
        let expected = prelude("cps_5_", "cps_6_")
            + "cps_4_ = halt_cont_;\n\
               cps_3_ = {|ir_1_| (k: -, d: cps_2_)\n  cps_1_(2) (k: -, d: cps_2_)\n};\n\
               f(1) (k: cps_3_, d: cps_4_)";
        assert_eq!(render("f. 1\n2"), expected);
    }

    #[test]
    fn functions_take_continuation_parameters() {
        let expected = prelude("cps_5_", "cps_6_")
            + "cps_2_ = halt_cont_;\n\
               g = {|a| (k: cps_3_, d: cps_4_)\n  cps_3_(a) (k: -, d: cps_4_)\n};\n\
               g(1) (k: cps_1_, d: cps_2_)";
        assert_eq!(render("g = {|a| a}\ng. 1"), expected);
    }

    #[test]
    fn field_mutation_is_kept_in_order() {
        let exp = cps("x.y := 3\nf. x");
        let rendered = exp.to_string();
        let mutation = rendered.find("x.y = 3;").expect("mutation rendered");
        let call = rendered.find("f(x)").expect("call rendered");
        assert!(mutation < call);
    }

    #[test]
    fn empty_program_returns_null() {
        let rendered = render("");
        assert!(rendered.ends_with("cps_1_(null_) (k: -, d: cps_2_)"), "{}", rendered);
    }
}

// ============================================================================
// Control Operators
// ============================================================================

mod control {
    use super::*;

    #[test]
    fn reset_is_defined_when_used() {
        let expected = prelude("cps_a_", "cps_b_")
            + "cps_2_ = halt_cont_;\n\
               reset = {|cps_5_| (k: cps_6_, d: cps_7_)\n  \
               cps_9_ = {|cps_8_| (k: -, d: -)\n    cps_6_(cps_8_) (k: -, d: cps_7_)\n  };\n  \
               cps_5_() (k: identity_cont_, d: cps_9_)\n};\n\
               ir_2_ = { (k: cps_3_, d: cps_4_)\n  cps_3_(1) (k: -, d: cps_4_)\n};\n\
               reset(ir_2_) (k: cps_1_, d: cps_2_)";
        assert_eq!(render("reset {|| 1}"), expected);
    }

    #[test]
    fn shift_is_defined_when_used() {
        let exp = cps("reset {|| shift {|k| k. 1}}");
        // both operators are bound before the program body uses them
        assert!(!exp.references(&user("reset")));
        assert!(!exp.references(&user("shift")));
        let rendered = exp.to_string();
        assert!(rendered.contains("\nshift = {|"), "{}", rendered);
        assert!(rendered.contains("\nreset = {|"), "{}", rendered);
        // shift calls the user function with the top-level identity
        assert!(rendered.contains("(k: identity_cont_, d: "), "{}", rendered);
    }

    #[test]
    fn control_operators_are_not_defined_when_unused() {
        let rendered = render("f. 1");
        assert!(!rendered.contains("reset"));
        assert!(!rendered.contains("shift"));
    }

    #[test]
    fn shadowed_reset_is_not_redefined() {
        let rendered = render("{|reset| reset. 1}");
        assert!(!rendered.contains("\nreset = {|"), "{}", rendered);
    }

    #[test]
    fn cont_binds_the_undelimited_continuation() {
        let rendered = render("f(cont)");
        assert!(
            rendered.contains(
                "cont = {|cps_3_| (k: -, d: -)\n  cps_1_(cps_3_) (k: cps_1_, d: cps_2_)\n};\nf(cont) (k: cps_1_, d: cps_2_)"
            ),
            "{}",
            rendered
        );
    }

    #[test]
    fn cont_is_not_bound_when_unused() {
        assert!(!render("f. 1").contains("cont ="));
    }
}

// ============================================================================
// Transformer instances
// ============================================================================

mod instances {
    use super::*;

    #[test]
    fn each_transformer_starts_fresh() {
        let source = "x = f. 1\ng. x";
        let ir = || convert(pants::parse(source).unwrap()).unwrap();
        let first = CPSTransformer::new().transform(ir()).unwrap();
        let second = CPSTransformer::new().transform(ir()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn prelude_binds_identity_first() {
        match cps("f.") {
            Expression::Assignment {
                assignee,
                value: Value::Callable(identity),
                local: true,
                ..
            } => {
                assert_eq!(assignee.name, "identity_cont");
                assert!(!assignee.user_provided);
                assert!(identity.comp_cont.is_none());
                assert!(identity.delim_cont.is_some());
            }
            other => panic!("unexpected prelude {}", other),
        }
    }
}
