use beryl::ast::{Expr, Spanned, Target};
use beryl::bind::{ArgBinder, BindError};
use beryl::expr::BasicExprCompiler;
use beryl::instr::Instr;
use beryl::machine::{Machine, MachineError, Value};

// ---- helpers ----

fn required(name: &str) -> Spanned<Target> {
    Spanned::unknown(Target::Required { name: name.into() })
}

fn local(name: &str) -> Spanned<Target> {
    Spanned::unknown(Target::LocalVariable { name: name.into() })
}

fn optional(name: &str, default: Expr) -> Spanned<Target> {
    Spanned::unknown(Target::Optional {
        name: name.into(),
        default: Box::new(Spanned::unknown(default)),
    })
}

fn rest(name: Option<&str>) -> Spanned<Target> {
    Spanned::unknown(Target::Rest { name: name.map(String::from) })
}

fn keyword(name: &str) -> Spanned<Target> {
    Spanned::unknown(Target::RequiredKeyword { name: name.into() })
}

fn opt_keyword(name: &str, default: Expr) -> Spanned<Target> {
    Spanned::unknown(Target::OptionalKeyword {
        name: name.into(),
        default: Box::new(Spanned::unknown(default)),
    })
}

fn kwrest(name: Option<&str>) -> Spanned<Target> {
    Spanned::unknown(Target::KeywordRest { name: name.map(String::from) })
}

fn multi(lefts: Vec<Spanned<Target>>) -> Spanned<Target> {
    Spanned::unknown(Target::Multi { lefts, rest: None, rights: Vec::new() })
}

fn lower(targets: &[Spanned<Target>]) -> Vec<Instr> {
    let mut expr = BasicExprCompiler;
    ArgBinder::new(&mut expr, "test.brl", true, false)
        .compile(targets)
        .expect("lowering failed")
}

fn lower_err(targets: &[Spanned<Target>]) -> BindError {
    let mut expr = BasicExprCompiler;
    ArgBinder::new(&mut expr, "test.brl", true, false)
        .compile(targets)
        .expect_err("lowering should fail")
}

fn bind(targets: &[Spanned<Target>], args: Vec<Value>) -> Machine {
    Machine::bind(&lower(targets), args, None).expect("binding failed")
}

fn bind_kw(
    targets: &[Spanned<Target>],
    args: Vec<Value>,
    kwargs: Vec<(&str, Value)>,
) -> Result<Machine, MachineError> {
    let kwargs = kwargs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    Machine::bind(&lower(targets), args, Some(kwargs))
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&i| Value::Int(i)).collect()
}

// ---- positional consumption ----

#[test]
fn requireds_bind_in_order() {
    let m = bind(&[required("a"), required("b")], ints(&[1, 2]));
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("b"), Some(&Value::Int(2)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn surplus_arguments_are_ignored() {
    let m = bind(&[required("a"), required("b")], ints(&[1, 2, 3]));
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("b"), Some(&Value::Int(2)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn missing_arguments_bind_nil() {
    let m = bind(&[required("a"), required("b")], ints(&[1]));
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("b"), Some(&Value::Nil));
}

#[test]
fn rest_collects_middle_posts_take_tail() {
    // a, *r, c against five values: requireds at both ends, the rest
    // scoops what remains.
    let m = bind(
        &[required("a"), rest(Some("r")), required("c")],
        ints(&[1, 2, 3, 4, 5]),
    );
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("c"), Some(&Value::Int(5)));
    assert_eq!(m.local("r"), Some(&Value::array(ints(&[2, 3, 4]))));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn rest_collects_empty_when_posts_exhaust() {
    let m = bind(&[required("a"), rest(Some("r")), required("c")], ints(&[1, 2]));
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("c"), Some(&Value::Int(2)));
    assert_eq!(m.local("r"), Some(&Value::array(vec![])));
}

#[test]
fn anonymous_rest_discards_middle() {
    let m = bind(&[required("a"), rest(None), required("c")], ints(&[1, 2, 3, 4]));
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("c"), Some(&Value::Int(4)));
    assert!(m.local("r").is_none());
    assert_eq!(m.stack_len(), 0);
}

// ---- optional deferral ----

#[test]
fn optional_takes_value_when_supplied() {
    let m = bind(
        &[optional("a", Expr::Integer(10)), required("b")],
        ints(&[5, 6]),
    );
    assert_eq!(m.local("a"), Some(&Value::Int(5)));
    assert_eq!(m.local("b"), Some(&Value::Int(6)));
}

#[test]
fn optional_defaults_when_requireds_need_the_value() {
    // One value, and b is required: the optional must yield it.
    let m = bind(&[optional("a", Expr::Integer(10)), required("b")], ints(&[5]));
    assert_eq!(m.local("a"), Some(&Value::Int(10)));
    assert_eq!(m.local("b"), Some(&Value::Int(5)));
}

#[test]
fn optional_default_reads_earlier_parameter() {
    let m = bind(
        &[required("a"), optional("b", Expr::LocalRead("a".into()))],
        ints(&[7]),
    );
    assert_eq!(m.local("a"), Some(&Value::Int(7)));
    assert_eq!(m.local("b"), Some(&Value::Int(7)));
}

#[test]
fn circular_default_is_rejected() {
    let err = lower_err(&[optional("x", Expr::LocalRead("x".into()))]);
    assert!(matches!(err, BindError::CircularDefault { ref name, .. } if name == "x"));
    assert_eq!(err.code(), "BRL-B003");
}

// ---- keywords ----

#[test]
fn keywords_extract_from_the_hash() {
    let m = bind_kw(
        &[keyword("x"), opt_keyword("y", Expr::Integer(2))],
        vec![],
        vec![("x", Value::Int(1))],
    )
    .expect("binding failed");
    assert_eq!(m.local("x"), Some(&Value::Int(1)));
    assert_eq!(m.local("y"), Some(&Value::Int(2)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn supplied_optional_keyword_wins_over_default() {
    let m = bind_kw(
        &[opt_keyword("y", Expr::Integer(2))],
        vec![],
        vec![("y", Value::Int(9))],
    )
    .expect("binding failed");
    assert_eq!(m.local("y"), Some(&Value::Int(9)));
}

#[test]
fn unknown_keyword_is_a_runtime_error() {
    let err = bind_kw(
        &[keyword("x")],
        vec![],
        vec![("x", Value::Int(1)), ("z", Value::Int(9))],
    )
    .expect_err("extra keyword should fail");
    assert!(matches!(err, MachineError::UnknownKeywords { ref keys } if keys == "z"));
    assert_eq!(err.code(), Some("BRL-R001"));
}

#[test]
fn missing_required_keyword_is_a_runtime_error() {
    let err = bind_kw(&[keyword("x")], vec![], vec![]).expect_err("missing keyword");
    assert!(matches!(err, MachineError::MissingKeyword { ref name } if name == "x"));
    assert_eq!(err.code(), Some("BRL-R002"));
}

#[test]
fn keyword_rest_absorbs_extras() {
    let m = bind_kw(
        &[keyword("x"), kwrest(Some("opts"))],
        vec![],
        vec![("x", Value::Int(1)), ("z", Value::Int(9))],
    )
    .expect("binding failed");
    assert_eq!(m.local("x"), Some(&Value::Int(1)));
    assert_eq!(
        m.local("opts"),
        Some(&Value::hash(vec![("z".to_string(), Value::Int(9))]))
    );
}

#[test]
fn keywords_mix_with_positionals() {
    let m = bind_kw(
        &[required("a"), keyword("x")],
        ints(&[5]),
        vec![("x", Value::Int(1))],
    )
    .expect("binding failed");
    assert_eq!(m.local("a"), Some(&Value::Int(5)));
    assert_eq!(m.local("x"), Some(&Value::Int(1)));
    assert_eq!(m.stack_len(), 0);
}

// ---- underscores ----

#[test]
fn repeated_underscores_keep_first_binding() {
    let m = bind(&[required("_"), required("_"), required("c")], ints(&[1, 2, 3]));
    assert_eq!(m.local("_"), Some(&Value::Int(1)));
    assert_eq!(m.local("c"), Some(&Value::Int(3)));
}

#[test]
fn underscore_prefixed_names_rebind_normally() {
    // Only the bare `_` collapses; `_a` is an ordinary name.
    let m = bind(&[required("_a"), required("_a")], ints(&[1, 2]));
    assert_eq!(m.local("_a"), Some(&Value::Int(2)));
}

// ---- destructuring ----

#[test]
fn nested_destructure_binds_elements() {
    let m = bind(
        &[required("a"), multi(vec![local("b"), local("c")])],
        vec![Value::Int(1), Value::array(ints(&[2, 3]))],
    );
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.local("b"), Some(&Value::Int(2)));
    assert_eq!(m.local("c"), Some(&Value::Int(3)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn nested_destructure_drops_overflow() {
    let m = bind(
        &[required("a"), multi(vec![local("b"), local("c")])],
        vec![Value::Int(1), Value::array(ints(&[2, 3, 4]))],
    );
    assert_eq!(m.local("b"), Some(&Value::Int(2)));
    assert_eq!(m.local("c"), Some(&Value::Int(3)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn nested_destructure_coerces_scalar() {
    let m = bind(
        &[multi(vec![local("b"), local("c")])],
        vec![Value::Int(5)],
    );
    assert_eq!(m.local("b"), Some(&Value::Int(5)));
    assert_eq!(m.local("c"), Some(&Value::Nil));
}

#[test]
fn nested_splat_collects() {
    let nested = Spanned::unknown(Target::Multi {
        lefts: vec![local("b")],
        rest: Some(Box::new(Spanned::unknown(Target::Splat {
            target: Some(Box::new(required("r"))),
        }))),
        rights: Vec::new(),
    });
    let m = bind(
        &[nested],
        vec![Value::array(ints(&[1, 2, 3]))],
    );
    assert_eq!(m.local("b"), Some(&Value::Int(1)));
    assert_eq!(m.local("r"), Some(&Value::array(ints(&[2, 3]))));
}

#[test]
fn splat_of_constant_is_rejected() {
    let bad = Spanned::unknown(Target::Multi {
        lefts: vec![local("a")],
        rest: Some(Box::new(Spanned::unknown(Target::Splat {
            target: Some(Box::new(Spanned::unknown(Target::Constant {
                name: "B".into(),
            }))),
        }))),
        rights: Vec::new(),
    });
    let mut expr = BasicExprCompiler;
    let err = ArgBinder::new(&mut expr, "test.brl", true, false)
        .compile_target(&bad)
        .expect_err("constant splat should fail");
    assert!(matches!(err, BindError::IllegalSplatTarget { kind: "constant target", .. }));
    assert_eq!(err.code(), "BRL-B002");
}

// ---- non-local targets ----

#[test]
fn sigil_targets_write_their_tables() {
    let targets = [
        Spanned::unknown(Target::InstanceVariable { name: "iv".into() }),
        Spanned::unknown(Target::GlobalVariable { name: "gv".into() }),
        Spanned::unknown(Target::ClassVariable { name: "cv".into() }),
    ];
    let m = bind(&targets, ints(&[1, 2, 3]));
    assert_eq!(m.ivars.get("iv"), Some(&Value::Int(1)));
    assert_eq!(m.globals.get("gv"), Some(&Value::Int(2)));
    assert_eq!(m.cvars.get("cv"), Some(&Value::Int(3)));
    assert!(m.locals.is_empty());
}

#[test]
fn constant_target_writes_constant_table() {
    let targets = [Spanned::unknown(Target::Constant { name: "LIMIT".into() })];
    let m = bind(&targets, ints(&[50]));
    assert_eq!(m.consts.get("LIMIT"), Some(&Value::Int(50)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn index_target_writes_through_receiver() {
    let targets = [Spanned::unknown(Target::Index {
        receiver: Box::new(Spanned::unknown(Expr::LocalRead("xs".into()))),
        arguments: vec![Spanned::unknown(Expr::Integer(1))],
    })];
    let instrs = lower(&targets);

    let xs = Value::array(ints(&[0, 0, 0]));
    let mut m = Machine::new();
    m.locals.insert("xs".to_string(), xs.clone());
    m.push(Value::array(ints(&[42])));
    m.run(&instrs).expect("binding failed");

    assert_eq!(xs, Value::array(ints(&[0, 42, 0])));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn safe_navigation_skips_nil_receiver() {
    let targets = [Spanned::unknown(Target::Call {
        receiver: Box::new(Spanned::unknown(Expr::Nil)),
        method: "size=".into(),
        safe_navigation: true,
    })];
    let m = bind(&targets, ints(&[5]));
    // No send happened, nothing bound, stack balanced.
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn attribute_write_reaches_self() {
    let targets = [Spanned::unknown(Target::Call {
        receiver: Box::new(Spanned::unknown(Expr::SelfRef)),
        method: "size=".into(),
        safe_navigation: false,
    })];
    let m = bind(&targets, ints(&[5]));
    match &m.self_value {
        Value::Object(fields) => {
            assert_eq!(fields.borrow().get("size"), Some(&Value::Int(5)));
        }
        other => panic!("self should be an object, got {other:?}"),
    }
    assert_eq!(m.stack_len(), 0);
}

// ---- trailing markers ----

#[test]
fn implicit_rest_discards_remainder() {
    let targets = [required("a"), Spanned::unknown(Target::ImplicitRest)];
    let m = bind(&targets, ints(&[1, 2, 3]));
    assert_eq!(m.local("a"), Some(&Value::Int(1)));
    assert_eq!(m.stack_len(), 0);
}

#[test]
fn no_keywords_marker_rejects_any_keywords() {
    let err = bind_kw(
        &[required("a"), Spanned::unknown(Target::NoKeywords)],
        ints(&[1]),
        vec![("z", Value::Int(9))],
    )
    .expect_err("keywords should be rejected");
    assert!(matches!(err, MachineError::UnknownKeywords { .. }));
}

// ---- stack discipline ----

#[test]
fn every_shape_leaves_the_stack_empty() {
    let shapes: Vec<Vec<Spanned<Target>>> = vec![
        vec![],
        vec![required("a")],
        vec![optional("a", Expr::Integer(1)), required("b")],
        vec![required("a"), rest(Some("r")), required("c")],
        vec![required("a"), multi(vec![local("b"), local("c")])],
    ];
    for targets in &shapes {
        let m = bind(targets, ints(&[1, 2, 3]));
        assert_eq!(m.stack_len(), 0, "unbalanced for {targets:?}");
    }
}

#[test]
fn empty_target_list_consumes_arguments() {
    let m = bind(&[], ints(&[1, 2]));
    assert_eq!(m.stack_len(), 0);
    assert!(m.locals.is_empty());
}
