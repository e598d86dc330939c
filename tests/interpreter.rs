use rox::error::LoxError;
use rox::interpreter::InterpreterOptions;
use rox::lox::{Lox, Status};

struct Outcome {
    status: Status,
    output: String,
    errors: Vec<LoxError>,
}

impl Outcome {
    fn kinds(&self) -> Vec<&'static str> {
        self.errors.iter().map(LoxError::kind_name).collect()
    }

    fn messages(&self) -> Vec<String> {
        self.errors.iter().map(LoxError::to_string).collect()
    }
}

fn run_with(source: &str, options: InterpreterOptions) -> Outcome {
    let mut buffer: Vec<u8> = Vec::new();

    let (status, errors) = {
        let mut lox = Lox::with_options(&mut buffer, options);
        let status = lox.run(source);
        (status, lox.diagnostics_mut().drain())
    };

    Outcome {
        status,
        output: String::from_utf8(buffer).unwrap(),
        errors,
    }
}

fn run(source: &str) -> Outcome {
    run_with(source, InterpreterOptions::default())
}

/// Runs a program expected to succeed and returns what it printed.
fn output(source: &str) -> String {
    let outcome = run(source);
    assert_eq!(
        outcome.status,
        Status::Ok,
        "unexpected errors: {:?}",
        outcome.messages()
    );
    outcome.output
}

// ───────────────────────── expressions ─────────────────────────

#[test]
fn arithmetic_and_concatenation() {
    let expected = "3\n3.5\nab\n-2\ntrue\n";
    let actual = output(
        r#"
        print 1 + 2;
        print 7 / 2;
        print "a" + "b";
        print -(1 + 1);
        print 2 + 3 == 3 + 2;
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn division_by_zero_follows_ieee() {
    let expected = "Infinity\n-Infinity\nNaN\nfalse\n";
    let actual = output(
        r#"
        print 1 / 0;
        print -1 / 0;
        var nan = 0 / 0;
        print nan;
        print nan == nan;
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn logical_operators_return_operand_values() {
    let expected = "x\nfalse\n2\ntrue\nnil\n";
    let actual = output(
        r#"
        print nil or "x";
        print false and 1;
        print 1 and 2;
        print !nil;
        print nil and undefinedIsNeverEvaluated;
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn equality_never_coerces() {
    let expected = "true\ntrue\nfalse\nfalse\ntrue\nfalse\n";
    let actual = output(
        r#"
        print 1 == 1;
        print "a" == "a";
        print nil == false;
        print 1 == "1";
        class A {}
        var a = A();
        print a == a;
        print a == A();
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn callables_render() {
    let expected = "<fn f>\n<native fn>\nPoint\nPoint instance\n";
    let actual = output(
        r#"
        fun f() {}
        print f;
        print clock;
        class Point {}
        print Point;
        print Point();
        "#,
    );
    assert_eq!(expected, actual);
}

// ───────────────────────── scoping ─────────────────────────

#[test]
fn block_shadowing() {
    let expected = "inner\nouter\n";
    let actual = output(
        r#"
        var a = "outer";
        {
            var a = "inner";
            print a;
        }
        print a;
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn closures_bind_statically() {
    let expected = "global\nglobal\n";
    let actual = output(
        r#"
        var a = "global";
        {
            fun showA() {
                print a;
            }

            showA();
            var a = "block";
            showA();
        }
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn counters_are_independent() {
    let expected = "1\n2\n3\n1\n";
    let actual = output(
        r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }

        var c1 = makeCounter();
        var c2 = makeCounter();
        print c1();
        print c1();
        print c1();
        print c2();
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn closures_over_one_scope_share_writes() {
    let expected = "10\n";
    let actual = output(
        r#"
        var get;
        var set;
        {
            var shared = 0;
            fun g() { return shared; }
            fun s(v) { shared = v; }
            get = g;
            set = s;
        }
        set(10);
        print get();
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn control_flow() {
    let expected = "0\n1\n2\nsmall\n10\n";
    let actual = output(
        r#"
        for (var i = 0; i < 3; i = i + 1) print i;

        var n = 1;
        if (n > 5) print "big"; else print "small";

        var k = 0;
        while (k < 10) {
            k = k + 1;
            if (k == 4) k = 10;
        }
        print k;
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn return_unwinds_nested_loops() {
    let expected = "7\nafter\n";
    let actual = output(
        r#"
        fun find() {
            for (var i = 0; i < 10; i = i + 1) {
                var j = 0;
                while (j < 10) {
                    if (i + j == 7) return i + j;
                    j = j + 10;
                }
            }
            return -1;
        }
        print find();
        print "after";
        "#,
    );
    assert_eq!(expected, actual);
}

// ───────────────────────── classes ─────────────────────────

#[test]
fn inheritance_and_super_dispatch() {
    let expected = "B\nA\nA.g\n";
    let actual = output(
        r#"
        class A {
            f() { return "A"; }
            g() { return "A.g"; }
        }

        class B < A {
            f() { return "B"; }
            callSuper() { return super.f(); }
        }

        var b = B();
        print b.f();
        print b.callSuper();
        print b.g();
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn super_is_resolved_against_the_defining_class() {
    let expected = "A\n";
    let actual = output(
        r#"
        class A { name() { return "A"; } }
        class B < A {
            name() { return "B"; }
            test() { return super.name(); }
        }
        class C < B {
            name() { return "C"; }
        }
        print C().test();
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn constructor_returns_the_instance() {
    let expected = "5\nC instance\ntrue\n7\n";
    let actual = output(
        r#"
        class C {
            init(x) {
                this.x = x;
                return;
            }
        }

        var c = C(5);
        print c.x;
        print c;
        print c.init(7) == c;
        print c.x;
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn inherited_constructor_and_bound_methods() {
    let expected = "3\n3\nfield\n";
    let actual = output(
        r#"
        class Base {
            init(n) { this.n = n; }
            get() { return this.n; }
        }
        class Derived < Base {}

        var d = Derived(3);
        var m = d.get;
        print m();
        print d.get();

        d.get = "field";
        print d.get;
        "#,
    );
    assert_eq!(expected, actual);
}

// ───────────────────────── static errors ─────────────────────────

#[test]
fn read_in_own_initializer_is_rejected() {
    let outcome = run(
        r#"var a = "x";
{ var a = a; }"#,
    );

    assert_eq!(outcome.status, Status::StaticError);
    assert_eq!(outcome.output, "");
    assert_eq!(
        outcome.messages(),
        vec!["[line 2] Error: Can't read local variable in its own initializer"]
    );
}

#[test]
fn static_errors_are_collected_and_nothing_runs() {
    let outcome = run(
        r#"print "before";
return 1;
{ var b = 1; var b = 2; }
print this;"#,
    );

    assert_eq!(outcome.status, Status::StaticError);
    assert_eq!(outcome.output, "");
    assert_eq!(
        outcome.kinds(),
        vec!["InvalidReturn", "VariableRedeclaration", "InvalidThis"]
    );
    assert_eq!(
        outcome.messages(),
        vec![
            "[line 2] Error: Can't return from top-level code",
            "[line 3] Error: Variable 'b' is already declared in this scope",
            "[line 4] Error: Can't use 'this' outside of a class",
        ]
    );
}

#[test]
fn global_redeclaration_is_allowed() {
    assert_eq!("2\n", output("var a = 1; var a = 2; print a;"));
}

#[test]
fn misplaced_super_is_rejected() {
    let outcome = run(
        r#"super.f();
class A { f() { return super.f(); } }"#,
    );

    assert_eq!(outcome.status, Status::StaticError);
    assert_eq!(
        outcome.messages(),
        vec![
            "[line 1] Error: Can't use 'super' outside of a class",
            "[line 2] Error: Can't use 'super' in a class with no superclass",
        ]
    );
}

#[test]
fn class_cannot_inherit_from_itself() {
    let outcome = run("class A < A {}");

    assert_eq!(outcome.status, Status::StaticError);
    assert_eq!(outcome.kinds(), vec!["InvalidInheritance"]);
    assert_eq!(
        outcome.messages(),
        vec!["[line 1] Error: A class can't inherit from itself"]
    );
}

#[test]
fn constructor_cannot_return_a_value() {
    let outcome = run(r#"class C { init() { return "ignored"; } }"#);

    assert_eq!(outcome.status, Status::StaticError);
    assert_eq!(
        outcome.messages(),
        vec!["[line 1] Error: Can't return from constructor"]
    );
}

#[test]
fn syntax_errors_are_reported_per_statement() {
    let outcome = run("print ;\nvar = 1;\nprint 1;");

    assert_eq!(outcome.status, Status::StaticError);
    assert_eq!(outcome.kinds(), vec!["ParseError", "ParseError"]);
    assert_eq!(outcome.output, "");
}

// ───────────────────────── runtime errors ─────────────────────────

#[test]
fn runtime_error_keeps_earlier_output() {
    let outcome = run(
        r#"print "one";
print 1 + "a";
print "never";"#,
    );

    assert_eq!(outcome.status, Status::RuntimeError);
    assert_eq!(outcome.output, "one\n");
    assert_eq!(
        outcome.messages(),
        vec!["[line 2] Error: Operator '+': incompatible types 'number' and 'string'"]
    );
}

#[test]
fn operator_type_errors() {
    assert_eq!(
        run(r#"-"a";"#).messages(),
        vec!["[line 1] Error: Operator '-': incompatible type 'string'"]
    );
    assert_eq!(
        run("nil < 1;").messages(),
        vec!["[line 1] Error: Operator '<': incompatible types 'nil' and 'number'"]
    );
}

#[test]
fn undefined_names() {
    let outcome = run("print missing;");
    assert_eq!(outcome.kinds(), vec!["UndefinedVariable"]);
    assert_eq!(
        outcome.messages(),
        vec!["[line 1] Error: Undefined variable 'missing'"]
    );

    let outcome = run("missing = 1;");
    assert_eq!(outcome.kinds(), vec!["UndefinedVariable"]);
}

#[test]
fn property_errors() {
    assert_eq!(
        run("var x = 1; print x.y;").messages(),
        vec!["[line 1] Error: Only class instances have properties"]
    );
    assert_eq!(
        run("var x = 1; x.y = 2;").kinds(),
        vec!["InvalidSetGet"]
    );
    assert_eq!(
        run("class E {} print E().nope;").messages(),
        vec!["[line 1] Error: Undefined property 'nope' for class 'E'"]
    );
}

#[test]
fn missing_super_method_names_the_superclass() {
    let outcome = run(
        r#"class A {}
class B < A { f() { return super.nope(); } }
B().f();"#,
    );

    assert_eq!(
        outcome.messages(),
        vec!["[line 2] Error: Undefined property 'nope' for class 'A'"]
    );
}

#[test]
fn superclass_must_be_a_class() {
    let outcome = run("var NotAClass = 1;\nclass S < NotAClass {}");

    assert_eq!(outcome.status, Status::RuntimeError);
    assert_eq!(outcome.kinds(), vec!["InvalidInheritance"]);
    assert_eq!(
        outcome.messages(),
        vec!["[line 2] Error: Superclass must be a class"]
    );
}

#[test]
fn arity_is_checked_for_every_callable() {
    let cases = [
        ("fun f(a, b) {} f(1);", "Function 'f' expected 2 arguments but got 1"),
        ("class K { m(x) {} } K().m();", "Function 'K::m' expected 1 arguments but got 0"),
        ("class P { init(a) {} } P();", "Function 'P::P' expected 1 arguments but got 0"),
        ("class Q {} Q(1);", "Function 'Q::Q' expected 0 arguments but got 1"),
        ("clock(1);", "Function 'clock' expected 0 arguments but got 1"),
    ];

    for (source, message) in cases {
        let outcome = run(source);
        assert_eq!(outcome.status, Status::RuntimeError, "{}", source);
        assert_eq!(outcome.kinds(), vec!["BadArity"], "{}", source);
        assert_eq!(outcome.errors[0].message(), message, "{}", source);
    }
}

#[test]
fn only_functions_and_classes_are_callable() {
    for source in [r#""str"();"#, "var x = 1; x();", "nil();", "class A {} A()();"] {
        let outcome = run(source);
        assert_eq!(outcome.kinds(), vec!["NotCallable"], "{}", source);
        assert_eq!(
            outcome.errors[0].message(),
            "Only classes and functions are callable"
        );
    }
}

#[test]
fn runaway_recursion_is_a_stack_overflow() {
    let outcome = run("fun r() { r(); }\nr();");

    assert_eq!(outcome.status, Status::RuntimeError);
    assert_eq!(outcome.kinds(), vec!["StackOverflow"]);
    assert_eq!(
        outcome.errors[0].message(),
        "Stack overflow: call depth exceeded 1000"
    );
}

#[test]
fn call_depth_limit_is_configurable() {
    let options = InterpreterOptions { max_call_depth: 8 };

    let outcome = run_with(
        "fun depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); }\nprint depth(7);\nprint depth(8);",
        options,
    );

    assert_eq!(outcome.output, "7\n");
    assert_eq!(
        outcome.messages(),
        vec!["[line 1] Error: Stack overflow: call depth exceeded 8"]
    );
}

#[test]
fn deep_but_bounded_recursion_succeeds() {
    let expected = "405450\n";
    let actual = output(
        r#"
        fun sum(n) {
            if (n == 0) return 0;
            return n + sum(n - 1);
        }
        print sum(900);
        "#,
    );
    assert_eq!(expected, actual);
}

#[test]
fn deeply_nested_blocks_run() {
    let depth = 3000;
    let source = format!(
        "var a = 0; {} a = a + 1; print a; {}",
        "{".repeat(depth),
        "}".repeat(depth)
    );

    assert_eq!("1\n", output(&source));
}

#[test]
fn deeply_nested_groupings_evaluate() {
    let depth = 3000;
    let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));

    assert_eq!("1\n", output(&source));
}

// ───────────────────────── driver ─────────────────────────

#[test]
fn running_twice_with_fresh_state_is_deterministic() {
    let program = r#"
        class Acc {
            init() { this.total = 0; }
            add(n) { this.total = this.total + n; return this; }
        }
        var acc = Acc();
        for (var i = 1; i <= 4; i = i + 1) acc.add(i);
        print acc.total;
        print acc;
    "#;

    let first = output(program);
    let second = output(program);

    assert_eq!(first, "10\nAcc instance\n");
    assert_eq!(first, second);
}

#[test]
fn globals_persist_across_runs() {
    let mut buffer: Vec<u8> = Vec::new();

    let statuses = {
        let mut lox = Lox::new(&mut buffer);
        vec![
            lox.run("var a = 1;"),
            lox.run("fun f() { var local = a + 1; return local; }"),
            lox.run("print missing;"),
            lox.run("{ var x = 10; print f() + x; }"),
        ]
    };

    assert_eq!(
        statuses,
        vec![Status::Ok, Status::Ok, Status::RuntimeError, Status::Ok]
    );
    assert_eq!(String::from_utf8(buffer).unwrap(), "12\n");
}

#[test]
fn exit_codes() {
    assert_eq!(Status::Ok.exit_code(), 0);
    assert_eq!(Status::StaticError.exit_code(), 65);
    assert_eq!(Status::RuntimeError.exit_code(), 70);
}
