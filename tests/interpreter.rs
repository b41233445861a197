use treelox as lox;

use lox::error::LoxError;
use lox::session::{self, Repl};

/// Run a program with a fresh interpreter, returning everything it printed.
fn run(code: &str) -> Result<String, Vec<LoxError>> {
    let mut buffer: Vec<u8> = Vec::new();

    session::run_source(code.as_bytes(), &mut buffer)?;

    Ok(String::from_utf8(buffer).expect("program output is UTF-8"))
}

/// Run a failing program, returning its output so far and its diagnostics.
fn run_failing(code: &str) -> (String, Vec<LoxError>) {
    let mut buffer: Vec<u8> = Vec::new();

    let errors = session::run_source(code.as_bytes(), &mut buffer)
        .expect_err("program was expected to fail");

    (String::from_utf8(buffer).expect("program output is UTF-8"), errors)
}

// ───────────────────────── basic execution ─────────────────────────

#[test]
fn declare_and_print() {
    assert_eq!(run("var x = 1; print x;").unwrap(), "1\n");
}

#[test]
fn arithmetic_and_grouping() {
    assert_eq!(run("print (1 + 2) * 3 - 4 / 2;").unwrap(), "7\n");
}

#[test]
fn number_display_drops_integral_fraction() {
    assert_eq!(run("print 4.0; print 2.5;").unwrap(), "4\n2.5\n");
}

#[test]
fn variable_scoping() {
    let code = "\
        var a = \"global a\";\n\
        var b = \"global b\";\n\
        {\n\
            var a = \"outer a\";\n\
            {\n\
                var a = \"inner a\";\n\
                print a;\n\
                print b;\n\
            }\n\
            print a;\n\
        }\n\
        print a;";

    let expected = "\
        inner a\n\
        global b\n\
        outer a\n\
        global a\n";

    assert_eq!(run(code).unwrap(), expected);
}

#[test]
fn block_shadowing_leaves_outer_binding_intact() {
    let code = "\
        var a = \"global\";\n\
        {\n\
            var a = \"local\";\n\
            a = \"changed\";\n\
        }\n\
        print a;";

    assert_eq!(run(code).unwrap(), "global\n");
}

#[test]
fn scoping_is_static_not_dynamic() {
    // Both calls must see the global: the function's `a` was resolved at
    // definition, and the later shadowing declaration cannot capture it.
    let code = "\
        var a = \"global\";\n\
        {\n\
            fun showA() {\n\
                print a;\n\
            }\n\
            showA();\n\
            var a = \"block\";\n\
            showA();\n\
        }";

    assert_eq!(run(code).unwrap(), "global\nglobal\n");
}

#[test]
fn reassignment() {
    assert_eq!(
        run("var a = \"original\"; a = \"updated\"; print a;").unwrap(),
        "updated\n"
    );
}

#[test]
fn while_loop() {
    assert_eq!(
        run("var i = 0; while (i < 3) { print i; i = i + 1; }").unwrap(),
        "0\n1\n2\n"
    );
}

#[test]
fn for_loop_runs_desugared() {
    assert_eq!(
        run("for (var i = 0; i < 3; i = i + 1) print i;").unwrap(),
        "0\n1\n2\n"
    );
}

#[test]
fn if_else_branches() {
    assert_eq!(
        run("if (1 < 2) print \"then\"; else print \"else\";").unwrap(),
        "then\n"
    );
    assert_eq!(
        run("if (1 > 2) print \"then\"; else print \"else\";").unwrap(),
        "else\n"
    );
}

// ───────────────────────── truthiness and equality ─────────────────────────

#[test]
fn zero_and_empty_string_are_truthy() {
    assert_eq!(run("if (0) print \"yes\";").unwrap(), "yes\n");
    assert_eq!(run("if (\"\") print \"yes\";").unwrap(), "yes\n");
}

#[test]
fn nil_and_false_are_falsy() {
    assert_eq!(run("if (nil) print \"a\"; else print \"b\";").unwrap(), "b\n");
    assert_eq!(run("if (false) print \"a\"; else print \"b\";").unwrap(), "b\n");
}

#[test]
fn equality_has_no_coercion() {
    let code = "\
        print nil == nil;\n\
        print 1 == \"1\";\n\
        print 0 == false;\n\
        print \"a\" == \"a\";\n\
        print 2 != 3;";

    assert_eq!(run(code).unwrap(), "true\nfalse\nfalse\ntrue\ntrue\n");
}

#[test]
fn logical_operators_return_operands() {
    let code = "\
        print \"hi\" or 2;\n\
        print nil or \"yes\";\n\
        print nil and \"no\";\n\
        print 1 and 2;";

    assert_eq!(run(code).unwrap(), "hi\nyes\nnil\n2\n");
}

#[test]
fn string_concatenation_coerces_one_side() {
    let code = "\
        print \"x = \" + 4;\n\
        print 2 + \"!\";\n\
        print \"a\" + \"b\";";

    assert_eq!(run(code).unwrap(), "x = 4\n2!\nab\n");
}

// ───────────────────────── functions and closures ─────────────────────────

#[test]
fn function_call_and_return() {
    let code = "\
        fun add(a, b) {\n\
            return a + b;\n\
        }\n\
        print add(1, 2);";

    assert_eq!(run(code).unwrap(), "3\n");
}

#[test]
fn bare_return_yields_nil() {
    assert_eq!(run("fun f() { return; } print f();").unwrap(), "nil\n");
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run("fun f() {} print f();").unwrap(), "nil\n");
}

#[test]
fn recursion() {
    let code = "\
        fun fib(n) {\n\
            if (n < 2) return n;\n\
            return fib(n - 1) + fib(n - 2);\n\
        }\n\
        print fib(10);";

    assert_eq!(run(code).unwrap(), "55\n");
}

#[test]
fn closures_capture_mutable_state() {
    let code = "\
        fun makeCounter() {\n\
            var count = 0;\n\
            fun increment() {\n\
                count = count + 1;\n\
                return count;\n\
            }\n\
            return increment;\n\
        }\n\
        var a = makeCounter();\n\
        var b = makeCounter();\n\
        print a();\n\
        print a();\n\
        print a();\n\
        print b();";

    // the same closure counts up; a fresh closure counts independently
    assert_eq!(run(code).unwrap(), "1\n2\n3\n1\n");
}

#[test]
fn return_unwinds_through_nested_blocks_and_loops() {
    let code = "\
        fun firstOverTen() {\n\
            var i = 0;\n\
            while (true) {\n\
                {\n\
                    if (i > 10) {\n\
                        return i;\n\
                    }\n\
                }\n\
                i = i + 3;\n\
            }\n\
        }\n\
        print firstOverTen();";

    assert_eq!(run(code).unwrap(), "12\n");
}

#[test]
fn native_clock_is_a_number() {
    assert_eq!(run("print clock() > 0;").unwrap(), "true\n");
}

// ───────────────────────── classes ─────────────────────────

#[test]
fn fields_are_created_on_first_assignment() {
    let code = "\
        class Bag {}\n\
        var bag = Bag();\n\
        bag.item = \"marble\";\n\
        print bag.item;";

    assert_eq!(run(code).unwrap(), "marble\n");
}

#[test]
fn methods_bind_this() {
    let code = "\
        class Greeter {\n\
            greet() {\n\
                print \"hello \" + this.name;\n\
            }\n\
        }\n\
        var g = Greeter();\n\
        g.name = \"world\";\n\
        g.greet();";

    assert_eq!(run(code).unwrap(), "hello world\n");
}

#[test]
fn detached_method_keeps_its_receiver() {
    let code = "\
        class Box {\n\
            label() {\n\
                print this.tag;\n\
            }\n\
        }\n\
        var a = Box();\n\
        a.tag = \"A\";\n\
        var m = a.label;\n\
        m();";

    assert_eq!(run(code).unwrap(), "A\n");
}

#[test]
fn initializer_runs_on_construction_and_returns_this() {
    let code = "\
        class Point {\n\
            init(x, y) {\n\
                this.x = x;\n\
                this.y = y;\n\
            }\n\
        }\n\
        var p = Point(3, 4);\n\
        print p.x + p.y;\n\
        print p;";

    assert_eq!(run(code).unwrap(), "7\nPoint instance\n");
}

#[test]
fn early_return_in_initializer_still_yields_this() {
    let code = "\
        class Guard {\n\
            init(ok) {\n\
                if (!ok) return;\n\
                this.armed = true;\n\
            }\n\
        }\n\
        print Guard(false);";

    assert_eq!(run(code).unwrap(), "Guard instance\n");
}

#[test]
fn subclass_overrides_and_super_dispatches_up() {
    let code = "\
        class A {\n\
            m() {\n\
                print \"A\";\n\
            }\n\
        }\n\
        class B < A {\n\
            m() {\n\
                print \"B\";\n\
            }\n\
            both() {\n\
                this.m();\n\
                super.m();\n\
            }\n\
        }\n\
        B().both();";

    assert_eq!(run(code).unwrap(), "B\nA\n");
}

#[test]
fn super_call_keeps_this_bound_to_original_instance() {
    let code = "\
        class A {\n\
            who() {\n\
                print this.name;\n\
            }\n\
        }\n\
        class B < A {\n\
            greet() {\n\
                super.who();\n\
            }\n\
        }\n\
        var b = B();\n\
        b.name = \"bee\";\n\
        b.greet();";

    assert_eq!(run(code).unwrap(), "bee\n");
}

#[test]
fn inherited_methods_resolve_up_the_chain() {
    let code = "\
        class A {\n\
            hello() {\n\
                print \"from A\";\n\
            }\n\
        }\n\
        class B < A {}\n\
        class C < B {}\n\
        C().hello();";

    assert_eq!(run(code).unwrap(), "from A\n");
}

#[test]
fn inherited_init_runs_via_class_call() {
    let code = "\
        class A {\n\
            init(v) {\n\
                this.v = v;\n\
            }\n\
        }\n\
        class B < A {}\n\
        print B(9).v;";

    assert_eq!(run(code).unwrap(), "9\n");
}

#[test]
fn class_values_print_their_name() {
    assert_eq!(run("class Cake {} print Cake;").unwrap(), "Cake\n");
}

// ───────────────────────── static errors ─────────────────────────

fn assert_single_resolve_error(code: &str, fragment: &str) {
    let (output, errors) = run_failing(code);

    assert!(output.is_empty(), "execution must not start");
    assert_eq!(errors.len(), 1, "unexpected diagnostics: {:?}", errors);
    assert!(matches!(errors[0], LoxError::Resolve { .. }));
    assert!(
        errors[0].to_string().contains(fragment),
        "unexpected message: {}",
        errors[0]
    );
}

#[test]
fn self_reference_in_initializer_is_rejected_statically() {
    assert_single_resolve_error("{ var a = a; }", "own initializer");
}

#[test]
fn duplicate_declaration_in_scope_is_rejected() {
    assert_single_resolve_error("{ var a = 1; var a = 2; }", "already declared");
}

#[test]
fn return_at_top_level_is_rejected() {
    assert_single_resolve_error("return 1;", "top-level");
}

#[test]
fn this_outside_a_class_is_rejected() {
    assert_single_resolve_error("print this;", "'this'");
}

#[test]
fn super_without_superclass_is_rejected() {
    assert_single_resolve_error(
        "class A { m() { super.m(); } }",
        "no superclass",
    );
}

#[test]
fn super_outside_a_class_is_rejected() {
    assert_single_resolve_error("print super.m;", "outside of a class");
}

#[test]
fn class_inheriting_from_itself_is_rejected() {
    assert_single_resolve_error("class A < A {}", "inherit from itself");
}

#[test]
fn returning_a_value_from_init_is_rejected() {
    assert_single_resolve_error(
        "class A { init() { return 1; } }",
        "initializer",
    );
}

#[test]
fn static_errors_block_execution_and_accumulate() {
    let code = "\
        print \"never runs\";\n\
        return 1;\n\
        { var a = a; }";

    let (output, errors) = run_failing(code);

    assert!(output.is_empty());
    assert_eq!(errors.len(), 2, "both static errors reported: {:?}", errors);
}

// ───────────────────────── runtime errors ─────────────────────────

fn assert_runtime_error(code: &str, fragment: &str) -> String {
    let (output, errors) = run_failing(code);

    assert_eq!(errors.len(), 1, "unexpected diagnostics: {:?}", errors);
    assert!(matches!(errors[0], LoxError::Runtime { .. }));
    assert!(
        errors[0].to_string().contains(fragment),
        "unexpected message: {}",
        errors[0]
    );

    output
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let output = assert_runtime_error("print 1 / 0;", "Division by zero");

    assert!(output.is_empty(), "no numeric result may be printed");
}

#[test]
fn arity_mismatch_reports_expected_and_actual() {
    let code = "\
        fun f(a) {\n\
            print \"ran\";\n\
        }\n\
        f(1, 2);";

    let output = assert_runtime_error(code, "Expected 1 arguments but got 2.");

    assert!(output.is_empty(), "the body must not execute");
}

#[test]
fn class_initializer_arity_is_enforced() {
    assert_runtime_error(
        "class P { init(a, b) {} } P(1);",
        "Expected 2 arguments but got 1.",
    );
}

#[test]
fn undefined_variable_read_is_a_runtime_error() {
    assert_runtime_error("print missing;", "Undefined variable 'missing'");
}

#[test]
fn assignment_to_undeclared_global_is_a_runtime_error() {
    assert_runtime_error("missing = 1;", "Undefined variable 'missing'");
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    assert_runtime_error("var x = 1; x();", "Can only call functions and classes");
}

#[test]
fn unary_minus_requires_a_number() {
    assert_runtime_error("print -\"muffin\";", "Operand must be a number");
}

#[test]
fn comparison_requires_numbers() {
    assert_runtime_error("print 1 < \"two\";", "Operands must be numbers");
}

#[test]
fn property_access_on_non_instance_is_a_runtime_error() {
    assert_runtime_error("print \"str\".length;", "Only instances have properties");
}

#[test]
fn field_write_on_non_instance_is_a_runtime_error() {
    assert_runtime_error("var n = 1; n.field = 2;", "Only instances have fields");
}

#[test]
fn absent_property_is_a_runtime_error() {
    assert_runtime_error(
        "class Bag {} print Bag().nothing;",
        "Undefined property 'nothing'",
    );
}

#[test]
fn inheriting_from_a_non_class_is_a_runtime_error() {
    assert_runtime_error("var NotAClass = 1; class A < NotAClass {}", "Superclass must be a class");
}

#[test]
fn runtime_error_halts_mid_program() {
    let output = assert_runtime_error(
        "print \"before\"; print missing; print \"after\";",
        "Undefined variable",
    );

    // everything before the error is visible, nothing after
    assert_eq!(output, "before\n");
}

// ───────────────────────── REPL sessions ─────────────────────────

#[test]
fn repl_keeps_globals_across_lines() {
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut repl = Repl::new(&mut buffer);

        repl.run_line("var x = 1;".to_string()).unwrap();
        repl.run_line("fun inc() { x = x + 1; return x; }".to_string())
            .unwrap();
        repl.run_line("print inc();".to_string()).unwrap();
        repl.run_line("print x;".to_string()).unwrap();
    }

    assert_eq!(String::from_utf8(buffer).unwrap(), "2\n2\n");
}

#[test]
fn repl_echoes_bare_expressions() {
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut repl = Repl::new(&mut buffer);

        repl.run_line("1 + 2;".to_string()).unwrap();
        repl.run_line("\"a\" + \"b\";".to_string()).unwrap();
    }

    assert_eq!(String::from_utf8(buffer).unwrap(), "3\nab\n");
}

#[test]
fn repl_session_survives_errors() {
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut repl = Repl::new(&mut buffer);

        repl.run_line("var x = 10;".to_string()).unwrap();

        let errors = repl
            .run_line("print missing;".to_string())
            .expect_err("undefined variable");
        assert!(matches!(errors[0], LoxError::Runtime { .. }));

        let errors = repl
            .run_line("var 1 = 2;".to_string())
            .expect_err("syntax error");
        assert!(matches!(errors[0], LoxError::Parse { .. }));

        repl.run_line("print x;".to_string()).unwrap();
    }

    assert_eq!(String::from_utf8(buffer).unwrap(), "10\n");
}

#[test]
fn repl_closures_outlive_their_defining_line() {
    let mut buffer: Vec<u8> = Vec::new();

    {
        let mut repl = Repl::new(&mut buffer);

        repl.run_line(
            "fun makeCounter() { var n = 0; fun next() { n = n + 1; return n; } return next; }"
                .to_string(),
        )
        .unwrap();
        repl.run_line("var tick = makeCounter();".to_string()).unwrap();
        repl.run_line("print tick();".to_string()).unwrap();
        repl.run_line("print tick();".to_string()).unwrap();
    }

    assert_eq!(String::from_utf8(buffer).unwrap(), "1\n2\n");
}
