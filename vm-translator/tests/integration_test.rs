//! Integration tests exercising the translator library end-to-end.

use vm_translator::{translate_file, translate_program};

fn lines(src: &[&str]) -> Vec<String> {
    src.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn simple_add_pushes_two_constants_and_adds() {
    let out = translate_file(
        "SimpleAdd",
        &lines(&["push constant 7", "push constant 8", "add"]),
    )
    .unwrap();

    let idx_add = out.iter().position(|l| l == "M=M+D").unwrap();
    let idx_push8 = out.iter().position(|l| l == "@8").unwrap();
    assert!(idx_push8 < idx_add);
}

#[test]
fn stack_test_exercises_every_arithmetic_command() {
    let out = translate_file(
        "StackTest",
        &lines(&[
            "push constant 17",
            "push constant 17",
            "eq",
            "push constant 892",
            "push constant 891",
            "lt",
            "push constant 32767",
            "push constant 32766",
            "gt",
            "push constant 57",
            "push constant 31",
            "and",
            "push constant 82",
            "push constant 12",
            "or",
            "push constant 57",
            "not",
            "push constant 57",
            "neg",
        ]),
    )
    .unwrap();

    assert!(out.iter().any(|l| l.contains("EQ_TRUE")));
    assert!(out.iter().any(|l| l.contains("LT_")));
    assert!(out.iter().any(|l| l.contains("GT_")));
    assert!(out.iter().any(|l| l == "M=D&M"));
    assert!(out.iter().any(|l| l == "M=D|M"));
    assert!(out.iter().any(|l| l == "M=!M"));
    assert!(out.iter().any(|l| l == "M=-M"));
}

#[test]
fn basic_loop_uses_scoped_labels() {
    let out = translate_file(
        "BasicLoop",
        &lines(&[
            "push constant 0",
            "pop local 0",
            "label LOOP_START",
            "push argument 0",
            "push local 0",
            "add",
            "pop local 0",
            "push argument 0",
            "push constant 1",
            "sub",
            "pop argument 0",
            "push argument 0",
            "if-goto LOOP_START",
            "push local 0",
        ]),
    )
    .unwrap();

    // Top-level code translates under the implicit "null" function scope.
    assert!(out.iter().any(|l| l == "(null$LOOP_START)"));
    assert!(out.iter().any(|l| l == "@null$LOOP_START"));
}

#[test]
fn fibonacci_element_uses_function_call_and_return() {
    let files = vec![
        (
            "Main".to_string(),
            lines(&[
                "function Main.fibonacci 0",
                "push argument 0",
                "push constant 2",
                "lt",
                "if-goto N_LT_2",
                "push argument 0",
                "push constant 2",
                "sub",
                "call Main.fibonacci 1",
                "push argument 0",
                "push constant 1",
                "sub",
                "call Main.fibonacci 1",
                "add",
                "return",
                "label N_LT_2",
                "push argument 0",
                "return",
            ]),
        ),
        (
            "Sys".to_string(),
            lines(&[
                "function Sys.init 0",
                "push constant 4",
                "call Main.fibonacci 1",
                "label WHILE",
                "goto WHILE",
            ]),
        ),
    ];

    let out = translate_program(&files, true).unwrap();

    assert_eq!(out.iter().filter(|l| *l == "// bootstrap").count(), 1);
    assert!(out.iter().any(|l| l.contains("call Main.fibonacci 1")));
    assert!(
        out.iter()
            .any(|l| l.starts_with("Main.fibonacci$ret.") && l.starts_with('('))
                || out.iter().any(|l| l.contains("Main.fibonacci$ret."))
    );
    assert!(out.iter().any(|l| l == "(Main.fibonacci)"));
    assert!(out.iter().any(|l| l == "(Sys.init)"));
}

#[test]
fn static_segment_is_namespaced_per_source_file() {
    let a = translate_file("FileA", &lines(&["push constant 1", "pop static 0"])).unwrap();
    let b = translate_file("FileB", &lines(&["push constant 2", "pop static 0"])).unwrap();

    assert!(a.iter().any(|l| l == "@FileA.0"));
    assert!(b.iter().any(|l| l == "@FileB.0"));
}
