#[test]
fn relay_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/relay_error_pass.rs");
    t.compile_fail("tests/ui/relay_error_no_context.rs");
    t.compile_fail("tests/ui/relay_error_bad_context_type.rs");
    t.compile_fail("tests/ui/relay_error_tuple_variant.rs");
}
