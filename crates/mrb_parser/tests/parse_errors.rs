use mrb_parser::parse_program;
use mrb_syntax::SourceText;

fn first_error(src: &str) -> (u32, String) {
    let parse = parse_program(src);
    let err = parse.first_error().expect("expected a syntax error");
    let line = err
        .span
        .map_or(1, |s| SourceText::new(src).line_of(s.start.0));
    (line, err.message.clone())
}

#[test]
fn leading_dot_reports_unexpected_dot() {
    let (line, message) = first_error(".fail here!");
    assert_eq!(line, 1);
    assert_eq!(message, "syntax error, unexpected '.'");
}

#[test]
fn missing_end_reports_end_of_file() {
    let (line, message) = first_error("def foo\n  1\n");
    assert_eq!(line, 3);
    assert!(message.contains("unexpected end of file"), "{message}");
}

#[test]
fn error_line_counts_from_one() {
    let (line, _) = first_error("a = 1\nb = 2\nc = )\n");
    assert_eq!(line, 3);
}

#[test]
fn unterminated_string_is_reported() {
    let (_, message) = first_error("x = \"abc");
    assert_eq!(message, "unterminated string meets end of file");
}

#[test]
fn error_inside_interpolation_points_into_the_literal() {
    let (line, message) = first_error("x = 1\ny = \"#{x +}\"");
    assert_eq!(line, 2);
    assert!(message.starts_with("syntax error"), "{message}");
}

#[test]
fn constant_assignment_in_method_is_rejected() {
    let (_, message) = first_error("def f\n  X = 1\nend");
    assert_eq!(message, "dynamic constant assignment");
}

#[test]
fn runaway_nesting_is_a_syntax_error() {
    let src = format!("{}1{}", "[".repeat(20_000), "]".repeat(20_000));
    let (line, message) = first_error(&src);
    assert_eq!(line, 1);
    assert_eq!(message, "syntax error, too deeply nested");

    let (_, message) = first_error(&format!("x = {}true", "!".repeat(20_000)));
    assert_eq!(message, "syntax error, too deeply nested");
}

#[test]
fn moderate_nesting_parses() {
    let src = format!("{}1{}", "[".repeat(200), "]".repeat(200));
    let parse = parse_program(&src);
    assert!(parse.diagnostics.is_empty(), "{:?}", parse.diagnostics.first().map(|d| &d.message));
}
