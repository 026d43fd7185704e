use mrb_parser::parse_program;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

fn any_ruby_like() -> impl Strategy<Value = String> {
    let ascii =
        proptest::collection::vec(any::<char>().prop_filter("ascii", |c| c.is_ascii()), 0..40)
            .prop_map(|v| v.into_iter().collect::<String>());
    let pieces = proptest::collection::vec(
        prop::sample::select(vec![
            "def ", "end", "class ", "X", "module ", "if ", "else", "while ", "do", "|x|", "{",
            "}", "(", ")", "[", "]", "\"#{", "'", ":s", "k: ", "@a", "$g", "1..2", "->", "=>",
            "||=", "&&", " ", "\n", ",", ".", "::", "x", "y = ", "rescue", "yield", "super",
            "return", "break", "case ", "when ", "%w[", "*", "&", "-", "?", " : ", ";",
        ]),
        0..40,
    )
    .prop_map(|v| v.concat());
    (ascii, pieces, any::<bool>()).prop_map(|(a, p, f)| {
        let s = if f { format!("{p}{a}") } else { format!("{a}{p}") };
        s.chars().take(200).collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, max_shrink_iters: 200, .. ProptestConfig::default()
    })]
    #[test]
    fn parse_random_input_should_not_panic(s in any_ruby_like()) {
        let parse = parse_program(&s);
        // Errors are allowed; every reported span must stay inside the source.
        for d in &parse.diagnostics {
            if let Some(span) = d.span {
                prop_assert!(span.end.0 as usize <= s.len(), "{:?} in {:?}", d, s);
            }
        }
    }
}
