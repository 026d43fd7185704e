use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use mrb_lexer::Lexer;
use mrb_syntax::TokenKind;

fn any_ruby_like() -> impl Strategy<Value = String> {
    let ascii =
        proptest::collection::vec(any::<char>().prop_filter("ascii", |c| c.is_ascii()), 0..40)
            .prop_map(|v| v.into_iter().collect::<String>());
    let unicode =
        proptest::collection::vec(any::<char>().prop_filter("non-ascii", |c| !c.is_ascii()), 0..20)
            .prop_map(|v| v.into_iter().collect::<String>());
    let sym = "def end class module if elsif else unless while do |x| {} [] () \"#{a}\" 'b' :c d: @e $f %w[g] 1..2 -> => ||= && \\\n # =begin"
        .to_string();
    (ascii, unicode, any::<bool>()).prop_map(move |(a, b, f)| {
        let mut s = String::new();
        s.push_str(&a);
        if f {
            s.push_str(&sym);
        }
        s.push_str(&b);
        s.chars().take(200).collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, max_shrink_iters: 200, .. ProptestConfig::default()
    })]
    #[test]
    fn lex_random_input_should_not_panic(s in any_ruby_like()) {
        let result = Lexer::new(&s).lex();
        // Must end with EOF.
        assert!(matches!(result.tokens.last().map(|t| t.kind), Some(TokenKind::Eof)));
        for t in &result.tokens {
            assert!(t.span.end.0 as usize <= s.len());
        }
    }
}
