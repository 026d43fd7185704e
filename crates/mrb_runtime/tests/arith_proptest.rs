use mrb_runtime::{CompileContext, State, Value};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

fn run(state: &State, src: &str) -> Value {
    let v = state.load_string(src, &CompileContext::default());
    assert!(state.exc().is_none(), "{src}");
    v
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, max_shrink_iters: 200, .. ProptestConfig::default()
    })]
    #[test]
    fn integer_ops_match_floored_semantics(a in -10_000i64..10_000, b in 1i64..500) {
        let state = State::open();
        let src = format!("x = {a}\ny = {b}\n[x + y, x - y, x * y, x / y, x % y]");
        let v = run(&state, &src);
        let expected = format!(
            "[{}, {}, {}, {}, {}]",
            a + b,
            a - b,
            a * b,
            a.div_euclid(b),
            a.rem_euclid(b)
        );
        prop_assert_eq!(state.inspect(&v), expected);
    }

    #[test]
    fn negative_divisor_floors_toward_negative_infinity(a in -10_000i64..10_000, b in 1i64..500) {
        let state = State::open();
        let v = run(&state, &format!("x = {a}\ny = 0 - {b}\n[x / y, x % y]"));
        let q = (a as f64 / -(b as f64)).floor() as i64;
        let r = a - q * -b;
        prop_assert_eq!(state.inspect(&v), format!("[{q}, {r}]"));
    }

    #[test]
    fn integer_to_s_round_trips(n in -(1i64 << 62)..(1i64 << 62)) {
        let state = State::open();
        let v = run(&state, &format!("({n}).to_s.to_i == {n}"));
        prop_assert!(v.truthy());
    }
}
