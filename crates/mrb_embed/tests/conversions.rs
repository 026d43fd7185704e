use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use mrb_embed::{Bytes, Context, Error, HostValue, ValueType};
use proptest::prelude::*;

#[test]
fn scalars_round_trip() {
    let ctx = Context::new();
    assert_eq!(ctx.to_value(&42i32).to_int().unwrap(), 42);
    assert_eq!(ctx.to_value(&-7i64).to_host(), HostValue::Int(-7));
    assert_eq!(ctx.to_value(&300u16).get::<u16>().unwrap(), 300);
    assert_eq!(ctx.to_value(&1.5f64).to_float().unwrap(), 1.5);
    assert_eq!(ctx.to_value(&0.25f32).get::<f32>().unwrap(), 0.25);
    assert!(ctx.to_value(&true).to_bool().unwrap());
    assert!(ctx.to_value(&false).is_false());
    assert_eq!(ctx.to_value("héllo").to_string().unwrap(), "héllo");
    assert_eq!(ctx.to_value(&String::from("x")).get::<String>().unwrap(), "x");
    assert!(ctx.to_value(&None::<i64>).is_nil());
    assert_eq!(ctx.to_value(&Some(3u8)).to_int().unwrap(), 3);
}

#[test]
fn integer_conversion_truncates() {
    let ctx = Context::new();
    assert_eq!(ctx.to_value(&u64::MAX).to_int().unwrap(), -1);
    assert_eq!(ctx.load_string("300", ()).unwrap().get::<u8>().unwrap(), 44);
}

#[test]
fn bytes_keep_nul_and_invalid_utf8() {
    let ctx = Context::new();
    let raw = [b'a', 0, 0xff, b'z'];
    let v = ctx.to_value(&Bytes(&raw));
    assert!(v.is_string());
    assert_eq!(v.to_bytes().unwrap(), raw.to_vec());
    assert_eq!(v.to_host(), HostValue::Bytes(raw.to_vec()));
    assert_eq!(v.call("bytesize", ()).unwrap().to_int().unwrap(), 4);
}

#[test]
fn symbols_read_as_strings() {
    let ctx = Context::new();
    let v = ctx.load_string(":hello", ()).unwrap();
    assert!(v.is_symbol());
    assert!(!v.is_string());
    assert_eq!(v.to_string().unwrap(), "hello");
    assert_eq!(v.to_host(), HostValue::String("hello".into()));
}

#[test]
fn arrays_round_trip_in_order() {
    let ctx = Context::new();
    let v = ctx.to_value(&vec![3i64, 1, 2]);
    assert!(v.is_array());
    assert_eq!(v.get::<Vec<i64>>().unwrap(), vec![3, 1, 2]);
    assert_eq!(v.call("sum", ()).unwrap().to_int().unwrap(), 6);

    let empty = ctx.to_value(&Vec::<String>::new());
    assert_eq!(empty.to_array().unwrap(), Vec::<HostValue>::new());

    let nested = ctx.to_value(&[vec!["a", "b"], vec![]]);
    assert_eq!(nested.inspect(), r#"[["a", "b"], []]"#);
}

#[test]
fn maps_round_trip_with_string_keys() {
    let ctx = Context::new();
    let mut ordered = IndexMap::new();
    ordered.insert("zeta", 1i64);
    ordered.insert("alpha", 2);
    let v = ctx.to_value(&ordered);
    assert!(v.is_hash());
    let back = v.to_map().unwrap();
    assert_eq!(back.keys().collect::<Vec<_>>(), ["zeta", "alpha"]);
    assert_eq!(back["alpha"], HostValue::Int(2));

    let mut std_map = HashMap::new();
    std_map.insert("k".to_string(), vec![1.5f64]);
    let v = ctx.to_value(&std_map);
    assert_eq!(v.call("size", ()).unwrap().to_int().unwrap(), 1);
    assert_eq!(
        v.to_host(),
        HostValue::Map(IndexMap::from([(
            "k".to_string(),
            HostValue::Array(vec![HostValue::Float(1.5)])
        )]))
    );

    let btree: BTreeMap<&str, bool> = BTreeMap::from([("b", true), ("a", false)]);
    let typed: IndexMap<String, bool> = ctx.to_value(&btree).get().unwrap();
    assert_eq!(typed.keys().collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn script_hash_keys_become_strings() {
    let ctx = Context::new();
    let v = ctx.load_string(r#"{a: 1, "b" => 2, 3 => [nil, true]}"#, ()).unwrap();
    let map = v.to_map().unwrap();
    assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b", "3"]);
    assert_eq!(
        map["3"],
        HostValue::Array(vec![HostValue::Nil, HostValue::Bool(true)])
    );
}

#[test]
fn unsupported_kinds_are_explicit() {
    let ctx = Context::new();
    let range = ctx.load_string("1..3", ()).unwrap();
    assert_eq!(range.to_host(), HostValue::Unsupported(ValueType::Range));

    let mixed = ctx.load_string("[1, Object.new]", ()).unwrap();
    assert_eq!(
        mixed.to_host(),
        HostValue::Array(vec![HostValue::Int(1), HostValue::Unsupported(ValueType::Object)])
    );
    assert!(matches!(mixed.to_array(), Err(Error::Unsupported(ValueType::Object))));

    let in_hash = ctx.load_string("{a: 1..2}", ()).unwrap();
    assert!(matches!(in_hash.to_map(), Err(Error::Unsupported(ValueType::Range))));

    assert!(ctx.to_value(&HostValue::Unsupported(ValueType::Class)).is_nil());
}

#[test]
fn recursive_containers_stop_at_the_repeat() {
    let ctx = Context::new();
    let looped = ctx.load_string_result("a = [1]\na << a\na", ()).unwrap();
    assert_eq!(
        looped,
        HostValue::Array(vec![HostValue::Int(1), HostValue::Unsupported(ValueType::Array)])
    );

    let a = ctx.load_string("a = [1]\na << a\na", ()).unwrap();
    assert!(matches!(a.to_array(), Err(Error::Unsupported(ValueType::Array))));
    assert_eq!(a.inspect(), "[1, [...]]");

    let h = ctx.load_string("h = {n: 1}\nh[:me] = h\nh", ()).unwrap();
    let HostValue::Map(map) = h.to_host() else {
        panic!("expected a map");
    };
    assert_eq!(map["n"], HostValue::Int(1));
    assert_eq!(map["me"], HostValue::Unsupported(ValueType::Hash));
    assert!(matches!(h.to_map(), Err(Error::Unsupported(ValueType::Hash))));
}

#[test]
fn shared_containers_are_not_recursive() {
    let ctx = Context::new();
    let v = ctx.load_string_result("b = [1]\n[b, {k: b}, b]", ()).unwrap();
    let one = HostValue::Array(vec![HostValue::Int(1)]);
    let mut map = IndexMap::new();
    map.insert("k".to_string(), one.clone());
    assert_eq!(v, HostValue::Array(vec![one.clone(), HostValue::Map(map), one]));
}

#[test]
fn narrowing_reports_both_types() {
    let ctx = Context::new();
    let v = ctx.to_value("12");
    match v.to_int() {
        Err(Error::Type { expected, actual }) => {
            assert_eq!(expected, ValueType::Integer);
            assert_eq!(actual, ValueType::String);
        }
        other => panic!("unexpected {other:?}"),
    }
    let err = ctx.to_value(&1i64).to_float().unwrap_err();
    assert_eq!(err.to_string(), "type mismatch: expected Float, got Integer");
    assert!(ctx.to_value(&1i64).to_map().is_err());
    assert!(ctx.nil().to_bool().is_err());
}

#[test]
fn values_cross_contexts_through_host_form() {
    let a = Context::new();
    let b = Context::new();
    let original = a.to_value(&vec!["x", "y"]);
    let copied = b.to_value(&original);
    assert_eq!(copied.context().id(), b.id());
    assert_eq!(copied.to_host(), original.to_host());

    let same = a.to_value(&original);
    assert!(same.call("equal?", [&original]).unwrap().to_bool().unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn ints_round_trip(n in any::<i64>()) {
        let ctx = Context::new();
        prop_assert_eq!(ctx.to_value(&n).to_host(), HostValue::Int(n));
    }

    #[test]
    fn byte_strings_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let ctx = Context::new();
        let v = ctx.to_value(&Bytes(&bytes));
        prop_assert_eq!(v.to_bytes().unwrap(), bytes.clone());
        let expected = match String::from_utf8(bytes.clone()) {
            Ok(s) => HostValue::String(s),
            Err(_) => HostValue::Bytes(bytes),
        };
        prop_assert_eq!(v.to_host(), expected);
    }

    #[test]
    fn finite_floats_round_trip(f in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
        let ctx = Context::new();
        let v = ctx.to_value(&f);
        prop_assert_eq!(v.to_host(), HostValue::Float(f));
        prop_assert_eq!(v.get::<f64>().unwrap(), f);
        let scaled = ctx.load_string("ARGV[0] * 1", [f]).unwrap();
        prop_assert_eq!(scaled.to_float().unwrap(), f);
    }

    #[test]
    fn string_arrays_round_trip(items in proptest::collection::vec(".{0,8}", 0..8)) {
        let ctx = Context::new();
        let v = ctx.to_value(&items);
        prop_assert_eq!(v.get::<Vec<String>>().unwrap(), items);
    }
}
