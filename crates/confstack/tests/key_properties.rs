//! Property tests for key ordering and encoder/decoder round-trips.

use proptest::prelude::*;

use confstack::{ConfigKey, KeyContext, KeyDecoder, KeyEncoder, KeySyntax};

fn component() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}".prop_map(String::from)
}

fn components() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(component(), 1..5)
}

proptest! {
    #[test]
    fn ordering_is_total_and_consistent(a in components(), b in components(), c in components()) {
        let ka = ConfigKey::new(a);
        let kb = ConfigKey::new(b);
        let kc = ConfigKey::new(c);

        // Antisymmetry
        if ka < kb {
            prop_assert!(kb > ka);
        }
        if ka == kb {
            prop_assert_eq!(ka.cmp(&kb), std::cmp::Ordering::Equal);
        }

        // Transitivity
        if ka <= kb && kb <= kc {
            prop_assert!(ka <= kc);
        }
    }

    #[test]
    fn ordering_agrees_with_dot_encoding_for_context_free_keys(
        a in components(),
        b in components(),
    ) {
        let ka = ConfigKey::new(a);
        let kb = ConfigKey::new(b);

        let enc = KeyEncoder::dot_separated();
        let ea = enc.encode(&ka.clone().into_absolute());
        let eb = enc.encode(&kb.clone().into_absolute());

        // String comparison of dot encodings: '.' sorts below all
        // [a-z0-9], so prefix keys order first, matching the key order.
        prop_assert_eq!(ka.cmp(&kb), ea.cmp(&eb));
    }

    #[test]
    fn sorting_keys_is_stable_under_duplicate_insertion(xs in prop::collection::vec(components(), 1..10)) {
        let mut keys: Vec<ConfigKey> = xs.into_iter().map(ConfigKey::new).collect();
        keys.sort();
        let mut resorted = keys.clone();
        resorted.sort();
        prop_assert_eq!(keys, resorted);
    }

    #[test]
    fn dot_encoding_round_trips(parts in components()) {
        let encoded = parts.join(".");
        let decoder = KeyDecoder::dot_separated();
        let encoder = KeyEncoder::dot_separated();

        let decoded = decoder.decode(&encoded, KeyContext::new());
        prop_assert_eq!(encoder.encode(&decoded.into_absolute()), encoded);
    }

    #[test]
    fn cli_encoding_round_trips(parts in components()) {
        let encoded = format!("--{}", parts.join("-"));
        let decoder = KeyDecoder::new(KeySyntax::CliFlag);
        let encoder = KeyEncoder::cli_flag();

        let decoded = decoder.decode(&encoded, KeyContext::new());
        prop_assert_eq!(encoder.encode(&decoded.into_absolute()), encoded);
    }

    #[test]
    fn screaming_snake_encoding_round_trips(parts in components()) {
        let encoded = parts.join("_").to_uppercase();
        let decoder = KeyDecoder::new(KeySyntax::ScreamingSnake);
        let encoder = KeyEncoder::screaming_snake();

        let decoded = decoder.decode(&encoded, KeyContext::new());
        prop_assert_eq!(encoder.encode(&decoded.into_absolute()), encoded);
    }

    #[test]
    fn append_then_components_concatenate(a in components(), b in components()) {
        let joined = ConfigKey::new(a.clone()).append(&ConfigKey::new(b.clone()));

        let mut expected = a;
        expected.extend(b);
        prop_assert_eq!(joined.components(), expected.as_slice());
    }
}
