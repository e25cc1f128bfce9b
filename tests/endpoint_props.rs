use proptest::prelude::*;
use serde_json::{json, Map, Value};
use source_dispatch::endpoint::{compare_endpoints, resolve, Endpoint, EndpointQuery, Matcher};
use std::cmp::Ordering;

fn arb_matcher(values: &'static [&'static str]) -> impl Strategy<Value = Matcher> {
    prop_oneof![
        Just(Matcher::Any),
        prop::sample::select(values).prop_map(Matcher::from),
        prop::sample::subsequence(values, 2..=values.len())
            .prop_map(|many| Matcher::Many(many.into_iter().map(String::from).collect())),
    ]
}

fn arb_endpoint() -> impl Strategy<Value = Endpoint> {
    (
        arb_matcher(&["entry", "user", "comment"]),
        arb_matcher(&["member", "collection"]),
        arb_matcher(&["GET", "SET", "DELETE"]),
        prop::collection::btree_map(
            prop::sample::select(&["id", "page", "author"][..]),
            any::<bool>(),
            0..3,
        ),
    )
        .prop_map(|(item_type, scope, action, params)| {
            params.into_iter().fold(
                Endpoint::default()
                    .with_type(item_type)
                    .with_scope(scope)
                    .with_action(action),
                |endpoint, (name, required)| endpoint.with_param(name, required),
            )
        })
}

fn arb_params() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        prop::sample::select(&["id", "page", "author"][..]),
        "[a-z0-9]{1,6}",
        0..3,
    )
    .prop_map(|params| {
        params
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect()
    })
}

fn entry_query(params: Map<String, Value>) -> EndpointQuery {
    let mut params = params;
    params.insert("type".into(), json!("entry"));
    EndpointQuery::new(Some("GET"), params, None)
}

proptest! {
    #[test]
    fn comparing_an_endpoint_with_itself_is_equal(endpoint in arb_endpoint(), params in arb_params()) {
        prop_assert_eq!(compare_endpoints(&endpoint, &endpoint, &params), Ordering::Equal);
    }

    #[test]
    fn comparison_is_antisymmetric(a in arb_endpoint(), b in arb_endpoint(), params in arb_params()) {
        prop_assert_eq!(
            compare_endpoints(&a, &b, &params),
            compare_endpoints(&b, &a, &params).reverse()
        );
    }

    #[test]
    fn resolved_endpoint_is_the_most_specific_match(
        endpoints in prop::collection::vec(arb_endpoint(), 0..8),
        params in arb_params(),
    ) {
        let query = entry_query(params);
        match resolve(&endpoints, &query) {
            Some(chosen) => {
                prop_assert!(chosen.is_compatible(&query));
                for other in endpoints.iter().filter(|e| e.is_compatible(&query)) {
                    prop_assert_ne!(compare_endpoints(chosen, other, &query.params), Ordering::Greater);
                }
            }
            None => prop_assert!(endpoints.iter().all(|e| !e.is_compatible(&query))),
        }
    }

    #[test]
    fn single_match_wins_regardless_of_order(
        others in prop::collection::vec(arb_endpoint(), 0..6),
        seed in any::<u64>(),
    ) {
        let query = entry_query(Map::new());
        let target = Endpoint::default().with_id("target").with_type("entry");
        // Every other endpoint is bound to a type the query never asks for.
        let mut endpoints: Vec<Endpoint> = others
            .into_iter()
            .map(|e| e.with_type(Matcher::from("comment")))
            .collect();
        let at = usize::try_from(seed % (endpoints.len() as u64 + 1)).unwrap();
        endpoints.insert(at, target);

        let chosen = resolve(&endpoints, &query).map(|e| e.id.as_deref());
        prop_assert_eq!(chosen, Some(Some("target")));
    }

    #[test]
    fn equally_specific_endpoints_keep_declaration_order(
        endpoint in arb_endpoint(),
        copies in 2usize..5,
        params in arb_params(),
    ) {
        let query = entry_query(params);
        let endpoints: Vec<Endpoint> = (0..copies)
            .map(|i| endpoint.clone().with_id(format!("copy{i}")))
            .collect();

        if let Some(chosen) = resolve(&endpoints, &query) {
            prop_assert_eq!(chosen.id.as_deref(), Some("copy0"));
        }
    }
}
