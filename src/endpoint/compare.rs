//! Specificity ordering for endpoints.

use super::{Endpoint, Matcher};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Orders `a` before `b` when `a` is the more specific endpoint for a request
/// carrying `params`. Each level only breaks ties of the previous one:
///
/// 1. a declared `type` beats none, a scalar `type` beats a list;
/// 2. the same for `scope`;
/// 3. the same for `action`;
/// 4. more required params;
/// 5. more optional params present in the request.
///
/// Endpoints equal on every level compare `Equal`, so a stable sort keeps
/// their declaration order.
pub fn compare_endpoints(a: &Endpoint, b: &Endpoint, params: &Map<String, Value>) -> Ordering {
    compare_matcher(&a.item_type, &b.item_type)
        .then_with(|| compare_matcher(&a.scope, &b.scope))
        .then_with(|| compare_matcher(&a.action, &b.action))
        .then_with(|| b.required_params().count().cmp(&a.required_params().count()))
        .then_with(|| {
            b.matched_optional_params(params)
                .cmp(&a.matched_optional_params(params))
        })
}

fn compare_matcher(a: &Matcher, b: &Matcher) -> Ordering {
    b.is_declared()
        .cmp(&a.is_declared())
        .then_with(|| a.is_multi().cmp(&b.is_multi()))
}
