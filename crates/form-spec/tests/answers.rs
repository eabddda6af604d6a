use serde_cbor::from_slice;
use serde_json::json;

use form_spec::{StoredResponse, Submission};

#[test]
fn lookup_prefers_nested_then_flat_then_url_params() {
    let response = StoredResponse::new(json!({
        "values": { "plan": "Pro" },
        "plan": "Free",
        "source": "form"
    }))
    .with_url_params(json!({ "plan": "Trial", "source": "url", "ref": "abc" }));

    assert_eq!(response.lookup("plan"), Some(&json!("Pro")));
    assert_eq!(response.lookup("source"), Some(&json!("form")));
    assert_eq!(response.lookup("ref"), Some(&json!("abc")));
    assert_eq!(response.lookup("missing"), None);
}

#[test]
fn null_values_fall_through_to_the_next_source() {
    let response = StoredResponse::new(json!({ "values": { "plan": null }, "plan": null }))
        .with_url_params(json!({ "plan": "Trial" }));
    assert_eq!(response.lookup("plan"), Some(&json!("Trial")));
}

#[test]
fn normalize_preserves_every_lookup() {
    let response = StoredResponse::new(json!({
        "values": { "plan": "Pro", "seats": 3 },
        "plan": "Free",
        "comment": "hi",
        "empty": null
    }))
    .with_url_params(json!({ "plan": "Trial", "utm": "ads" }));

    let normalized = response.clone().normalize();
    for key in ["plan", "seats", "comment", "utm", "empty", "values"] {
        assert_eq!(normalized.lookup(key), response.lookup(key), "key {key}");
    }
    assert_eq!(
        normalized.answers,
        json!({
            "plan": "Pro",
            "utm": "ads",
            "comment": "hi",
            "seats": 3,
            "values": { "plan": "Pro", "seats": 3 }
        })
    );
}

#[test]
fn normalize_keeps_the_values_key_resolvable() {
    let only_nested = StoredResponse::new(json!({ "values": { "a": 1 } }));
    let normalized = only_nested.clone().normalize();
    assert_eq!(normalized.lookup("values"), Some(&json!({ "a": 1 })));
    assert_eq!(normalized.lookup("values"), only_nested.lookup("values"));
    assert_eq!(normalized.lookup("a"), Some(&json!(1)));

    let nested_values_key = StoredResponse::new(json!({
        "values": { "values": "inner", "a": null },
        "a": 2
    }));
    let normalized = nested_values_key.clone().normalize();
    for key in ["values", "a"] {
        assert_eq!(normalized.lookup(key), nested_values_key.lookup(key), "key {key}");
    }
    assert_eq!(normalized.lookup("values"), Some(&json!("inner")));
    assert_eq!(normalized.lookup("a"), Some(&json!(2)));

    assert_eq!(normalized.clone().normalize(), normalized);
}

#[test]
fn submission_becomes_flat_response() {
    let submission: Submission = serde_json::from_value(json!({
        "answers": { "name": "Ana", "utm": "direct" },
        "email": "ana@example.com",
        "urlParams": { "utm": "newsletter", "ref": "x1" }
    }))
    .expect("submission");

    let stored = submission.into_response();
    assert_eq!(stored.lookup("name"), Some(&json!("Ana")));
    assert_eq!(stored.lookup("utm"), Some(&json!("direct")));
    assert_eq!(stored.answers["ref"], json!("x1"));
    assert_eq!(stored.url_params, Some(json!({ "ref": "x1", "utm": "newsletter" })));
}

#[test]
fn stored_response_roundtrips_through_cbor() {
    let response = StoredResponse::new(json!({ "name": "Ana", "tags": ["a", "b"] }))
        .with_url_params(json!({ "ref": "x1" }));
    let bytes = response.to_cbor().expect("cbor");
    assert!(!bytes.is_empty());
    let decoded: StoredResponse = from_slice(&bytes).expect("decode");
    assert_eq!(decoded.lookup("tags"), Some(&json!(["a", "b"])));
    assert_eq!(decoded.lookup("ref"), Some(&json!("x1")));
}
