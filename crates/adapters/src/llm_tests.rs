// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn scripted_model_returns_in_order_and_records_prompts() {
    let model = ScriptedModel::new(vec!["first", "second"]);
    assert_eq!(model.invoke("p1").await.unwrap(), "first");
    assert_eq!(model.invoke("p2").await.unwrap(), "second");
    assert_eq!(model.prompts(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn scripted_model_exhaustion_errors_without_fallback() {
    let model = ScriptedModel::new(vec![]);
    assert!(matches!(model.invoke("p").await, Err(LlmError::Exhausted)));
}

#[tokio::test]
async fn scripted_model_fallback_repeats() {
    let model = ScriptedModel::new(vec![]).with_fallback("ok");
    assert_eq!(model.invoke("a").await.unwrap(), "ok");
    assert_eq!(model.invoke("b").await.unwrap(), "ok");
}

#[tokio::test]
async fn unreachable_endpoint_is_transient_connection_error() {
    let client = HttpModelClient::new(ModelEndpoint {
        base_url: "http://127.0.0.1:1".into(),
        model_id: "m".into(),
        api_token: None,
        timeout: Duration::from_millis(500),
    })
    .unwrap();
    let err = client.invoke("hello").await.unwrap_err();
    assert!(err.is_transient());
}
