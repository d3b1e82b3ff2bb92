//! Integration tests for tenant resolution, caching, and deduplication in
//! the embedding service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{service_with, vector_for, wait_for, ScriptedProvider};
use tokio_test::{assert_err, assert_ok};
use vectorgate::domain::models::keys;
use vectorgate::domain::ports::EmbeddingProvider;
use vectorgate::services::normalize::l2_norm;
use vectorgate::{EmbeddingError, EmbeddingRequest};

const BASE: &[(&str, &str)] = &[
    (keys::DEFAULT_PROVIDER, "scripted"),
    (keys::DEFAULT_MODEL, "vec-4"),
    (keys::NORMALIZE, "false"),
];

fn scripted(dimension: usize) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new("scripted", "vec-", dimension))
}

fn request(texts: &[&str]) -> EmbeddingRequest {
    EmbeddingRequest::new(texts.iter().copied()).unwrap()
}

#[tokio::test]
async fn test_vectors_follow_request_order_with_hits_and_duplicates() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider.clone()], BASE);

    // Warm the cache with "b".
    assert_ok!(service.embed(&request(&["b"])).await);

    let texts = ["a", "b", "c", "a", "b", "d"];
    let response = service.embed(&request(&texts)).await.unwrap();

    let expected: Vec<Vec<f32>> = texts.iter().map(|t| vector_for(t, 4)).collect();
    assert_eq!(response.vectors, expected);
    assert_eq!(response.dimension, 4);
    assert_eq!(response.provider, "scripted");
    assert_eq!(response.model, "vec-4");
    assert_eq!(response.embedding_version, "v1");

    // One call for the warm-up, one for the distinct misses in first-seen order.
    assert_eq!(provider.calls(), 2);
    assert_eq!(
        provider.seen()[1],
        vec!["a".to_string(), "c".to_string(), "d".to_string()]
    );
}

#[tokio::test]
async fn test_duplicates_reach_provider_once_and_are_independent_copies() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider.clone()], BASE);

    let response = service.embed(&request(&["same", "same", "same"])).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.seen()[0], vec!["same".to_string()]);

    let mut vectors = response.vectors;
    assert_eq!(vectors[0], vectors[1]);
    assert_eq!(vectors[1], vectors[2]);

    vectors[0][0] = -1.0;
    assert_ne!(vectors[0], vectors[1]);

    // The cached copy is untouched as well.
    let again = service.embed(&request(&["same"])).await.unwrap();
    assert_eq!(again.vectors[0], vector_for("same", 4));
}

fn spawn_embed(
    service: &Arc<vectorgate::services::EmbeddingService>,
    text: &'static str,
) -> tokio::task::JoinHandle<Result<vectorgate::EmbeddingResponse, EmbeddingError>> {
    let service = Arc::clone(service);
    tokio::spawn(async move { service.embed_for_tenant(Some("acme"), &request(&[text])).await })
}

#[tokio::test]
async fn test_concurrent_requests_for_same_text_share_one_call() {
    let (provider, gate) = ScriptedProvider::new("scripted", "vec-", 4).gated();
    let provider = Arc::new(provider);
    let (_, service) = service_with(vec![provider.clone()], BASE);

    let first = spawn_embed(&service, "same");
    assert!(wait_for(|| provider.started() == 1, Duration::from_secs(2)).await);

    let second = spawn_embed(&service, "same");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.started(), 1);

    gate.add_permits(1);
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(first.vectors, second.vectors);
    assert_eq!(first.vectors[0], vector_for("same", 4));
}

#[tokio::test]
async fn test_concurrent_requests_share_a_failed_call() {
    let (provider, gate) = ScriptedProvider::new("scripted", "vec-", 4).gated();
    let provider = Arc::new(provider);
    provider.fail_next(1);
    let (_, service) = service_with(vec![provider.clone()], BASE);

    let first = spawn_embed(&service, "same");
    assert!(wait_for(|| provider.started() == 1, Duration::from_secs(2)).await);
    let second = spawn_embed(&service, "same");
    tokio::time::sleep(Duration::from_millis(50)).await;

    gate.add_permits(1);
    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(matches!(first, Err(EmbeddingError::Provider { .. })));
    assert!(matches!(second, Err(EmbeddingError::Provider { .. })));
    assert_eq!(provider.calls(), 1);

    // Nothing was cached or left claimed, so the next call goes out again.
    gate.add_permits(1);
    let retried = service.embed_for_tenant(Some("acme"), &request(&["same"])).await;
    assert_ok!(retried);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_second_identical_call_is_served_from_cache() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider.clone()], BASE);
    let req = request(&["x", "y"]);

    let first = service.embed(&req).await.unwrap();
    let second = service.embed(&req).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.calls(), 1);
    assert_eq!(service.cache().len(), 2);
    assert_eq!(service.cache().stats().hits, 2);
}

#[tokio::test]
async fn test_disabled_cache_still_dedups_but_never_stores() {
    let provider = scripted(4);
    let mut settings = BASE.to_vec();
    settings.push((keys::CACHE_ENABLED, "false"));
    let (_, service) = service_with(vec![provider.clone()], &settings);

    let req = request(&["x", "x"]);
    assert_ok!(service.embed(&req).await);
    assert_ok!(service.embed(&req).await);

    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.seen()[1], vec!["x".to_string()]);
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_inconsistent_dimensions_fail_and_cache_nothing() {
    let provider = Arc::new(ScriptedProvider::new("scripted", "vec", 4));
    let mut settings = BASE.to_vec();
    settings.push((keys::DEFAULT_MODEL, "vec"));
    let (_, service) = service_with(vec![provider.clone()], &settings);
    provider.ragged_next(1);

    let err = service.embed(&request(&["a", "b", "c"])).await.unwrap_err();

    match err {
        EmbeddingError::DimensionMismatch {
            index,
            expected,
            actual,
        } => {
            assert_eq!(index, 2);
            assert_eq!(expected, 4);
            assert_eq!(actual, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_model_implied_dimension_is_enforced() {
    let provider = Arc::new(ScriptedProvider::new("hash-like", "hash", 128));
    let (_, service) = service_with(
        vec![provider],
        &[
            (keys::DEFAULT_PROVIDER, "hash-like"),
            (keys::DEFAULT_MODEL, "hash-384"),
        ],
    );

    let err = service.embed(&request(&["text"])).await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::ModelDimensionMismatch {
            ref model,
            expected: 384,
            observed: 128,
        } if model == "hash-384"
    ));
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_version_tagged_model_name_implies_no_dimension() {
    let provider = Arc::new(ScriptedProvider::new("openai", "text-embedding-", 12));
    let (_, service) = service_with(vec![provider], &[(keys::DEFAULT_PROVIDER, "openai")]);

    let response = service
        .embed(&request(&["text"]).with_model("text-embedding-ada-002"))
        .await
        .unwrap();

    assert_eq!(response.model, "text-embedding-ada-002");
    assert_eq!(response.dimension, 12);
}

#[tokio::test]
async fn test_result_count_mismatch() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider.clone()], BASE);
    provider.short_next(1);

    let err = service.embed(&request(&["a", "b"])).await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::ResultCountMismatch {
            expected: 2,
            actual: 1
        }
    ));
    assert!(err.is_consistency_error());
}

#[tokio::test]
async fn test_normalization_applies_to_new_vectors() {
    let provider = scripted(4);
    let (_, service) = service_with(
        vec![provider],
        &[
            (keys::DEFAULT_PROVIDER, "scripted"),
            (keys::DEFAULT_MODEL, "vec-4"),
        ],
    );

    let normalized = service.embed(&request(&["n"])).await.unwrap();
    assert!((l2_norm(&normalized.vectors[0]) - 1.0).abs() < 1e-5);

    let raw = service
        .embed(&request(&["n"]).with_normalize(false))
        .await
        .unwrap();
    assert_eq!(raw.vectors[0], vector_for("n", 4));
}

#[tokio::test]
async fn test_tenant_strategy_overrides_defaults() {
    let default_provider = scripted(4);
    let tenant_provider = Arc::new(ScriptedProvider::new("tenant-p", "alt-", 6));
    let (_, service) = service_with(
        vec![default_provider.clone(), tenant_provider.clone()],
        BASE,
    );
    service.tenants().register("Acme", "tenant-p", "alt-6").unwrap();

    let acme = service
        .embed_for_tenant(Some(" ACME "), &request(&["hello"]))
        .await
        .unwrap();
    assert_eq!(acme.provider, "tenant-p");
    assert_eq!(acme.model, "alt-6");
    assert_eq!(acme.dimension, 6);

    let other = service
        .embed_for_tenant(Some("globex"), &request(&["hello"]))
        .await
        .unwrap();
    assert_eq!(other.provider, "scripted");
    assert_eq!(other.model, "vec-4");

    assert_eq!(tenant_provider.calls(), 1);
    assert_eq!(default_provider.calls(), 1);
}

#[tokio::test]
async fn test_configured_strategy_table_applies_and_registry_wins() {
    let default_provider = scripted(4);
    let alt = Arc::new(ScriptedProvider::new("alt", "alt-", 2));
    let mut settings = BASE.to_vec();
    settings.push((keys::TENANT_STRATEGIES, "acme|alt|alt-2;globex=alt:alt-2"));
    let (_, service) = service_with(vec![default_provider, alt], &settings);

    let acme = service
        .embed_for_tenant(Some("acme"), &request(&["t"]))
        .await
        .unwrap();
    assert_eq!((acme.provider.as_str(), acme.model.as_str()), ("alt", "alt-2"));

    service.tenants().register("acme", "scripted", "vec-4").unwrap();
    let acme = service
        .embed_for_tenant(Some("acme"), &request(&["t"]))
        .await
        .unwrap();
    assert_eq!((acme.provider.as_str(), acme.model.as_str()), ("scripted", "vec-4"));

    let globex = service
        .embed_for_tenant(Some("globex"), &request(&["t"]))
        .await
        .unwrap();
    assert_eq!(globex.provider, "alt");
}

#[tokio::test]
async fn test_explicit_request_beats_tenant_strategy() {
    let default_provider = scripted(4);
    let alt = Arc::new(ScriptedProvider::new("alt", "alt-", 2));
    let (_, service) = service_with(vec![default_provider, alt], BASE);
    service.tenants().register("acme", "alt", "alt-2").unwrap();

    let response = service
        .embed_for_tenant(
            Some("acme"),
            &request(&["t"]).with_provider("scripted").with_model("vec-4"),
        )
        .await
        .unwrap();
    assert_eq!(response.provider, "scripted");
    assert_eq!(response.model, "vec-4");
}

#[tokio::test]
async fn test_provider_inferred_from_model() {
    let default_provider = scripted(4);
    let alt = Arc::new(ScriptedProvider::new("alt", "alt-", 3));
    let (_, service) = service_with(vec![default_provider, alt.clone()], BASE);

    let response = service
        .embed(&request(&["t"]).with_model("alt-3"))
        .await
        .unwrap();
    assert_eq!(response.provider, "alt");
    assert_eq!(alt.calls(), 1);
}

#[tokio::test]
async fn test_resolution_failures() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider.clone()], BASE);

    let err = service
        .embed(&request(&["t"]).with_provider("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::ProviderNotFound(ref name) if name == "missing"));

    let err = service
        .embed(&request(&["t"]).with_provider("scripted").with_model("other"))
        .await
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::UnsupportedModel { .. }));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_tenants_do_not_share_cache_entries() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider.clone()], BASE);

    assert_ok!(service.embed_for_tenant(Some("a"), &request(&["t"])).await);
    assert_ok!(service.embed_for_tenant(Some("b"), &request(&["t"])).await);
    assert_ok!(service.embed_for_tenant(Some("A"), &request(&["t"])).await);
    assert_ok!(service.embed_for_tenant(None, &request(&["t"])).await);
    assert_ok!(service.embed_for_tenant(Some("  "), &request(&["t"])).await);

    // "A" shares with "a"; a blank tenant shares with no tenant.
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_reload_clears_and_resizes_cache() {
    let provider = scripted(4);
    let (source, service) = service_with(vec![provider.clone()], BASE);

    assert_ok!(service.embed(&request(&["a", "b", "c"])).await);
    assert_eq!(service.cache().len(), 3);

    source.set(keys::CACHE_MAX_ENTRIES, "2");
    source.set(keys::VERSION, "v2");
    let snapshot = service.reload_configuration().unwrap();

    assert_eq!(snapshot.embedding_version, "v2");
    assert!(service.cache().is_empty());
    assert_eq!(service.cache().capacity(), 2);

    let response = service.embed(&request(&["a"])).await.unwrap();
    assert_eq!(response.embedding_version, "v2");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_embed_one() {
    let provider = scripted(4);
    let (_, service) = service_with(vec![provider], BASE);

    let vector = service.embed_one("solo").await.unwrap();
    assert_eq!(vector, vector_for("solo", 4));
    assert_err!(service.embed_one("").await);
}

#[tokio::test]
async fn test_invalid_configuration_surfaces_as_error() {
    let provider = scripted(4);
    let (source, service) = service_with(vec![provider.clone()], BASE);

    source.set(keys::BATCH_SIZE, "many");
    let err = service.embed(&request(&["t"])).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Validation(_)));
    assert_eq!(provider.name(), "scripted");
    assert_eq!(provider.calls(), 0);
}
