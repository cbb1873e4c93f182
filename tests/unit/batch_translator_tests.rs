/*!
 * Tests for the batch translator: ordering, failure policies, timeouts,
 * bounded concurrency, retries and caching
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use subtrans::errors::{ProviderError, TranslationError};
use subtrans::providers::mock::MockProvider;
use subtrans::translation::{BatchOptions, BatchTranslator, FailurePolicy, RateLimiter, TranslationCache};

use crate::common;

fn translator(provider: &MockProvider, options: BatchOptions) -> BatchTranslator {
    BatchTranslator::new(Arc::new(provider.clone()), options)
}

#[tokio::test]
async fn test_translate_batch_withRandomDelays_shouldPreserveOrder() {
    common::init_logging();
    let texts: Vec<String> = (1..=40).map(|i| format!("line {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let entries = common::entries(&refs);

    let provider = MockProvider::working().with_random_delays(20);
    let outcome = translator(&provider, common::options(8, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.entries.len(), entries.len());
    for (input, output) in entries.iter().zip(&outcome.entries) {
        assert_eq!(output.id, input.id);
        assert_eq!(output.start_time, input.start_time);
        assert_eq!(output.end_time, input.end_time);
        assert_eq!(output.original_text, input.original_text);
        assert_eq!(output.translated_text, MockProvider::default_translation(&input.original_text, "fr"));
    }
}

#[tokio::test]
async fn test_translate_batch_withReversedCompletion_shouldPlaceByPosition() {
    let entries = common::entries(&["first", "second", "third"]);
    let provider = MockProvider::working()
        .delay_on("first", 60)
        .delay_on("second", 30)
        .delay_on("third", 0);

    let outcome = translator(&provider, common::options(3, FailurePolicy::BestEffort))
        .translate_batch(&entries, "de")
        .await
        .unwrap();

    let translated: Vec<&str> = outcome.entries.iter().map(|e| e.translated_text.as_str()).collect();
    assert_eq!(translated, vec!["[de] first", "[de] second", "[de] third"]);
}

#[tokio::test]
async fn test_translate_batch_withEmptyBatch_shouldMakeNoCalls() {
    let provider = MockProvider::working();
    let outcome = translator(&provider, BatchOptions::default())
        .translate_batch(&[], "fr")
        .await
        .unwrap();

    assert!(outcome.entries.is_empty());
    assert!(outcome.failures.is_empty());
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translate_batch_withBlankTarget_shouldFailValidationWithoutCalls() {
    let provider = MockProvider::working();
    let entries = common::entries(&["Hello"]);

    let result = translator(&provider, BatchOptions::default())
        .translate_batch(&entries, "  ")
        .await;

    assert!(matches!(result, Err(TranslationError::Validation(_))));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translate_batch_withBestEffort_shouldIsolateFailedEntry() {
    let entries = common::entries(&["one", "two", "three", "four", "five"]);
    let provider = MockProvider::working().fail_on("three", ProviderError::ApiError {
        status_code: 400,
        message: "unsupported".to_string(),
    });

    let outcome = translator(&provider, common::options(5, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    assert_eq!(outcome.entries.len(), 5);
    for (i, entry) in outcome.entries.iter().enumerate() {
        if i == 2 {
            assert!(entry.translated_text.is_empty());
        } else {
            assert_eq!(entry.translated_text, format!("[fr] {}", entry.original_text));
        }
    }

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.id, 3);
    assert_eq!(failure.index, 2);
    assert_eq!(failure.kind, "Api");
}

#[tokio::test]
async fn test_translate_batch_withSeveralFailures_shouldSortFailuresByPosition() {
    let entries = common::entries(&["a", "b", "c", "d"]);
    let provider = MockProvider::working()
        .fail_on("d", ProviderError::ConnectionError("reset".to_string()))
        .fail_on("b", ProviderError::ConnectionError("reset".to_string()))
        .delay_on("b", 40);

    let outcome = translator(&provider, common::options(4, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    let indexes: Vec<usize> = outcome.failures.iter().map(|f| f.index).collect();
    assert_eq!(indexes, vec![1, 3]);
}

#[tokio::test]
async fn test_translate_batch_withFailFast_shouldAbortAndIdentifyEntry() {
    let entries = common::entries(&["ok", "bad", "slow one", "slow two"]);
    let provider = MockProvider::working()
        .fail_on("bad", ProviderError::RateLimitExceeded {
            message: "quota".to_string(),
            retry_after_secs: None,
        })
        .delay_on("slow one", 5_000)
        .delay_on("slow two", 5_000);

    let start = Instant::now();
    let result = translator(&provider, common::options(4, FailurePolicy::FailFast))
        .translate_batch(&entries, "fr")
        .await;

    // In-flight slow calls are dropped, not awaited
    assert!(start.elapsed() < Duration::from_secs(2));
    match result {
        Err(TranslationError::Provider { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].id, 2);
            assert_eq!(failures[0].kind, "RateLimited");
        }
        other => panic!("expected a provider error, got {:?}", other),
    }
    assert_eq!(provider.in_flight(), 0);
}

#[tokio::test]
async fn test_translate_batch_withSlowProvider_shouldTimeOutEntry() {
    let entries = common::entries(&["fast", "stuck"]);
    let provider = MockProvider::working().delay_on("stuck", 5_000);

    let options = BatchOptions {
        request_timeout: Duration::from_millis(100),
        ..common::options(2, FailurePolicy::BestEffort)
    };

    let start = Instant::now();
    let outcome = translator(&provider, options).translate_batch(&entries, "fr").await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.entries[0].translated_text, "[fr] fast");
    assert!(outcome.entries[1].translated_text.is_empty());
    assert_eq!(outcome.failures[0].kind, "Timeout");
}

#[tokio::test]
async fn test_translate_batch_withConcurrencyLimit_shouldNeverExceedIt() {
    let texts: Vec<String> = (0..24).map(|i| format!("entry {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let entries = common::entries(&refs);
    let provider = MockProvider::slow(15);

    translator(&provider, common::options(3, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 24);
    assert!(provider.max_in_flight() <= 3, "max in flight was {}", provider.max_in_flight());
    assert!(provider.max_in_flight() >= 2);
}

#[tokio::test]
async fn test_translate_batch_withBlankText_shouldSkipProvider() {
    let entries = common::entries(&["Hello", "   ", ""]);
    let provider = MockProvider::working();

    let outcome = translator(&provider, common::options(2, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 1);
    assert!(outcome.is_complete());
    assert_eq!(outcome.entries[1].translated_text, "");
}

#[tokio::test]
async fn test_translate_batch_withRetryableFailure_shouldRetry() {
    // Every second call fails with a 503
    let provider = MockProvider::intermittent(2);
    let entries = common::entries(&["retry me"]);
    let options = BatchOptions {
        retry_count: 2,
        retry_backoff_ms: 1,
        ..common::options(1, FailurePolicy::BestEffort)
    };

    // First call succeeds, so burn it to make the batch call hit the failure
    translator(&provider, options.clone())
        .translate_batch(&common::entries(&["warm up"]), "fr")
        .await
        .unwrap();

    let outcome = translator(&provider, options).translate_batch(&entries, "fr").await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_translate_batch_withNonRetryableFailure_shouldNotRetry() {
    let provider = MockProvider::working()
        .fail_on("x", ProviderError::AuthenticationError("bad key".to_string()));
    let options = BatchOptions {
        retry_count: 3,
        retry_backoff_ms: 1,
        ..common::options(1, FailurePolicy::BestEffort)
    };

    let outcome = translator(&provider, options)
        .translate_batch(&common::entries(&["x"]), "fr")
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 1);
    assert_eq!(outcome.failures[0].kind, "Authentication");
}

#[tokio::test]
async fn test_translate_batch_withCache_shouldTranslateDuplicatesOnce() {
    let provider = MockProvider::working();
    let translator = translator(&provider, common::options(1, FailurePolicy::BestEffort))
        .with_cache(TranslationCache::new(true, 100));

    let entries = common::entries(&["Hello", "Hello", "World"]);
    let outcome = translator.translate_batch(&entries, "fr").await.unwrap();
    translator.translate_batch(&entries, "fr").await.unwrap();

    assert_eq!(provider.request_count(), 2);
    assert_eq!(outcome.entries[1].translated_text, "[fr] Hello");
    assert_eq!(translator.cache().len(), 2);
}

#[tokio::test]
async fn test_translate_batch_withoutCache_shouldCallForEveryEntry() {
    let provider = MockProvider::working();
    let entries = common::entries(&["Hello", "Hello"]);

    translator(&provider, common::options(2, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translate_batch_withProgress_shouldReportEveryEntry() {
    let provider = MockProvider::working().with_random_delays(5);
    let entries = common::entries(&["a", "b", "c", "d", "e"]);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = seen.clone();
    translator(&provider, common::options(2, FailurePolicy::BestEffort))
        .translate_batch_with_progress(&entries, "fr", move |done, total| {
            recorder.lock().push((done, total));
        })
        .await
        .unwrap();

    let seen = seen.lock().clone();
    assert_eq!(seen, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
}

#[tokio::test]
async fn test_translate_batch_withRateLimiter_shouldStillTranslateAll() {
    let provider = MockProvider::working();
    let translator = translator(&provider, common::options(4, FailurePolicy::BestEffort))
        .with_rate_limiter(Arc::new(RateLimiter::new(6000)));

    let outcome = translator
        .translate_batch(&common::entries(&["a", "b", "c"]), "fr")
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_translate_batch_withDuplicateIds_shouldKeepPositions() {
    let mut entries = common::entries(&["first", "second"]);
    entries[1].id = entries[0].id;

    let outcome = translator(&MockProvider::working(), common::options(2, FailurePolicy::BestEffort))
        .translate_batch(&entries, "fr")
        .await
        .unwrap();

    assert_eq!(outcome.entries[0].translated_text, "[fr] first");
    assert_eq!(outcome.entries[1].translated_text, "[fr] second");
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withRetryAfterBeyondTimeout_shouldFailEntryWithoutWaiting() {
    let provider = MockProvider::working().fail_on("Hello", ProviderError::RateLimitExceeded {
        message: "quota".to_string(),
        retry_after_secs: Some(3600),
    });
    let options = BatchOptions {
        request_timeout: Duration::from_millis(200),
        retry_count: 2,
        ..common::options(2, FailurePolicy::BestEffort)
    };

    let start = tokio::time::Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(3),
        translator(&provider, options).translate_batch(&common::entries(&["Hello", "World"]), "fr"),
    )
    .await
    .expect("batch waited for the provider's Retry-After")
    .unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(provider.request_count(), 2);
    assert_eq!(outcome.entries[1].translated_text, "[fr] World");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].kind, "RateLimited");
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withRetryAfterWithinTimeout_shouldWaitAndRetry() {
    let provider = MockProvider::working().fail_on("Hello", ProviderError::RateLimitExceeded {
        message: "quota".to_string(),
        retry_after_secs: Some(1),
    });
    let options = BatchOptions {
        request_timeout: Duration::from_secs(5),
        retry_count: 2,
        ..common::options(1, FailurePolicy::BestEffort)
    };

    let start = tokio::time::Instant::now();
    let outcome = translator(&provider, options)
        .translate_batch(&common::entries(&["Hello"]), "fr")
        .await
        .unwrap();

    // One first attempt and two retries, each one second apart
    assert_eq!(provider.request_count(), 3);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.failures[0].kind, "RateLimited");
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withProviderAlwaysTimingOut_shouldStayWithinBound() {
    let provider = MockProvider::slow(60_000);
    let entries = common::entries(&["a", "b", "c", "d"]);
    let options = BatchOptions {
        request_timeout: Duration::from_millis(100),
        retry_count: 2,
        retry_backoff_ms: 50,
        ..common::options(2, FailurePolicy::BestEffort)
    };

    let start = tokio::time::Instant::now();
    let outcome = translator(&provider, options).translate_batch(&entries, "fr").await.unwrap();

    // Two waves, each three attempts of 100ms with 50ms and 100ms backoff, plus timer slack
    let bound = Duration::from_millis(2 * (3 * 100 + 50 + 100) + 100);
    assert!(start.elapsed() <= bound, "batch took {:?}", start.elapsed());
    assert_eq!(provider.request_count(), 12);
    assert_eq!(provider.in_flight(), 0);
    assert_eq!(outcome.failures.len(), 4);
    assert!(outcome.failures.iter().all(|f| f.kind == "Timeout"));
    assert!(outcome.entries.iter().all(|e| e.translated_text.is_empty()));
}
