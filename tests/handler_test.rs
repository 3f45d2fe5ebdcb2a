//! Tests for handler composition: auth guard and cache layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use krishi::handler::{Authenticated, Authenticator, Handler, with_auth, with_cache};
use krishi::{CacheKey, Krishi, KrishiError, MemoCache, Result, UserContext};

// ============================================================================
// Test handlers
// ============================================================================

/// Greets the resolved user; counts calls.
struct Greeter {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Handler<(UserContext, String)> for Greeter {
    type Output = String;

    async fn call(&self, request: (UserContext, String)) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (user, greeting) = request;
        Ok(format!("{greeting}, {}", user.full_name))
    }
}

/// Upper-cases its input, failing on "fail".
struct Shout {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Handler<String> for Shout {
    type Output = String;

    async fn call(&self, request: String) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request == "fail" {
            return Err(KrishiError::Unavailable("shout failed".to_string()));
        }
        Ok(request.to_uppercase())
    }
}

/// Accepts exactly one token.
struct StaticTokens;

#[async_trait]
impl Authenticator for StaticTokens {
    async fn authenticate(&self, credential: &str) -> Result<UserContext> {
        if credential == "valid-token" {
            Ok(UserContext::new("u-1", "Asha Patil").with_location("Nashik"))
        } else {
            Err(KrishiError::Unauthorized("token is invalid".to_string()))
        }
    }
}

fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

// ============================================================================
// Auth guard
// ============================================================================

#[tokio::test]
async fn valid_token_reaches_handler() {
    let calls = counter();
    let handler = with_auth(
        Greeter {
            calls: calls.clone(),
        },
        StaticTokens,
    );

    let out = handler
        .call(Authenticated::new("valid-token", "Namaskar".to_string()))
        .await
        .unwrap();

    assert_eq!(out, "Namaskar, Asha Patil");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_token_is_rejected_before_handler() {
    let calls = counter();
    let handler = with_auth(
        Greeter {
            calls: calls.clone(),
        },
        StaticTokens,
    );

    let err = handler
        .call(Authenticated::anonymous("Namaskar".to_string()))
        .await
        .unwrap_err();

    assert_eq!(err, KrishiError::Unauthorized("token is missing".to_string()));
    assert_eq!(err.status_code(), 401);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_token_counts_as_missing() {
    let handler = with_auth(Greeter { calls: counter() }, StaticTokens);
    let err = handler
        .call(Authenticated::new("   ", "Namaskar".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err, KrishiError::Unauthorized("token is missing".to_string()));
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let calls = counter();
    let handler = with_auth(
        Greeter {
            calls: calls.clone(),
        },
        StaticTokens,
    );

    let err = handler
        .call(Authenticated::new("stolen", "Namaskar".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, KrishiError::Unauthorized(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Cache layer
// ============================================================================

#[tokio::test]
async fn cache_layer_memoizes_success() {
    let calls = counter();
    let cache = Arc::new(MemoCache::<String>::new("shout", 100));
    let handler = with_cache(
        Shout {
            calls: calls.clone(),
        },
        cache,
        Duration::from_secs(60),
        |word: &String| CacheKey::new("shout", &[word.as_str()]),
    );

    assert_eq!(handler.call("hello".to_string()).await.unwrap(), "HELLO");
    assert_eq!(handler.call("Hello ".to_string()).await.unwrap(), "HELLO");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cache_layer_does_not_memoize_errors() {
    let calls = counter();
    let handler = with_cache(
        Shout {
            calls: calls.clone(),
        },
        Arc::new(MemoCache::<String>::new("shout", 100)),
        Duration::from_secs(60),
        |word: &String| CacheKey::new("shout", &[word.as_str()]),
    );

    assert!(handler.call("fail".to_string()).await.is_err());
    assert!(handler.call("fail".to_string()).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Wrappers stack: auth outside, cache inside.
#[tokio::test]
async fn wrappers_compose() {
    let calls = counter();
    let cached = with_cache(
        Greeter {
            calls: calls.clone(),
        },
        Arc::new(MemoCache::<String>::new("greeting", 100)),
        Duration::from_secs(60),
        |(user, greeting): &(UserContext, String)| {
            CacheKey::new("greeting", &[user.user_id.as_str(), greeting.as_str()])
        },
    );
    let handler = with_auth(cached, StaticTokens);

    for _ in 0..3 {
        let out = handler
            .call(Authenticated::new("valid-token", "Ram Ram".to_string()))
            .await
            .unwrap();
        assert_eq!(out, "Ram Ram, Asha Patil");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Ready handlers
// ============================================================================

#[tokio::test]
async fn dashboard_handler_requires_location() {
    let ctx = Krishi::builder().build().unwrap();

    struct NoLocation;

    #[async_trait]
    impl Authenticator for NoLocation {
        async fn authenticate(&self, _credential: &str) -> Result<UserContext> {
            Ok(UserContext::new("u-2", "Ravi Jadhav"))
        }
    }

    let handler = with_auth(ctx.dashboard_handler(), NoLocation);
    let err = handler
        .call(Authenticated::new("any", ()))
        .await
        .unwrap_err();
    assert_eq!(err, KrishiError::Validation("User location not set.".to_string()));
}

#[tokio::test]
async fn weather_handler_reports_missing_upstream() {
    let ctx = Krishi::builder().build().unwrap();
    let err = ctx
        .weather_handler()
        .call("Pune".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, KrishiError::Misconfigured { upstream: "weather", .. }));
}
