//! Data-dependent predicates attached to permission grants.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Parameters supplied by the caller of a permission check.
pub type Params = serde_json::Value;

/// Asynchronous predicate deciding whether a conditional grant applies.
#[async_trait]
pub trait Condition: Send + Sync {
    /// Evaluate against the call-supplied parameters.
    async fn evaluate(&self, params: &Params) -> anyhow::Result<bool>;
}

/// Condition backed by an async closure.
pub struct FnCondition<F>(F);

#[async_trait]
impl<F, Fut> Condition for FnCondition<F>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn evaluate(&self, params: &Params) -> anyhow::Result<bool> {
        (self.0)(params.clone()).await
    }
}

/// Wrap an async closure as a shareable condition.
///
/// ```
/// use tessera_session::rbac::condition;
///
/// let owner_only = condition(|params| async move {
///     Ok(params["ownerId"] == params["userId"])
/// });
/// # let _ = owner_only;
/// ```
pub fn condition<F, Fut>(f: F) -> Arc<dyn Condition>
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(FnCondition(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_condition_receives_params() {
        let owner_only = condition(|params| async move {
            Ok(params["ownerId"] == params["userId"])
        });

        assert!(owner_only
            .evaluate(&json!({"userId": 1, "ownerId": 1}))
            .await
            .unwrap());
        assert!(!owner_only
            .evaluate(&json!({"userId": 1, "ownerId": 2}))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_fn_condition_propagates_failure() {
        let failing = condition(|_| async { Err(anyhow::anyhow!("lookup failed")) });
        let err = failing.evaluate(&Params::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "lookup failed");
    }
}
