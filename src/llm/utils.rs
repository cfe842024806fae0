use crate::llm::{ApiError, ApiErrorContext, RateLimitHandler};
use anyhow::Result;
use reqwest::Response;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Check response error and extract rate limit information.
/// Returns Ok(Response) if successful, or an error with rate limit context if not.
pub async fn check_response_error<T: RateLimitHandler + std::fmt::Debug + Send + Sync + 'static>(
    response: Response,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limits = T::from_response(&response);
    let response_text = response
        .text()
        .await
        .map_err(|e| ApiError::NetworkError(e.to_string()))?;

    let error = match status.as_u16() {
        429 => ApiError::RateLimit(response_text),
        401 => ApiError::Authentication(response_text),
        400 => ApiError::InvalidRequest(response_text),
        // Anthropic reports an overloaded service with this non-standard code
        529 => ApiError::Overloaded(response_text),
        _ if status.is_server_error() => ApiError::ServiceError(response_text),
        _ => ApiError::Unknown(format!("Status {status}: {response_text}")),
    };

    Err(ApiErrorContext {
        error,
        rate_limits: Some(rate_limits),
    }
    .into())
}

/// Exponential backoff used when the provider gives no timing hint.
/// `attempts` counts failed attempts so far, starting at 1.
fn backoff_delay(attempts: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempts.saturating_sub(1)))
}

/// Handle retryable errors and rate limiting for LLM providers.
/// Returns true if the error is retryable and we should continue the retry loop.
/// Returns false if we should exit the retry loop.
pub async fn handle_retryable_error<
    T: RateLimitHandler + std::fmt::Debug + Send + Sync + 'static,
>(
    error: &anyhow::Error,
    attempts: u32,
    max_retries: u32,
) -> bool {
    if attempts > max_retries {
        return false;
    }

    let Some(ctx) = error.downcast_ref::<ApiErrorContext<T>>() else {
        return false;
    };

    match &ctx.error {
        ApiError::RateLimit(_) => {
            let delay = match &ctx.rate_limits {
                Some(rate_limits) => rate_limits.get_retry_delay(),
                None => backoff_delay(attempts),
            };
            warn!(
                "Rate limit hit (attempt {}/{}), waiting {} seconds before retry",
                attempts,
                max_retries,
                delay.as_secs()
            );
            sleep(delay).await;
            true
        }
        ApiError::ServiceError(_) | ApiError::NetworkError(_) | ApiError::Overloaded(_) => {
            let delay = backoff_delay(attempts);
            warn!(
                "Error: {} (attempt {}/{}), retrying in {} seconds",
                error,
                attempts,
                max_retries,
                delay.as_secs()
            );
            sleep(delay).await;
            true
        }
        _ => {
            warn!(
                "Unhandled error (attempt {}/{}): {:?}",
                attempts, max_retries, error
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_never_underflows() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
    }
}
