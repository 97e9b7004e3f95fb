//! Bounded-attempt retry with exponential backoff and jitter. Only errors
//! where [`FilterError::is_transient`] holds are retried; the
//! ambient context's cancellation/deadline is checked before every attempt
//! and during every backoff sleep.

use std::time::Duration;

use gateway_core::config::RetryConfig;
use gateway_core::context::AmbientContext;
use gateway_core::error::FilterError;

/// Run `op` up to `1 + config.number_of_retries` times, sleeping
/// `min(maxBackoff, baseBackoff * 2^attempt) + jitter` between attempts,
/// where `jitter` is uniform in `[0, baseBackoff)`.
pub async fn run_with_retry<F, Fut, T>(
    config: &RetryConfig,
    ctx: &AmbientContext,
    mut op: F,
) -> Result<T, FilterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FilterError>>,
{
    let attempts = 1 + config.number_of_retries;
    let mut last_err: Option<FilterError> = None;

    for attempt in 0..attempts {
        if ctx.is_done() {
            return Err(deadline_or_cancellation(ctx));
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }
                last_err = Some(err);
                if attempt + 1 < attempts {
                    let backoff = compute_backoff(config, attempt);
                    if !interruptible_sleep(ctx, backoff).await {
                        return Err(deadline_or_cancellation(ctx));
                    }
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        FilterError::Upstream(Box::new(std::io::Error::other("retry exhausted with no error")))
    }))
}

fn deadline_or_cancellation(ctx: &AmbientContext) -> FilterError {
    if ctx.cancellation().is_cancelled() {
        FilterError::ContextCanceled
    } else {
        FilterError::DeadlineExceeded
    }
}

fn compute_backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let base_ms = config.base_backoff_ms;
    let max = Duration::from_millis(config.max_backoff_ms);
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(32));
    let capped = Duration::from_millis(exp_ms).min(max);
    let jitter_ms = (rand::random::<f64>() * base_ms as f64) as u64;
    capped + Duration::from_millis(jitter_ms)
}

/// Sleep for `duration`, cut short by the context's cancellation or
/// deadline. Returns `false` if the sleep was interrupted.
async fn interruptible_sleep(ctx: &AmbientContext, duration: Duration) -> bool {
    let wait = match ctx.remaining() {
        Some(remaining) if remaining < duration => remaining,
        _ => duration,
    };
    tokio::select! {
        _ = tokio::time::sleep(wait) => !ctx.is_done(),
        _ = ctx.cancellation().cancelled() => false,
    }
}
