use std::time::Duration;

pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(120);

/// Wait to apply after a rate-limit response: the server's suggestion when it
/// gave one, otherwise a fixed default.
pub fn rate_limit_wait(retry_after_secs: Option<u64>, default_wait: Duration) -> Duration {
    match retry_after_secs {
        Some(secs) => Duration::from_secs(secs),
        None => default_wait,
    }
}

/// Wait for the next cycle: the rate-limit override when one was recorded this
/// iteration, otherwise the normal poll interval.
pub fn next_wait(wait_override: Option<Duration>, poll_interval: Duration) -> Duration {
    wait_override.unwrap_or(poll_interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_wait_is_honored() {
        assert_eq!(
            rate_limit_wait(Some(45), DEFAULT_RATE_LIMIT_WAIT),
            Duration::from_secs(45)
        );
    }

    #[test]
    fn test_missing_suggestion_falls_back_to_default() {
        assert_eq!(
            rate_limit_wait(None, DEFAULT_RATE_LIMIT_WAIT),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_zero_suggestion_means_no_extra_wait() {
        assert_eq!(
            rate_limit_wait(Some(0), DEFAULT_RATE_LIMIT_WAIT),
            Duration::ZERO
        );
    }

    #[test]
    fn test_next_wait_prefers_override() {
        let interval = Duration::from_secs(300);
        assert_eq!(
            next_wait(Some(Duration::from_secs(45)), interval),
            Duration::from_secs(45)
        );
        assert_eq!(next_wait(None, interval), interval);
    }
}
