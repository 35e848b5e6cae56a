#![forbid(unsafe_code)]

//! Conversions between browser values and engine types.
//!
//! Kept free of `web-sys` so the rules can be tested natively.

use std::time::Duration;

use unveil_core::host::PlaybackError;

/// `DOMHighResTimeStamp` (milliseconds) to a duration. Negative and
/// non-finite stamps map to zero; stamps too large for a `Duration`
/// saturate.
#[must_use]
pub fn duration_from_ms(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Delay argument for `setTimeout`, saturating at `i32::MAX` milliseconds.
#[must_use]
pub fn timeout_ms(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis()).unwrap_or(i32::MAX)
}

/// Map the `name` of the exception a rejected `play()` promise carries.
#[must_use]
pub fn playback_error_from_name(name: &str) -> PlaybackError {
    match name {
        "NotAllowedError" => PlaybackError::NotAllowed,
        "NotSupportedError" => PlaybackError::NotSupported,
        "AbortError" => PlaybackError::Aborted,
        other => PlaybackError::Other(other.to_owned()),
    }
}

/// `data-*` key (as seen through `HTMLElement.dataset`) for a config
/// variable: `UNVEIL_MEDIA_MAX_WAIT_MS` becomes `unveilMediaMaxWaitMs`.
#[must_use]
pub fn dataset_key(var: &str) -> String {
    let mut out = String::with_capacity(var.len());
    for (i, word) in var.split('_').filter(|w| !w.is_empty()).enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps() {
        assert_eq!(duration_from_ms(1500.0), Duration::from_millis(1500));
        assert_eq!(duration_from_ms(-3.0), Duration::ZERO);
        assert_eq!(duration_from_ms(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_ms(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn oversized_timestamps_saturate() {
        assert_eq!(duration_from_ms(f64::MAX), Duration::MAX);
        assert_eq!(duration_from_ms(1e300), Duration::MAX);
    }

    #[test]
    fn timeout_saturates() {
        assert_eq!(timeout_ms(Duration::from_millis(2000)), 2000);
        assert_eq!(timeout_ms(Duration::from_secs(u64::MAX / 4)), i32::MAX);
    }

    #[test]
    fn dom_exception_names() {
        assert_eq!(playback_error_from_name("NotAllowedError"), PlaybackError::NotAllowed);
        assert_eq!(playback_error_from_name("AbortError"), PlaybackError::Aborted);
        assert_eq!(
            playback_error_from_name("SecurityError"),
            PlaybackError::Other("SecurityError".to_owned())
        );
    }

    #[test]
    fn dataset_keys_are_camel_case() {
        assert_eq!(dataset_key("UNVEIL_MEDIA_MAX_WAIT_MS"), "unveilMediaMaxWaitMs");
        assert_eq!(dataset_key("UNVEIL_REVEAL_ROOT_MARGIN"), "unveilRevealRootMargin");
        assert_eq!(dataset_key("UNVEIL"), "unveil");
    }
}
