//! Size Estimation Module
//!
//! Byte-footprint estimates used by the security gate.

use std::sync::Arc;

use serde::Serialize;

/// Size charged for values that cannot be measured.
///
/// Estimation failure must never make a value look free.
pub const FALLBACK_SIZE_BYTES: usize = 1024;

/// Estimates the byte footprint of a value, or None when it cannot.
pub type SizeEstimator<V> = Arc<dyn Fn(&V) -> Option<usize> + Send + Sync>;

/// Measures a value by the length of its JSON encoding.
///
/// Values whose `Serialize` impl fails (non-string map keys, custom
/// errors) report None.
pub fn json_size<V: Serialize + ?Sized>(value: &V) -> Option<usize> {
    serde_json::to_vec(value).ok().map(|bytes| bytes.len())
}

/// The default estimator for serializable values.
pub fn json_estimator<V: Serialize + 'static>() -> SizeEstimator<V> {
    Arc::new(|value: &V| json_size(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_json_size_string() {
        // Quotes are part of the encoding.
        assert_eq!(json_size("hello"), Some(7));
        assert_eq!(json_size(&"x".repeat(100)), Some(102));
    }

    #[test]
    fn test_json_size_grows_with_payload() {
        let small = vec![1u8; 10];
        let large = vec![1u8; 1000];
        assert!(json_size(&large).unwrap() > json_size(&small).unwrap());
    }

    #[test]
    fn test_json_size_unserializable() {
        // JSON object keys must be strings.
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        assert_eq!(json_size(&map), None);
    }

    #[test]
    fn test_json_estimator() {
        let estimator = json_estimator::<String>();
        assert_eq!(estimator(&"abc".to_string()), Some(5));
    }
}
