//! JSON serialization for filter results.

use crate::result::FilterResult;

/// Serialize a FilterResult to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for FilterResult).
pub fn to_json(result: &FilterResult) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

/// Serialize a FilterResult to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for FilterResult).
pub fn to_json_pretty(result: &FilterResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdaptiveKnockoff;

    fn make_result() -> FilterResult {
        AdaptiveKnockoff::new()
            .run_scalar(
                &[3.0, -1.0, 5.0, -2.0, 4.0, -0.5],
                &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                &[0.5, 1.0],
            )
            .unwrap()
            .into_result()
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&make_result()).unwrap();
        assert!(json.contains("\"reveal_order\":[0,1,2,3,4,5]"));
        assert!(json.contains("\"rejections\":[0,2,4]"));
        assert!(json.contains("\"stop_reason\":\"Exhausted\""));
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json_pretty(&make_result()).unwrap();
        assert!(json.contains('\n')); // Pretty print has newlines
        assert!(json.contains("fdp_trace"));
    }

    #[test]
    fn test_json_parses_back() {
        let result = make_result();
        let parsed: FilterResult = serde_json::from_str(&to_json(&result).unwrap()).unwrap();
        assert_eq!(parsed.levels, result.levels);
        assert_eq!(parsed.reveal_order, result.reveal_order);
    }
}
