use serde_json::Value;

use crate::errors::ExtractError;

/// Best-effort extraction of a JSON object from model output.
///
/// Slices from the first `{` to the last `}` inclusive and parses the
/// result. Models tend to wrap their JSON in prose, so this is usually
/// enough; it is deliberately not a real scanner. Known failure modes:
/// two independent objects in one reply are sliced together as one
/// (and will normally fail to parse), and a `{` or `}` inside a string
/// literal before/after the object skews the slice. Callers get the raw
/// text back in the error for inspection.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ExtractError::NoJsonObject)?;
    if end < start {
        return Err(ExtractError::NoJsonObject);
    }

    let candidate = &text[start..=end];
    serde_json::from_str(candidate).map_err(|source| ExtractError::Parse {
        source,
        raw: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_with_surrounding_prose() {
        let value = extract_json("Here is the data: {\"a\": 1} hope it helps!").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn extracts_bare_object() {
        let value = extract_json("{\"headline\": \"x\", \"n\": 2}").unwrap();
        assert_eq!(value["n"], json!(2));
    }

    #[test]
    fn fails_without_braces() {
        assert!(matches!(
            extract_json("no braces here"),
            Err(ExtractError::NoJsonObject)
        ));
    }

    #[test]
    fn fails_on_reversed_braces() {
        assert!(matches!(
            extract_json("} backwards {"),
            Err(ExtractError::NoJsonObject)
        ));
    }

    // Documented quirk: two objects are sliced from the first `{` to the
    // last `}` and the combined text is not valid JSON.
    #[test]
    fn two_objects_slice_together_and_fail_to_parse() {
        let result = extract_json("{\"a\": 1} ... {\"b\": 2}");
        match result {
            Err(ExtractError::Parse { raw, .. }) => {
                assert!(raw.contains("{\"a\": 1}"));
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_preserves_raw_text() {
        let result = extract_json("prefix {not json} suffix");
        match result {
            Err(ExtractError::Parse { raw, .. }) => {
                assert_eq!(raw, "prefix {not json} suffix");
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }
}
