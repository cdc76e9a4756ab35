use regex::Regex;
use std::sync::OnceLock;

const ORDER_NUMBER_PATTERN: &str =
    r"(?i)\border\s*(?:number|num|no\.?|id)?\s*(?:is\s*)?[:#]?\s*([A-Z0-9][A-Z0-9-]{3,})\b";

fn order_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(ORDER_NUMBER_PATTERN).ok())
        .as_ref()
}

/// Pull an order reference such as `order #12345` or `order number AB-20931`
/// out of an utterance. The reference must contain at least one digit.
pub fn extract_order_number(utterance: &str) -> Option<String> {
    order_pattern()?
        .captures_iter(utterance)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('-'))
        .find(|candidate| candidate.chars().any(|c| c.is_ascii_digit()))
        .map(|candidate| candidate.to_uppercase())
}
