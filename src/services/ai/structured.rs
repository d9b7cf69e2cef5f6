use serde::de::DeserializeOwned;

/// Pulls a JSON value of shape `T` out of a model reply. Models wrap JSON in
/// markdown fences or surround it with prose often enough that a plain
/// `from_str` is not sufficient.
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Option<T> {
    // Try direct parse first
    if let Ok(value) = serde_json::from_str::<T>(response) {
        return Some(value);
    }

    // Strip markdown code fences
    let trimmed = response.trim();
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(value) = serde_json::from_str::<T>(cleaned) {
        return Some(value);
    }

    // Try to find JSON object in the response
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<T>(&cleaned[start..=end]).ok()
}
