//! Domain ID generation
//!
//! All IDs use the format: `{8-char-hex}-{type}-{slug}`
//! Example: `9f3c21ab-topic-chatgpt-で議事録作成`

/// Longest slug carried in an ID, in characters
const MAX_SLUG_CHARS: usize = 32;

/// Generate a domain ID from type and title
///
/// The hex part comes from the random tail of a UUIDv7, so records created
/// in the same millisecond with the same title still get distinct IDs.
pub fn generate_id(domain_type: &str, title: &str) -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    let hex = &uuid[uuid.len() - 8..];
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}-{}", hex, domain_type)
    } else {
        format!("{}-{}-{}", hex, domain_type, slug)
    }
}

/// Slugify a title for use in IDs
fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}
