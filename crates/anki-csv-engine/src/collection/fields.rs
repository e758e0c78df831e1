//! Field text helpers: HTML stripping, checksums and GUIDs.

use sha1::{Digest, Sha1};

use super::sql::FIELD_SEPARATOR;

/// Characters used for base91 GUIDs, as Anki generates them.
const GUID_CHARS: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// Remove HTML tags and decode the common entities.
pub fn strip_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Checksum Anki stores in `notes.csum` for duplicate lookup.
///
/// The first 8 hex digits of the SHA-1 of the stripped field, as an integer.
pub fn field_checksum(field: &str) -> i64 {
    let digest = Sha1::digest(strip_html(field).as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as i64
}

/// A random note GUID.
pub fn generate_guid() -> String {
    let mut n: u64 = rand::random();
    let mut result = String::new();
    while n > 0 {
        result.push(GUID_CHARS[(n % 91) as usize] as char);
        n /= 91;
    }
    if result.is_empty() {
        result.push(GUID_CHARS[0] as char);
    }
    result
}

/// Join field values the way `notes.flds` stores them.
pub fn join_fields(fields: &[String]) -> String {
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Split `notes.flds` into field values.
pub fn split_fields(flds: &str) -> Vec<String> {
    flds.split(FIELD_SEPARATOR).map(str::to_string).collect()
}

/// Format tags the way `notes.tags` stores them: space separated with a
/// leading and trailing space, or empty.
pub fn join_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" {} ", tags.join(" "))
    }
}
