/// Content item id utilities.
///
/// Ids are 26 lowercase base32 characters encoding a time-ordered UUID, so
/// they sort roughly by creation time and never contain separators.
use uuid::Uuid;

const ID_LEN: usize = 26;
const ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Generate a new content item id.
pub fn new_content_item_id() -> String {
    let mut bits = Uuid::now_v7().as_u128();
    let mut out = [0u8; ID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(bits & 0x1f) as usize];
        bits >>= 5;
    }
    out.iter().map(|&b| b as char).collect()
}

/// Heuristic used when reading client bodies: a string longer than 20
/// characters made only of letters and digits is taken to be an id.
///
/// Long single-word text values are misread as ids. Known and accepted.
pub fn looks_like_content_item_id(value: &str) -> bool {
    value.chars().count() > 20 && value.chars().all(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_look_like_ids() {
        let id = new_content_item_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(looks_like_content_item_id(&id));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = new_content_item_id();
        let b = new_content_item_id();
        assert_ne!(a, b);
    }

    #[test]
    fn heuristic_boundaries() {
        assert!(!looks_like_content_item_id("short"));
        assert!(!looks_like_content_item_id(&"a".repeat(20)));
        assert!(looks_like_content_item_id(&"a".repeat(21)));
        assert!(!looks_like_content_item_id("4k1qg2x0-d9m3r7t5v8w6y2z1ab"));
        assert!(!looks_like_content_item_id("a sentence with many words in it"));
    }
}
