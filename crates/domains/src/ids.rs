//! Client-side identifier generation: `<millis in base36>-<13 random chars>`.

use uuid::Uuid;

const RANDOM_LEN: usize = 13;

pub fn new_identifier(now_ms: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(now_ms.max(0) as u64), &random[..RANDOM_LEN])
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_700_000_000_000), "loyw3v28");
    }

    #[test]
    fn identifiers_are_prefixed_by_time_and_unique() {
        let a = new_identifier(36);
        let b = new_identifier(36);
        assert!(a.starts_with("10-"));
        assert_eq!(a.len(), 3 + RANDOM_LEN);
        assert_ne!(a, b);
    }
}
