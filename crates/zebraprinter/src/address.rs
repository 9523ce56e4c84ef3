//! Bluetooth device address normalization.
//!
//! Printer addresses arrive in two spellings: colon-separated pairs
//! ("AA:BB:CC:DD:EE:FF") or 12 bare hex digits ("aabbccddeeff"). Both
//! normalize to the uppercase colon-separated canonical form.

/// Normalize a raw address string to canonical `AA:BB:CC:DD:EE:FF` form.
///
/// Strips every non-hex character, uppercases, keeps the first 12 hex
/// digits, and groups them into colon-separated pairs. Idempotent.
pub fn normalize_mac(raw: &str) -> String {
    let digits: Vec<char> = raw
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .take(12)
        .collect();

    digits
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// Whether the input already has the shape of a device address
/// (canonical colon-separated form or 12 bare hex digits).
pub fn looks_like_mac(raw: &str) -> bool {
    let s = raw.trim().to_ascii_uppercase();
    is_canonical(&s) || (s.len() == 12 && s.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_canonical(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}
