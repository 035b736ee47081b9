//! Shared input validation for values typed on the configuration console.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// SSID: 1-32 printable ASCII bytes.
pub fn valid_ssid(ssid: &str) -> bool {
    (1..=32).contains(&ssid.len()) && is_printable_ascii(ssid)
}

/// WPA2 passphrase: empty (open network) or 8-64 printable ASCII bytes.
pub fn valid_secret(secret: &str) -> bool {
    (secret.is_empty() || (8..=64).contains(&secret.len())) && is_printable_ascii(secret)
}

/// Host part of the server URL: non-empty, printable, no whitespace or
/// URL delimiters.
pub fn valid_host(host: &str) -> bool {
    !host.is_empty()
        && is_printable_ascii(host)
        && !host.bytes().any(|b| matches!(b, b' ' | b'/' | b'?' | b'#' | b'@'))
}

/// TCP port: 1-65535.
pub fn valid_port(port: i64) -> Option<u16> {
    u16::try_from(port).ok().filter(|p| *p != 0)
}
