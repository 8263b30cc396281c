pub const MAX_START_LEVEL: u32 = 255;
pub const DEFAULT_PORT: u16 = 8080;

pub fn normalize_level(value: Option<i64>) -> u32 {
    value.unwrap_or(1).clamp(1, MAX_START_LEVEL as i64) as u32
}

/// Seeds wrap into `u32`; a missing seed falls back to `fallback`.
pub fn normalize_seed(value: Option<i64>, fallback: u32) -> u32 {
    match value {
        Some(seed) => seed.rem_euclid(1_i64 << 32) as u32,
        None => fallback,
    }
}

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_PORT)
}

pub fn session_id_from(value: u64) -> String {
    format!("session_{value:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_level_clamps_range() {
        assert_eq!(normalize_level(None), 1);
        assert_eq!(normalize_level(Some(-4)), 1);
        assert_eq!(normalize_level(Some(7)), 7);
        assert_eq!(normalize_level(Some(10_000)), 255);
    }

    #[test]
    fn normalize_seed_wraps_and_falls_back() {
        assert_eq!(normalize_seed(None, 9), 9);
        assert_eq!(normalize_seed(Some(42), 9), 42);
        assert_eq!(normalize_seed(Some(-1), 9), u32::MAX);
        assert_eq!(normalize_seed(Some(1_i64 << 32), 9), 0);
    }

    #[test]
    fn port_parsing_is_lenient_for_invalid_values() {
        assert_eq!(parse_port(Some("3000")), 3000);
        assert_eq!(parse_port(Some(" 3000 ")), 3000);
        assert_eq!(parse_port(Some("0")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("abc")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000")), DEFAULT_PORT);
        assert_eq!(parse_port(None), DEFAULT_PORT);
    }

    #[test]
    fn session_ids_are_fixed_width() {
        assert_eq!(session_id_from(255), "session_00000000000000ff");
    }
}
