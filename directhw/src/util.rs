//! Small shared helpers for the CLI tools.

/// Parse a number the way `strtoul(s, NULL, 0)` does: `0x`/`0X` hex,
/// `0o` or a leading zero octal, `0b` binary, otherwise decimal.
pub fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2)
    } else if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        u64::from_str_radix(oct, 8)
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid number `{s}`: {e}"))
}

/// Like [`parse_u64`] but bounded to `u32`.
pub fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_u64(s)?;
    u32::try_from(value).map_err(|_| format!("number `{s}` does not fit in 32 bits"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bases_follow_strtoul() {
        assert_eq!(parse_u64("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_u64("0X10").unwrap(), 16);
        assert_eq!(parse_u64("16").unwrap(), 16);
        assert_eq!(parse_u64("0o20").unwrap(), 16);
        assert_eq!(parse_u64("020").unwrap(), 16);
        assert_eq!(parse_u64("0b101").unwrap(), 5);
        assert_eq!(parse_u64("0").unwrap(), 0);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_u64("").is_err());
        assert!(parse_u64("0xzz").is_err());
        assert!(parse_u64("-4").is_err());
    }

    #[test]
    fn parse_u32_bounds() {
        assert_eq!(parse_u32("0xffffffff").unwrap(), u32::MAX);
        assert!(parse_u32("0x100000000").is_err());
    }
}
