//! Alpha blending for theme colors.
//!
//! Best-effort compatibility shim: hex and `rgb()`/`rgba()` inputs become
//! `rgba(r,g,b,alpha)`, anything else is returned as given.

use regex::Regex;
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+").unwrap());

/// Re-express `color` with the given alpha.
pub fn to_rgba(color: &str, alpha: f64) -> String {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        return match parse_hex(hex) {
            Some((r, g, b)) => format!("rgba({r},{g},{b},{alpha})"),
            None => color.to_string(),
        };
    }
    if color.starts_with("rgb") {
        let nums: Vec<&str> = NUMBER_RE.find_iter(color).map(|m| m.as_str()).collect();
        if nums.len() >= 3 {
            return format!("rgba({},{},{},{alpha})", nums[0], nums[1], nums[2]);
        }
    }
    color.to_string()
}

/// `rgb`, `rgba`, `rrggbb` and `rrggbbaa` forms. Alpha digits are dropped.
fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().take(3).flat_map(|c| [c, c]).collect(),
        6 | 8 => hex[..6].to_string(),
        _ => return None,
    };
    let num = u32::from_str_radix(&expanded, 16).ok()?;
    Some(((num >> 16) as u8, (num >> 8) as u8, num as u8))
}
