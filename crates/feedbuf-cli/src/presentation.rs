//! Terminal formatting helpers.
//!
//! Format-only: no domain transforms.

/// Truncate `s` to `max_len` characters, ending in "..." when shortened.
///
/// # Examples
///
/// ```rust
/// use feedbuf_cli::presentation::truncate_string;
///
/// assert_eq!(truncate_string("clip", 10), "clip");
/// assert_eq!(truncate_string("a-very-long-id", 8), "a-ver...");
/// ```
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_string("ééééé", 5), "ééééé");
        assert_eq!(truncate_string("éééééé", 5), "éé...");
    }
}
