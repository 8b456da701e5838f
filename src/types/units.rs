//! Unit Formatting
//!
//! The upstream services speak XMR as JSON numbers; logs and the CLI render
//! them with full piconero precision.

/// Human-readable amount, e.g. "0.000500000000 XMR"
pub fn format_xmr(xmr: f64) -> String {
    format!("{:.12} XMR", xmr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_xmr(0.0005), "0.000500000000 XMR");
        assert_eq!(format_xmr(1.0), "1.000000000000 XMR");
    }
}
