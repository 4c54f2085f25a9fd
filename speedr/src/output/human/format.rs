/// Two decimals; an empty series shows up as `NaN`.
pub(crate) fn format_fixed(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        format!("{v:.2}")
    }
}

pub(crate) fn format_ms(v: f64) -> String {
    format!("{} ms", format_fixed(v))
}

pub(crate) fn format_mbps(v: f64) -> String {
    format!("{} Mbps", format_fixed(v))
}

/// Right-aligned `label: value` line.
pub(crate) fn format_line(label: &str, value: &str) -> String {
    format!("{label:>20}: {value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_rounds_to_two_decimals() {
        assert_eq!(format_fixed(12.345_6), "12.35");
        assert_eq!(format_fixed(0.0), "0.00");
        assert_eq!(format_fixed(f64::NAN), "NaN");
    }

    #[test]
    fn lines_align_on_the_colon() {
        assert_eq!(
            format_line("Latency", &format_ms(40.0)),
            "             Latency: 40.00 ms"
        );
        assert_eq!(
            format_line("Download speed", &format_mbps(f64::NAN)),
            "      Download speed: NaN Mbps"
        );
    }
}
