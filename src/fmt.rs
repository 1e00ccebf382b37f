/// Format a float as Brazilian reais: R$ 1.234,56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-R$ {grouped},{dec_part}")
    } else {
        format!("R$ {grouped},{dec_part}")
    }
}

/// Human-readable artifact size.
pub fn file_size(bytes: Option<u64>) -> String {
    match bytes {
        None => "-".to_string(),
        Some(b) if b < 1024 => format!("{b} bytes"),
        Some(b) if b < 1024 * 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        Some(b) => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
    }
}

/// Milliseconds as seconds with one decimal.
pub fn duration(ms: Option<i64>) -> String {
    ms.map_or_else(|| "-".to_string(), |ms| format!("{:.1}s", ms as f64 / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "R$ 1.234,56");
        assert_eq!(money(-500.00), "-R$ 500,00");
        assert_eq!(money(0.0), "R$ 0,00");
        assert_eq!(money(1000000.99), "R$ 1.000.000,99");
        assert_eq!(money(42.10), "R$ 42,10");
    }

    #[test]
    fn test_file_size() {
        assert_eq!(file_size(None), "-");
        assert_eq!(file_size(Some(512)), "512 bytes");
        assert_eq!(file_size(Some(2048)), "2.0 KB");
        assert_eq!(file_size(Some(3 * 1024 * 1024 + 1024 * 512)), "3.5 MB");
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(None), "-");
        assert_eq!(duration(Some(1260)), "1.3s");
    }
}
