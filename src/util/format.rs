/// Format a byte count as `"<n> <unit>"` with at most two decimals, trailing zeros dropped
pub fn format_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    const K: f64 = 1024.0;

    if bytes <= 0.0 || !bytes.is_finite() {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes.ln() / K.ln()).floor().max(0.0) as usize).min(UNITS.len() - 1);
    let scaled = bytes / K.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;

    let mut number = format!("{:.2}", rounded);
    while number.ends_with('0') {
        number.pop();
    }
    if number.ends_with('.') {
        number.pop();
    }

    format!("{} {}", number, UNITS[exponent])
}

/// Format minutes as a compact duration label (`15m`, `3h`, `1h 30m`)
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}
