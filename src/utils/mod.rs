const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human-readable size label for a rendition, e.g. `12 MB`.
pub fn format_bytes(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        None => return "Unknown".to_string(),
        Some(0) => return "0 Byte".to_string(),
        Some(bytes) => bytes,
    };

    let mut index = 0;
    while index + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(index as u32 + 1) {
        index += 1;
    }

    let value = bytes as f64 / 1024f64.powi(index as i32);
    format!("{} {}", value.round() as u64, SIZE_UNITS[index])
}

/// `M:SS`, minutes are not folded into hours.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Keeps ASCII word characters and whitespace, drops everything else.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}
