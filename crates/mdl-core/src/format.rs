//! Human-readable sizes and rates for progress labels.

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;
const TB: f64 = GB * 1024.0;
const PB: f64 = TB * 1024.0;

/// Renders a byte count with binary units and two decimals. Unknown or zero
/// sizes render as "unknown size".
pub fn format_size(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        Some(b) if b > 0 => b,
        _ => return "unknown size".to_string(),
    };
    let size = bytes as f64;
    if size >= PB {
        format!("{:.2}PB", size / PB)
    } else if size >= TB {
        format!("{:.2}TB", size / TB)
    } else if size >= GB {
        format!("{:.2}GB", size / GB)
    } else if size >= MB {
        format!("{:.2}MB", size / MB)
    } else if size >= KB {
        format!("{:.2}KB", size / KB)
    } else {
        format!("{}B", bytes)
    }
}

/// Byte throughput label, e.g. `"3.50 MB/s"`.
pub fn byte_rate_label(bytes_per_sec: f64) -> String {
    format!("{:.2} MB/s", bytes_per_sec / MB)
}

/// Segment throughput label, e.g. `"1.50 seg/s (3/10)"`.
pub fn segment_rate_label(segments_per_sec: f64, done: u64, total: u64) -> String {
    format!("{:.2} seg/s ({}/{})", segments_per_sec, done, total)
}
