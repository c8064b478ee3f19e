//! Conversions between human-facing quota units and platform quantity
//! strings
//!
//! Callers work in cores and GiB; the platform speaks millicore strings
//! ("1000m") and binary-suffixed byte strings ("1Gi", "512Mi"). Parsers
//! return 0 for missing or unparseable input so a partially populated
//! observation never aborts adaptation; 0 therefore means "unknown",
//! not an explicit zero quota.

/// Format cores as a millicore quantity ("1.5" -> "1500m").
pub fn cpu_to_millicores(cores: f64) -> String {
    format!("{}m", (cores * 1000.0).floor() as i64)
}

/// Format GiB as a binary memory quantity. Sub-GiB values are rendered
/// in Mi to avoid fractional Gi quantities.
pub fn memory_to_native(gib: f64) -> String {
    if gib >= 1.0 && gib.fract() == 0.0 {
        format!("{}Gi", gib as i64)
    } else {
        format!("{}Mi", (gib * 1024.0).round() as i64)
    }
}

/// Format GiB of storage as a quantity string.
pub fn storage_to_native(gib: f64) -> String {
    format!("{}Gi", gib.round() as i64)
}

fn split_quantity(s: &str) -> Option<(f64, &str)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(s.len());
    let value: f64 = s[..split].parse().ok()?;
    Some((value, &s[split..]))
}

/// Parse a CPU quantity into millicores.
///
/// Accepts nanocore ("n"), microcore ("u"), millicore ("m") and plain
/// core values. Results below 0.1 millicores collapse to 0; the result
/// is rounded to 4 decimal places.
pub fn parse_cpu_millicores(cpu: &str) -> f64 {
    let Some((value, suffix)) = split_quantity(cpu) else {
        return 0.0;
    };
    let millicores = match suffix {
        "n" => value / 1_000_000.0,
        "u" => value / 1_000.0,
        "m" => value,
        "" => value * 1000.0,
        _ => return 0.0,
    };
    if millicores < 0.1 {
        return 0.0;
    }
    round_to(millicores, 4)
}

/// Parse a CPU quantity into cores, rounded to 8 decimal places for
/// sub-core precision.
pub fn parse_cpu_cores(cpu: &str) -> f64 {
    round_to(parse_cpu_millicores(cpu) / 1000.0, 8)
}

/// Parse a memory quantity into Mi. Ki/Mi/Gi/Ti suffixes are accepted;
/// unknown suffixes yield 0.
pub fn parse_memory_mi(memory: &str) -> f64 {
    let Some((value, suffix)) = split_quantity(memory) else {
        return 0.0;
    };
    let mi = match suffix {
        "Ki" => value / 1024.0,
        "Mi" => value,
        "Gi" => value * 1024.0,
        "Ti" => value * 1024.0 * 1024.0,
        "" => value / 1024.0 / 1024.0, // bare bytes
        _ => return 0.0,
    };
    round_to(mi, 2)
}

/// Parse a memory quantity into GiB, rounded to 8 decimal places.
pub fn parse_memory_gib(memory: &str) -> f64 {
    round_to(parse_memory_mi(memory) / 1024.0, 8)
}

/// Parse a storage quantity into GiB. Accepts the binary suffixes plus
/// decimal G/M/T, since storage classes report both.
pub fn parse_storage_gib(storage: &str) -> f64 {
    let Some((value, suffix)) = split_quantity(storage) else {
        return 0.0;
    };
    match suffix {
        "Gi" | "G" => value,
        "Mi" | "M" => round_to(value / 1024.0, 8),
        "Ti" | "T" => value * 1024.0,
        "Ki" => round_to(value / 1024.0 / 1024.0, 8),
        "" => value,
        _ => 0.0,
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
