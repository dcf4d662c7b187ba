/// Default output columns when `--output` is not given.
pub const DEFAULT_FIELDS: &str = "source.timestamp_local,service,log_type,message";

/// Split a comma-separated field list into display order. Field names are
/// taken verbatim (no trimming, no validation); a field that never appears
/// in an event simply renders empty.
pub fn select(spec: Option<&str>) -> Vec<String> {
    let spec = match spec {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_FIELDS,
    };
    spec.split(',').map(str::to_string).collect()
}
