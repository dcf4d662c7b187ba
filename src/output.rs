use crate::event::NormalizedEvent;

/// Render one event as a tab-separated line in the given column order.
/// Absent fields render as empty string so the column count always equals
/// the field count. Embedded tabs or newlines inside values are not
/// escaped; callers wanting machine-safe output should pick fields that
/// cannot contain them.
pub fn format_line(event: &NormalizedEvent, fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| event.get(f).map(|v| v.to_string()).unwrap_or_default())
        .collect::<Vec<String>>()
        .join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FieldValue;

    fn sample() -> NormalizedEvent {
        let mut e = NormalizedEvent::default();
        e.insert("service", FieldValue::Str("s1".to_string()));
        e.insert("status", FieldValue::Int(200));
        e
    }

    #[test]
    fn joins_with_tabs_in_field_order() {
        let fields = vec!["status".to_string(), "service".to_string()];
        assert_eq!(format_line(&sample(), &fields), "200\ts1");
    }

    #[test]
    fn missing_fields_render_empty_and_keep_column_count() {
        let fields = vec![
            "service".to_string(),
            "nope".to_string(),
            "status".to_string(),
        ];
        let line = format_line(&sample(), &fields);
        assert_eq!(line, "s1\t\t200");
        assert_eq!(line.split('\t').count(), fields.len());
    }

    #[test]
    fn empty_event_renders_all_empty() {
        let fields = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_line(&NormalizedEvent::default(), &fields), "\t");
    }
}
