use crate::cache::LineEntries;

/// Renders one language's cached entries as
/// `"<line>": [\n    "<translation>"\n]`, joined with `,\n`.
///
/// Lines and translations are written as JSON string literals, so plain text
/// comes out verbatim and embedded quotes stay unambiguous.
pub fn format_entries(entries: &LineEntries) -> String {
    entries
        .iter()
        .map(|(line, translations)| {
            let values = translations
                .iter()
                .map(|value| format!("    {}", quote(value)))
                .collect::<Vec<_>>()
                .join(",\n");
            format!("{}: [\n{}\n]", quote(line), values)
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn empty_entries_render_as_empty_string() {
        assert_eq!(format_entries(&LineEntries::default()), "");
    }

    #[test]
    fn single_entry_renders_exactly() {
        let mut entries = LineEntries::default();
        entries.insert("hello", "ahoj");
        assert_eq!(format_entries(&entries), "\"hello\": [\n    \"ahoj\"\n]");
    }

    #[test]
    fn entries_keep_input_order() {
        let mut entries = LineEntries::default();
        entries.insert("Hello", "Ahoj");
        entries.insert("Goodbye", "Na shledanou");
        entries.insert("Say \"hi\"", "Řekni \"ahoj\"");
        assert_snapshot!(format_entries(&entries), @r#"
        "Hello": [
            "Ahoj"
        ],
        "Goodbye": [
            "Na shledanou"
        ],
        "Say \"hi\"": [
            "Řekni \"ahoj\""
        ]
        "#);
    }
}
