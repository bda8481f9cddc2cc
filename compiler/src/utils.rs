/// Double quoted string literal, valid in both C and Python for the text
/// found in definition files.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub const GENERATED_NOTICE: &str = "Automatically generated by cloudgen, do not edit.";

/// Include guard derived from the header path.
pub fn include_guard(path: &str) -> String {
    let mangled: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("INFUSE_SDK_{}_", mangled)
}

/// Text safe to place inside a C block comment.
pub fn comment_text(text: &str) -> String {
    text.replace("*/", "* /").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("mV"), "\"mV\"");
        assert_eq!(quote("a \"b\""), "\"a \\\"b\\\"\"");
    }

    #[test]
    fn test_include_guard() {
        assert_eq!(
            include_guard("include/infuse/tdf/definitions.h"),
            "INFUSE_SDK_INCLUDE_INFUSE_TDF_DEFINITIONS_H_"
        );
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(comment_text("ends */ early\nsecond"), "ends * / early second");
    }
}
