/// Escapes `$` for clients that render markdown with inline math, where a
/// bare dollar sign flips the rest of the line into LaTeX.
///
/// Applied only to text leaving through the display endpoints. Text sent
/// to the model or the search service is never escaped.
pub fn escape_dollars(text: &str) -> String {
    text.replace('$', "\\$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_signs_are_escaped() {
        assert_eq!(escape_dollars("costs $49.99"), "costs \\$49.99");
        assert_eq!(escape_dollars("$5 and $10"), "\\$5 and \\$10");
    }

    #[test]
    fn text_without_dollars_is_unchanged() {
        assert_eq!(escape_dollars("no currency here"), "no currency here");
    }

    #[test]
    fn escaping_must_run_exactly_once() {
        assert_eq!(escape_dollars("\\$5"), "\\\\$5");
    }
}
