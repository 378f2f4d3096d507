//! JavaScript snippets for DOM interaction.
//!
//! All caller-provided values are injected as JSON string literals, never
//! into code positions.

/// Encode a value as a JS string literal.
pub fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Wrap a statement body into an immediately invoked function expression.
pub fn iife(body: &str) -> String {
    format!("(() => {{ {body} }})()")
}

/// Click the first element matching `selector`; evaluates to whether it existed.
pub fn click(selector: &str) -> String {
    iife(&format!(
        "const el = document.querySelector({}); if (!el) return false; el.click(); return true;",
        js_str(selector)
    ))
}

/// Set the value of the first input matching `selector`.
pub fn fill(selector: &str, value: &str) -> String {
    iife(&format!(
        "const el = document.querySelector({}); if (!el) return false; \
         el.focus(); el.value = {}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;",
        js_str(selector),
        js_str(value)
    ))
}

/// Click the parent of the first `tag` element whose trimmed text equals `text`.
pub fn click_parent_of_text(tag: &str, text: &str) -> String {
    iife(&format!(
        "const el = Array.from(document.querySelectorAll({})) \
           .find(e => e.textContent.trim() === {}); \
         if (!el || !el.parentElement) return false; el.parentElement.click(); return true;",
        js_str(tag),
        js_str(text)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes_and_newlines() {
        assert_eq!(js_str("a'b\"c\nd"), r#""a'b\"c\nd""#);
    }

    #[test]
    fn test_fill_injects_value_as_literal() {
        let script = fill("#password", "p\"); alert(1); (\"");
        assert!(script.contains(r#"el.value = "p\"); alert(1); (\"""#));
    }

    #[test]
    fn test_click_targets_selector() {
        let script = click("#submitbutton");
        assert!(script.starts_with("(() => {"));
        assert!(script.contains(r##"document.querySelector("#submitbutton")"##));
    }
}
