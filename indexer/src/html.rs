use scraper::Html;

/// Visible text of an HTML page; script and style contents are dropped.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
        });
        let text = text.trim();
        if !hidden && !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_scripts() {
        let html = r#"<html><head><title>Кошки</title><style>p { color: red }</style></head>
            <body><p>Кот <b>спит</b></p><script>var x = 1;</script></body></html>"#;
        assert_eq!(visible_text(html), "Кошки Кот спит");
    }

    #[test]
    fn drops_text_nested_in_hidden_elements() {
        let html = r#"<html><body><p>Кот</p>
            <noscript><p>Включите <b>скрипты</b></p></noscript>
            <div><style>.a { }</style>спит</div></body></html>"#;
        assert_eq!(visible_text(html), "Кот спит");
    }
}
