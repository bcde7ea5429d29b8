//! Server-rendered HTML for the single demo page.

pub const TITLE: &str = "Bear Detector Classifier";
pub const DESCRIPTION: &str =
    "Upload a photo and the classifier tells you which kind of bear it sees.";
pub const TOP_CLASSES: usize = 3;

pub fn index(has_example: bool) -> String {
    render(has_example, "")
}

pub fn with_result(has_example: bool, top: &[(String, f32)]) -> String {
    let mut rows = String::new();
    for (label, prob) in top.iter().take(TOP_CLASSES) {
        let pct = prob * 100.0;
        rows.push_str(&format!(
            "<div class=\"row\"><span class=\"label\">{}</span>\
             <span class=\"bar\" style=\"width:{:.1}%\"></span>\
             <span class=\"pct\">{:.1}%</span></div>\n",
            escape(label),
            pct.clamp(0.0, 100.0),
            pct
        ));
    }
    render(
        has_example,
        &format!("<section class=\"result\"><h2>Prediction</h2>\n{rows}</section>"),
    )
}

pub fn with_error(has_example: bool, msg: &str) -> String {
    render(
        has_example,
        &format!("<section class=\"error\">{}</section>", escape(msg)),
    )
}

fn render(has_example: bool, result_html: &str) -> String {
    let example = if has_example {
        "<p><img src=\"/example.jpg\" alt=\"example\" width=\"224\">\
         <a href=\"/api/predict/example\">classify the example image</a></p>"
    } else {
        ""
    };
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{TITLE}</title>\n\
         <style>\n\
         body{{font-family:sans-serif;max-width:40rem;margin:2rem auto}}\n\
         .row{{display:flex;align-items:center;gap:.5rem;margin:.25rem 0}}\n\
         .label{{width:8rem}}\n\
         .bar{{background:#4a7;height:1rem;display:inline-block}}\n\
         .error{{color:#a33;border:1px solid #a33;padding:.5rem}}\n\
         </style></head>\n<body>\n\
         <h1>{TITLE}</h1>\n<p>{DESCRIPTION}</p>\n\
         <form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"image\" accept=\"image/*\" required>\n\
         <button type=\"submit\">Classify</button>\n\
         </form>\n{example}\n{result_html}\n</body></html>\n"
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_has_upload_form_and_title() {
        let html = index(false);
        assert!(html.contains(TITLE));
        assert!(html.contains("multipart/form-data"));
        assert!(html.contains("type=\"file\""));
        assert!(!html.contains("/example.jpg"));
    }

    #[test]
    fn example_link_only_when_configured() {
        assert!(index(true).contains("/example.jpg"));
    }

    #[test]
    fn result_shows_at_most_top_three() {
        let top = vec![
            ("grizzly".to_string(), 0.81),
            ("black".to_string(), 0.15),
            ("teddy".to_string(), 0.03),
            ("polar".to_string(), 0.01),
        ];
        let html = with_result(false, &top);
        assert!(html.contains("grizzly"));
        assert!(html.contains("black"));
        assert!(html.contains("teddy"));
        assert!(!html.contains("polar"));
        assert!(html.contains("81.0%"));
    }

    #[test]
    fn labels_and_errors_are_escaped() {
        let top = vec![("<b>bear</b>".to_string(), 1.0)];
        assert!(!with_result(false, &top).contains("<b>bear</b>"));
        assert!(with_error(false, "<script>").contains("&lt;script&gt;"));
    }
}
