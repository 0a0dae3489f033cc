//! Server-rendered pages: the upload form and the result view.

const PAGE_HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>LesionScan</title>
<style>
  body { font-family: sans-serif; max-width: 640px; margin: 2rem auto; padding: 0 1rem; color: #222; }
  h1 { font-size: 1.5rem; }
  form { margin: 1.5rem 0; padding: 1rem; border: 1px dashed #999; border-radius: 6px; }
  .result { margin-top: 2rem; padding: 1rem; border: 1px solid #ccc; border-radius: 6px; }
  .diagnosis { font-size: 1.2rem; font-weight: bold; }
  .confidence { color: #555; font-weight: normal; }
  .recommendation { margin-top: 1rem; line-height: 1.5; }
  .disclaimer { margin-top: 2rem; font-size: 0.8rem; color: #777; }
</style>
</head>
<body>
<h1>LesionScan</h1>
<p>Upload a photo of a skin lesion to screen it against seven diagnostic categories.</p>
"#;

const UPLOAD_FORM: &str = r#"<form method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept=".png,.jpg,.jpeg" required>
  <button type="submit">Analyze</button>
</form>
"#;

const PAGE_FOOT: &str = r#"<p class="disclaimer">This tool is a screening aid, not a diagnosis. Always consult a dermatologist.</p>
</body>
</html>
"#;

pub fn form_page() -> String {
    format!("{PAGE_HEAD}{UPLOAD_FORM}{PAGE_FOOT}")
}

/// Renders the result view. The recommendation is a trusted HTML fragment
/// from the label table; everything client-derived is escaped.
pub fn result_page(
    filename: &str,
    class_name: &str,
    confidence: f32,
    recommendation: &str,
) -> String {
    let result = format!(
        r#"<section class="result">
  <h2>Result for {file}</h2>
  <p class="diagnosis">{class} <span class="confidence">{conf}%</span></p>
  <div class="recommendation">{recommendation}</div>
</section>
"#,
        file = escape_html(filename),
        class = escape_html(class_name),
        conf = format_confidence(confidence),
    );
    format!("{PAGE_HEAD}{UPLOAD_FORM}{result}{PAGE_FOOT}")
}

/// Confidence as a percentage with two decimals, e.g. 0.81 -> "81.00".
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.2}", confidence * 100.0)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
