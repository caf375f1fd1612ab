//! Stylesheet collection and the injected style runtime.
//!
//! The backend may emit any number of stylesheet outputs per entry. They are
//! concatenated into a single payload with embedded source-map annotations
//! stripped, since the annotations point at files that no longer exist once
//! the text is concatenated.

/// Concatenate stylesheet outputs into one payload.
///
/// Empty results (after stripping) are skipped entirely.
pub fn collect_styles(styles: &[String]) -> String {
  styles
    .iter()
    .map(|css| strip_source_map(css))
    .filter(|css| !css.is_empty())
    .collect::<Vec<_>>()
    .join("\n")
}

/// Remove `sourceMappingURL` annotations, both the block-comment and the
/// line-comment form.
fn strip_source_map(css: &str) -> String {
  let mut out = String::with_capacity(css.len());
  for line in css.lines() {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//#") || trimmed.starts_with("//@") {
      if trimmed[3..].trim_start().starts_with("sourceMappingURL=") {
        continue;
      }
    }
    out.push_str(line);
    out.push('\n');
  }

  // Block comments can span lines, so a second pass removes them from the
  // joined text.
  for marker in ["/*# sourceMappingURL=", "/*@ sourceMappingURL="] {
    while let Some(start) = out.find(marker) {
      match out[start..].find("*/") {
        Some(end) => out.replace_range(start..start + end + 2, ""),
        None => out.replace_range(start.., ""),
      }
    }
  }

  out.trim().to_string()
}

/// Generate the runtime snippet that installs the style payload.
///
/// The snippet creates a single `<style>` element keyed by `style_id` and is
/// idempotent against duplicate execution (re-importing the artifact must not
/// duplicate the element).
pub fn style_injector(style_id: &str, css: &str) -> String {
  let content = serde_json::to_string(css).unwrap_or_else(|_| "\"\"".to_string());
  let key = serde_json::to_string(style_id).unwrap_or_else(|_| "\"\"".to_string());
  [
    format!("const __pb_style = {content};"),
    format!("if (typeof document !== 'undefined' && !document.getElementById({key})) {{"),
    "  const el = document.createElement('style');".to_string(),
    format!("  el.id = {key};"),
    "  el.textContent = __pb_style;".to_string(),
    "  document.head.appendChild(el);".to_string(),
    "}".to_string(),
  ]
  .join("\n")
}
