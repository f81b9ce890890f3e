use pretty_assertions::assert_eq;
use rstest::rstest;
use tera_fmt::{FormatOptions, format_template};

#[rstest]
#[case::page(include_str!("resources/page.html.tera"))]
#[case::inheritance(include_str!("resources/inheritance.html.tera"))]
#[case::macros(include_str!("resources/macros.html.tera"))]
#[case::whitespace_control(include_str!("resources/whitespace_control.html.tera"))]
fn test_format_is_idempotent(#[case] source: &str) {
    let options = FormatOptions::default();
    let once = format_template(source, &options);
    let twice = format_template(&once, &options);
    assert_eq!(twice, once);
}

#[rstest]
#[case::inheritance(
    include_str!("resources/inheritance.html.tera"),
    include_str!("resources/inheritance.formatted.html.tera")
)]
#[case::whitespace_control(
    include_str!("resources/whitespace_control.html.tera"),
    include_str!("resources/whitespace_control.formatted.html.tera")
)]
fn test_format_matches_expected(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(format_template(source, &FormatOptions::default()), expected);
}

#[test]
fn test_page_structure() {
    let out = format_template(
        include_str!("resources/page.html.tera"),
        &FormatOptions::default(),
    );
    assert!(out.starts_with("<!DOCTYPE html>\n<html lang=\"en\">\n"));
    assert!(out.contains("<title>{{ page_title | default(value=\"My Website\") }}</title>"));
    assert!(out.contains("<meta charset=\"UTF-8\" />"));
    assert!(out.contains("{# Navigation menu #}"));
    assert!(out.contains("        {% for item in menu_items %}\n"));
    assert!(out.contains("<li>\n"));
    assert!(out.contains("<a href=\"{{item.url}}\">{{ item.title }}</a>"));
    assert!(out.contains("{{ message.text | safe }}"));
    assert!(out.ends_with("</html>\n"));
}

#[test]
fn test_macros_structure() {
    let out = format_template(
        include_str!("resources/macros.html.tera"),
        &FormatOptions::default(),
    );
    assert!(out.contains("{% macro render_field(field, label=\"\") %}\n  <div class=\"form-field\">\n"));
    assert!(out.contains("{% endmacro %}"));
    assert!(out.contains("\n{% set greeting %}\n  hello\n{% endset %}\n<form\n"));
    assert!(out.contains("  data-validate=\"true\"\n>\n"));
    assert!(out.contains("<input type=\"submit\" value=\"Send\" disabled />"));
    assert!(out.ends_with("{% include \"partials/footer.html\" %}\n"));
}

#[rstest]
#[case("<table>{% for r in rows %}<tr><td>{{ r }}</td></tr>{% endfor %}</table>")]
#[case("{% macro row(x) %}<tr><td>{{ x }}</td></tr>{% endmacro %}")]
#[case("<p>&lt;div&gt;x &amp;copy; &amp; y</p>")]
#[case(r#"<p title="a &quot;b&quot; 'c'" data-q='say "hi"'>x</p>"#)]
#[case("<p>a&nbsp;&nbsp;b</p>")]
#[case("<script>\n  if (a <b && c) {\n    go();\n  }\n</script>")]
#[case("<ul><li>one<li>two</ul>")]
fn test_snippet_is_idempotent(#[case] source: &str) {
    let options = FormatOptions::default();
    let once = format_template(source, &options);
    assert_eq!(format_template(&once, &options), once);
}
