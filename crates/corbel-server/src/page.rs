//! Server-rendered audit page

use corbel_lib::{AuditReport, DesignParameters, NarrativeOutcome, PARAMETER_SPECS};
use std::fmt::Write;

/// What to show below the inputs
#[derive(Debug)]
pub enum PageOutcome<'a> {
    Empty,
    Error(String),
    Report(&'a AuditReport),
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f5f7f9; margin: 0; }
main { display: flex; gap: 2rem; padding: 2rem; }
form { background: #fff; padding: 1.5rem; border-radius: 10px; min-width: 18rem; }
label { display: block; margin-top: 1rem; font-weight: 600; }
input[type=range] { width: 100%; }
.metric { background: #fff; padding: 15px; border-radius: 10px; box-shadow: 2px 2px 5px rgba(0,0,0,0.1); }
.info { background: #e8f1fb; padding: 0.75rem; border-radius: 6px; }
.warning { background: #fff4db; padding: 0.75rem; border-radius: 6px; }
.error { background: #fde8e8; padding: 0.75rem; border-radius: 6px; }
.narrative { white-space: pre-wrap; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the full page with the inputs set to `values`
pub fn render(values: &DesignParameters, outcome: PageOutcome<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Corbel-Audit AI</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <header style=\"padding: 0 2rem\">\n\
         <h1>Structural audit agent</h1>\n\
         <p>Load capacity (Pu) of reinforced-concrete corbels from a surrogate MLP model, \
         with a narrative engineering review.</p>\n</header>\n<main>\n"
    );

    render_form(&mut html, values);

    html.push_str("<section>\n");
    match outcome {
        PageOutcome::Empty => {}
        PageOutcome::Error(message) => {
            let _ = writeln!(html, "<p class=\"error\">{}</p>", escape(&message));
        }
        PageOutcome::Report(report) => render_report(&mut html, report),
    }
    html.push_str("</section>\n</main>\n</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, values: &DesignParameters) {
    html.push_str("<form method=\"post\" action=\"/audit\">\n<h2>Design parameters</h2>\n");
    for (spec, value) in PARAMETER_SPECS.iter().zip(values.to_feature_row()) {
        let unit = if spec.unit.is_empty() {
            String::new()
        } else {
            format!(" ({})", spec.unit)
        };
        let _ = write!(
            html,
            "<label for=\"{col}\">{label}{unit}: <output id=\"{col}-value\">{shown}</output></label>\n\
             <input type=\"range\" id=\"{col}\" name=\"{col}\" min=\"{min}\" max=\"{max}\" \
             step=\"{step}\" value=\"{value}\" \
             oninput=\"document.getElementById('{col}-value').value = Number(this.value).toFixed({decimals})\">\n",
            col = spec.column,
            label = escape(spec.label),
            unit = escape(&unit),
            shown = spec.format(value),
            min = spec.min,
            max = spec.max,
            step = spec.step,
            value = value,
            decimals = spec.decimals,
        );
    }
    html.push_str(
        "<hr>\n<label for=\"api_key\">Gemini API key</label>\n\
         <input type=\"password\" id=\"api_key\" name=\"api_key\" autocomplete=\"off\">\n\
         <p><button type=\"submit\">Run full audit</button></p>\n</form>\n",
    );
}

fn render_report(html: &mut String, report: &AuditReport) {
    let _ = write!(
        html,
        "<div class=\"metric\"><div>Predicted load capacity (Pu)</div>\
         <strong>{:.2} kN</strong></div>\n\
         <p class=\"info\">a/d ratio: {:.2}</p>\n",
        report.predicted_load_kn, report.ad_ratio
    );
    if let Some(warning) = &report.warning {
        let _ = writeln!(html, "<p class=\"warning\">{}</p>", escape(warning));
    }

    html.push_str("<h2>Technical report</h2>\n");
    match &report.narrative {
        NarrativeOutcome::Generated { text } => {
            let _ = writeln!(html, "<div class=\"narrative\">{}</div>", escape(text));
        }
        NarrativeOutcome::Failed { error } => {
            let _ = writeln!(
                html,
                "<p class=\"error\">Connection error with the AI service: {}</p>",
                escape(error)
            );
        }
    }
    let _ = writeln!(
        html,
        "<p><small>Model {}</small></p>",
        escape(&report.model_version)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use corbel_lib::Classification;

    fn report(narrative: NarrativeOutcome, short: bool) -> AuditReport {
        AuditReport {
            parameters: DesignParameters::default(),
            predicted_load_kn: 812.3456,
            ad_ratio: if short { 0.5 } else { 1.25 },
            classification: short.then_some(Classification::ShortCorbel),
            warning: short
                .then(|| "Element classified as a short corbel (a/d < 1.0).".to_string()),
            narrative,
            model_version: "modelo_corbel-0123456789ab".to_string(),
            generated_at: 0,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b a="1">&'x'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;x&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_empty_page_has_sliders_with_defaults() {
        let html = render(&DesignParameters::default(), PageOutcome::Empty);

        assert!(html.contains(r#"name="fc" min="21" max="35" step="1" value="28""#));
        assert!(html.contains(r#"name="rho" min="0.004" max="0.015" step="0.0001" value="0.01""#));
        assert!(html.contains(r#"<output id="rho-value">0.0100</output>"#));
        assert!(html.contains(r#"type="password""#));
        assert!(!html.contains("class=\"metric\""));
    }

    #[test]
    fn test_report_with_warning_and_narrative() {
        let html = render(
            &DesignParameters::default(),
            PageOutcome::Report(&report(
                NarrativeOutcome::Generated {
                    text: "Paragraph <one>.".to_string(),
                },
                true,
            )),
        );

        assert!(html.contains("<strong>812.35 kN</strong>"));
        assert!(html.contains("a/d ratio: 0.50"));
        assert!(html.contains("class=\"warning\""));
        assert!(html.contains("Paragraph &lt;one&gt;."));
    }

    #[test]
    fn test_failed_narrative_shows_error_line() {
        let html = render(
            &DesignParameters::default(),
            PageOutcome::Report(&report(
                NarrativeOutcome::Failed {
                    error: "transport error: timed out".to_string(),
                },
                false,
            )),
        );

        assert!(html.contains("Connection error with the AI service: transport error: timed out"));
        assert!(!html.contains("class=\"warning\""));
        assert!(!html.contains("class=\"narrative\""));
    }

    #[test]
    fn test_error_outcome() {
        let html = render(
            &DesignParameters::default(),
            PageOutcome::Error("please enter an API key".to_string()),
        );
        assert!(html.contains("<p class=\"error\">please enter an API key</p>"));
    }
}
