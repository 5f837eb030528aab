use std::borrow::Cow;
use std::fmt::{self, Write};

use sheetguard_engine::{CycleShape, RiskTier};

use super::Report;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;margin:0 0 1.5rem;width:100%}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left;vertical-align:top}\
th{background:#f3f3f3}code{font-size:0.9em}\
.tier{font-weight:bold;padding:2px 8px;border-radius:4px}\
.tier-high{background:#f8d7da}.tier-medium{background:#fff3cd}.tier-low{background:#d4edda}\
.banner{background:#e7f1ff;border:1px solid #9ec5fe;padding:8px;margin-bottom:1rem}\
.errors{background:#fdecea;border:1px solid #f5c2c7;padding:8px}\
.empty{color:#777}";

pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn tier_badge(tier: RiskTier) -> String {
    format!(
        "<span class=\"tier tier-{}\">{}</span>",
        tier.as_str().to_ascii_lowercase(),
        tier
    )
}

/// Heading plus a table; every cell is escaped. Empty `rows` renders a note instead.
fn table(out: &mut String, title: &str, headers: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    writeln!(out, "<h2>{}</h2>", escape_html(title))?;
    if rows.is_empty() {
        return writeln!(out, "<p class=\"empty\">None found.</p>");
    }
    out.push_str("<table><thead><tr>");
    for h in headers {
        write!(out, "<th>{}</th>", escape_html(h))?;
    }
    out.push_str("</tr></thead><tbody>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            write!(out, "<td>{}</td>", escape_html(cell))?;
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody></table>\n");
    Ok(())
}

fn render(report: &Report, out: &mut String) -> fmt::Result {
    let scan = &report.scan;
    let title = format!("SheetGuard report: {}", scan.workbook);

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{}</title>", escape_html(&title))?;
    writeln!(out, "<style>{STYLE}</style></head><body>")?;
    writeln!(out, "<h1>{}</h1>", escape_html(&title))?;
    writeln!(out, "<p>Generated {}</p>", escape_html(&report.generated))?;

    if scan.trial {
        let info = &scan.trial_info;
        write!(
            out,
            "<div class=\"banner\">Trial scan: {} of at most {} formulas analysed",
            info.formulas_scanned, info.formula_limit
        )?;
        if info.truncated {
            out.push_str("; the workbook has more formulas and the results are partial");
        }
        out.push_str(".</div>\n");
    }

    writeln!(
        out,
        "<p>Workbook risk: {} {}</p>",
        tier_badge(scan.workbook_risk),
        escape_html(&scan.reason)
    )?;

    let s = &scan.signals;
    let signal_rows: Vec<Vec<String>> = [
        ("Circular reference cycles", s.circular),
        ("High-impact cells", s.top_risks),
        ("Volatile function hits", s.volatile),
        ("Symbolic references", s.symbolic),
        ("Embedded constants", s.hardcoded_constants),
        ("Orphan formulas", s.orphan_formulas),
        ("Drifting formulas", s.drift_formulas),
    ]
    .into_iter()
    .map(|(label, n)| vec![label.to_string(), n.to_string()])
    .collect();
    table(out, "Signals", &["Signal", "Count"], &signal_rows)?;

    // Sheet rows carry a badge, so they are written by hand.
    writeln!(out, "<h2>Sheets</h2>")?;
    if scan.sheets.is_empty() {
        writeln!(out, "<p class=\"empty\">None found.</p>")?;
    } else {
        out.push_str("<table><thead><tr><th>Sheet</th><th>Risk</th><th>Formulas</th>\
<th>Circular cells</th><th>High-risk cells</th><th>Reason</th></tr></thead><tbody>\n");
        for sheet in &scan.sheets {
            writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&sheet.sheet),
                tier_badge(sheet.risk),
                sheet.formulas,
                sheet.circular_cells,
                sheet.high_risk_cells,
                escape_html(&sheet.reason)
            )?;
        }
        out.push_str("</tbody></table>\n");
    }

    let rows: Vec<Vec<String>> = scan
        .top_risks
        .iter()
        .map(|e| {
            vec![
                e.cell.clone(),
                e.downstream_reach.to_string(),
                e.direct_fan_out.to_string(),
                e.explanation.clone(),
            ]
        })
        .collect();
    table(
        out,
        "Top impact cells",
        &["Cell", "Downstream reach", "Direct fan-out", "Why"],
        &rows,
    )?;

    let rows: Vec<Vec<String>> = scan
        .findings
        .iter()
        .flat_map(|f| f.items.iter())
        .map(|item| {
            let label = match item.cycle_type {
                CycleShape::SelfReference => "self reference",
                CycleShape::MultiCellCycle => "multi-cell cycle",
            };
            vec![
                label.to_string(),
                item.cells.join(" -> "),
                item.explanation.to_string(),
            ]
        })
        .collect();
    table(out, "Circular references", &["Type", "Cells", "Explanation"], &rows)?;

    let rows: Vec<Vec<String>> = scan
        .hardcoded_constants
        .iter()
        .map(|c| {
            vec![
                c.sheet.clone(),
                c.cell.clone(),
                c.literal.clone(),
                c.operator.clone(),
                c.function.clone(),
                c.formula.clone(),
            ]
        })
        .collect();
    table(
        out,
        "Hard-coded constants",
        &["Sheet", "Cell", "Literal", "Operator", "Function", "Formula"],
        &rows,
    )?;

    let rows: Vec<Vec<String>> = scan
        .formula_drift
        .iter()
        .map(|d| {
            vec![
                d.sheet.clone(),
                d.cell.clone(),
                d.row.to_string(),
                d.formula.clone(),
                d.cell_shape.clone(),
                d.dominant_shape.clone(),
            ]
        })
        .collect();
    table(
        out,
        "Formula drift",
        &["Sheet", "Cell", "Row", "Formula", "Shape", "Dominant shape"],
        &rows,
    )?;

    let rows: Vec<Vec<String>> = scan
        .orphan_formulas
        .iter()
        .map(|o| {
            vec![
                o.sheet.clone(),
                o.cell.clone(),
                o.formula.clone(),
                o.reason.to_string(),
            ]
        })
        .collect();
    table(out, "Orphan formulas", &["Sheet", "Cell", "Formula", "Reason"], &rows)?;

    let rows: Vec<Vec<String>> = scan
        .symbolic_edges
        .iter()
        .map(|e| {
            vec![
                e.dependent.clone(),
                e.raw.clone(),
                e.reference.clone(),
                e.kind.to_string(),
            ]
        })
        .collect();
    table(
        out,
        "Symbolic references",
        &["Formula cell", "Reference", "Resolved as", "Kind"],
        &rows,
    )?;

    if !scan.errors.is_empty() {
        writeln!(out, "<div class=\"errors\"><h2>Scan issues</h2><ul>")?;
        for issue in &scan.errors {
            writeln!(out, "<li><code>{}</code></li>", escape_html(&issue.to_string()))?;
        }
        writeln!(out, "</ul></div>")?;
    }

    writeln!(
        out,
        "<p>Graph: {} nodes, {} edges.</p>",
        scan.graph.nodes, scan.graph.edges
    )?;
    writeln!(out, "</body></html>")
}

pub fn render_html(report: &Report) -> String {
    let mut out = String::with_capacity(16 * 1024);
    // fmt::Write into a String never fails
    let _ = render(report, &mut out);
    out
}
