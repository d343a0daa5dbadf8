//! SVG rendering of DVS pages.

use super::{Dvs, Frame};
use crate::EverestError;

/// SVG user units per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Fraction of a cell left blank around a plotted curve.
const CURVE_PADDING: f64 = 0.04;

/// Content drawn inside a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    /// Lines of text, top-left aligned.
    Text(Vec<String>),
    /// A curve `y(x)`. An empty `x` plots against the sample index.
    Curve {
        x: Vec<f64>,
        y: Vec<f64>,
        label: Option<String>,
    },
}

impl Dvs {
    /// Render the page as an SVG document.
    ///
    /// `panels` pairs a cell number with the content to draw in it.
    pub fn render_svg(&self, panels: &[(usize, Panel)]) -> Result<String, EverestError> {
        let width = self.fig().width * POINTS_PER_INCH;
        let height = self.fig().height * POINTS_PER_INCH;

        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}in\" height=\"{}in\" viewBox=\"0 0 {} {}\">\n",
            self.fig().width,
            self.fig().height,
            width,
            height
        ));
        svg.push_str(&format!(
            "<rect width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
            width, height
        ));

        for cell in self.cells() {
            let f = to_points(&cell.frame);
            svg.push_str(&format!("<g id=\"cell-{:02}\">\n", cell.extent.n));
            if self.labels() {
                svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"black\" stroke-width=\"0.5\" stroke-dasharray=\"3,3\" stroke-opacity=\"0.5\"/>\n",
                    f.left, f.top, f.width, f.height
                ));
                svg.push_str(&format!(
                    "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-size=\"14\" font-weight=\"bold\" fill-opacity=\"0.5\">Cell #{:02}</text>\n",
                    f.left + f.width / 2.0,
                    f.top + f.height / 2.0,
                    cell.extent.n
                ));
            } else {
                svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"black\" stroke-width=\"0.5\"/>\n",
                    f.left, f.top, f.width, f.height
                ));
            }
            svg.push_str("</g>\n");
        }

        for (n, panel) in panels {
            let cell = self.cell(*n).ok_or_else(|| {
                EverestError::NotFound(format!(
                    "cell {} (layout has {} cells)",
                    n,
                    self.cells().len()
                ))
            })?;
            let f = to_points(&cell.frame);
            match panel {
                Panel::Text(lines) => svg.push_str(&text_block(&f, lines)),
                Panel::Curve { x, y, label } => {
                    svg.push_str(&polyline(&f, x, y)?);
                    if let Some(label) = label {
                        svg.push_str(&text_block(&f, std::slice::from_ref(label)));
                    }
                }
            }
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

fn to_points(frame: &Frame) -> Frame {
    Frame {
        left: frame.left * POINTS_PER_INCH,
        top: frame.top * POINTS_PER_INCH,
        width: frame.width * POINTS_PER_INCH,
        height: frame.height * POINTS_PER_INCH,
    }
}

fn text_block(f: &Frame, lines: &[String]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"7\">{}</text>\n",
            f.left + 3.0,
            f.top + 9.0 * (i + 1) as f64,
            escape(line)
        ));
    }
    out
}

fn polyline(f: &Frame, x: &[f64], y: &[f64]) -> Result<String, EverestError> {
    if !x.is_empty() && x.len() != y.len() {
        return Err(EverestError::InvalidShape(format!(
            "curve has {} x values and {} y values",
            x.len(),
            y.len()
        )));
    }

    let points: Vec<(f64, f64)> = y
        .iter()
        .enumerate()
        .map(|(i, &yi)| (x.get(i).copied().unwrap_or(i as f64), yi))
        .filter(|(xi, yi)| xi.is_finite() && yi.is_finite())
        .collect();
    if points.len() < 2 {
        tracing::debug!("Skipping curve with {} finite points", points.len());
        return Ok(String::new());
    }

    let (xmin, xmax) = span(points.iter().map(|p| p.0));
    let (ymin, ymax) = span(points.iter().map(|p| p.1));

    let pad_x = f.width * CURVE_PADDING;
    let pad_y = f.height * CURVE_PADDING;
    let inner_w = f.width - 2.0 * pad_x;
    let inner_h = f.height - 2.0 * pad_y;

    let coords: Vec<String> = points
        .iter()
        .map(|(xi, yi)| {
            let px = f.left + pad_x + (xi - xmin) / (xmax - xmin) * inner_w;
            let py = f.top + pad_y + (1.0 - (yi - ymin) / (ymax - ymin)) * inner_h;
            format!("{:.2},{:.2}", px, py)
        })
        .collect();

    Ok(format!(
        "<polyline fill=\"none\" stroke=\"black\" stroke-width=\"0.3\" points=\"{}\"/>\n",
        coords.join(" ")
    ))
}

/// Min and max of a non-empty iterator, widened when degenerate.
fn span(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::dvs::DvsOptions;

    #[test]
    fn labelled_page_names_every_cell() {
        let dvs = Dvs::new(DvsOptions {
            labels: true,
            ..DvsOptions::default()
        })
        .unwrap();
        let svg = dvs.render_svg(&[]).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Cell #00"));
        assert!(svg.contains("Cell #10"));
        assert!(!svg.contains("Cell #11"));
    }

    #[test]
    fn curve_becomes_polyline() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let panel = Panel::Curve {
            x: vec![],
            y: vec![1.0, 2.0, f64::NAN, 3.0],
            label: Some("Raw <SAP>".to_string()),
        };
        let svg = dvs.render_svg(&[(1, panel)]).unwrap();
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("Raw &lt;SAP&gt;"));
    }

    #[test]
    fn flat_curve_is_drawn() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let panel = Panel::Curve {
            x: vec![0.0, 1.0],
            y: vec![5.0, 5.0],
            label: None,
        };
        assert!(dvs.render_svg(&[(3, panel)]).unwrap().contains("<polyline"));
    }

    #[test]
    fn unknown_cell_rejected() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let result = dvs.render_svg(&[(42, Panel::Text(vec!["x".to_string()]))]);
        assert!(matches!(result, Err(EverestError::NotFound(_))));
    }

    #[test]
    fn mismatched_curve_rejected() {
        let dvs = Dvs::new(DvsOptions::default()).unwrap();
        let panel = Panel::Curve {
            x: vec![0.0],
            y: vec![1.0, 2.0],
            label: None,
        };
        assert!(dvs.render_svg(&[(1, panel)]).is_err());
    }
}
