//! Probability bar chart
//!
//! Inline SVG, one bar per label in label-set order. The predicted label is
//! drawn green, the rest grey.

use shm_common::LabelSet;

use super::escape_html;

const WIDTH: f32 = 720.0;
const HEIGHT: f32 = 420.0;
const MARGIN_LEFT: f32 = 60.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 40.0;
const MARGIN_BOTTOM: f32 = 150.0;

const HIGHLIGHT: &str = "#2e7d32";
const BAR: &str = "#9e9e9e";

/// Render `distribution` as an SVG bar chart
pub fn render_distribution_chart(labels: &LabelSet, distribution: &[f32], predicted: &str) -> String {
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_height;
    let slot = plot_width / distribution.len().max(1) as f32;
    let bar_width = slot * 0.7;

    let mut svg = format!(
        r#"<svg class="chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" role="img">
<text x="{cx:.1}" y="24" text-anchor="middle" class="chart-title">Soil Type Prediction Probabilities</text>
<text x="16" y="{cy:.1}" text-anchor="middle" transform="rotate(-90 16 {cy:.1})">Probability</text>
"#,
        w = WIDTH,
        h = HEIGHT,
        cx = WIDTH / 2.0,
        cy = MARGIN_TOP + plot_height / 2.0,
    );

    // Y axis grid: 0, 0.25, ... 1.0
    for step in 0..=4 {
        let value = step as f32 * 0.25;
        let y = baseline - value * plot_height;
        svg.push_str(&format!(
            "<line x1=\"{x1:.1}\" y1=\"{y:.1}\" x2=\"{x2:.1}\" y2=\"{y:.1}\" stroke=\"#ddd\"/>\
<text x=\"{tx:.1}\" y=\"{ty:.1}\" text-anchor=\"end\" font-size=\"11\">{value:.2}</text>\n",
            x1 = MARGIN_LEFT,
            x2 = WIDTH - MARGIN_RIGHT,
            y = y,
            tx = MARGIN_LEFT - 6.0,
            ty = y + 4.0,
            value = value,
        ));
    }

    for (i, &probability) in distribution.iter().enumerate() {
        let label = labels.get(i).unwrap_or("?");
        let colour = if label == predicted { HIGHLIGHT } else { BAR };
        let label = escape_html(label);
        let bar_height = probability.clamp(0.0, 1.0) * plot_height;
        let x = MARGIN_LEFT + i as f32 * slot + (slot - bar_width) / 2.0;
        let label_x = x + bar_width / 2.0;
        let label_y = baseline + 12.0;

        svg.push_str(&format!(
            "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{bw:.1}\" height=\"{bh:.1}\" fill=\"{colour}\"><title>{label}: {pct:.2}%</title></rect>\
<text x=\"{lx:.1}\" y=\"{ly:.1}\" text-anchor=\"end\" font-size=\"11\" transform=\"rotate(-45 {lx:.1} {ly:.1})\">{label}</text>\n",
            x = x,
            y = baseline - bar_height,
            bw = bar_width,
            bh = bar_height,
            colour = colour,
            label = label,
            pct = probability * 100.0,
            lx = label_x,
            ly = label_y,
        ));
    }

    svg.push_str(&format!(
        "<line x1=\"{x1:.1}\" y1=\"{y:.1}\" x2=\"{x2:.1}\" y2=\"{y:.1}\" stroke=\"#333\"/>\n</svg>\n",
        x1 = MARGIN_LEFT,
        x2 = WIDTH - MARGIN_RIGHT,
        y = baseline,
    ));
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_bar_per_label_with_prediction_highlighted() {
        let labels = LabelSet::default();
        let mut dist = vec![0.01; 11];
        dist[2] = 0.9;

        let svg = render_distribution_chart(&labels, &dist, "Clay");

        assert_eq!(svg.matches("<rect").count(), 11);
        assert_eq!(svg.matches(HIGHLIGHT).count(), 1);
        assert!(svg.contains("<title>Clay: 90.00%</title>"));
        assert!(svg.contains(">Black Cotton Soil (Regur)</text>"));
    }

    #[test]
    fn labels_are_escaped_in_svg_text() {
        let labels = LabelSet::new(["Sand & <Silt>", "Clay"]).unwrap();
        let svg = render_distribution_chart(&labels, &[0.7, 0.3], "Sand & <Silt>");

        assert!(svg.contains(">Sand &amp; &lt;Silt&gt;</text>"));
        assert!(!svg.contains("<Silt>"));
        assert_eq!(svg.matches(HIGHLIGHT).count(), 1);
    }

    #[test]
    fn bar_heights_scale_with_probability() {
        let labels = LabelSet::new(["A", "B"]).unwrap();
        let svg = render_distribution_chart(&labels, &[1.0, 0.0], "A");

        let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        assert!(svg.contains(&format!("height=\"{:.1}\"", plot_height)));
        assert!(svg.contains("height=\"0.0\""));
    }
}
