//! Soil distribution map
//!
//! Leaflet map with one marker per (label, region) tuple. Tooltip is the
//! soil label; the popup names the region.

use serde::Serialize;
use shm_common::knowledge::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use shm_common::KnowledgeBase;

use super::escape_html;

const DEFAULT_ZOOM: u8 = 5;

/// One map marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub label: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Markers for the regions of one soil label
///
/// Labels without reference data get the knowledge base's default location.
pub fn predicted_markers(knowledge: &KnowledgeBase, label: &str) -> Vec<MapMarker> {
    knowledge
        .get(label)
        .locations
        .iter()
        .map(|region| MapMarker {
            label: label.to_string(),
            region: region.name.to_string(),
            latitude: region.latitude,
            longitude: region.longitude,
        })
        .collect()
}

/// Markers for every region of every soil type
pub fn all_markers(knowledge: &KnowledgeBase) -> Vec<MapMarker> {
    knowledge
        .entries()
        .iter()
        .flat_map(|entry| predicted_markers(knowledge, entry.label))
        .collect()
}

/// Leaflet map snippet; needs leaflet.js/css from the page layout
///
/// Tooltip and popup content is HTML to Leaflet, so labels and regions are
/// escaped before they are embedded.
pub fn render_map(markers: &[MapMarker]) -> String {
    let escaped: Vec<MapMarker> = markers
        .iter()
        .map(|marker| MapMarker {
            label: escape_html(&marker.label),
            region: escape_html(&marker.region),
            ..marker.clone()
        })
        .collect();

    let mut list = String::new();
    for marker in &escaped {
        list.push_str(&format!(
            "<li>{}: {} ({:.4}, {:.4})</li>",
            marker.label, marker.region, marker.latitude, marker.longitude
        ));
    }

    let data = serde_json::to_string(&escaped).unwrap_or_else(|_| "[]".to_string());

    let mut html = String::new();
    html.push_str("<div id=\"soil-map\" class=\"soil-map\"></div>\n");
    html.push_str(&format!("<ul class=\"map-legend\">{}</ul>\n", list));
    html.push_str("<script>\n(function () {\n  if (typeof L === 'undefined') { return; }\n");
    html.push_str(&format!(
        "  var map = L.map('soil-map').setView([{:.4}, {:.4}], {});\n",
        DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_ZOOM
    ));
    html.push_str(
        "  L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', \
{ attribution: '&copy; OpenStreetMap contributors' }).addTo(map);\n",
    );
    html.push_str(&format!("  var markers = {};\n", data));
    html.push_str(
        "  markers.forEach(function (m) {\n\
    L.marker([m.latitude, m.longitude]).bindTooltip(m.label).bindPopup(m.region).addTo(map);\n\
  });\n})();\n</script>\n",
    );
    html
}
