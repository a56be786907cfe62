//! Navigation Controller
//!
//! The sidebar selects exactly one [`Page`]. Selection is the only
//! transition; there is no terminal page. Every page except Upload & Predict
//! needs an accepted prediction in the session and otherwise shows a single
//! fixed notice.
//!
//! Rendering is a pure function of page, session snapshot, knowledge base
//! and configuration.

use serde::Serialize;
use shm_common::config::MapMode;
use shm_common::knowledge::{Topic, NO_DATA};
use shm_common::{KnowledgeBase, LabelSet};

use crate::render::{self, chart, escape_html, map, Notice};
use crate::services::report::format_confidence;
use crate::services::PredictionResult;
use crate::session::SessionState;

/// Shown on guarded pages before any accepted prediction
pub const GUARD_NOTICE: &str =
    "Please upload and predict a soil image first from the Upload & Predict page.";

/// Shown when the classifier result fails the acceptance policy
pub const REJECTION_NOTICE: &str =
    "This does not appear to be a valid soil image. Please upload a clear photo of soil.";

/// Shown when the upload cannot be decoded
pub const INVALID_IMAGE_NOTICE: &str = "Invalid image. Please upload a JPG or PNG photo.";

/// Shown when inference itself failed
pub const CLASSIFIER_FAILURE_NOTICE: &str =
    "Soil classification failed. Please try again with another photo.";

/// Shown when report generation failed
pub const EXPORT_FAILURE_NOTICE: &str =
    "The report could not be generated. Please try again later.";

/// Sidebar pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Page {
    UploadAndPredict,
    RecommendedCrops,
    NutrientDeficiency,
    RecommendedFertilizers,
    TipsToImprove,
    DistributionMap,
    ExportReport,
}

impl Page {
    /// Sidebar order
    pub const ALL: [Page; 7] = [
        Page::UploadAndPredict,
        Page::RecommendedCrops,
        Page::NutrientDeficiency,
        Page::RecommendedFertilizers,
        Page::TipsToImprove,
        Page::DistributionMap,
        Page::ExportReport,
    ];

    /// URL segment under `/page/`
    pub fn slug(&self) -> &'static str {
        match self {
            Page::UploadAndPredict => "upload",
            Page::RecommendedCrops => "crops",
            Page::NutrientDeficiency => "deficiency",
            Page::RecommendedFertilizers => "fertilizers",
            Page::TipsToImprove => "tips",
            Page::DistributionMap => "map",
            Page::ExportReport => "export",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Page> {
        Page::ALL.into_iter().find(|page| page.slug() == slug)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::UploadAndPredict => "Upload & Predict",
            Page::DistributionMap => "Soil Distribution Map",
            Page::ExportReport => "Export Report",
            _ => self.topic().map(|t| t.title()).unwrap_or_default(),
        }
    }

    /// Knowledge topic shown by a content page
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Page::RecommendedCrops => Some(Topic::Crops),
            Page::NutrientDeficiency => Some(Topic::Deficiency),
            Page::RecommendedFertilizers => Some(Topic::Fertilizers),
            Page::TipsToImprove => Some(Topic::Tips),
            _ => None,
        }
    }

    pub fn requires_prediction(&self) -> bool {
        !matches!(self, Page::UploadAndPredict)
    }
}

/// Renders pages from session state and static reference data
#[derive(Debug, Clone)]
pub struct NavigationController {
    knowledge: &'static KnowledgeBase,
    labels: LabelSet,
    map_mode: MapMode,
}

impl NavigationController {
    pub fn new(knowledge: &'static KnowledgeBase, labels: LabelSet, map_mode: MapMode) -> Self {
        Self {
            knowledge,
            labels,
            map_mode,
        }
    }

    /// Switch the session to `page`
    pub fn select(&self, session: &mut SessionState, page: Page) {
        if session.current_page != page {
            tracing::debug!(
                session_id = %session.id,
                from = ?session.current_page,
                to = ?page,
                "Page selected"
            );
        }
        session.current_page = page;
    }

    /// Full HTML document for `page`
    pub fn render(&self, page: Page, session: &SessionState, notice: Option<&Notice>) -> String {
        let content = self.render_content(page, session, notice);
        render::layout(page, &content)
    }

    /// Page body without the surrounding layout
    pub fn render_content(
        &self,
        page: Page,
        session: &SessionState,
        notice: Option<&Notice>,
    ) -> String {
        let mut html = String::new();
        if let Some(notice) = notice {
            html.push_str(&notice.to_html());
        }

        let body = match (page, session.last_result()) {
            (Page::UploadAndPredict, result) => self.upload_page(result),
            (page, None) => format!(
                "<h1>{}</h1>\n{}",
                page.title(),
                Notice::Warning(GUARD_NOTICE.to_string()).to_html()
            ),
            (Page::DistributionMap, Some(result)) => self.map_page(result),
            (Page::ExportReport, Some(result)) => self.export_page(result),
            (page, Some(result)) => self.topic_page(page, result),
        };
        html.push_str(&body);
        html
    }

    fn upload_page(&self, result: Option<&PredictionResult>) -> String {
        let mut html = String::from(
            r#"<h1>🌾 Soil Health Monitoring System</h1>
<div class="input-methods">
  <form class="card" method="post" action="/predict" enctype="multipart/form-data">
    <h3>Upload Image</h3>
    <input type="file" name="image" accept=".jpg,.jpeg,.png,image/jpeg,image/png" required>
    <button type="submit" class="button">Predict</button>
  </form>
  <form class="card" method="post" action="/predict" enctype="multipart/form-data">
    <h3>Take Photo</h3>
    <input type="file" name="image" accept="image/*" capture="environment" required>
    <button type="submit" class="button">Predict</button>
  </form>
</div>
"#,
        );

        if let Some(result) = result {
            html.push_str(&format!(
                r#"<figure class="uploaded"><img src="/image" alt="Uploaded soil image"><figcaption>Uploaded Image</figcaption></figure>
{}<h3>📍 Major Regions with this Soil Type in India</h3>
{}
{}
"#,
                Notice::Success(format!(
                    "🧪 Detected Soil Type: {} ({} confidence)",
                    escape_html(&result.label),
                    format_confidence(result.confidence)
                ))
                .to_html(),
                map::render_map(&map::predicted_markers(self.knowledge, &result.label)),
                chart::render_distribution_chart(&self.labels, &result.raw_distribution, &result.label),
            ));
        }

        html
    }

    fn topic_page(&self, page: Page, result: &PredictionResult) -> String {
        let entry = self.knowledge.get(&result.label);
        let text = page.topic().map(|topic| entry.text(topic)).unwrap_or(NO_DATA);
        format!(
            r#"<h1>📚 {}</h1>
<h3>For <u>{}</u> soil:</h3>
<p class="topic-text">{}</p>
"#,
            page.title(),
            escape_html(&result.label),
            text
        )
    }

    fn map_page(&self, result: &PredictionResult) -> String {
        let (heading, markers) = match self.map_mode {
            MapMode::Predicted => (
                format!("Regions with {} soil", escape_html(&result.label)),
                map::predicted_markers(self.knowledge, &result.label),
            ),
            MapMode::All => (
                "Regions of all soil types".to_string(),
                map::all_markers(self.knowledge),
            ),
        };

        format!(
            "<h1>🗺️ {}</h1>\n<h3>{}</h3>\n{}\n",
            Page::DistributionMap.title(),
            heading,
            map::render_map(&markers)
        )
    }

    fn export_page(&self, result: &PredictionResult) -> String {
        format!(
            r#"<h1>📄 {}</h1>
<p>Report for <strong>{}</strong> soil ({} confidence).</p>
<form method="post" action="/export">
  <button type="submit" class="button">📄 Download Report</button>
</form>
"#,
            Page::ExportReport.title(),
            escape_html(&result.label),
            format_confidence(result.confidence)
        )
    }
}
