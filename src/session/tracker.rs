use crate::protocol::Stage;

/// Progress of the server-side pipeline as seen by the client
///
/// The stage only ever moves forward: a repeated or out-of-order stage
/// notification leaves it where it is, but the status line is still
/// overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageTracker {
    stage: Stage,
    status_text: String,
    is_rejected: bool,
    category: Option<String>,
    subcategory: Option<String>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_rejected(&self) -> bool {
        self.is_rejected
    }

    /// Category text reported during classification
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Sub-category text reported during classification
    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    /// Record a stage notification, returning whether the stage advanced
    pub fn record(&mut self, stage: Stage, status: Option<&str>) -> bool {
        let advanced = stage.index() > self.stage.index();
        if advanced {
            self.stage = stage;
        }
        self.status_text = status.unwrap_or(stage.default_status()).to_string();
        advanced
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = Some(category.into());
    }

    pub fn set_subcategory(&mut self, subcategory: impl Into<String>) {
        self.subcategory = Some(subcategory.into());
    }

    pub(crate) fn mark_rejected(&mut self) {
        self.is_rejected = true;
        self.status_text = "input rejected".to_string();
    }

    pub(crate) fn complete(&mut self) {
        self.stage = Stage::Complete;
        self.status_text.clear();
    }
}
