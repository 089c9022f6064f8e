/*!
 * Saved transformation records and paging types.
 *
 * Field names follow the record service's JSON (camelCase); the local
 * SQLite table uses the same names in snake_case.
 */

use serde::{Deserialize, Serialize};

/// Identifier assigned by the record store
pub type RecordId = i64;

/// Status value of a completed transformation
pub const STATUS_COMPLETED: i32 = 1;

/// Page size used when none or an out-of-range one is requested
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest page size the stores accept
pub const MAX_PAGE_SIZE: u64 = 100;

/// A saved transformation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub original_content: String,
    #[serde(default)]
    pub modified_content: String,
    #[serde(default)]
    pub modification_description: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub resume_classification: Option<String>,
    #[serde(default)]
    pub modified_resume_classification: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub updated_time: Option<String>,
}

/// A record about to be saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub original_content: String,
    pub modified_content: String,
    pub modification_description: String,
    pub user_id: String,
    pub status: i32,
    pub resume_classification: Option<String>,
    pub modified_resume_classification: Option<String>,
}

impl NewRecord {
    /// Record of a completed transformation
    pub fn completed(
        original_content: impl Into<String>,
        modified_content: impl Into<String>,
        modification_description: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            original_content: original_content.into(),
            modified_content: modified_content.into(),
            modification_description: modification_description.into(),
            user_id: user_id.into(),
            status: STATUS_COMPLETED,
            resume_classification: None,
            modified_resume_classification: None,
        }
    }

    /// Attach the category texts observed during the stream
    pub fn with_classification(mut self, category: Option<String>, subcategory: Option<String>) -> Self {
        self.resume_classification = category;
        self.modified_resume_classification = subcategory;
        self
    }
}

/// One page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub current: u64,
    pub size: u64,
    pub user_id: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            current: 1,
            size: DEFAULT_PAGE_SIZE,
            user_id: None,
        }
    }
}

impl PageQuery {
    pub fn new(current: u64, size: u64, user_id: Option<String>) -> Self {
        Self { current, size, user_id }.normalized()
    }

    /// Page number raised to 1; a size outside 1..=100 falls back to the default
    pub fn normalized(self) -> Self {
        let size = if (1..=MAX_PAGE_SIZE).contains(&self.size) {
            self.size
        } else {
            DEFAULT_PAGE_SIZE
        };
        Self {
            current: self.current.max(1),
            size,
            user_id: self.user_id.filter(|u| !u.trim().is_empty()),
        }
    }

    /// Rows skipped before this page, saturating for absurd page numbers
    pub fn offset(&self) -> u64 {
        (self.current.max(1) - 1).saturating_mul(self.size)
    }
}

/// One page of records, newest first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub pages: u64,
}

impl RecordPage {
    pub fn new(records: Vec<Record>, total: u64, query: &PageQuery) -> Self {
        let pages = if query.size == 0 { 0 } else { total.div_ceil(query.size) };
        Self {
            records,
            total,
            current: query.current,
            size: query.size,
            pages,
        }
    }
}
