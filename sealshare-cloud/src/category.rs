//! File categorization by decrypted name.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Images,
    Videos,
    Documents,
    Others,
}

impl Category {
    /// Display order.
    pub const ALL: [Category; 4] = [
        Category::Images,
        Category::Videos,
        Category::Documents,
        Category::Others,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Documents => "Documents",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "ppt", "pptx", "xls", "xlsx"];

/// Classifies a filename by its extension, case-insensitively.
pub fn classify(name: &str) -> Category {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return Category::Others;
    };
    let ext = ext.to_ascii_lowercase();
    let ext = ext.as_str();

    if IMAGE_EXTENSIONS.contains(&ext) {
        Category::Images
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Category::Videos
    } else if DOCUMENT_EXTENSIONS.contains(&ext) {
        Category::Documents
    } else {
        Category::Others
    }
}

/// Case-insensitive substring match. An empty or blank query matches
/// everything.
pub fn matches_query(name: &str, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || name.to_lowercase().contains(&query.to_lowercase())
}
