use serde::{Deserialize, Serialize};

/// Request body for lending a book out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BorrowRequest {
    /// Name of the person taking the book
    #[serde(default)]
    pub borrower: String,
}

/// Query parameters for the recently-added listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentParams {
    /// How many books to return; the configured default when absent
    pub limit: Option<usize>,
}
