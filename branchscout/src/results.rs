use crate::metrics::ScanStats;

/// Column names of the report, always its first row
pub const REPORT_HEADER: [&str; 6] = [
    "REPO_URL",
    "BRANCH",
    "SEARCH_TERM",
    "FILE_NAME",
    "LINE_NUMBER",
    "CONTENT",
];

/// One line-level occurrence of a search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Repository URL as configured
    pub repository: String,
    /// Full reference name of the branch
    pub branch: String,
    /// Search term as configured
    pub term: String,
    /// Path of the file within the repository
    pub path: String,
    /// 1-based line number
    pub line_number: usize,
    /// The line containing the match
    pub content: String,
}

impl MatchRecord {
    /// The record as a report row, in [`REPORT_HEADER`] order
    pub fn to_row(&self) -> [String; 6] {
        [
            self.repository.clone(),
            self.branch.clone(),
            self.term.clone(),
            self.path.clone(),
            self.line_number.to_string(),
            self.content.clone(),
        ]
    }
}

/// The merged outcome of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Records in window order, then configuration order within a window
    pub records: Vec<MatchRecord>,
    pub stats: ScanStats,
}

impl ScanReport {
    /// Merges per-window record lists in the order given
    pub fn from_windows<I>(windows: I, stats: ScanStats) -> Self
    where
        I: IntoIterator<Item = Vec<MatchRecord>>,
    {
        let records = windows.into_iter().flatten().collect();
        Self { records, stats }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Header row followed by one row per record
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        std::iter::once(REPORT_HEADER.iter().map(|h| h.to_string()).collect())
            .chain(self.records.iter().map(|r| r.to_row().to_vec()))
    }
}
