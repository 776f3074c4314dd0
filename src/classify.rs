//! Folder classification by name

/// Folder names whose contents get merged. Matching is exact and case-sensitive.
pub const MERGE_TARGET_NAMES: [&str; 6] = [
    "guides",
    "reports",
    "tiss-guides",
    "guias",
    "laudos",
    "guias - tiss",
];

/// What the walker does with a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderKind {
    /// Merge the files inside; do not descend further
    MergeTarget,
    /// Descend and keep looking
    Container,
}

/// Classify a directory by its file name
pub fn classify(name: &str) -> FolderKind {
    if MERGE_TARGET_NAMES.contains(&name) {
        FolderKind::MergeTarget
    } else {
        FolderKind::Container
    }
}
