//! Content negotiation for provider-native document types

/// Prefix shared by all provider-native (not directly downloadable) types
const NATIVE_PREFIX: &str = "application/vnd.google-apps.";

/// Export used for native types missing from the table
const FALLBACK_EXPORT: &str = "text/plain";

/// Native type and the representation requested when reading it
pub const EXPORT_TABLE: &[(&str, &str)] = &[
    ("application/vnd.google-apps.document", "text/markdown"),
    ("application/vnd.google-apps.spreadsheet", "text/csv"),
    ("application/vnd.google-apps.presentation", "text/plain"),
    ("application/vnd.google-apps.drawing", "image/png"),
];

/// How a resource's bytes are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Ask the provider to convert into this MIME type
    Export(&'static str),
    /// Download the stored bytes as-is
    Media,
}

pub fn export_target(native: &str) -> Option<&'static str> {
    EXPORT_TABLE.iter().find(|(from, _)| *from == native).map(|(_, to)| *to)
}

/// Pick the fetch path for a resource of type `mime_type`
pub fn plan_fetch(mime_type: &str) -> FetchPlan {
    match export_target(mime_type) {
        Some(target) => FetchPlan::Export(target),
        None if mime_type.starts_with(NATIVE_PREFIX) => FetchPlan::Export(FALLBACK_EXPORT),
        None => FetchPlan::Media,
    }
}
