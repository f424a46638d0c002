//! Application collections and their foreign keys

use welddesk_cascade::Schema;
use welddesk_store::fields;

/// Collection names
pub mod collections {
    /// Projects (cascade roots only)
    pub const PROJECTS: &str = "projects";
    /// Weld logs, per project
    pub const WELD_LOGS: &str = "weldLogs";
    /// Welds, per weld log
    pub const WELDS: &str = "welds";
    /// Materials, per project
    pub const MATERIALS: &str = "materials";
    /// Document libraries, per project
    pub const DOCUMENT_LIBRARIES: &str = "documentLibraries";
    /// Ordered sections, per library
    pub const DOCUMENT_SECTIONS: &str = "documentSections";
    /// Ordered documents, per section
    pub const DOCUMENTS: &str = "documents";
}

/// Foreign key field names
pub mod keys {
    /// Owning project
    pub const PROJECT_ID: &str = "projectId";
    /// Owning weld log
    pub const WELD_LOG_ID: &str = "weldLogId";
    /// Owning document library
    pub const LIBRARY_ID: &str = "libraryId";
    /// Owning document section
    pub const SECTION_ID: &str = "sectionId";
}

/// Schema every application graph is validated against
#[must_use]
pub fn application_schema() -> Schema {
    use collections::{
        DOCUMENTS, DOCUMENT_LIBRARIES, DOCUMENT_SECTIONS, MATERIALS, PROJECTS, WELDS, WELD_LOGS,
    };
    use keys::{LIBRARY_ID, PROJECT_ID, SECTION_ID, WELD_LOG_ID};

    Schema::new()
        .collection(PROJECTS, &[])
        .collection(WELD_LOGS, &[PROJECT_ID])
        .collection(WELDS, &[WELD_LOG_ID, PROJECT_ID])
        .collection(MATERIALS, &[PROJECT_ID])
        .collection(DOCUMENT_LIBRARIES, &[PROJECT_ID])
        .collection(DOCUMENT_SECTIONS, &[LIBRARY_ID, fields::ORDER])
        .collection(DOCUMENTS, &[SECTION_ID, LIBRARY_ID, fields::ORDER])
}
