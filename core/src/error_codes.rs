//! Stable error codes attached to every public error.
//!
//! Reporters and scripts match on these rather than on message text.

pub const CONTAINER_IO: &str = "EXCHK_CONT_001";
pub const CONTAINER_ZIP: &str = "EXCHK_CONT_002";
pub const CONTAINER_NOT_ZIP: &str = "EXCHK_CONT_003";
pub const CONTAINER_NOT_OPC: &str = "EXCHK_CONT_004";
pub const CONTAINER_TOO_MANY_ENTRIES: &str = "EXCHK_CONT_005";
pub const CONTAINER_PART_TOO_LARGE: &str = "EXCHK_CONT_006";
pub const CONTAINER_TOTAL_TOO_LARGE: &str = "EXCHK_CONT_007";

pub const LOAD_UNREADABLE_WORKBOOK: &str = "EXCHK_LOAD_001";
pub const LOAD_CORRUPT_SHEET: &str = "EXCHK_LOAD_002";

pub const ALIGN_TOO_LARGE: &str = "EXCHK_ALIGN_001";
pub const ALIGN_KEY_COLUMN_UNMATCHED: &str = "EXCHK_ALIGN_002";

pub const CONFIG_INVALID: &str = "EXCHK_CONF_001";

pub const DIFF_SINK_ERROR: &str = "EXCHK_DIFF_001";
pub const DIFF_SHEET_NOT_FOUND: &str = "EXCHK_DIFF_002";
