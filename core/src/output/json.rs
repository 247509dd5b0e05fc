use crate::diff::DiffReport;

pub fn serialize_diff_report(report: &DiffReport) -> serde_json::Result<String> {
    serde_json::to_string(report)
}

pub fn serialize_diff_report_pretty(report: &DiffReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

pub fn deserialize_diff_report(json: &str) -> serde_json::Result<DiffReport> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangeRecord, SheetFailure};

    #[test]
    fn report_json_keeps_version_and_omits_empty_lists() {
        let report = DiffReport::new(vec![ChangeRecord::SheetRemoved {
            sheet: "Old".into(),
        }]);
        let json = serialize_diff_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1");
        assert_eq!(value["records"][0]["kind"], "SheetRemoved");
        assert!(value.get("failures").is_none());
        assert_eq!(deserialize_diff_report(&json).unwrap(), report);
    }

    #[test]
    fn failures_are_serialized_when_present() {
        let mut report = DiffReport::default();
        report.failures.push(SheetFailure {
            sheet: "Big".into(),
            code: crate::error_codes::ALIGN_TOO_LARGE.into(),
            message: "too large".into(),
        });
        let json = serialize_diff_report_pretty(&report).unwrap();
        assert!(json.contains("EXCHK_ALIGN_001"));
    }
}
