use crate::reporter::{ReportSink, SuiteReport};
use std::fs::{self, File};
use std::path::PathBuf;

pub const REPORT_FILE_NAME: &'static str = "suite-report.json";

/// Writes the suite report as JSON under a fixed name in the report directory.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE_NAME)
    }
}

impl ReportSink for JsonReportSink {
    fn emit(&self, report: &SuiteReport) -> Result<PathBuf, String> {
        fs::create_dir_all(&self.dir).map_err(|e| format!("{:?}: {}", self.dir, e))?;
        let path = self.path();
        let file = File::create(&path).map_err(|e| format!("{:?}: {}", path, e))?;
        serde_json::to_writer_pretty(file, report).map_err(|e| e.to_string())?;
        debug!("Suite report stored under {:?}", path);
        Ok(path)
    }
}
