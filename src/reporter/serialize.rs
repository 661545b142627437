pub mod local_datetime {
    use chrono::{DateTime, Local};
    use serde::Serializer;

    pub fn serialize<S>(datetime: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let datetime_string = datetime.to_rfc3339();
        serializer.serialize_str(datetime_string.as_str())
    }
}
