pub mod comma_list {
    use serde::{Deserialize, Deserializer};

    #[derive(serde_derive::Deserialize)]
    #[serde(untagged)]
    enum ListEntry {
        Joined(String),
        Array(Vec<String>),
    }

    /// Accepts either `"a, b"` or `["a", "b"]`; blank entries are dropped.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = match ListEntry::deserialize(deserializer)? {
            ListEntry::Joined(joined) => split(&joined),
            ListEntry::Array(array) => array
                .into_iter()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .collect(),
        };
        Ok(values)
    }

    pub fn split(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

pub mod level_filter {
    use log::LevelFilter;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value
            .parse::<LevelFilter>()
            .map_err(|_| D::Error::custom(format!("Unknown log level '{}'", value)))
    }
}
