use serde::Serialize;
use std::str::FromStr;
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, StructOpt)]
pub struct OutputFormat {
    /// Format of output data. Possible values: json, yaml
    #[structopt(
        long = "output-format",
        default_value = "json",
        possible_values = &["json", "yaml"]
    )]
    format: FormatVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatVariant {
    Json,
    Yaml,
}

impl FromStr for FormatVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &*s.trim().to_lowercase() {
            "json" => Ok(FormatVariant::Json),
            "yaml" => Ok(FormatVariant::Yaml),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to format output as JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to format output as YAML")]
    Yaml(#[from] serde_yaml::Error),
}

impl OutputFormat {
    pub fn json() -> Self {
        OutputFormat {
            format: FormatVariant::Json,
        }
    }

    pub fn format<T: Serialize>(&self, data: &T) -> Result<String, Error> {
        let formatted = match self.format {
            FormatVariant::Json => serde_json::to_string_pretty(data)?,
            FormatVariant::Yaml => serde_yaml::to_string(data)?,
        };
        Ok(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_is_selectable() {
        let format = OutputFormat::from_iter(&["test", "--output-format", "yaml"]);
        let out = format.format(&json!({ "Archival": true })).unwrap();
        assert!(out.contains("Archival: true"));
    }

    #[test]
    fn json_is_the_default() {
        let format = OutputFormat::from_iter(&["test"]);
        let out = format.format(&json!({ "Archival": true })).unwrap();
        assert_eq!(out, "{\n  \"Archival\": true\n}");
    }
}
