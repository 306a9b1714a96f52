use std::env;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl OutputConfig {
    pub fn from_env() -> Self {
        Self::from_values(
            env::var("DIVMINDER_OUTPUT_FORMAT").ok().as_deref(),
            env::var("DIVMINDER_OUTPUT_PRETTY").ok().as_deref(),
        )
    }

    /// `--json` wins over whatever the environment asks for.
    pub fn with_json_flag(mut self, json: bool) -> Self {
        if json { self.format = OutputFormat::Json; }
        self
    }

    fn from_values(format: Option<&str>, pretty: Option<&str>) -> Self {
        let format = match format {
            Some(v) if v.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        };
        let pretty = matches!(
            pretty.map(str::to_ascii_lowercase).as_deref(),
            Some("1") | Some("true") | Some("yes")
        );
        OutputConfig { format, pretty }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_and_pretty() {
        let cfg = OutputConfig::from_values(Some("JSON"), Some("Yes"));
        assert_eq!(cfg, OutputConfig { format: OutputFormat::Json, pretty: true });
        let cfg = OutputConfig::from_values(None, Some("0"));
        assert_eq!(cfg, OutputConfig { format: OutputFormat::Text, pretty: false });
        assert_eq!(cfg.with_json_flag(true).format, OutputFormat::Json);
    }
}
