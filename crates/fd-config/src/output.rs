use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OutputConfig: deserialized from [output]
// ---------------------------------------------------------------------------

/// Sink destinations for the three engine output streams.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Alert destinations (URI list, e.g. `"file:///var/log/fraud-alerts.jsonl"`).
    pub alerts: Vec<String>,
    /// Destinations for rules exported by `EXPORT_RULES_CURRENT`.
    #[serde(default)]
    pub current_rules: Vec<String>,
    /// Destinations for averaged latency reports.
    #[serde(default)]
    pub latency: Vec<String>,
}

// ---------------------------------------------------------------------------
// SinkUri
// ---------------------------------------------------------------------------

/// A parsed sink destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkUri {
    /// JSON Lines appended to a file.
    File { path: PathBuf },
    Stdout,
}

impl SinkUri {
    /// Resolve relative file paths against `base_dir`.
    pub fn resolve(self, base_dir: &Path) -> Self {
        match self {
            SinkUri::File { path } if path.is_relative() => SinkUri::File {
                path: base_dir.join(path),
            },
            other => other,
        }
    }
}

/// Parse a sink URI: `file://<path>` or `stdout`.
pub fn parse_sink_uri(uri: &str) -> anyhow::Result<SinkUri> {
    let uri = uri.trim();
    if uri == "stdout" {
        return Ok(SinkUri::Stdout);
    }
    if let Some(path) = uri.strip_prefix("file://") {
        if path.is_empty() {
            anyhow::bail!("file sink URI has an empty path: {uri:?}");
        }
        return Ok(SinkUri::File {
            path: PathBuf::from(path),
        });
    }
    anyhow::bail!("unsupported sink URI {uri:?} (expected file://<path> or stdout)")
}

impl OutputConfig {
    pub fn parsed_alerts(&self) -> anyhow::Result<Vec<SinkUri>> {
        parse_all(&self.alerts)
    }

    pub fn parsed_current_rules(&self) -> anyhow::Result<Vec<SinkUri>> {
        parse_all(&self.current_rules)
    }

    pub fn parsed_latency(&self) -> anyhow::Result<Vec<SinkUri>> {
        parse_all(&self.latency)
    }
}

fn parse_all(uris: &[String]) -> anyhow::Result<Vec<SinkUri>> {
    uris.iter().map(|u| parse_sink_uri(u)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_uri() {
        assert_eq!(
            parse_sink_uri("file:///var/log/alerts.jsonl").unwrap(),
            SinkUri::File {
                path: PathBuf::from("/var/log/alerts.jsonl")
            }
        );
    }

    #[test]
    fn parse_stdout() {
        assert_eq!(parse_sink_uri("stdout").unwrap(), SinkUri::Stdout);
    }

    #[test]
    fn parse_rejects_unknown_scheme() {
        assert!(parse_sink_uri("kafka://alerts").is_err());
        assert!(parse_sink_uri("file://").is_err());
    }

    #[test]
    fn relative_file_resolves_against_base() {
        let uri = parse_sink_uri("file://out/alerts.jsonl")
            .unwrap()
            .resolve(Path::new("/srv/fraud"));
        assert_eq!(
            uri,
            SinkUri::File {
                path: PathBuf::from("/srv/fraud/out/alerts.jsonl")
            }
        );
    }
}
