use crate::fraud::FraudConfig;
use crate::output::parse_sink_uri;

/// Internal validation, called automatically during `FraudConfig::from_str` / `load`.
pub(crate) fn validate(config: &FraudConfig) -> anyhow::Result<()> {
    let engine = &config.engine;

    if engine.partitions == 0 {
        anyhow::bail!("engine.partitions must be > 0");
    }
    if engine.channel_capacity == 0 {
        anyhow::bail!("engine.channel_capacity must be > 0");
    }
    if engine.timer_resolution.is_zero() {
        anyhow::bail!("engine.timer_resolution must be > 0");
    }
    if engine.latency_report_interval.is_zero() {
        anyhow::bail!("engine.latency_report_interval must be > 0");
    }

    if config.input.path.trim().is_empty() {
        anyhow::bail!("input.path must not be empty");
    }

    // output.alerts must be non-empty; every URI in every list must parse
    if config.output.alerts.is_empty() {
        anyhow::bail!("output.alerts must contain at least one sink URI");
    }
    let lists = [
        ("output.alerts", &config.output.alerts),
        ("output.current_rules", &config.output.current_rules),
        ("output.latency", &config.output.latency),
    ];
    for (section, uris) in lists {
        for (i, uri) in uris.iter().enumerate() {
            parse_sink_uri(uri).map_err(|e| anyhow::anyhow!("{section}[{i}]: {e}"))?;
        }
    }

    if config.metrics.enabled && config.metrics.report_interval.is_zero() {
        anyhow::bail!("metrics.report_interval must be > 0 when metrics are enabled");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::fraud::FraudConfig;

    fn with_engine(engine: &str) -> String {
        format!(
            "[engine]\n{engine}\n\n[input]\npath = \"-\"\n\n[output]\nalerts = [\"stdout\"]\n"
        )
    }

    fn err_of(toml: &str) -> String {
        toml.parse::<FraudConfig>().unwrap_err().to_string()
    }

    #[test]
    fn reject_zero_partitions() {
        assert!(err_of(&with_engine("partitions = 0")).contains("engine.partitions"));
    }

    #[test]
    fn reject_zero_channel_capacity() {
        assert!(err_of(&with_engine("channel_capacity = 0")).contains("channel_capacity"));
    }

    #[test]
    fn reject_zero_timer_resolution() {
        assert!(err_of(&with_engine("timer_resolution = \"0s\"")).contains("timer_resolution"));
    }

    #[test]
    fn reject_zero_latency_interval() {
        assert!(
            err_of(&with_engine("latency_report_interval = \"0ms\""))
                .contains("latency_report_interval")
        );
    }

    #[test]
    fn reject_empty_alert_sinks() {
        let toml = "[input]\npath = \"-\"\n\n[output]\nalerts = []\n";
        assert!(err_of(toml).contains("output.alerts"));
    }

    #[test]
    fn reject_unknown_sink_scheme() {
        let toml = "[input]\npath = \"-\"\n\n[output]\nalerts = [\"stdout\"]\nlatency = [\"kafka://lat\"]\n";
        assert!(err_of(toml).contains("output.latency[0]"));
    }

    #[test]
    fn reject_empty_input_path() {
        let toml = "[input]\npath = \"  \"\n\n[output]\nalerts = [\"stdout\"]\n";
        assert!(err_of(toml).contains("input.path"));
    }
}
