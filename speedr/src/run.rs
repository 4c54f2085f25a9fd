use crate::cli::Cli;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::plan_yaml::load_plan_yaml;
use crate::run_error::RunError;

pub async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let cfg = run_config(&cli).await.map_err(RunError::InvalidInput)?;
    let out = output::formatter(cli.output_format());

    out.print_header(&cfg);
    let report = speedr_core::run(&cfg, out.progress()).await?;
    out.print_summary(&report).map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}

/// Defaults, then the plan file, then CLI flags.
async fn run_config(cli: &Cli) -> anyhow::Result<speedr_core::RunConfig> {
    let mut cfg = speedr_core::RunConfig::default();

    if let Some(path) = &cli.plan {
        load_plan_yaml(path).await?.apply(&mut cfg);
    }

    if let Some(base_url) = &cli.base_url {
        cfg.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        cfg.timeout = Some(timeout);
    }
    if let Some(metric) = &cli.server_timing_metric {
        cfg.server_timing_metric = metric.clone();
    }

    cfg.plan.validate()?;
    speedr_core::Endpoints::new(&cfg.base_url)?;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use clap::Parser as _;
    use std::path::PathBuf;
    use std::time::Duration;

    fn fixture(name: &str) -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
            .display()
            .to_string()
    }

    fn cli(args: &[&str]) -> Cli {
        let argv = std::iter::once("speedr").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn flags_override_the_plan_file() {
        let plan = fixture("quick.yaml");
        let cfg = run_config(&cli(&[
            "--plan",
            &plan,
            "--timeout",
            "2s",
            "--base-url",
            "http://127.0.0.1:1",
        ]))
        .await
        .unwrap();

        // quick.yaml sets 10s.
        assert_eq!(cfg.timeout, Some(Duration::from_secs(2)));
        assert_eq!(cfg.base_url, "http://127.0.0.1:1");
        assert_eq!(cfg.plan.latency.trials, 3);
    }

    #[tokio::test]
    async fn invalid_plan_file_is_rejected() {
        let plan = fixture("invalid.yaml");
        let err = run_config(&cli(&["--plan", &plan])).await.unwrap_err();
        assert!(format!("{err:#}").contains("invalid plan"), "{err:#}");
    }

    #[tokio::test]
    async fn bad_base_url_is_rejected() {
        assert!(
            run_config(&cli(&["--base-url", "speed.example"]))
                .await
                .is_err()
        );
    }
}
