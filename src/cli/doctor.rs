//! `opsbot doctor` - active health diagnostics.
//!
//! Probes the pieces the bot needs at runtime and prints one line per
//! check with guidance on failures.

use crate::cluster::Kubectl;
use crate::config::{ChannelsConfig, ClusterConfig, Config, DatabaseConfig};
use crate::db::{BindingStore, LibSqlBindingStore};

/// Run diagnostic checks and print results. Fails when any check fails.
pub async fn run_doctor_command() -> anyhow::Result<()> {
    println!("opsbot doctor");
    println!("=============\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    let config = match Config::from_env() {
        Ok(config) => {
            check(
                "Configuration",
                CheckResult::Pass("environment parsed".into()),
                &mut passed,
                &mut failed,
            );
            Some(config)
        }
        Err(e) => {
            check(
                "Configuration",
                CheckResult::Fail(e.to_string()),
                &mut passed,
                &mut failed,
            );
            None
        }
    };

    match &config {
        Some(config) => {
            check(
                "Slack credentials",
                check_slack_credentials(&config.channels),
                &mut passed,
                &mut failed,
            );
            check(
                "Binding store",
                check_database(&config.database).await,
                &mut passed,
                &mut failed,
            );
            check(
                "Cluster CLI",
                check_cluster_cli(&config.cluster).await,
                &mut passed,
                &mut failed,
            );
        }
        None => {
            for name in ["Slack credentials", "Binding store", "Cluster CLI"] {
                check(
                    name,
                    CheckResult::Skip("configuration invalid".into()),
                    &mut passed,
                    &mut failed,
                );
            }
        }
    }

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        anyhow::bail!("doctor failed with {failed} check(s)");
    }
    Ok(())
}

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_slack_credentials(channels: &ChannelsConfig) -> CheckResult {
    match channels.require_slack() {
        Ok(slack) => CheckResult::Pass(format!(
            "token and signing secret set ({})",
            slack.api_base_url
        )),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

async fn check_database(config: &DatabaseConfig) -> CheckResult {
    let store = match LibSqlBindingStore::new_local(&config.path).await {
        Ok(store) => store,
        Err(e) => {
            return CheckResult::Fail(format!("cannot open {}: {e}", config.path.display()));
        }
    };
    match store.init_schema().await {
        Ok(()) => CheckResult::Pass(format!("schema ready at {}", config.path.display())),
        Err(e) => CheckResult::Fail(format!("schema check failed: {e}")),
    }
}

async fn check_cluster_cli(config: &ClusterConfig) -> CheckResult {
    match Kubectl::from_config(config).client_version().await {
        Ok(version) if version.is_empty() => {
            CheckResult::Pass(format!("{} responded", config.kubectl_bin))
        }
        Ok(version) => CheckResult::Pass(version),
        Err(e) => CheckResult::Fail(format!("{e}; install kubectl or set KUBECTL_BIN")),
    }
}
