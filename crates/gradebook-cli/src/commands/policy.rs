//! The `gradebook policy` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::policy::{GradingPolicy, RecoveryType};

pub async fn execute(format: String, config_path: Option<PathBuf>) -> Result<()> {
    let mut session = super::connect(config_path.as_deref())?;
    session.refresh_policy().await;
    let policy = session.store().policy();

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(policy)?),
        _ => print_policy(policy),
    }
    Ok(())
}

fn print_policy(policy: &GradingPolicy) {
    println!("System:             {} ({} terms)", policy.system, policy.period_count());
    println!("Calculation method: {}", policy.calculation_method);
    println!(
        "Weights:            exam {} / activities {} / participation {}",
        policy.weights.exam, policy.weights.activities, policy.weights.participation
    );
    println!("Minimum to pass:    {:.1}", policy.min_passing_grade);
    println!("Recovery:           {}", policy.recovery_type);
    if policy.recovery_type != RecoveryType::None {
        println!("Recovery rule:      {}", policy.recovery_rule);
    }
}
