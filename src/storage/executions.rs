//! Execution result storage

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;
use crate::types::ExecutionResult;

pub fn save_execution_result(result: &ExecutionResult) -> Result<()> {
    let filename = format!("output/executions/arbitrage_{}.jsonl",
        Utc::now().format("%Y-%m-%d"));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(result)?)?;

    info!(
        plan_id = %result.plan_id,
        success = result.success,
        realized_profit = %result.realized_profit,
        "Saved execution result"
    );

    Ok(())
}
