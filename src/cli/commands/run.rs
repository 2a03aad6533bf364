use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::cli::script::{Script, ScriptRunner, StepReport};
use crate::cli::OutputFormat;
use crate::database::MemoryStorage;
use crate::handlers;

pub async fn handle(path: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    let script = Script::load(path)?;
    tracing::info!("Replaying {} step(s) from {}", script.steps.len(), path.display());

    let dispatcher = handlers::dispatcher(Arc::new(MemoryStorage::new()))?;
    let reports = ScriptRunner::new(&dispatcher).run(script).await?;
    let failed = reports.iter().filter(|r| !r.is_success()).count();

    match output_format {
        OutputFormat::Json => {
            let steps: Vec<Value> = reports.iter().map(report_json).collect();
            let response = json!({
                "success": failed == 0,
                "failed": failed,
                "steps": steps
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            for report in &reports {
                print_report(report)?;
            }
            println!();
            println!("{} step(s), {} failed", reports.len(), failed);
        }
    }

    if failed > 0 {
        anyhow::bail!("{} step(s) failed", failed);
    }
    Ok(())
}

fn report_json(report: &StepReport) -> Value {
    match &report.result {
        Ok(output) => json!({
            "step": report.index,
            "request": report.request,
            "user": report.user,
            "success": true,
            "result": output
        }),
        Err(err) => json!({
            "step": report.index,
            "request": report.request,
            "user": report.user,
            "success": false,
            "status": err.status_code(),
            "error": err.to_json()
        }),
    }
}

fn print_report(report: &StepReport) -> anyhow::Result<()> {
    let user = report.user.as_deref().unwrap_or("anonymous");
    match &report.result {
        Ok(Value::Null) => println!("✓ [{}] {} ({})", report.index, report.request, user),
        Ok(output) => println!(
            "✓ [{}] {} ({}): {}",
            report.index,
            report.request,
            user,
            serde_json::to_string(output)?
        ),
        Err(err) => println!(
            "✗ [{}] {} ({}): {} {}",
            report.index,
            report.request,
            user,
            err.status_code(),
            err
        ),
    }
    Ok(())
}
