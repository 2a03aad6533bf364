use crate::cli::OutputFormat;
use crate::config;

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => {
            println!("Environment:        {:?}", config.environment);
            println!("Max page size:      {}", config.paging.max_page_size);
            println!("Slow request (ms):  {}", config.pipeline.slow_request_threshold_ms);
            println!("Stage debug logs:   {}", config.pipeline.debug_logging);
            println!("Owner claim:        {}", config.tenant.owner_claim);
        }
    }
    Ok(())
}
