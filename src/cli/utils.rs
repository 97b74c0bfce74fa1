use serde_json::{json, Value};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output key/value lines in text mode, or the whole object in JSON mode
pub fn output_details(output_format: &OutputFormat, message: &str, details: Value) -> anyhow::Result<()> {
    if let OutputFormat::Text = output_format {
        println!("✓ {}", message);
        if let Some(fields) = details.as_object() {
            for (key, value) in fields {
                match value {
                    Value::String(s) => println!("  {}: {}", key, s),
                    Value::Array(items) => println!("  {}: {} item(s)", key, items.len()),
                    other => println!("  {}: {}", key, other),
                }
            }
        }
        return Ok(());
    }
    output_success(output_format, message, Some(details))
}

/// Base URL of the running API: `--url`, then `BACKOFFICE_API_URL`, then localhost on the configured port
pub fn resolve_api_url(provided: Option<String>, port: u16) -> String {
    provided
        .or_else(|| std::env::var("BACKOFFICE_API_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| format!("http://localhost:{}", port))
        .trim_end_matches('/')
        .to_string()
}
