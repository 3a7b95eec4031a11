use serde_json::{json, Value};
use crate::cli::OutputFormat;

/// Render a success message in the appropriate format.
///
/// JSON output merges the fields of `data` (an object) next to the message;
/// text output prints the message followed by one `key: value` line per field.
pub fn render_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<String> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(fields)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(fields);
            }

            Ok(serde_json::to_string_pretty(&response)?)
        }
        OutputFormat::Text => {
            let mut out = format!("✓ {}", message);
            if let Some(Value::Object(fields)) = data {
                for (key, value) in fields {
                    out.push_str(&format!("\n  {}: {}", key, value));
                }
            }
            Ok(out)
        }
    }
}

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    println!("{}", render_success(output_format, message, data)?);
    Ok(())
}
