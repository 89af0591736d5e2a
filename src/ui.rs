use colored::Colorize;
use console_query::ApiError;
use serde_json::Value;

/// Print a section header to separate logical sections of output
pub fn section_header(title: &str) {
    println!("\n{}", format!("==== {} ====", title).cyan().bold());
}

/// Print a success line followed by the payload as pretty JSON
pub fn payload(label: &str, value: &Value) {
    println!("{} {}", "✅".green(), label.green());
    println!("{}", pretty(value));
}

/// Print the user-facing message of a request failure
pub fn api_failure(label: &str, error: &ApiError) {
    eprintln!("{} {} {}", "❌".red(), label.red().bold(), error.user_message());
    if let Some(status) = error.status_code() {
        eprintln!("   {} {}", "status:".dimmed(), status);
    }
    if let Some(correlation_id) = error.correlation_id() {
        eprintln!("   {} {}", "correlation id:".dimmed(), correlation_id);
    }
}

/// Print a simple informational message
pub fn info_message(message: &str) {
    println!("{} {}", "ℹ️ ".blue(), message.blue());
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
