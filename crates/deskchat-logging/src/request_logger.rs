use colored::Colorize;
use serde::Serialize;

use crate::safe_truncate;

const MAX_BODY_CHARS: usize = 5000;

/// Print host/port/scheme details for a URL
fn print_url_details(url: &str) {
    println!("{}: {}", "URL".bright_yellow(), url);
    if let Ok(parsed_url) = reqwest::Url::parse(url) {
        println!("{}: {}", "Host".bright_yellow(), parsed_url.host_str().unwrap_or("unknown"));
        println!(
            "{}: {}",
            "Port".bright_yellow(),
            parsed_url
                .port()
                .map(|p| p.to_string())
                .unwrap_or_else(|| if parsed_url.scheme() == "https" {
                    "443 (default)".to_string()
                } else {
                    "80 (default)".to_string()
                })
        );
        println!("{}: {}", "Scheme".bright_yellow(), parsed_url.scheme());
    }
}

fn print_body(body: &str) {
    if body.chars().count() > MAX_BODY_CHARS {
        println!("{}", safe_truncate(body, MAX_BODY_CHARS));
        println!("\n{}", format!("... (truncated, total {} bytes)", body.len()).bright_black());
    } else {
        println!("{}", body);
    }
}

/// Log a backend request for debugging (console output)
pub fn log_request<T: Serialize>(method: &str, url: &str, body: Option<&T>, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_cyan());
    println!("{}", "🔍 HTTP REQUEST DEBUG".bright_cyan().bold());
    println!("{}", "═".repeat(80).bright_cyan());

    println!("{}: {}", "Method".bright_yellow(), method);
    print_url_details(url);

    if let Some(body) = body {
        println!("\n{}", "Request Body:".bright_yellow());
        match serde_json::to_string_pretty(body) {
            Ok(json) => print_body(&json),
            Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
        }
    }

    println!("{}", "═".repeat(80).bright_cyan());
    println!();
}

/// Log a backend response for debugging (console output)
pub fn log_response(
    status: &reqwest::StatusCode,
    headers: &reqwest::header::HeaderMap,
    body: &str,
    verbose: bool,
) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_green());
    println!("{}", "📥 HTTP RESPONSE DEBUG".bright_green().bold());
    println!("{}", "═".repeat(80).bright_green());

    println!(
        "{}: {} {}",
        "Status".bright_yellow(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    println!("\n{}", "Headers:".bright_yellow());
    for (name, value) in headers.iter() {
        if let Ok(val_str) = value.to_str() {
            println!("  {}: {}", name.as_str().bright_white(), val_str);
        }
    }

    println!("\n{}", "Response Body:".bright_yellow());
    // Try to pretty-print JSON, fall back to raw text
    let pretty = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok());
    print_body(pretty.as_deref().unwrap_or(body));

    println!("{}", "═".repeat(80).bright_green());
    println!();
}
