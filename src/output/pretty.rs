use chrono::Utc;
use colored::Colorize;

use crate::features::cache::CacheSummary;
use crate::features::queue::{DiscardedRequest, QueuedRequest};
use crate::http::{Method, Response};

fn method_label(method: Method) -> String {
    let label = format!("{:<6}", method.as_str());
    match method {
        Method::Post => label.green().to_string(),
        Method::Patch => label.yellow().to_string(),
        Method::Delete => label.red().to_string(),
        _ => label,
    }
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn age(then: chrono::DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(then);
    if age.num_days() > 0 {
        format!("{}d ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Format queued requests as a table
pub fn format_queue_pretty(records: &[QueuedRequest]) -> String {
    if records.is_empty() {
        return "Queue (0 requests)\n  Nothing waiting to sync".to_string();
    }

    let mut output = format!("Queue ({} requests)\n", records.len());
    output.push_str(&"─".repeat(70));
    output.push('\n');

    for record in records {
        output.push_str(&format!(
            "{:>5}  {} {}  {}\n",
            format!("#{}", record.id).dimmed(),
            method_label(record.method),
            shorten(&record.url, 48),
            age(record.timestamp).dimmed()
        ));
    }

    output.trim_end().to_string()
}

/// Format discarded requests as a table
pub fn format_discarded_pretty(records: &[DiscardedRequest]) -> String {
    if records.is_empty() {
        return "Discarded (0 requests)\n  Every queued change was saved".to_string();
    }

    let mut output = format!(
        "{} ({} requests)\n",
        "Changes that could not be saved".red().bold(),
        records.len()
    );
    output.push_str(&"─".repeat(70));
    output.push('\n');

    for record in records {
        output.push_str(&format!(
            "{:>5}  {} {}  {}  {}\n",
            format!("#{}", record.request.id).dimmed(),
            method_label(record.request.method),
            shorten(&record.request.url, 40),
            record.status.to_string().red(),
            age(record.discarded_at).dimmed()
        ));
    }

    output.trim_end().to_string()
}

/// Format cache summaries as a table
pub fn format_caches_pretty(caches: &[CacheSummary], current: &[&str]) -> String {
    if caches.is_empty() {
        return "Caches (0)\n  No cached responses".to_string();
    }

    let mut output = format!("Caches ({})\n", caches.len());
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for cache in caches {
        let name = if current.contains(&cache.name.as_str()) {
            cache.name.bold().to_string()
        } else {
            format!("{} {}", cache.name, "(stale)".yellow())
        };
        output.push_str(&format!(
            "  {:<32} {:>6} entries {:>10} bytes\n",
            name, cache.entries, cache.bytes
        ));
    }

    output.trim_end().to_string()
}

/// Format a response with its status line and body
pub fn format_response_pretty(response: &Response) -> String {
    let status = response.status.to_string();
    let status = if response.is_success() {
        status.green()
    } else if response.is_client_error() || response.is_server_error() {
        status.red()
    } else {
        status.yellow()
    };

    let mut output = format!("{} {}\n", "HTTP".dimmed(), status.bold());
    for (name, value) in &response.headers {
        output.push_str(&format!("{}: {}\n", name.dimmed(), value));
    }
    output.push('\n');
    output.push_str(&response.text());

    output.trim_end().to_string()
}
