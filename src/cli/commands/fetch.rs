//! Fetch command implementation.
//!
//! Sends one request through the interceptor.

use colored::Colorize;

use crate::cli::args::{FetchArgs, OutputFormat};
use crate::error::PantryError;
use crate::features::intercept::QUEUED_HEADER;
use crate::http::{Method, Request};
use crate::offline::OfflineLayer;
use crate::output::format_response;

/// Execute the fetch command.
///
/// # Errors
///
/// Returns an error if the arguments do not form a valid request, or if the
/// request fails and cannot be answered from cache or queued.
pub fn fetch(
    layer: &OfflineLayer,
    args: FetchArgs,
    format: OutputFormat,
) -> Result<String, PantryError> {
    let request = build_request(args)?;
    let response = layer.interceptor().handle_fetch(request)?;

    let mut output = format_response(&response, format)?;
    if format == OutputFormat::Pretty {
        if let Some(id) = response.headers.get(QUEUED_HEADER) {
            output.push_str(&format!(
                "\n\n{}",
                format!("Offline: queued as #{id}. Run 'pantry sync run' once back online.")
                    .yellow()
            ));
        }
    }
    Ok(output)
}

fn build_request(args: FetchArgs) -> Result<Request, PantryError> {
    let method: Method = args.method.parse()?;
    let mut request = Request::parse(method, &args.url)?;

    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        request = request.with_header(name, value);
    }

    if let Some(body) = args.body {
        request = request.with_body(body);
    }

    Ok(request)
}

/// Split a `Name: value` header argument.
fn parse_header(header: &str) -> Result<(&str, &str), PantryError> {
    let (name, value) = header.split_once(':').ok_or_else(|| {
        PantryError::InvalidRequest(format!("Header must be 'Name: value': {header}"))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(PantryError::InvalidRequest(format!(
            "Header name is empty: {header}"
        )));
    }

    Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, url: &str) -> FetchArgs {
        FetchArgs {
            url: url.to_string(),
            method: method.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Content-Type: application/json").unwrap(),
            ("Content-Type", "application/json")
        );
        assert_eq!(parse_header("x-a:b:c").unwrap(), ("x-a", "b:c"));
        assert!(parse_header("no colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_build_request() {
        let mut fetch = args("patch", "https://api.test/rest/v1/items?id=eq.1");
        fetch.headers = vec!["Authorization: Bearer abc".to_string()];
        fetch.body = Some(r#"{"done":true}"#.to_string());

        let request = build_request(fetch).unwrap();

        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(request.body.as_deref(), Some(r#"{"done":true}"#));
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        assert!(build_request(args("FETCH", "https://api.test/")).is_err());
        assert!(build_request(args("GET", "not a url")).is_err());
    }
}
