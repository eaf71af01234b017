use crate::headers::Headers;
use crate::request::HttpMethod;

/// What a request resolves to, decided from its method and path segments alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    Root,
    Echo(&'a str),
    UserAgent,
    File { name: &'a str, method: &'a HttpMethod },
    NotFound,
}

/// Resolves the route discriminator (`segments[1]`) to a handler.
///
/// `segments` comes from splitting a path that starts with '/', so
/// `segments[0]` is always empty. Shorter input resolves to `NotFound`.
pub fn route<'a>(method: &'a HttpMethod, segments: &'a [String]) -> RouteDecision<'a> {
    let Some(discriminator) = segments.get(1) else {
        return RouteDecision::NotFound;
    };
    let argument = segments.get(2).map(String::as_str);

    match discriminator.as_str() {
        "" => RouteDecision::Root,
        "echo" => RouteDecision::Echo(argument.unwrap_or("")),
        "user-agent" => RouteDecision::UserAgent,
        "files" => match argument {
            Some(name) if !matches!(name, "" | "." | "..") => RouteDecision::File { name, method },
            _ => RouteDecision::NotFound,
        },
        _ => RouteDecision::NotFound,
    }
}

/// True when `Accept-Encoding` lists `gzip` as one of its comma-separated tokens.
pub fn accepts_gzip(headers: &Headers) -> bool {
    headers
        .get("Accept-Encoding")
        .is_some_and(|value| value.split(',').any(|token| token.trim() == "gzip"))
}
