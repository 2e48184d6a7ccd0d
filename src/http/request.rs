/// HTTP request methods.
///
/// Only `GET` is served; every other token is kept so the handler can
/// answer 405 instead of 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    PATCH,
    /// Any other method token, verbatim.
    Other(String),
}

/// A parsed request line.
///
/// Headers are read off the wire but not retained: nothing in the server
/// depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Raw request target, still percent-encoded (e.g. "/docs/a%20b.txt")
    pub path: String,
    /// Protocol token as sent (typically "HTTP/1.1")
    pub version: String,
}

impl Method {
    /// Maps a method token to a `Method`. Matching is case-sensitive.
    ///
    /// # Example
    ///
    /// ```
    /// # use docgate::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Method::GET);
    /// assert_eq!(Method::from_token("get"), Method::Other("get".into()));
    /// ```
    pub fn from_token(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}
