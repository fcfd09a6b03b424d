use {
    std::collections::BTreeMap,
    serde::{Serialize, Deserialize},
    thiserror::Error,
};

pub const HEADER_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const HEADER_ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const HEADER_ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

const CONTENT_TYPE_JSON: &str = "application/json";

/// Response object handed back to the invocation host.
///
/// Serialized field names follow the proxy integration shape expected by
/// API gateways (`statusCode`, `headers`, `body`), where `body` is itself
/// an encoded JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl FunctionResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cors(self, cors: &CorsPolicy) -> Self {
        cors.headers()
            .into_iter()
            .fold(self, |response, (name, value)| response.with_header(name, value))
    }

    pub fn with_json<T: Serialize>(self, body: &T) -> Result<Self, ResponseError> {
        let mut response = self.with_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);
        response.body = serde_json::to_string(body)?;
        Ok(response)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn into_http(self) -> Result<http::Response<String>, ResponseError> {
        let builder = self.headers
            .iter()
            .fold(http::Response::builder().status(self.status_code), |builder, (name, value)| builder.header(name, value));
        Ok(builder.body(self.body)?)
    }
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("failed to encode response body: {0:?}")]
    BodyEncoding(#[from] serde_json::Error),

    #[error("failed to convert into http response: {0:?}")]
    HttpConversion(#[from] http::Error),
}

/// JSON document carried in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBody {
    pub views: u64,
}

impl CountBody {
    pub fn new(views: u64) -> Self {
        Self { views }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    allowed_origin: String,
    allowed_methods: String,
    allowed_headers: String,
}

impl CorsPolicy {
    pub fn new(allowed_origin: impl Into<String>) -> Self {
        Self {
            allowed_origin: allowed_origin.into(),
            allowed_methods: "GET,OPTIONS".to_owned(),
            allowed_headers: HEADER_CONTENT_TYPE.to_owned(),
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            (HEADER_ALLOW_ORIGIN.to_owned(), self.allowed_origin.clone()),
            (HEADER_ALLOW_METHODS.to_owned(), self.allowed_methods.clone()),
            (HEADER_ALLOW_HEADERS.to_owned(), self.allowed_headers.clone()),
        ]
    }
}
