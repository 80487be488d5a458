use {
    reqwest::Method,
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
};

use crate::{
    error::{Error, Result},
    meta::ResponseMeta,
};

/// Remote API family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Calendar,
    Meet,
}

impl Provider {
    pub const ALL: [Self; 2] = [Self::Calendar, Self::Meet];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Meet => "meet",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API stability tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTier {
    #[default]
    Stable,
    Preview,
}

/// One outbound call, before authentication and URL resolution.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub provider: Provider,
    pub operation: String,
    /// `"<tool>.<operation>"` when issued on behalf of a tool.
    pub tool: Option<String>,
    pub method: Method,
    /// Path below the versioned base, without a leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub tier: ApiTier,
}

impl GatewayRequest {
    pub fn new(
        provider: Provider,
        operation: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            operation: operation.into(),
            tool: None,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            tier: ApiTier::Stable,
        }
    }

    pub fn get(provider: Provider, operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(provider, operation, Method::GET, path)
    }

    pub fn post(provider: Provider, operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(provider, operation, Method::POST, path)
    }

    pub fn patch(provider: Provider, operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(provider, operation, Method::PATCH, path)
    }

    pub fn delete(provider: Provider, operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(provider, operation, Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn preview(mut self) -> Self {
        self.tier = ApiTier::Preview;
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Endpoint label for logs and call records: method and path.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{} /{}", self.method, self.path)
    }
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub meta: ResponseMeta,
    pub body: ResponseBody,
}

impl GatewayResponse {
    /// Body as JSON; text bodies become a JSON string and empty bodies `null`.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self.body {
            ResponseBody::Json(v) => v,
            ResponseBody::Text(t) => Value::String(t),
            ResponseBody::Empty => Value::Null,
        }
    }

    /// Deserialize the JSON body into `T`.
    pub fn json<T: DeserializeOwned>(self, operation: &str) -> Result<T> {
        let meta = self.meta.clone();
        serde_json::from_value(self.into_value()).map_err(|source| Error::Decode {
            operation: operation.to_string(),
            meta,
            source,
        })
    }
}
