use {
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
};

use crate::{
    error::{Error, Result},
    request::GatewayResponse,
};

/// One page of a list call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T: DeserializeOwned> ListPage<T> {
    /// Pull `key` out of a list response. A missing key is an empty page,
    /// which is how the APIs answer when nothing matches.
    pub(crate) fn from_response(
        response: GatewayResponse,
        key: &str,
        operation: &str,
    ) -> Result<Self> {
        let meta = response.meta.clone();
        let mut value = response.into_value();
        let next_page_token = value
            .get("nextPageToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string);
        let items = match value.get_mut(key).map(Value::take) {
            Some(Value::Null) | None => Vec::new(),
            Some(items) => serde_json::from_value(items).map_err(|source| Error::Decode {
                operation: operation.to_string(),
                meta,
                source,
            })?,
        };
        Ok(Self {
            items,
            next_page_token,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{meta::ResponseMeta, request::ResponseBody},
        serde_json::json,
    };

    fn response(body: Value) -> GatewayResponse {
        GatewayResponse {
            status: 200,
            meta: ResponseMeta::default(),
            body: ResponseBody::Json(body),
        }
    }

    #[test]
    fn missing_key_is_empty_page() {
        let page: ListPage<Value> =
            ListPage::from_response(response(json!({})), "spaces", "op").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn items_and_token_are_read() {
        let page: ListPage<String> = ListPage::from_response(
            response(json!({"names": ["a", "b"], "nextPageToken": "t2"})),
            "names",
            "op",
        )
        .unwrap();
        assert_eq!(page.items, vec!["a", "b"]);
        assert_eq!(page.next_page_token.as_deref(), Some("t2"));
    }
}
