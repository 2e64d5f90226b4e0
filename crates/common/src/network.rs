//! Network responses observed by the browser driver

use serde::{Deserialize, Serialize};

/// Resource type as reported by the browser for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    #[serde(other)]
    Other,
}

impl ResourceType {
    /// Whether the resource came from a script-initiated request
    pub fn is_fetch(&self) -> bool {
        matches!(self, ResourceType::Xhr | ResourceType::Fetch)
    }
}

/// A response as handed over by the driver, body already read as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub url: String,
    pub status: u16,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: String,
}

impl NetworkResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Content type claims JSON (`application/json`, `application/vnd.x+json`, ...)
    pub fn declares_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_from_browser_strings() {
        let parsed: Vec<ResourceType> =
            serde_json::from_str(r#"["xhr", "fetch", "image", "websocket"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                ResourceType::Xhr,
                ResourceType::Fetch,
                ResourceType::Image,
                ResourceType::Other
            ]
        );
        assert!(parsed[0].is_fetch());
        assert!(!parsed[2].is_fetch());
    }

    #[test]
    fn test_declares_json() {
        let mut resp = NetworkResponse {
            url: "https://example.test/a".to_string(),
            status: 200,
            resource_type: ResourceType::Xhr,
            content_type: Some("Application/JSON; charset=utf-8".to_string()),
            body: String::new(),
        };
        assert!(resp.declares_json());
        assert!(resp.is_success());

        resp.content_type = Some("text/html".to_string());
        resp.status = 304;
        assert!(!resp.declares_json());
        assert!(!resp.is_success());
    }
}
