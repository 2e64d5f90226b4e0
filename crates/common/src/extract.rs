//! Payload extraction for configurator responses
//!
//! The configurator backend does not label its responses reliably, so the
//! body goes through an ordered list of parse strategies. The first strategy
//! that yields a JSON object wins; if none does the response is rejected as
//! `MalformedPayload`. Field reads after that never fail: missing or
//! malformed fields just leave the record emptier.

use serde_json::Value;
use tracing::{debug, trace};

use crate::network::NetworkResponse;
use crate::types::{Brand, ExtractedRecord};
use crate::{Error, Result};

/// One way of turning a response body into JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Trust the declared content type and parse as JSON
    TypedJson,
    /// Ignore the label and parse the raw text
    TextAsJson,
}

impl ParseStrategy {
    pub const DEFAULT_ORDER: [ParseStrategy; 2] =
        [ParseStrategy::TypedJson, ParseStrategy::TextAsJson];

    fn name(&self) -> &'static str {
        match self {
            ParseStrategy::TypedJson => "typed-json",
            ParseStrategy::TextAsJson => "text-as-json",
        }
    }

    /// Attempt this strategy, returning a failure description on miss
    pub fn parse(&self, response: &NetworkResponse) -> std::result::Result<Value, String> {
        let value: Value = match self {
            ParseStrategy::TypedJson => {
                if !response.declares_json() {
                    return Err(format!(
                        "content type {:?} is not JSON",
                        response.content_type.as_deref().unwrap_or("<none>")
                    ));
                }
                serde_json::from_str(&response.body).map_err(|e| e.to_string())?
            }
            ParseStrategy::TextAsJson => {
                let text = response.body.trim_start_matches('\u{feff}').trim();
                serde_json::from_str(text).map_err(|e| e.to_string())?
            }
        };

        if value.is_object() {
            Ok(value)
        } else {
            Err("top-level value is not an object".to_string())
        }
    }
}

/// Builds `ExtractedRecord`s from raw responses
#[derive(Debug, Clone)]
pub struct ResultExtractor {
    strategies: Vec<ParseStrategy>,
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self {
            strategies: ParseStrategy::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl ResultExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom strategy order
    pub fn with_strategies(strategies: Vec<ParseStrategy>) -> Self {
        Self { strategies }
    }

    /// Parse and extract in one go
    pub fn extract(&self, response: &NetworkResponse) -> Result<ExtractedRecord> {
        let value = self.parse(response)?;
        Ok(record_from_value(&value))
    }

    /// Run the strategies in order; first success wins
    pub fn parse(&self, response: &NetworkResponse) -> Result<Value> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.parse(response) {
                Ok(value) => {
                    if !failures.is_empty() {
                        debug!(
                            "Parsed {} with {} after: {}",
                            response.url,
                            strategy.name(),
                            failures.join("; ")
                        );
                    }
                    return Ok(value);
                }
                Err(reason) => {
                    trace!("{} rejected {}: {}", strategy.name(), response.url, reason);
                    failures.push(format!("{}: {}", strategy.name(), reason));
                }
            }
        }

        Err(Error::MalformedPayload(format!(
            "{} ({})",
            response.url,
            failures.join("; ")
        )))
    }
}

/// Read the record fields out of an already parsed body
pub fn record_from_value(value: &Value) -> ExtractedRecord {
    let side = value
        .pointer("/plugs/side")
        .and_then(Value::as_str)
        .map(normalize_whitespace)
        .filter(|s| !s.is_empty());

    let plug_messages = value
        .pointer("/plugs/plugs")
        .and_then(Value::as_array)
        .map(|plugs| {
            plugs
                .iter()
                .filter_map(|plug| plug.get("msg").and_then(Value::as_str))
                .map(normalize_whitespace)
                .filter(|msg| !msg.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let brands = value
        .get("brands")
        .and_then(Value::as_array)
        .map(|brands| brands.iter().filter_map(brand_from_value).collect())
        .unwrap_or_default();

    let articles_count = value
        .pointer("/data/result/articles/count")
        .and_then(count_from_value)
        .or_else(|| {
            value
                .pointer("/data/result/articles/items")
                .and_then(Value::as_array)
                .map(|items| items.len() as u64)
        })
        .unwrap_or(0);

    ExtractedRecord {
        side,
        plug_messages,
        brands,
        articles_count,
    }
}

fn brand_from_value(value: &Value) -> Option<Brand> {
    let name = value
        .get("brand")
        .and_then(Value::as_str)
        .map(normalize_whitespace)
        .filter(|name| !name.is_empty())?;

    let count = match value.get("count") {
        Some(raw) => count_from_value(raw).unwrap_or_else(|| {
            debug!("Unreadable count {} for brand '{}', using 0", raw, name);
            0
        }),
        None => 0,
    };

    Some(Brand { name, count })
}

/// Counts arrive as numbers or as numeric strings ("12", " 1,204 ")
fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ',')
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ResourceType;
    use test_case::test_case;

    const BODY: &str = r#"{
        "plugs": { "side": "left", "plugs": [
            { "msg": "  BNC   female\n" }, { "msg": "" }, { "id": 3 }, { "msg": "XLR male" }
        ] },
        "brands": [
            { "brand": "Sennheiser", "count": 12 },
            { "brand": "Shure", "count": "7" },
            { "brand": "", "count": 3 },
            { "count": 4 }
        ],
        "data": { "result": { "articles": { "count": 19, "items": [1, 2] } } }
    }"#;

    fn response(content_type: Option<&str>, body: &str) -> NetworkResponse {
        NetworkResponse {
            url: "https://www.thomann.de/intl/cableguy_ajax.html?side=left".to_string(),
            status: 200,
            resource_type: ResourceType::Xhr,
            content_type: content_type.map(String::from),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_extract_full_record() {
        let record = ResultExtractor::new()
            .extract(&response(Some("application/json"), BODY))
            .unwrap();

        assert_eq!(record.side.as_deref(), Some("left"));
        assert_eq!(record.plug_messages, vec!["BNC female", "XLR male"]);
        assert_eq!(
            record.brands,
            vec![
                Brand { name: "Sennheiser".into(), count: 12 },
                Brand { name: "Shure".into(), count: 7 },
            ]
        );
        assert_eq!(record.articles_count, 19);
    }

    #[test_case(Some("text/html; charset=UTF-8") ; "mislabeled as html")]
    #[test_case(Some("text/plain") ; "mislabeled as text")]
    #[test_case(None ; "no content type")]
    fn test_mislabeled_body_matches_typed(content_type: Option<&str>) {
        let extractor = ResultExtractor::new();
        let typed = extractor
            .extract(&response(Some("application/json"), BODY))
            .unwrap();
        let mislabeled = extractor.extract(&response(content_type, BODY)).unwrap();
        assert_eq!(typed, mislabeled);
    }

    #[test]
    fn test_brands_absent_and_items_fallback() {
        let body = r#"{ "data": { "result": { "articles": { "items": [{}, {}, {}] } } } }"#;
        let record = ResultExtractor::new()
            .extract(&response(Some("application/json"), body))
            .unwrap();
        assert!(record.brands.is_empty());
        assert!(record.plug_messages.is_empty());
        assert_eq!(record.articles_count, 3);
    }

    #[test]
    fn test_empty_object_degrades_to_empty_record() {
        let record = ResultExtractor::new()
            .extract(&response(Some("application/json"), "{}"))
            .unwrap();
        assert_eq!(record, ExtractedRecord::default());
    }

    #[test_case("Not Found" ; "plain text")]
    #[test_case("<html><body>oops</body></html>" ; "html page")]
    #[test_case("[1, 2, 3]" ; "array at top level")]
    #[test_case("" ; "empty body")]
    fn test_unparseable_is_malformed(body: &str) {
        let err = ResultExtractor::new()
            .extract(&response(Some("text/html"), body))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)), "{:?}", err);
    }

    #[test]
    fn test_typed_strategy_alone_rejects_mislabeled() {
        let extractor = ResultExtractor::with_strategies(vec![ParseStrategy::TypedJson]);
        assert!(extractor.extract(&response(Some("text/html"), BODY)).is_err());
    }

    #[test]
    fn test_bom_prefixed_text() {
        let body = format!("\u{feff}  {}", r#"{"brands":[{"brand":"Neumann","count":2}]}"#);
        let record = ResultExtractor::new()
            .extract(&response(None, &body))
            .unwrap();
        assert_eq!(record.brand("Neumann").map(|b| b.count), Some(2));
    }

    #[test_case(serde_json::json!(5), Some(5) ; "number")]
    #[test_case(serde_json::json!("12"), Some(12) ; "numeric string")]
    #[test_case(serde_json::json!(" 1,204 "), Some(1204) ; "separated string")]
    #[test_case(serde_json::json!(3.0), Some(3) ; "integral float")]
    #[test_case(serde_json::json!(-1), None ; "negative")]
    #[test_case(serde_json::json!("many"), None ; "word")]
    #[test_case(serde_json::json!(null), None ; "null")]
    fn test_count_from_value(value: Value, expected: Option<u64>) {
        assert_eq!(count_from_value(&value), expected);
    }

    #[test]
    fn test_unreadable_brand_count_defaults_to_zero() {
        let record = record_from_value(&serde_json::json!({
            "brands": [{ "brand": "Cordial", "count": "n/a" }]
        }));
        assert_eq!(record.brands, vec![Brand { name: "Cordial".into(), count: 0 }]);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Jack \t 6.3mm\n "), "Jack 6.3mm");
        assert_eq!(normalize_whitespace(" \n "), "");
    }
}
