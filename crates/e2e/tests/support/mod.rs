//! Scripted in-memory configurator page for workflow tests

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use cableguy_common::{NetworkResponse, ResourceType, Slot};
use cableguy_e2e::{BrowserDriver, E2eError, E2eResult, ResponseStream};

pub const AJAX_URL: &str = "https://www.thomann.de/intl/cableguy_ajax.html?ts=1700000000";

/// Calls the workflow made against the page, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    OpenSurface(Slot),
    ListOptions { slot: Slot, count: usize },
    Trigger { slot: Slot, index: usize },
    ReadCount(String),
}

/// Page whose options, responses and rendered counts are fixed up front.
///
/// Triggering a selection publishes the slot's scripted responses on the
/// same broadcast channel a live driver would use.
pub struct ScriptedDriver {
    options: HashMap<Slot, Vec<String>>,
    responses: HashMap<Slot, Vec<NetworkResponse>>,
    rendered_counts: HashMap<String, u64>,
    open_slot: Mutex<Option<Slot>>,
    calls: Mutex<Vec<DriverCall>>,
    tx: broadcast::Sender<NetworkResponse>,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            options: HashMap::new(),
            responses: HashMap::new(),
            rendered_counts: HashMap::new(),
            open_slot: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            tx,
        }
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, slot: Slot, options: &[&str]) -> Self {
        self.options
            .insert(slot, options.iter().map(|o| o.to_string()).collect());
        self
    }

    pub fn with_response(mut self, slot: Slot, response: NetworkResponse) -> Self {
        self.responses.entry(slot).or_default().push(response);
        self
    }

    pub fn with_rendered_count(mut self, brand: &str, count: u64) -> Self {
        self.rendered_counts.insert(brand.to_string(), count);
        self
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn open_selection_surface(&self, slot: Slot) -> E2eResult<()> {
        self.record(DriverCall::OpenSurface(slot));
        *self.open_slot.lock() = Some(slot);
        Ok(())
    }

    async fn list_rendered_options(&self) -> E2eResult<Vec<String>> {
        let slot = (*self.open_slot.lock())
            .ok_or_else(|| E2eError::Driver("no selection surface open".to_string()))?;
        let options = self.options.get(&slot).cloned().unwrap_or_default();
        self.record(DriverCall::ListOptions {
            slot,
            count: options.len(),
        });
        Ok(options)
    }

    async fn trigger_selection(&self, slot: Slot, index: usize) -> E2eResult<()> {
        let rendered = self.options.get(&slot).map(Vec::len).unwrap_or(0);
        if index >= rendered {
            return Err(E2eError::Driver(format!(
                "no option {} on {} surface ({} rendered)",
                index, slot, rendered
            )));
        }
        self.record(DriverCall::Trigger { slot, index });
        *self.open_slot.lock() = None;

        for response in self.responses.get(&slot).into_iter().flatten() {
            let _ = self.tx.send(response.clone());
        }
        Ok(())
    }

    async fn read_rendered_count(&self, brand: &str) -> E2eResult<u64> {
        self.record(DriverCall::ReadCount(brand.to_string()));
        self.rendered_counts
            .get(brand)
            .copied()
            .ok_or_else(|| E2eError::Driver(format!("brand '{}' not rendered", brand)))
    }

    fn subscribe_responses(&self) -> ResponseStream {
        self.tx.subscribe()
    }
}

/// Configurator AJAX response, mislabeled as HTML the way the site serves it
pub fn ajax_response(body: Value) -> NetworkResponse {
    NetworkResponse {
        url: AJAX_URL.to_string(),
        status: 200,
        resource_type: ResourceType::Xhr,
        content_type: Some("text/html; charset=UTF-8".to_string()),
        body: body.to_string(),
    }
}

/// Response that must never be correlated
pub fn noise_response(url: &str, status: u16, resource_type: ResourceType) -> NetworkResponse {
    NetworkResponse {
        url: url.to_string(),
        status,
        resource_type,
        content_type: Some("application/json".to_string()),
        body: json!({ "brands": [{ "brand": "Decoy", "count": 999 }] }).to_string(),
    }
}

pub fn plugs_body(side: &str, plugs: &[&str]) -> Value {
    json!({
        "plugs": {
            "side": side,
            "plugs": plugs.iter().map(|p| json!({ "msg": p })).collect::<Vec<_>>(),
        },
        "data": { "result": { "articles": { "items": [] } } }
    })
}

pub fn brands_body(brands: &[(&str, u64)], articles: u64) -> Value {
    json!({
        "plugs": { "side": "right", "plugs": [{ "msg": "BNC male" }] },
        "brands": brands
            .iter()
            .map(|(name, count)| json!({ "brand": name, "count": count.to_string() }))
            .collect::<Vec<_>>(),
        "data": { "result": { "articles": { "count": articles } } }
    })
}

pub const BEGIN_OPTIONS: [&str; 3] = ["BNC female", "XLR male", "Jack 6.3mm"];
pub const END_OPTIONS: [&str; 2] = ["BNC male", "XLR female"];

/// Page for the Sennheiser/Shure scenario with the given rendered Sennheiser count
pub fn sennheiser_page(rendered: u64) -> ScriptedDriver {
    ScriptedDriver::new()
        .with_options(Slot::Begin, &BEGIN_OPTIONS)
        .with_options(Slot::End, &END_OPTIONS)
        .with_response(
            Slot::Begin,
            ajax_response(plugs_body("left", &["BNC male", "XLR female"])),
        )
        .with_response(
            Slot::End,
            ajax_response(brands_body(&[("Sennheiser", 12), ("Shure", 7)], 19)),
        )
        .with_rendered_count("Sennheiser", rendered)
        .with_rendered_count("Shure", 7)
}
