#![allow(dead_code)]

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use shipping_portal::config::Config;
use shipping_portal::gateway::{ApiRequest, Method, RawResponse, Transport};
use shipping_portal::shipment::ShipmentClient;

pub const BASE_URL: &str = "https://api.test/v1";

type Reply = std::result::Result<RawResponse, String>;

/// Scripted transport. Replies are queued per method and path and consumed in order;
/// the last reply of a queue is repeated. Every request is recorded.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<(Method, String), VecDeque<Reply>>>>,
    calls: Arc<Mutex<Vec<ApiRequest>>>,
    sent_at: Arc<Mutex<Vec<Instant>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// When each request reached the transport, on the tokio clock
    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| format!("{} {}", call.method.as_str(), path_of(&call.url)))
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && path_of(&call.url) == path)
            .count()
    }

    pub fn client(&self) -> ShipmentClient {
        self.client_with(&test_config())
    }

    pub fn client_with(&self, config: &Config) -> ShipmentClient {
        ShipmentClient::with_transport(config, Box::new(self.clone()))
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Reply {
        self.calls
            .lock()
            .map_err(|_| "calls lock poisoned".to_string())?
            .push(request.clone());
        self.sent_at
            .lock()
            .map_err(|_| "timestamps lock poisoned".to_string())?
            .push(Instant::now());

        let key = (request.method, path_of(&request.url).to_string());
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| "replies lock poisoned".to_string())?;

        match replies.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Err("empty".into())),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Err("empty".into())),
            None => Ok(status(404, json!({"status": "error", "message": "Not found", "code": "NOT_FOUND"}))),
        }
    }
}

fn path_of(url: &str) -> &str {
    url.strip_prefix(BASE_URL).unwrap_or(url)
}

pub fn test_config() -> Config {
    config_with(&[("RETRY_DELAY_MS", "1")])
}

/// Test configuration with `overrides` on top of the required values.
pub fn config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("API_BASE_URL", BASE_URL),
        ("API_KEY", "test-key"),
        ("TENANT_ID", "tenant-1"),
    ]);
    vars.extend(overrides.iter().copied());
    Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
        .expect("test config is valid")
}

pub fn ok(data: Value) -> Reply {
    Ok(status(200, json!({"status": "success", "message": "ok", "data": data})))
}

pub fn status(code: u16, body: Value) -> RawResponse {
    RawResponse {
        status: code,
        body: body.to_string(),
    }
}

pub fn fail(code: u16, body: Value) -> Reply {
    Ok(status(code, body))
}

pub fn request_json(request: &ApiRequest) -> Result<Value> {
    match &request.body {
        shipping_portal::gateway::RequestBody::Json(value) => Ok(value.clone()),
        other => Err(anyhow!("expected a JSON body, got {:?}", other)),
    }
}

pub fn categories_json() -> Value {
    json!([
        {"id": "cat-general", "name": "General", "description": "General goods", "group_tag": "general", "hs_code": "9999"},
        {"id": "cat-general-2", "name": "General (dup)", "description": "", "group_tag": "general", "hs_code": "9999"},
        {"id": "cat-electronics", "name": "Electronics", "description": "Devices", "group_tag": "electronics", "hs_code": "8517"}
    ])
}

pub fn quote_json(id: &str, total: f64, expires_at: &str) -> Value {
    json!({
        "quote_id": id,
        "carrier_code": "dhl",
        "carrier_name": "DHL Express",
        "service_type": "express",
        "display_name": "DHL Express Worldwide",
        "base_rate": total,
        "adjustments": [],
        "discounts": [],
        "total_amount": total,
        "currency": "NGN",
        "estimated_days": 4,
        "expires_at": expires_at
    })
}

pub fn address_json(name: &str, city: &str, state: &str, country: &str) -> Value {
    json!({
        "name": name,
        "address_line_1": "1 Marina Road",
        "city": city,
        "state": state,
        "postal_code": "100001",
        "country": country,
        "phone": "+2348000000000",
        "email": "ada@example.com"
    })
}

pub fn shipment_json(id: &str, payment_id: Option<&str>, method: Option<&str>) -> Value {
    json!({
        "id": id,
        "code": "SH13651729",
        "status": "drafted",
        "carrier_name": "DHL Express",
        "service_type": "express",
        "final_price": 45000.0,
        "currency": "NGN",
        "origin_address": address_json("Ada Lovelace", "lagos", "lagos", "NG"),
        "destination_address": address_json("Grace Hopper", "new york", "ny", "US"),
        "is_insured": true,
        "channel_code": "web",
        "payment_id": payment_id,
        "selected_payment_method": method,
        "payment_status": "pending",
        "items": []
    })
}

pub fn payment_methods_json() -> Value {
    json!([
        {
            "id": "tpm-bank",
            "tenant_id": "tenant-1",
            "is_enabled": true,
            "provider_code": "manual",
            "provider_name": "Manual",
            "payment_method": {"id": "pm-1", "name": "Bank transfer", "code": "bank_transfer", "is_active": true}
        },
        {
            "id": "tpm-card",
            "tenant_id": "tenant-1",
            "is_enabled": false,
            "provider_code": "paystack",
            "provider_name": "Paystack",
            "payment_method": {"id": "pm-2", "name": "Card", "code": "card", "is_active": true}
        }
    ])
}
