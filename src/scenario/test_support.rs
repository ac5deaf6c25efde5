//! In-process PVZ service used by scenario and client tests.
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};

const MODERATOR_TOKEN: &str = "token-moderator";
const EMPLOYEE_TOKEN: &str = "token-employee";
const PRODUCT_TYPES: [&str; 3] = ["электроника", "одежда", "обувь"];
const CITIES: [&str; 3] = ["Москва", "Санкт-Петербург", "Казань"];

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MockConfig {
    /// Answer `/dummyLogin` with `{"token": ...}` instead of a bare string.
    pub token_as_object: bool,
    /// Refuse pickup point creation with 403.
    pub reject_pvz_creation: bool,
    /// Sleep before every response.
    pub delay: Duration,
}

#[derive(Debug, Default)]
struct MockState {
    hits: BTreeMap<&'static str, u64>,
    open_receptions: HashMap<String, bool>,
    pvz_bodies: Vec<Value>,
    product_types: Vec<String>,
}

struct Reply {
    status: u16,
    body: Value,
}

impl Reply {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    fn message(status: u16, message: &str) -> Self {
        Self::new(status, json!({ "message": message }))
    }
}

pub(crate) struct MockPvzService {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    handle: JoinHandle<()>,
}

impl MockPvzService {
    pub(crate) async fn start(config: MockConfig) -> AppResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(MockState::default()));
        let shared = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let connection_state = Arc::clone(&shared);
                tokio::spawn(serve_connection(stream, connection_state, config));
            }
        });
        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn hits(&self, route: &str) -> u64 {
        self.with_state(|state| state.hits.get(route).copied().unwrap_or(0))
    }

    pub(crate) fn reception_open(&self, pvz_id: &str) -> bool {
        self.with_state(|state| state.open_receptions.get(pvz_id).copied().unwrap_or(false))
    }

    pub(crate) fn pvz_bodies(&self) -> Vec<Value> {
        self.with_state(|state| state.pvz_bodies.clone())
    }

    pub(crate) fn product_types(&self) -> Vec<String> {
        self.with_state(|state| state.product_types.clone())
    }

    fn with_state<T>(&self, read: impl FnOnce(&MockState) -> T) -> T {
        match self.state.lock() {
            Ok(state) => read(&state),
            Err(poisoned) => read(&poisoned.into_inner()),
        }
    }
}

impl Drop for MockPvzService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reserves a local port and releases it, so connecting to it is refused.
pub(crate) async fn unused_base_url() -> AppResult<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

async fn serve_connection(stream: TcpStream, state: Arc<Mutex<MockState>>, config: MockConfig) {
    let mut reader = BufReader::new(stream);
    loop {
        let Ok(Some(request)) = read_request(&mut reader).await else {
            return;
        };
        if !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
        let reply = route(&request, &state, config);
        let body = reply.body.to_string();
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            reply.status,
            reason(reply.status),
            body.len()
        );
        let writer = reader.get_mut();
        if writer.write_all(head.as_bytes()).await.is_err()
            || writer.write_all(body.as_bytes()).await.is_err()
        {
            return;
        }
    }
}

struct MockRequest {
    method: String,
    path: String,
    token: Option<String>,
    body: Value,
}

async fn read_request(
    reader: &mut BufReader<TcpStream>,
) -> Result<Option<MockRequest>, AppError> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut content_length: usize = 0;
    let mut token = None;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 {
            return Ok(None);
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "authorization" => {
                    token = value.strip_prefix("Bearer ").map(str::to_owned);
                }
                _ => {}
            }
        }
    }

    let mut raw = vec![0_u8; content_length];
    reader.read_exact(&mut raw).await?;
    let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);
    Ok(Some(MockRequest {
        method,
        path,
        token,
        body,
    }))
}

fn route(request: &MockRequest, state: &Mutex<MockState>, config: MockConfig) -> Reply {
    let Ok(mut state) = state.lock() else {
        return Reply::message(500, "state poisoned");
    };
    if request.method != "POST" {
        return Reply::message(405, "method not allowed");
    }
    let token = request.token.as_deref();
    let field = |name: &str| {
        request
            .body
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    if request.path == "/dummyLogin" {
        bump(&mut state, "dummyLogin");
        return match field("role").as_deref() {
            Some(role @ ("moderator" | "employee")) => {
                let issued = format!("token-{}", role);
                if config.token_as_object {
                    Reply::new(200, json!({ "token": issued }))
                } else {
                    Reply::new(200, Value::String(issued))
                }
            }
            _ => Reply::message(400, "invalid role"),
        };
    }

    if request.path == "/pvz" {
        bump(&mut state, "pvz");
        if config.reject_pvz_creation || token != Some(MODERATOR_TOKEN) {
            return Reply::message(403, "access denied");
        }
        let city_ok = field("city").is_some_and(|city| CITIES.contains(&city.as_str()));
        let date_ok = field("registrationDate")
            .is_some_and(|date| chrono::DateTime::parse_from_rfc3339(&date).is_ok());
        let Some(id) = field("id").filter(|_| city_ok && date_ok) else {
            return Reply::message(400, "invalid request");
        };
        state.pvz_bodies.push(request.body.clone());
        state.open_receptions.insert(id, false);
        return Reply::new(201, request.body.clone());
    }

    if token != Some(EMPLOYEE_TOKEN) {
        return Reply::message(403, "access denied");
    }

    if request.path == "/receptions" {
        bump(&mut state, "receptions");
        let Some(pvz_id) = field("pvzId") else {
            return Reply::message(400, "invalid request");
        };
        return match state.open_receptions.get_mut(&pvz_id) {
            None => Reply::message(400, "pvz not found"),
            Some(true) => Reply::message(400, "active reception exists"),
            Some(open) => {
                *open = true;
                Reply::new(201, json!({ "pvzId": pvz_id, "status": "in_progress" }))
            }
        };
    }

    if request.path == "/products" {
        bump(&mut state, "products");
        let product_type = field("type").filter(|kind| PRODUCT_TYPES.contains(&kind.as_str()));
        let (Some(product_type), Some(pvz_id)) = (product_type, field("pvzId")) else {
            return Reply::message(400, "invalid request");
        };
        state.product_types.push(product_type.clone());
        if state.open_receptions.get(&pvz_id).copied().unwrap_or(false) {
            return Reply::new(201, json!({ "type": product_type }));
        }
        return Reply::message(400, "no active reception");
    }

    if let Some(pvz_id) = request
        .path
        .strip_prefix("/pvz/")
        .and_then(|rest| rest.strip_suffix("/close_last_reception"))
    {
        bump(&mut state, "close");
        return match state.open_receptions.get_mut(pvz_id) {
            Some(open) if *open => {
                *open = false;
                Reply::new(200, json!({ "pvzId": pvz_id, "status": "close" }))
            }
            _ => Reply::message(400, "no active reception"),
        };
    }

    Reply::message(404, "not found")
}

fn bump(state: &mut MockState, route: &'static str) {
    let hits = state.hits.entry(route).or_insert(0);
    *hits = hits.saturating_add(1);
}

const fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}
