#![allow(dead_code)]

//! Bellek içi, senaryolu bir ACME v1 CA'sı.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::path::PathBuf;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use serde_json::{json, Value};
use url::Url;

use tinycert_acme::{HttpResponse, Transport, TransportError};

pub const CA_BASE: &str = "https://ca.test";
pub const ISSUED_DER: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

/// Bir challenge sorgusuna verilecek yanıt.
#[derive(Debug, Clone)]
pub enum PollReply {
    Status(&'static str),
    Invalid(&'static str),
    NetworkFailure,
    Http(StatusCode),
}

/// Kaydedilen tek bir istek.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub payload: Option<Value>,
    pub nonce: Option<String>,
}

impl Recorded {
    pub fn resource(&self) -> Option<&str> {
        self.payload.as_ref()?.get("resource")?.as_str()
    }
}

struct State {
    nonces_issued: u32,
    nonce_budget: Option<u32>,
    registration_status: StatusCode,
    revocation_status: StatusCode,
    offer_http01: bool,
    self_check_failures: BTreeMap<String, u32>,
    poll_scripts: BTreeMap<String, VecDeque<PollReply>>,
    stalled: BTreeSet<String>,
    requests: Vec<Recorded>,
    artifacts_at_notify: Vec<(String, String)>,
}

pub struct FakeCa {
    challenge_root: PathBuf,
    state: RefCell<State>,
}

impl FakeCa {
    pub fn new(challenge_root: impl Into<PathBuf>) -> Self {
        Self {
            challenge_root: challenge_root.into(),
            state: RefCell::new(State {
                nonces_issued: 0,
                nonce_budget: None,
                registration_status: StatusCode::CREATED,
                revocation_status: StatusCode::OK,
                offer_http01: true,
                self_check_failures: BTreeMap::new(),
                poll_scripts: BTreeMap::new(),
                stalled: BTreeSet::new(),
                requests: Vec::new(),
                artifacts_at_notify: Vec::new(),
            }),
        }
    }

    pub fn with_registration_status(self, status: StatusCode) -> Self {
        self.state.borrow_mut().registration_status = status;
        self
    }

    pub fn with_revocation_status(self, status: StatusCode) -> Self {
        self.state.borrow_mut().revocation_status = status;
        self
    }

    /// İlk `count` dizin isteğinden sonra `Replay-Nonce` başlığı gönderilmez.
    pub fn stop_nonces_after(self, count: u32) -> Self {
        self.state.borrow_mut().nonce_budget = Some(count);
        self
    }

    pub fn without_http01(self) -> Self {
        self.state.borrow_mut().offer_http01 = false;
        self
    }

    /// İlk `times` erişilebilirlik denetimi 404 alır.
    pub fn fail_self_check(self, domain: &str, times: u32) -> Self {
        self.state
            .borrow_mut()
            .self_check_failures
            .insert(domain.to_owned(), times);
        self
    }

    /// Senaryo tükenince alan adı `valid` döner.
    pub fn script_poll(self, domain: &str, replies: impl IntoIterator<Item = PollReply>) -> Self {
        self.state
            .borrow_mut()
            .poll_scripts
            .insert(domain.to_owned(), replies.into_iter().collect());
        self
    }

    /// Alan adı hiçbir zaman `pending` durumundan çıkmaz.
    pub fn stall(self, domain: &str) -> Self {
        self.state.borrow_mut().stalled.insert(domain.to_owned());
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.borrow().requests.clone()
    }

    pub fn posted_resources(&self) -> Vec<String> {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| request.method == "POST")
            .filter_map(|request| request.resource().map(ToOwned::to_owned))
            .collect()
    }

    pub fn poll_count(&self, domain: &str) -> usize {
        let path = challenge_path(domain);
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| request.method == "GET" && request.url.ends_with(&path))
            .count()
    }

    pub fn self_check_count(&self, domain: &str) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| {
                request.method == "GET"
                    && request.url.starts_with(&format!("http://{domain}/.well-known/"))
            })
            .count()
    }

    /// Challenge bildirimi anında diskte bulunan dosya içerikleri.
    pub fn artifacts_at_notify(&self) -> Vec<(String, String)> {
        self.state.borrow().artifacts_at_notify.clone()
    }

    pub fn nonces_issued(&self) -> u32 {
        self.state.borrow().nonces_issued
    }

    fn issue_nonce(&self) -> HttpResponse {
        let mut state = self.state.borrow_mut();
        if state.nonce_budget == Some(state.nonces_issued) {
            return HttpResponse::new(StatusCode::OK);
        }
        state.nonces_issued += 1;
        let nonce = URL_SAFE_NO_PAD.encode(state.nonces_issued.to_be_bytes());
        HttpResponse::new(StatusCode::OK).with_header(
            HeaderName::from_static("replay-nonce"),
            HeaderValue::from_str(&nonce).expect("nonce header"),
        )
    }

    fn serve_artifact(&self, url: &Url) -> HttpResponse {
        let domain = url.host_str().unwrap_or_default().to_owned();
        {
            let mut state = self.state.borrow_mut();
            if let Some(remaining) = state.self_check_failures.get_mut(&domain) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return HttpResponse::new(StatusCode::NOT_FOUND);
                }
            }
        }
        let token = url
            .path()
            .trim_start_matches("/.well-known/acme-challenge/")
            .to_owned();
        match fs::read(self.challenge_root.join(token)) {
            Ok(body) => HttpResponse::new(StatusCode::OK).with_body(body),
            Err(_) => HttpResponse::new(StatusCode::NOT_FOUND),
        }
    }

    fn poll(&self, domain: &str) -> Result<HttpResponse, TransportError> {
        let reply = {
            let mut state = self.state.borrow_mut();
            if state.stalled.contains(domain) {
                PollReply::Status("pending")
            } else {
                state
                    .poll_scripts
                    .get_mut(domain)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or(PollReply::Status("valid"))
            }
        };
        let mut document = challenge_json(domain, "pending");
        match reply {
            PollReply::Status(status) => document["status"] = json!(status),
            PollReply::Invalid(detail) => {
                document["status"] = json!("invalid");
                document["error"] = json!({
                    "type": "urn:acme:error:unauthorized",
                    "detail": detail,
                });
            }
            PollReply::NetworkFailure => {
                let url = Url::parse(&format!("{CA_BASE}{}", challenge_path(domain)))
                    .expect("challenge url");
                return Err(TransportError::request(
                    &url,
                    io::Error::new(io::ErrorKind::ConnectionReset, "bağlantı koptu"),
                ));
            }
            PollReply::Http(status) => return Ok(HttpResponse::new(status)),
        }
        Ok(json_response(StatusCode::OK, &document))
    }

    fn new_authorization(&self, payload: &Value) -> HttpResponse {
        let domain = payload["identifier"]["value"]
            .as_str()
            .expect("identifier.value")
            .to_owned();
        let offer_http01 = self.state.borrow().offer_http01;
        let mut challenges = vec![json!({
            "type": "dns-01",
            "status": "pending",
            "uri": format!("{CA_BASE}/acme/challenge/dns/{domain}"),
            "token": "dns-token",
        })];
        if offer_http01 {
            challenges.push(challenge_json(&domain, "pending"));
        }
        json_response(
            StatusCode::CREATED,
            &json!({
                "identifier": {"type": "dns", "value": domain},
                "status": "pending",
                "challenges": challenges,
            }),
        )
    }

    fn notify(&self, domain: &str, payload: &Value) -> HttpResponse {
        let key_authorization = payload["keyAuthorization"]
            .as_str()
            .expect("keyAuthorization")
            .to_owned();
        let token = key_authorization
            .split('.')
            .next()
            .unwrap_or_default()
            .to_owned();
        let on_disk = fs::read_to_string(self.challenge_root.join(token)).unwrap_or_default();
        self.state
            .borrow_mut()
            .artifacts_at_notify
            .push((domain.to_owned(), on_disk));
        json_response(StatusCode::ACCEPTED, &challenge_json(domain, "pending"))
    }

    fn record(&self, method: &'static str, url: &Url, payload: Option<Value>, nonce: Option<String>) {
        self.state.borrow_mut().requests.push(Recorded {
            method,
            url: url.to_string(),
            payload,
            nonce,
        });
    }
}

impl Transport for FakeCa {
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.record("GET", url, None, None);
        if url.host_str() != Some("ca.test") {
            return Ok(self.serve_artifact(url));
        }
        if url.path() == "/directory" {
            return Ok(self.issue_nonce());
        }
        if let Some(domain) = url.path().strip_prefix("/acme/challenge/") {
            return self.poll(domain);
        }
        Ok(HttpResponse::new(StatusCode::NOT_FOUND))
    }

    fn post(&self, url: &Url, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let (payload, nonce) = decode_envelope(body);
        self.record("POST", url, Some(payload.clone()), Some(nonce));
        let path = url.path();
        let response = match path {
            "/acme/new-reg" => HttpResponse::new(self.state.borrow().registration_status),
            "/acme/new-authz" => self.new_authorization(&payload),
            "/acme/new-cert" => HttpResponse::new(StatusCode::CREATED).with_body(ISSUED_DER.to_vec()),
            "/acme/revoke-cert" => HttpResponse::new(self.state.borrow().revocation_status),
            _ => match path.strip_prefix("/acme/challenge/") {
                Some(domain) => self.notify(domain, &payload),
                None => HttpResponse::new(StatusCode::NOT_FOUND),
            },
        };
        Ok(response)
    }
}

pub fn token_for(domain: &str) -> String {
    format!("tok_{}", domain.replace('.', "-"))
}

fn challenge_path(domain: &str) -> String {
    format!("/acme/challenge/{domain}")
}

fn challenge_json(domain: &str, status: &str) -> Value {
    json!({
        "type": "http-01",
        "status": status,
        "uri": format!("{CA_BASE}{}", challenge_path(domain)),
        "token": token_for(domain),
    })
}

fn json_response(status: StatusCode, document: &Value) -> HttpResponse {
    HttpResponse::new(status).with_body(serde_json::to_vec(document).expect("json"))
}

/// Zarfın yükünü ve korunan başlıktaki nonce değerini çözer.
pub fn decode_envelope(body: &[u8]) -> (Value, String) {
    let envelope: Value = serde_json::from_slice(body).expect("envelope json");
    let payload = URL_SAFE_NO_PAD
        .decode(envelope["payload"].as_str().expect("payload"))
        .expect("payload base64");
    let protected = URL_SAFE_NO_PAD
        .decode(envelope["protected"].as_str().expect("protected"))
        .expect("protected base64");
    let protected: Value = serde_json::from_slice(&protected).expect("protected json");
    (
        serde_json::from_slice(&payload).expect("payload json"),
        protected["nonce"].as_str().expect("nonce").to_owned(),
    )
}
