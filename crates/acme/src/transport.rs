use std::borrow::Cow;
use std::error::Error as StdError;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;

/// CA isteklerinde gönderilen `User-Agent` değeri.
pub const USER_AGENT: &str = concat!("tinycert/", env!("CARGO_PKG_VERSION"));

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// HTTP taşıma katmanında oluşan hatalar.
#[derive(Debug, Error)]
pub enum TransportError {
    /// İstek gönderilemedi veya yanıt gövdesi okunamadı.
    #[error("{url} adresine HTTP isteği başarısız oldu: {source}")]
    Request {
        url: String,
        #[source]
        source: BoxedSource,
    },
    /// HTTP istemcisi oluşturulamadı.
    #[error("HTTP istemcisi oluşturulamadı: {0}")]
    Client(#[source] reqwest::Error),
}

impl TransportError {
    /// Herhangi bir hata kaynağını URL bilgisiyle sarmalar.
    pub fn request<E>(url: &Url, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Request {
            url: url.to_string(),
            source: Box::new(source),
        }
    }
}

/// Taşıma katmanından dönen, tamamen okunmuş HTTP yanıtı.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gövdeyi kayıplı UTF-8 dönüşümüyle metin olarak döndürür.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Hata yanıtları için okunabilir bir açıklama üretir.
    ///
    /// ACME problem belgelerinde `detail` alanı tercih edilir; aksi halde
    /// gövdenin ilk satırları kullanılır.
    #[must_use]
    pub fn problem_detail(&self) -> String {
        const LIMIT: usize = 512;

        if let Ok(serde_json::Value::Object(map)) =
            serde_json::from_slice::<serde_json::Value>(&self.body)
        {
            if let Some(detail) = map.get("detail").and_then(serde_json::Value::as_str) {
                return match map.get("type").and_then(serde_json::Value::as_str) {
                    Some(kind) => format!("{kind}: {detail}"),
                    None => detail.to_owned(),
                };
            }
        }

        let text = self.body_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return "(boş gövde)".to_owned();
        }
        trimmed.chars().take(LIMIT).collect()
    }
}

/// CA ile konuşan senkron HTTP sözleşmesi.
///
/// Varsayılan uygulama [`ReqwestTransport`]'tur; testlerde bellek içi bir CA
/// veya farklı bir bağlantı katmanı aynı arayüzle takılabilir.
pub trait Transport {
    /// # Errors
    ///
    /// Bağlantı veya okuma hatasında `TransportError` döner.
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;

    /// JSON gövdesini verilen adrese gönderir.
    ///
    /// # Errors
    ///
    /// Bağlantı veya okuma hatasında `TransportError` döner.
    fn post(&self, url: &Url, body: &[u8]) -> Result<HttpResponse, TransportError>;
}

impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }

    fn post(&self, url: &Url, body: &[u8]) -> Result<HttpResponse, TransportError> {
        (**self).post(url, body)
    }
}

/// `reqwest` engelleyici istemcisi üzerine kurulu taşıma katmanı.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Yapılandırmadaki istek zaman aşımıyla yeni bir istemci oluşturur.
    ///
    /// # Errors
    ///
    /// TLS altyapısı başlatılamazsa `TransportError::Client` döner.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }

    fn read_response(
        url: &Url,
        response: reqwest::blocking::Response,
    ) -> Result<HttpResponse, TransportError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|err| TransportError::request(url, err))?
            .to_vec();
        debug!(%url, status = status.as_u16(), bytes = body.len(), "HTTP yanıtı alındı");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|err| TransportError::request(url, err))?;
        Self::read_response(url, response)
    }

    fn post(&self, url: &Url, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .map_err(|err| TransportError::request(url, err))?;
        Self::read_response(url, response)
    }
}
