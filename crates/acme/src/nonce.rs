use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use http::header::{HeaderMap, ToStrError};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::{AcmeError, Step};
use crate::transport::Transport;

/// ACME protokolünde kullanılan `Replay-Nonce` başlığının adı.
pub const REPLAY_NONCE_HEADER: &str = "Replay-Nonce";

/// Nonce doğrulama hataları.
#[derive(Debug, Error)]
pub enum NonceError {
    /// CA yanıtı `Replay-Nonce` başlığı içermiyor.
    #[error("CA yanıtında Replay-Nonce başlığı bulunamadı")]
    Missing,
    /// Boş bir nonce değeri ile karşılaşıldı.
    #[error("Replay-Nonce değeri boş olamaz")]
    Empty,
    /// Nonce base64url (padding'siz) formatında değil.
    #[error("Replay-Nonce değeri base64url olarak ayrıştırılamadı: {source}")]
    InvalidBase64 {
        #[source]
        source: base64::DecodeError,
    },
    /// HTTP başlığındaki nonce UTF-8 olarak çözümlenemedi.
    #[error("Replay-Nonce HTTP başlığı UTF-8 olarak çözümlenemedi: {source}")]
    InvalidHeaderEncoding {
        #[source]
        source: ToStrError,
    },
}

/// CA tarafından döndürülen, tek kullanımlık base64url kodlu nonce değeri.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplayNonce(String);

impl ReplayNonce {
    /// Metinsel bir değerden nonce üretir ve base64url uygunluğunu doğrular.
    ///
    /// # Errors
    ///
    /// * `NonceError::Empty` - değer yalnızca boşluklardan oluştuğunda.
    /// * `NonceError::InvalidBase64` - değer base64url olarak çözümlenemediğinde.
    pub fn parse<S: AsRef<str>>(value: S) -> Result<Self, NonceError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(NonceError::Empty);
        }

        URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|source| NonceError::InvalidBase64 { source })?;

        Ok(Self(trimmed.to_owned()))
    }

    /// HTTP başlıklarındaki `Replay-Nonce` değerini ayrıştırır.
    ///
    /// # Errors
    ///
    /// Başlık yoksa `NonceError::Missing`, değer hatalıysa ilgili varyant döner.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, NonceError> {
        let value = headers
            .get(REPLAY_NONCE_HEADER)
            .ok_or(NonceError::Missing)?;
        let as_str = value
            .to_str()
            .map_err(|source| NonceError::InvalidHeaderEncoding { source })?;
        Self::parse(as_str)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for ReplayNonce {
    type Err = NonceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Dizin uç noktasına tek bir GET isteği göndererek taze bir nonce alır.
///
/// Nonce değerleri önbelleğe alınmaz; her imzalı istek kendi nonce'unu
/// imzalamadan hemen önce çeker. `step`, nonce'un hazırlandığı imzalı isteği
/// adlandırır ve hata mesajlarına taşınır.
///
/// # Errors
///
/// Ağ hatasında `AcmeError::Transport`, başlık eksik veya hatalıysa
/// `AcmeError::Nonce` döner.
pub fn fetch_nonce<T>(
    transport: &T,
    directory_url: &Url,
    step: &Step,
) -> Result<ReplayNonce, AcmeError>
where
    T: Transport + ?Sized,
{
    let response = transport
        .get(directory_url)
        .map_err(|source| AcmeError::Transport {
            step: step.clone(),
            source,
        })?;
    let nonce =
        ReplayNonce::from_headers(&response.headers).map_err(|source| AcmeError::Nonce {
            step: step.clone(),
            source,
        })?;
    debug!(url = %directory_url, nonce = nonce.as_str(), "taze Replay-Nonce alındı");
    Ok(nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpResponse, TransportError};
    use http::header::HeaderValue;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct StubTransport {
        responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        calls: RefCell<usize>,
    }

    impl StubTransport {
        fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl Transport for StubTransport {
        fn get(&self, _url: &Url) -> Result<HttpResponse, TransportError> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop_front()
                .expect("beklenmeyen GET isteği")
        }

        fn post(&self, _url: &Url, _body: &[u8]) -> Result<HttpResponse, TransportError> {
            panic!("nonce alımı POST göndermemeli")
        }
    }

    fn directory_response(nonce: &str) -> HttpResponse {
        HttpResponse::new(StatusCode::OK).with_header(
            http::header::HeaderName::from_static("replay-nonce"),
            HeaderValue::from_str(nonce).unwrap(),
        )
    }

    fn sample_url() -> Url {
        Url::parse("https://ca.example/directory").unwrap()
    }

    #[test]
    fn replay_nonce_accepts_base64url_value() {
        let nonce = ReplayNonce::parse("  z9lqO7iAJ6T4tO4Hq8xPRA ").expect("nonce");
        assert_eq!(nonce.as_str(), "z9lqO7iAJ6T4tO4Hq8xPRA");
        assert_eq!(nonce.into_inner(), "z9lqO7iAJ6T4tO4Hq8xPRA");
    }

    #[test]
    fn replay_nonce_rejects_padding_and_blank() {
        assert!(matches!(
            ReplayNonce::parse("abc="),
            Err(NonceError::InvalidBase64 { .. })
        ));
        assert!(matches!(ReplayNonce::parse("   "), Err(NonceError::Empty)));
    }

    #[test]
    fn fetch_nonce_reads_header_from_directory_get() {
        let stub = StubTransport::new(vec![Ok(directory_response("AAECAwQ"))]);
        let nonce = fetch_nonce(&stub, &sample_url(), &Step::Registration).expect("nonce");
        assert_eq!(nonce.as_str(), "AAECAwQ");
        assert_eq!(stub.call_count(), 1);
    }

    #[test]
    fn consecutive_fetches_never_reuse_a_nonce() {
        let stub = StubTransport::new(vec![
            Ok(directory_response("AAECAwQ")),
            Ok(directory_response("BQYHCAk")),
        ]);
        let first = fetch_nonce(&stub, &sample_url(), &Step::Registration).expect("first");
        let second = fetch_nonce(&stub, &sample_url(), &Step::Registration).expect("second");
        assert_ne!(first, second);
        assert_eq!(stub.call_count(), 2);
    }

    #[test]
    fn missing_header_is_a_protocol_error() {
        let stub = StubTransport::new(vec![Ok(HttpResponse::new(StatusCode::OK))]);
        let step = Step::NewAuthorization("a.example".into());
        let err = fetch_nonce(&stub, &sample_url(), &step).expect_err("missing header");
        assert!(matches!(
            &err,
            AcmeError::Nonce {
                step: Step::NewAuthorization(domain),
                source: NonceError::Missing,
            } if domain == "a.example"
        ));
        assert!(err.to_string().contains("a.example"));
        assert_eq!(err.kind(), crate::error::ErrorKind::Protocol);
    }

    #[test]
    fn transport_failure_is_reported_with_step() {
        let url = sample_url();
        let failure = TransportError::request(
            &url,
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        );
        let stub = StubTransport::new(vec![Err(failure)]);
        let err = fetch_nonce(&stub, &url, &Step::NewCertificate).expect_err("transport failure");
        assert!(matches!(
            err,
            AcmeError::Transport {
                step: Step::NewCertificate,
                ..
            }
        ));
    }
}
