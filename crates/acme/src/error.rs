use std::fmt;
use std::io;
use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

use crate::authorization::AuthorizationError;
use crate::certificate::CertificateError;
use crate::config::ConfigError;
use crate::csr::CsrError;
use crate::directory::DirectoryError;
use crate::jws::KeyError;
use crate::nonce::NonceError;
use crate::transport::TransportError;

/// Hataların kabaca hangi katmandan geldiğini belirten sınıflandırma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Hesap anahtarı okunamadı veya imza üretilemedi.
    Key,
    /// Ağ hatası veya yerel deneme bütçesinin tükenmesi.
    Transport,
    /// CA beklenmeyen bir durum kodu ya da bozuk bir belge döndürdü.
    Protocol,
    /// CA bir alan adı doğrulamasını geçersiz ilan etti.
    Validation,
    /// Kullanıcının sağladığı girdi (CSR, sertifika, dizin) kullanılamaz.
    Input,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Validation => "validation",
            Self::Input => "input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hata mesajlarında başarısız olan protokol adımını adlandırır.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `new-reg`.
    Registration,
    /// Alan adı için `new-authz`.
    NewAuthorization(String),
    /// Alan adının challenge bildirimi.
    ChallengeResponse(String),
    /// Alan adının challenge durum sorgusu.
    ChallengePoll(String),
    /// `new-cert`.
    NewCertificate,
    /// `revoke-cert`.
    Revocation,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => f.write_str("hesap kaydı"),
            Self::NewAuthorization(domain) => write!(f, "{domain} için yetkilendirme isteği"),
            Self::ChallengeResponse(domain) => write!(f, "{domain} için challenge bildirimi"),
            Self::ChallengePoll(domain) => write!(f, "{domain} için challenge sorgusu"),
            Self::NewCertificate => f.write_str("sertifika isteği"),
            Self::Revocation => f.write_str("sertifika iptali"),
        }
    }
}

/// İstemcinin dışarıya döndürdüğü üst düzey hata türü.
#[derive(Debug, Error)]
pub enum AcmeError {
    /// Hesap anahtarı veya imza hatası.
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Csr(#[from] CsrError),
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    /// İstek CA'ya ulaşamadı.
    #[error("{step} başarısız oldu")]
    Transport {
        step: Step,
        #[source]
        source: TransportError,
    },
    /// İmzalı istekten önce alınan nonce kullanılamadı.
    #[error("{step}: CA nonce yanıtı kullanılamadı")]
    Nonce {
        step: Step,
        #[source]
        source: NonceError,
    },
    /// CA adım için beklenmeyen bir durum kodu döndürdü.
    #[error("{step}: CA beklenmeyen HTTP {status} yanıtı döndürdü: {detail}")]
    UnexpectedStatus {
        step: Step,
        status: StatusCode,
        detail: String,
    },
    /// CA yanıt gövdesi bozuk.
    #[error("{step}: CA yanıtı ayrıştırılamadı")]
    MalformedResponse {
        step: Step,
        #[source]
        source: AuthorizationError,
    },
    /// Yetkilendirme http-01 challenge'ı içermiyor.
    #[error("{domain} için CA http-01 challenge'ı sunmadı")]
    NoHttpChallenge { domain: String },
    /// Alan adı ile geçerli bir challenge URL'si kurulamadı.
    #[error("{domain} alan adı için challenge adresi oluşturulamadı")]
    InvalidDomain {
        domain: String,
        #[source]
        source: url::ParseError,
    },
    /// Challenge dosyası yazılamadı.
    #[error("{domain} için challenge dosyası yazılamadı: {}", .path.display())]
    Publish {
        domain: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Kullanıcı manuel onayı vermedi.
    #[error("{domain} için manuel onay alınamadı: {reason}")]
    ConfirmationDeclined { domain: String, reason: String },
    /// Erişilebilirlik denetimi deneme bütçesini tüketti.
    #[error("{domain} challenge dosyası {attempts} denemede doğrulanamadı: {last_failure}")]
    SelfCheckFailed {
        domain: String,
        attempts: u32,
        last_failure: String,
    },
    /// CA alan adını `invalid` ilan etti.
    #[error("{domain} alan adı doğrulaması CA tarafından reddedildi: {detail}")]
    AuthorizationInvalid { domain: String, detail: String },
    /// Sorgu turları bitti, bekleyen alan adları kaldı.
    #[error("{attempts} sorgu turunda doğrulama tamamlanmadı; bekleyen alan adları: {}", .pending.join(", "))]
    PollBudgetExhausted { attempts: u32, pending: Vec<String> },
}

impl AcmeError {
    /// Hatanın sınıfını döndürür.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Key(_) => ErrorKind::Key,
            Self::Transport { .. } | Self::SelfCheckFailed { .. } | Self::PollBudgetExhausted { .. } => {
                ErrorKind::Transport
            }
            Self::Nonce { .. }
            | Self::UnexpectedStatus { .. }
            | Self::MalformedResponse { .. }
            | Self::NoHttpChallenge { .. } => ErrorKind::Protocol,
            Self::AuthorizationInvalid { .. } => ErrorKind::Validation,
            Self::Config(_)
            | Self::Directory(_)
            | Self::Csr(_)
            | Self::Certificate(_)
            | Self::InvalidDomain { .. }
            | Self::Publish { .. }
            | Self::ConfirmationDeclined { .. } => ErrorKind::Input,
        }
    }

    pub(crate) fn unexpected_status(step: Step, response: &crate::transport::HttpResponse) -> Self {
        Self::UnexpectedStatus {
            step,
            status: response.status,
            detail: response.problem_detail(),
        }
    }
}
