use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::validation::Http01Error;

mod batch;

pub use batch::{AuthorizationBatch, AuthorizationState, DomainAuthorization};

/// ACME yetkilendirme belgesini ayrıştırırken oluşabilecek hatalar.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// Gövde JSON değil.
    #[error("ACME authorization belgesi JSON olarak ayrıştırılamadı: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON değeri bir nesne değil.
    #[error("ACME authorization belgesi JSON objesi olmalıdır")]
    NotAnObject,
    /// Zorunlu alan eksik.
    #[error("ACME authorization alanı eksik: {field}")]
    MissingField { field: &'static str },
    /// Alan beklenen türde değil.
    #[error("ACME authorization alanı beklenen türde değil: {field}")]
    InvalidFieldType { field: &'static str },
    /// Authorization durum değeri bilinmeyen bir string.
    #[error("ACME authorization durum değeri geçersiz: {value}")]
    InvalidStatus { value: String },
    /// Identifier `type` alanı desteklenmiyor.
    #[error("ACME authorization identifier türü desteklenmiyor: {value}")]
    UnsupportedIdentifierType { value: String },
    /// Challenge ayrıştırılırken hata oluştu.
    #[error("ACME authorization challenge[{index}] hatası: {source}")]
    Challenge {
        index: usize,
        #[source]
        source: ChallengeError,
    },
    /// Tek başına sorgulanan challenge belgesi geçersiz.
    #[error(transparent)]
    ChallengeDocument(#[from] ChallengeError),
    /// Anahtar yetkilendirmesi oluşturulamadı.
    #[error(transparent)]
    KeyAuthorization(#[from] Http01Error),
}

/// ACME challenge ayrıştırma hataları.
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// Gövde JSON değil.
    #[error("ACME challenge JSON olarak ayrıştırılamadı: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON değeri bir nesne değil.
    #[error("ACME challenge JSON objesi olmalıdır")]
    NotAnObject,
    /// Zorunlu alan eksik.
    #[error("ACME challenge alanı eksik: {field}")]
    MissingField { field: &'static str },
    /// Alan beklenen türde değil.
    #[error("ACME challenge alanı beklenen türde değil: {field}")]
    InvalidFieldType { field: &'static str },
    /// Challenge durum değeri bilinmeyen bir string.
    #[error("ACME challenge durum değeri geçersiz: {value}")]
    InvalidStatus { value: String },
    /// `uri` alanı geçerli bir URL değil.
    #[error("ACME challenge URI'si geçersiz: {source}")]
    InvalidUri {
        #[from]
        source: url::ParseError,
    },
}

/// Authorization kaynağının durumları.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
    Revoked,
    Deactivated,
    Expired,
}

impl AuthorizationStatus {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "valid" => Some(Self::Valid),
            "invalid" => Some(Self::Invalid),
            "revoked" => Some(Self::Revoked),
            "deactivated" => Some(Self::Deactivated),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Revoked => "revoked",
            Self::Deactivated => "deactivated",
            Self::Expired => "expired",
        })
    }
}

/// Challenge durumları.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
}

impl ChallengeStatus {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "valid" => Some(Self::Valid),
            "invalid" => Some(Self::Invalid),
            _ => None,
        }
    }

    /// `valid` veya `invalid` ise `true`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Valid | Self::Invalid)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        })
    }
}

/// ACME v1 challenge türleri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    Http01,
    Dns01,
    TlsSni01,
    Other(String),
}

impl ChallengeKind {
    fn parse(value: &str) -> Self {
        match value {
            "http-01" => Self::Http01,
            "dns-01" => Self::Dns01,
            "tls-sni-01" => Self::TlsSni01,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http01 => "http-01",
            Self::Dns01 => "dns-01",
            Self::TlsSni01 => "tls-sni-01",
            Self::Other(value) => value.as_str(),
        }
    }
}

/// CA'nın sunduğu tek bir challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    kind: ChallengeKind,
    status: ChallengeStatus,
    uri: Url,
    token: Option<String>,
    error_detail: Option<String>,
}

impl Challenge {
    /// Challenge URI'sine yapılan GET yanıtını ayrıştırır.
    ///
    /// # Errors
    ///
    /// Gövde beklenen şemaya uymazsa `ChallengeError` döner.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ChallengeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        parse_challenge(&value)
    }

    #[must_use]
    pub const fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    #[must_use]
    pub const fn status(&self) -> ChallengeStatus {
        self.status
    }

    #[must_use]
    pub const fn uri(&self) -> &Url {
        &self.uri
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// CA'nın `error` nesnesinden okunan açıklama.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }
}

/// `new-authz` yanıtı olarak dönen yetkilendirme belgesi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDocument {
    identifier: String,
    status: AuthorizationStatus,
    challenges: Vec<Challenge>,
}

impl AuthorizationDocument {
    /// # Errors
    ///
    /// JSON objesi zorunlu alanları sağlamazsa veya beklenen türlere
    /// uymuyorsa `AuthorizationError` döndürülür.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, AuthorizationError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(object) = value else {
            return Err(AuthorizationError::NotAnObject);
        };
        Self::from_object(&object)
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self, AuthorizationError> {
        let identifier = match object.get("identifier") {
            Some(value) => parse_identifier(value)?,
            None => return Err(AuthorizationError::MissingField { field: "identifier" }),
        };

        let status_value = match object.get("status") {
            Some(Value::String(value)) => value.clone(),
            Some(_) => return Err(AuthorizationError::InvalidFieldType { field: "status" }),
            None => return Err(AuthorizationError::MissingField { field: "status" }),
        };
        let status = AuthorizationStatus::parse(&status_value).ok_or(
            AuthorizationError::InvalidStatus {
                value: status_value,
            },
        )?;

        let challenges = match object.get("challenges") {
            Some(Value::Array(values)) => values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    parse_challenge(value)
                        .map_err(|source| AuthorizationError::Challenge { index, source })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(AuthorizationError::InvalidFieldType { field: "challenges" }),
            None => return Err(AuthorizationError::MissingField { field: "challenges" }),
        };

        Ok(Self {
            identifier,
            status,
            challenges,
        })
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub const fn status(&self) -> AuthorizationStatus {
        self.status
    }

    #[must_use]
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Sunulan ilk `http-01` challenge'ı; diğer türler yok sayılır.
    #[must_use]
    pub fn http01(&self) -> Option<&Challenge> {
        self.challenges
            .iter()
            .find(|challenge| challenge.kind == ChallengeKind::Http01)
    }
}

fn parse_identifier(value: &Value) -> Result<String, AuthorizationError> {
    let Value::Object(object) = value else {
        return Err(AuthorizationError::InvalidFieldType { field: "identifier" });
    };

    match object.get("type") {
        Some(Value::String(kind)) if kind == "dns" => {}
        Some(Value::String(kind)) => {
            return Err(AuthorizationError::UnsupportedIdentifierType {
                value: kind.clone(),
            })
        }
        Some(_) => return Err(AuthorizationError::InvalidFieldType { field: "identifier.type" }),
        None => return Err(AuthorizationError::MissingField { field: "identifier.type" }),
    }

    match object.get("value") {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(AuthorizationError::InvalidFieldType {
            field: "identifier.value",
        }),
        None => Err(AuthorizationError::MissingField {
            field: "identifier.value",
        }),
    }
}

fn parse_challenge(value: &Value) -> Result<Challenge, ChallengeError> {
    let Value::Object(object) = value else {
        return Err(ChallengeError::NotAnObject);
    };

    let kind = match object.get("type") {
        Some(Value::String(value)) => ChallengeKind::parse(value),
        Some(_) => return Err(ChallengeError::InvalidFieldType { field: "type" }),
        None => return Err(ChallengeError::MissingField { field: "type" }),
    };

    let status_value = match object.get("status") {
        Some(Value::String(value)) => value.clone(),
        Some(_) => return Err(ChallengeError::InvalidFieldType { field: "status" }),
        None => return Err(ChallengeError::MissingField { field: "status" }),
    };
    let status = ChallengeStatus::parse(&status_value).ok_or(ChallengeError::InvalidStatus {
        value: status_value,
    })?;

    // v1 CA'lar `uri` kullanır; `url` yalnızca geri dönüş olarak okunur.
    let uri_value = match object.get("uri").or_else(|| object.get("url")) {
        Some(Value::String(value)) => value,
        Some(_) => return Err(ChallengeError::InvalidFieldType { field: "uri" }),
        None => return Err(ChallengeError::MissingField { field: "uri" }),
    };
    let uri = Url::parse(uri_value)?;

    let token = match object.get("token") {
        Some(Value::String(value)) if !value.is_empty() => Some(value.clone()),
        Some(Value::String(_) | Value::Null) | None => None,
        Some(_) => return Err(ChallengeError::InvalidFieldType { field: "token" }),
    };
    if kind == ChallengeKind::Http01 && token.is_none() {
        return Err(ChallengeError::MissingField { field: "token" });
    }

    let error_detail = match object.get("error") {
        Some(Value::Object(error)) => error
            .get("detail")
            .and_then(Value::as_str)
            .or_else(|| error.get("type").and_then(Value::as_str))
            .map(ToOwned::to_owned),
        _ => None,
    };

    Ok(Challenge {
        kind,
        status,
        uri,
        token,
        error_detail,
    })
}
