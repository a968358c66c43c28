use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const PRODUCTION_BASE: &str = "https://acme-v01.api.letsencrypt.org";
const STAGING_BASE: &str = "https://acme-staging.api.letsencrypt.org";
const DEFAULT_AGREEMENT: &str =
    "https://letsencrypt.org/documents/LE-SA-v1.2-November-15-2017.pdf";

/// İstemci yapılandırması doğrulanırken oluşabilecek hatalar.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// URL alanı ayrıştırılamadı.
    #[error("{field} URL değeri geçersiz ({value}): {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    /// Yalnızca `http` ve `https` şemaları desteklenir.
    #[error("{field} URL şeması desteklenmiyor: {scheme}")]
    UnsupportedScheme { field: &'static str, scheme: String },
    /// Deneme bütçesi sıfır olarak ayarlandı.
    #[error("{budget} deneme sayısı en az 1 olmalıdır")]
    ZeroAttempts { budget: &'static str },
    /// Bilinmeyen CA ortam adı.
    #[error("bilinmeyen CA ortamı: {0}")]
    UnknownEnvironment(String),
}

/// Önceden tanımlı Let's Encrypt v1 uç noktaları.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaEnvironment {
    #[default]
    Production,
    Staging,
}

impl CaEnvironment {
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_BASE,
            Self::Staging => STAGING_BASE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
        }
    }
}

impl fmt::Display for CaEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaEnvironment {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            other => Err(ConfigError::UnknownEnvironment(other.to_owned())),
        }
    }
}

/// ACME istemcisinin tüm bileşenlerine açıkça aktarılan çalışma zamanı ayarları.
///
/// Süreç genelinde paylaşılan bir durum yoktur; CA adresi, deneme bütçeleri ve
/// zaman aşımları bu değer üzerinden taşınır.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    ca_base: Url,
    agreement: Url,
    self_check_attempts: u32,
    self_check_delay: Duration,
    poll_attempts: u32,
    poll_interval: Duration,
    request_timeout: Duration,
    challenge_port: u16,
}

impl ClientConfig {
    pub const DEFAULT_SELF_CHECK_ATTEMPTS: u32 = 5;
    pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_CHALLENGE_PORT: u16 = 80;

    /// Verilen CA kök adresi için varsayılan bütçelerle yapılandırma üretir.
    ///
    /// # Errors
    ///
    /// Sözleşme URL'si ayrıştırılamazsa `ConfigError::InvalidUrl` döner.
    pub fn new(ca_base: Url) -> Result<Self, ConfigError> {
        ensure_http_scheme("ca", &ca_base)?;
        Ok(Self {
            ca_base,
            agreement: parse_url("agreement", DEFAULT_AGREEMENT)?,
            self_check_attempts: Self::DEFAULT_SELF_CHECK_ATTEMPTS,
            self_check_delay: Self::DEFAULT_RETRY_DELAY,
            poll_attempts: Self::DEFAULT_POLL_ATTEMPTS,
            poll_interval: Self::DEFAULT_RETRY_DELAY,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            challenge_port: Self::DEFAULT_CHALLENGE_PORT,
        })
    }

    /// Let's Encrypt üretim veya test ortamı için yapılandırma üretir.
    ///
    /// # Errors
    ///
    /// Sabit URL'ler ayrıştırılamazsa `ConfigError::InvalidUrl` döner.
    pub fn for_environment(environment: CaEnvironment) -> Result<Self, ConfigError> {
        Self::new(parse_url("ca", environment.base_url())?)
    }

    /// Metin olarak verilen CA kök adresinden yapılandırma üretir.
    ///
    /// # Errors
    ///
    /// Adres geçerli bir `http`/`https` URL'si değilse hata döner.
    pub fn from_base_str(value: &str) -> Result<Self, ConfigError> {
        Self::new(parse_url("ca", value.trim())?)
    }

    #[must_use]
    pub fn with_agreement(mut self, agreement: Url) -> Self {
        self.agreement = agreement;
        self
    }

    /// Kendi kendine erişilebilirlik denetimi bütçesini ayarlar.
    ///
    /// # Errors
    ///
    /// `attempts` sıfırsa `ConfigError::ZeroAttempts` döner.
    pub fn with_self_check(mut self, attempts: u32, delay: Duration) -> Result<Self, ConfigError> {
        if attempts == 0 {
            return Err(ConfigError::ZeroAttempts {
                budget: "self-check",
            });
        }
        self.self_check_attempts = attempts;
        self.self_check_delay = delay;
        Ok(self)
    }

    /// Tüm alan adları için ortak sorgulama bütçesini ayarlar.
    ///
    /// # Errors
    ///
    /// `attempts` sıfırsa `ConfigError::ZeroAttempts` döner.
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Result<Self, ConfigError> {
        if attempts == 0 {
            return Err(ConfigError::ZeroAttempts { budget: "polling" });
        }
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        Ok(self)
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_challenge_port(mut self, port: u16) -> Self {
        self.challenge_port = port;
        self
    }

    #[must_use]
    pub const fn ca_base(&self) -> &Url {
        &self.ca_base
    }

    #[must_use]
    pub const fn agreement(&self) -> &Url {
        &self.agreement
    }

    #[must_use]
    pub const fn self_check_attempts(&self) -> u32 {
        self.self_check_attempts
    }

    #[must_use]
    pub const fn self_check_delay(&self) -> Duration {
        self.self_check_delay
    }

    #[must_use]
    pub const fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub const fn challenge_port(&self) -> u16 {
        self.challenge_port
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_owned(),
        source,
    })?;
    ensure_http_scheme(field, &url)?;
    Ok(url)
}

fn ensure_http_scheme(field: &'static str, url: &Url) -> Result<(), ConfigError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::UnsupportedScheme {
            field,
            scheme: other.to_owned(),
        }),
    }
}
