use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// CA directory belgesi ayrıştırma hataları.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Gövde JSON değil.
    #[error("directory belgesi JSON olarak ayrıştırılamadı: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON değeri bir nesne değil.
    #[error("directory belgesi bir JSON objesi olmalı")]
    NotAnObject,
    /// Uç nokta değeri URL olarak ayrıştırılamadı.
    #[error("`{field}` uç noktası geçersiz URL ({value}): {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    /// Uç nokta değeri string değil.
    #[error("`{field}` alanı string tipinde olmalı")]
    InvalidUrlType { field: &'static str },
}

/// ACME v1 CA'larının yayımladığı uç noktalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KnownEndpoint {
    Directory,
    NewRegistration,
    NewAuthorization,
    NewCertificate,
    RevokeCertificate,
}

impl KnownEndpoint {
    pub const ALL: [Self; 5] = [
        Self::Directory,
        Self::NewRegistration,
        Self::NewAuthorization,
        Self::NewCertificate,
        Self::RevokeCertificate,
    ];

    /// Directory belgesindeki anahtar adı.
    #[must_use]
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::NewRegistration => "new-reg",
            Self::NewAuthorization => "new-authz",
            Self::NewCertificate => "new-cert",
            Self::RevokeCertificate => "revoke-cert",
        }
    }

    /// CA kök adresine eklenen varsayılan yol.
    #[must_use]
    pub const fn default_path(self) -> &'static str {
        match self {
            Self::Directory => "/directory",
            Self::NewRegistration => "/acme/new-reg",
            Self::NewAuthorization => "/acme/new-authz",
            Self::NewCertificate => "/acme/new-cert",
            Self::RevokeCertificate => "/acme/revoke-cert",
        }
    }
}

/// Bir CA için çözümlenmiş uç nokta adresleri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcmeDirectory {
    pub directory: Url,
    pub new_reg: Url,
    pub new_authz: Url,
    pub new_cert: Url,
    pub revoke_cert: Url,
}

impl AcmeDirectory {
    /// Uç noktaları CA kök adresine varsayılan yolları ekleyerek türetir.
    ///
    /// Kök adresin sonundaki `/` karakterleri atılır; böylece
    /// `https://ca.example/` ve `https://ca.example` aynı sonucu verir.
    ///
    /// # Errors
    ///
    /// Birleştirilen adres ayrıştırılamazsa `DirectoryError::InvalidUrl` döner.
    pub fn from_base(base: &Url) -> Result<Self, DirectoryError> {
        Ok(Self {
            directory: default_endpoint(base, KnownEndpoint::Directory)?,
            new_reg: default_endpoint(base, KnownEndpoint::NewRegistration)?,
            new_authz: default_endpoint(base, KnownEndpoint::NewAuthorization)?,
            new_cert: default_endpoint(base, KnownEndpoint::NewCertificate)?,
            revoke_cert: default_endpoint(base, KnownEndpoint::RevokeCertificate)?,
        })
    }

    /// CA'nın yayımladığı v1 directory belgesini uygular.
    ///
    /// Belgede bulunmayan anahtarlar için kök adrese göre varsayılan yollar
    /// kullanılır. Nonce alımı her zaman `directory` adresine yapılır.
    ///
    /// # Errors
    ///
    /// JSON geçersizse ya da bir uç nokta string/URL değilse
    /// `DirectoryError` döner.
    pub fn from_json_slice(base: &Url, bytes: &[u8]) -> Result<Self, DirectoryError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(map) = value else {
            return Err(DirectoryError::NotAnObject);
        };

        let mut directory = Self::from_base(base)?;
        for endpoint in KnownEndpoint::ALL {
            if let Some(url) = parse_optional_url(&map, endpoint)? {
                *directory.endpoint_mut(endpoint) = url;
            }
        }
        Ok(directory)
    }

    #[must_use]
    pub const fn endpoint(&self, endpoint: KnownEndpoint) -> &Url {
        match endpoint {
            KnownEndpoint::Directory => &self.directory,
            KnownEndpoint::NewRegistration => &self.new_reg,
            KnownEndpoint::NewAuthorization => &self.new_authz,
            KnownEndpoint::NewCertificate => &self.new_cert,
            KnownEndpoint::RevokeCertificate => &self.revoke_cert,
        }
    }

    fn endpoint_mut(&mut self, endpoint: KnownEndpoint) -> &mut Url {
        match endpoint {
            KnownEndpoint::Directory => &mut self.directory,
            KnownEndpoint::NewRegistration => &mut self.new_reg,
            KnownEndpoint::NewAuthorization => &mut self.new_authz,
            KnownEndpoint::NewCertificate => &mut self.new_cert,
            KnownEndpoint::RevokeCertificate => &mut self.revoke_cert,
        }
    }
}

fn default_endpoint(base: &Url, endpoint: KnownEndpoint) -> Result<Url, DirectoryError> {
    let value = format!(
        "{}{}",
        base.as_str().trim_end_matches('/'),
        endpoint.default_path()
    );
    Url::parse(&value).map_err(|source| DirectoryError::InvalidUrl {
        field: endpoint.as_key(),
        value,
        source,
    })
}

fn parse_optional_url(
    map: &Map<String, Value>,
    endpoint: KnownEndpoint,
) -> Result<Option<Url>, DirectoryError> {
    let field = endpoint.as_key();
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Url::parse(value)
            .map(Some)
            .map_err(|source| DirectoryError::InvalidUrl {
                field,
                value: value.clone(),
                source,
            }),
        Some(_) => Err(DirectoryError::InvalidUrlType { field }),
    }
}
