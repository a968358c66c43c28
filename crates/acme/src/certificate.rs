use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pem::{EncodeConfig, LineEnding, Pem};
use thiserror::Error;

/// Sertifika dosyası okunurken oluşan hatalar.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// Sertifika dosyası okunamadı.
    #[error("sertifika dosyası okunamadı: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// PEM sarmalayıcısı bozuk.
    #[error("sertifika PEM belgesi çözülemedi: {0}")]
    InvalidPem(String),
    /// PEM belgesinde sertifika bloğu yok.
    #[error("PEM belgesinde CERTIFICATE bloğu bulunamadı")]
    MissingCertificate,
    /// DER içeriği boş.
    #[error("sertifika içeriği boş")]
    Empty,
}

/// DER kodlu X.509 sertifikası; CA'dan dönen veya iptal için okunan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDer(Vec<u8>);

impl CertificateDer {
    /// # Errors
    ///
    /// `der` boşsa `CertificateError::Empty` döner.
    pub fn new(der: Vec<u8>) -> Result<Self, CertificateError> {
        if der.is_empty() {
            return Err(CertificateError::Empty);
        }
        Ok(Self(der))
    }

    /// PEM girdisinde ilk `CERTIFICATE` bloğunu, aksi halde ham DER'i kullanır.
    ///
    /// # Errors
    ///
    /// PEM çözülemezse veya sertifika bloğu yoksa `CertificateError` döner.
    pub fn from_pem_or_der(bytes: &[u8]) -> Result<Self, CertificateError> {
        let start = bytes
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        if !bytes[start..].starts_with(b"-----BEGIN") {
            return Self::new(bytes.to_vec());
        }

        let sections =
            pem::parse_many(bytes).map_err(|err| CertificateError::InvalidPem(err.to_string()))?;
        let first = sections
            .into_iter()
            .find(|section| section.tag() == "CERTIFICATE")
            .ok_or(CertificateError::MissingCertificate)?;
        Self::new(first.into_contents())
    }

    /// # Errors
    ///
    /// Dosya okunamazsa `CertificateError::Read` döner.
    pub fn from_file(path: &Path) -> Result<Self, CertificateError> {
        let bytes = fs::read(path).map_err(|source| CertificateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem_or_der(&bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Standart base64, 64 sütun ve LF satır sonlarıyla PEM çıktısı.
    #[must_use]
    pub fn to_pem(&self) -> String {
        pem::encode_config(
            &Pem::new("CERTIFICATE", self.0.clone()),
            EncodeConfig::new().set_line_ending(LineEnding::LF),
        )
    }
}
