use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use x509_parser::prelude::{FromDer, GeneralName, ParsedExtension, X509CertificationRequest};

/// CSR yüklenirken ve alan adları çıkarılırken oluşan hatalar.
#[derive(Debug, Error)]
pub enum CsrError {
    /// CSR dosyası okunamadı.
    #[error("CSR dosyası okunamadı: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// PEM sarmalayıcısı bozuk.
    #[error("CSR PEM belgesi çözülemedi: {0}")]
    InvalidPem(String),
    /// PEM bloğu `CERTIFICATE REQUEST` değil.
    #[error("beklenmeyen PEM etiketi: {0}")]
    UnexpectedTag(String),
    /// PKCS#10 yapısı çözülemedi.
    #[error("CSR DER yapısı ayrıştırılamadı: {0}")]
    InvalidDer(String),
    /// CommonName UTF-8 metin değil.
    #[error("CSR içindeki CommonName okunamadı: {0}")]
    InvalidCommonName(String),
    /// Sertifika istenecek alan adı yok.
    #[error("CSR ne CommonName ne de DNS SubjectAltName içeriyor")]
    NoDomains,
}

/// Sertifika isteği (CSR) ve ondan çıkarılan alan adı kümesi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    der: Vec<u8>,
    domains: BTreeSet<String>,
}

impl CertificateRequest {
    /// PEM (`CERTIFICATE REQUEST` / `NEW CERTIFICATE REQUEST`) ya da ham DER
    /// girdisini kabul eder.
    ///
    /// # Errors
    ///
    /// PEM/DER çözülemezse veya alan adı bulunamazsa `CsrError` döner.
    pub fn from_pem_or_der(bytes: &[u8]) -> Result<Self, CsrError> {
        if bytes.trim_ascii_start().starts_with(b"-----BEGIN") {
            let parsed = pem::parse(bytes).map_err(|err| CsrError::InvalidPem(err.to_string()))?;
            if parsed.tag() != "CERTIFICATE REQUEST" && parsed.tag() != "NEW CERTIFICATE REQUEST" {
                return Err(CsrError::UnexpectedTag(parsed.tag().to_owned()));
            }
            return Self::from_der(parsed.into_contents());
        }
        Self::from_der(bytes.to_vec())
    }

    /// # Errors
    ///
    /// Dosya okunamazsa `CsrError::Read`, içerik geçersizse
    /// [`CertificateRequest::from_pem_or_der`] hataları döner.
    pub fn from_file(path: &Path) -> Result<Self, CsrError> {
        let bytes = fs::read(path).map_err(|source| CsrError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem_or_der(&bytes)
    }

    /// # Errors
    ///
    /// DER yapısı CSR değilse veya alan adı yoksa `CsrError` döner.
    pub fn from_der(der: Vec<u8>) -> Result<Self, CsrError> {
        let domains = extract_domains(&der)?;
        Ok(Self { der, domains })
    }

    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject CN ve DNS SAN girdilerinin tekilleştirilmiş, sıralı kümesi.
    #[must_use]
    pub const fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }
}

fn extract_domains(der: &[u8]) -> Result<BTreeSet<String>, CsrError> {
    let (_, csr) = X509CertificationRequest::from_der(der)
        .map_err(|err| CsrError::InvalidDer(err.to_string()))?;

    let mut domains = BTreeSet::new();
    for attribute in csr.certification_request_info.subject.iter_common_name() {
        let value = attribute
            .as_str()
            .map_err(|err| CsrError::InvalidCommonName(err.to_string()))?;
        domains.insert(value.to_owned());
    }

    if let Some(extensions) = csr.requested_extensions() {
        for extension in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = extension {
                for name in &san.general_names {
                    if let GeneralName::DNSName(dns) = name {
                        domains.insert((*dns).to_owned());
                    }
                }
            }
        }
    }

    if domains.is_empty() {
        return Err(CsrError::NoDomains);
    }
    Ok(domains)
}
