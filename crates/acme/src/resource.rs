use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::ser::{Serialize, Serializer};
use serde::Serialize as DeriveSerialize;
use thiserror::Error;
use url::Url;

use crate::validation::KeyAuthorization;

/// Hesap iletişim bilgisi hataları.
#[derive(Debug, Error)]
pub enum AccountContactError {
    #[error("ACME hesap e-posta adresi geçersiz: {value}")]
    InvalidEmail { value: String },
}

/// `mailto:` URI'si olarak gönderilen hesap iletişim adresi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContact {
    uri: String,
}

impl AccountContact {
    /// E-posta adresinden iletişim girdisi oluşturur; `mailto:` öneki
    /// verilmişse korunur, alan adı küçük harfe çevrilir.
    ///
    /// # Errors
    ///
    /// Adres tek bir `@` içermiyorsa, boşluk barındırıyorsa veya yerel kısım
    /// ya da alan adı boşsa `AccountContactError::InvalidEmail` döner.
    pub fn email(address: &str) -> Result<Self, AccountContactError> {
        let trimmed = address.trim();
        let bare = trimmed.strip_prefix("mailto:").unwrap_or(trimmed);
        let invalid = || AccountContactError::InvalidEmail {
            value: trimmed.to_owned(),
        };

        if bare.chars().any(char::is_whitespace) || bare.matches('@').count() != 1 {
            return Err(invalid());
        }
        let (local, domain) = bare.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
            return Err(invalid());
        }

        Ok(Self {
            uri: format!("mailto:{local}@{}", domain.to_ascii_lowercase()),
        })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Serialize for AccountContact {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.uri)
    }
}

impl fmt::Display for AccountContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Yetkilendirme isteğinde doğrulanacak tanımlayıcı.
#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
}

impl Identifier {
    #[must_use]
    pub fn dns(domain: &str) -> Self {
        Self {
            kind: "dns",
            value: domain.to_owned(),
        }
    }
}

/// Her ACME v1 çağrısının imzalanan yükü.
///
/// Her varyant kendi zorunlu alanlarını taşır ve `resource` etiketiyle
/// serileştirilir.
#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
#[serde(tag = "resource")]
pub enum AcmeResource {
    #[serde(rename = "new-reg")]
    NewRegistration {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        contact: Vec<AccountContact>,
        agreement: String,
    },
    #[serde(rename = "new-authz")]
    NewAuthorization { identifier: Identifier },
    #[serde(rename = "challenge")]
    ChallengeResponse {
        #[serde(rename = "keyAuthorization")]
        key_authorization: String,
    },
    #[serde(rename = "new-cert")]
    NewCertificate { csr: String },
    #[serde(rename = "revoke-cert")]
    RevokeCertificate { certificate: String },
}

impl AcmeResource {
    #[must_use]
    pub fn new_registration(contact: Option<&AccountContact>, agreement: &Url) -> Self {
        Self::NewRegistration {
            contact: contact.into_iter().cloned().collect(),
            agreement: agreement.to_string(),
        }
    }

    #[must_use]
    pub fn new_authorization(domain: &str) -> Self {
        Self::NewAuthorization {
            identifier: Identifier::dns(domain),
        }
    }

    #[must_use]
    pub fn challenge_response(key_authorization: &KeyAuthorization) -> Self {
        Self::ChallengeResponse {
            key_authorization: key_authorization.as_str().to_owned(),
        }
    }

    #[must_use]
    pub fn new_certificate(csr_der: &[u8]) -> Self {
        Self::NewCertificate {
            csr: URL_SAFE_NO_PAD.encode(csr_der),
        }
    }

    #[must_use]
    pub fn revoke_certificate(certificate_der: &[u8]) -> Self {
        Self::RevokeCertificate {
            certificate: URL_SAFE_NO_PAD.encode(certificate_der),
        }
    }

    /// `resource` alanının değeri.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewRegistration { .. } => "new-reg",
            Self::NewAuthorization { .. } => "new-authz",
            Self::ChallengeResponse { .. } => "challenge",
            Self::NewCertificate { .. } => "new-cert",
            Self::RevokeCertificate { .. } => "revoke-cert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn email_contact_normalizes_domain() {
        let contact = AccountContact::email(" Admin@Example.COM ").expect("contact");
        assert_eq!(contact.uri(), "mailto:Admin@example.com");
        let prefixed = AccountContact::email("mailto:ops@example.org").expect("contact");
        assert_eq!(prefixed.to_string(), "mailto:ops@example.org");
    }

    #[test]
    fn email_contact_rejects_invalid() {
        for value in ["", "no-at-sign", "a@@b", "@example.com", "ops@", "o ps@example.com"] {
            assert!(AccountContact::email(value).is_err(), "{value:?} kabul edilmemeli");
        }
    }

    #[test]
    fn registration_payload_matches_wire_format() {
        let agreement = Url::parse("https://ca.example/terms.pdf").unwrap();
        let contact = AccountContact::email("ops@example.com").unwrap();
        let resource = AcmeResource::new_registration(Some(&contact), &agreement);
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "resource": "new-reg",
                "contact": ["mailto:ops@example.com"],
                "agreement": "https://ca.example/terms.pdf"
            })
        );

        let anonymous = AcmeResource::new_registration(None, &agreement);
        assert_eq!(
            serde_json::to_value(&anonymous).unwrap(),
            json!({"resource": "new-reg", "agreement": "https://ca.example/terms.pdf"})
        );
    }

    #[test]
    fn authorization_and_challenge_payloads() {
        assert_eq!(
            serde_json::to_value(AcmeResource::new_authorization("www.example.com")).unwrap(),
            json!({"resource": "new-authz", "identifier": {"type": "dns", "value": "www.example.com"}})
        );

        let key_authorization = KeyAuthorization::new("tok", "thumb").unwrap();
        assert_eq!(
            serde_json::to_value(AcmeResource::challenge_response(&key_authorization)).unwrap(),
            json!({"resource": "challenge", "keyAuthorization": "tok.thumb"})
        );
    }

    #[test]
    fn binary_fields_use_unpadded_base64url() {
        let csr = AcmeResource::new_certificate(&[0xfb, 0xff]);
        assert_eq!(
            serde_json::to_value(&csr).unwrap(),
            json!({"resource": "new-cert", "csr": "-_8"})
        );
        let revoke = AcmeResource::revoke_certificate(&[0x30, 0x82]);
        assert_eq!(revoke.name(), "revoke-cert");
        assert_eq!(
            serde_json::to_value(&revoke).unwrap(),
            json!({"resource": "revoke-cert", "certificate": "MII"})
        );
    }
}
