use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rsa::errors::Error as RsaError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use signature::Error as SignatureError;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::nonce::ReplayNonce;

/// Hesap anahtarı yüklenirken veya imza üretilirken oluşan hatalar.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Anahtar dosyası okunamadı.
    #[error("hesap anahtarı okunamadı: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// PEM belgesi PKCS#1 veya PKCS#8 RSA anahtarı değil.
    #[error("hesap anahtarı PKCS#1 veya PKCS#8 RSA PEM belgesi olarak çözülemedi: {0}")]
    Malformed(String),
    /// RSA anahtarı doğrulama kontrollerinden geçemedi.
    #[error("ACME RSA anahtarı geçersiz: {0}")]
    InvalidRsaKey(#[from] RsaError),
    /// İmza üretimi sırasında hata oluştu.
    #[error("ACME JWS imzası üretilemedi: {0}")]
    Signature(#[from] SignatureError),
    /// Başlık veya yük JSON olarak serileştirilemedi.
    #[error("ACME JWS içeriği serileştirilemedi: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Yalnızca zorunlu üyeleri taşıyan JSON Web Key.
///
/// Üyeler sıralı tutulduğundan serileştirilmiş hali RFC 7638 kanonik
/// biçimiyle aynıdır.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jwk(BTreeMap<String, String>);

impl Jwk {
    /// RSA modülü ve üssünden (büyük-endian) JWK üretir.
    #[must_use]
    pub fn rsa(modulus: &[u8], exponent: &[u8]) -> Self {
        let mut members = BTreeMap::new();
        members.insert("e".to_owned(), URL_SAFE_NO_PAD.encode(exponent));
        members.insert("kty".to_owned(), "RSA".to_owned());
        members.insert("n".to_owned(), URL_SAFE_NO_PAD.encode(modulus));
        Self(members)
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// RFC 7638 thumbprint değerini üretir.
    ///
    /// # Errors
    ///
    /// Kanonik JSON üretilemezse `KeyError::Encoding` döner.
    pub fn thumbprint(&self) -> Result<String, KeyError> {
        let canonical = serde_json::to_vec(&self.0)?;
        Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical)))
    }
}

/// ACME isteklerini imzalayan hesap anahtarı arka ucu.
pub trait AccountSigner {
    /// JWS `alg` değeri.
    fn algorithm(&self) -> &'static str;

    /// Açık anahtarın JWK gösterimi.
    fn jwk(&self) -> Jwk;

    /// Verilen imza girdisini imzalar.
    ///
    /// # Errors
    ///
    /// İmza üretilemezse `KeyError` döner.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError>;

    /// Hesap anahtarının JWK thumbprint değeri.
    ///
    /// # Errors
    ///
    /// Kanonik JSON üretilemezse `KeyError::Encoding` döner.
    fn thumbprint(&self) -> Result<String, KeyError> {
        self.jwk().thumbprint()
    }
}

impl<S> AccountSigner for &S
where
    S: AccountSigner + ?Sized,
{
    fn algorithm(&self) -> &'static str {
        (**self).algorithm()
    }

    fn jwk(&self) -> Jwk {
        (**self).jwk()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        (**self).sign(message)
    }
}

/// RSA PKCS#1 v1.5 (RS256) tabanlı ACME hesap anahtarı.
#[derive(Clone)]
pub struct RsaAccountKey {
    signing_key: RsaSigningKey<Sha256>,
}

impl fmt::Debug for RsaAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaAccountKey").finish_non_exhaustive()
    }
}

impl RsaAccountKey {
    /// ACME JWS başlığında kullanılacak algoritma adı.
    pub const ALGORITHM: &'static str = "RS256";

    /// RSA özel anahtarından hesap anahtarı oluşturur.
    ///
    /// # Errors
    ///
    /// Sağlanan anahtar doğrulama kontrollerinden geçemezse
    /// `KeyError::InvalidRsaKey` döner.
    pub fn new(private_key: RsaPrivateKey) -> Result<Self, KeyError> {
        private_key.validate()?;
        Ok(Self {
            signing_key: RsaSigningKey::<Sha256>::new(private_key),
        })
    }

    /// PKCS#1 (`BEGIN RSA PRIVATE KEY`) veya PKCS#8 (`BEGIN PRIVATE KEY`)
    /// PEM belgesinden anahtar yükler.
    ///
    /// # Errors
    ///
    /// Belge iki biçimde de çözülemezse `KeyError::Malformed`, anahtar
    /// tutarsızsa `KeyError::InvalidRsaKey` döner.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let private_key = match RsaPrivateKey::from_pkcs1_pem(pem) {
            Ok(key) => key,
            Err(pkcs1) => RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|pkcs8| KeyError::Malformed(format!("PKCS#1: {pkcs1}; PKCS#8: {pkcs8}")))?,
        };
        Self::new(private_key)
    }

    /// Diskteki PEM dosyasından anahtar yükler; okunan metin bellekten silinir.
    ///
    /// # Errors
    ///
    /// Dosya okunamazsa `KeyError::Read`, içerik geçersizse
    /// [`RsaAccountKey::from_pem`] hataları döner.
    pub fn from_pem_file(path: &Path) -> Result<Self, KeyError> {
        let pem = Zeroizing::new(fs::read_to_string(path).map_err(|source| KeyError::Read {
            path: path.to_path_buf(),
            source,
        })?);
        Self::from_pem(&pem)
    }

    /// RSA doğrulama anahtarını döndürür.
    #[must_use]
    pub fn verifying_key(&self) -> rsa::pkcs1v15::VerifyingKey<Sha256> {
        signature::Keypair::verifying_key(&self.signing_key)
    }

    /// Açık anahtarın modül ve üs değerlerini büyük-endian bayt olarak döndürür.
    #[must_use]
    pub fn public_parameters(&self) -> (Vec<u8>, Vec<u8>) {
        let verifying = self.verifying_key();
        let public = verifying.as_ref();
        (public.n().to_bytes_be(), public.e().to_bytes_be())
    }
}

impl AccountSigner for RsaAccountKey {
    fn algorithm(&self) -> &'static str {
        Self::ALGORITHM
    }

    fn jwk(&self) -> Jwk {
        let (modulus, exponent) = self.public_parameters();
        Jwk::rsa(&modulus, &exponent)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let signature = signature::Signer::try_sign(&self.signing_key, message)?;
        let bytes: Box<[u8]> = signature::SignatureEncoding::to_bytes(&signature);
        Ok(bytes.into_vec())
    }
}

/// Korumasız JWS başlığı; korumalı başlık bunun nonce eklenmiş kopyasıdır.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    pub jwk: Jwk,
}

#[derive(Serialize)]
struct ProtectedHeader<'a> {
    alg: &'a str,
    jwk: &'a Jwk,
    nonce: &'a str,
}

/// ACME v1 düzleştirilmiş JWS zarfı.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    pub header: JwsHeader,
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

impl SignedEnvelope {
    /// Ham yükü imzalar.
    ///
    /// İmza girdisi `base64url(protected) + "." + base64url(payload)` biçimindedir.
    ///
    /// # Errors
    ///
    /// Başlık serileştirilemez veya imza üretilemezse `KeyError` döner.
    pub fn sign<S>(signer: &S, payload: &[u8], nonce: &ReplayNonce) -> Result<Self, KeyError>
    where
        S: AccountSigner + ?Sized,
    {
        let header = JwsHeader {
            alg: signer.algorithm().to_owned(),
            jwk: signer.jwk(),
        };
        let protected_json = serde_json::to_vec(&ProtectedHeader {
            alg: &header.alg,
            jwk: &header.jwk,
            nonce: nonce.as_str(),
        })?;
        let protected = URL_SAFE_NO_PAD.encode(protected_json);
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let signing_input = format!("{protected}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(signer.sign(signing_input.as_bytes())?);

        Ok(Self {
            header,
            protected,
            payload,
            signature,
        })
    }

    /// JSON serileştirilebilir yükü imzalar.
    ///
    /// # Errors
    ///
    /// Serileştirme veya imza üretimi başarısız olursa `KeyError` döner.
    pub fn sign_json<S, P>(signer: &S, payload: &P, nonce: &ReplayNonce) -> Result<Self, KeyError>
    where
        S: AccountSigner + ?Sized,
        P: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(payload)?;
        Self::sign(signer, &bytes, nonce)
    }

    /// Zarfı POST gövdesi olarak kullanılacak JSON baytlarına dönüştürür.
    #[must_use]
    pub fn to_body(&self) -> Vec<u8> {
        let jwk: Map<String, Value> = self
            .header
            .jwk
            .0
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        let mut header = Map::new();
        header.insert("alg".to_owned(), Value::String(self.header.alg.clone()));
        header.insert("jwk".to_owned(), Value::Object(jwk));

        let mut envelope = Map::new();
        envelope.insert("header".to_owned(), Value::Object(header));
        envelope.insert("protected".to_owned(), Value::String(self.protected.clone()));
        envelope.insert("payload".to_owned(), Value::String(self.payload.clone()));
        envelope.insert("signature".to_owned(), Value::String(self.signature.clone()));
        Value::Object(envelope).to_string().into_bytes()
    }
}
