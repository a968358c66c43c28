use std::collections::BTreeSet;

use http::StatusCode;
use tracing::info;

use crate::authorization::{AuthorizationBatch, DomainAuthorization};
use crate::certificate::CertificateDer;
use crate::challenge::{ChallengeDirectory, ManualConfirmation};
use crate::config::ClientConfig;
use crate::csr::CertificateRequest;
use crate::directory::AcmeDirectory;
use crate::error::{AcmeError, Step};
use crate::jws::AccountSigner;
use crate::request::SignedRequester;
use crate::resource::{AccountContact, AcmeResource};
use crate::transport::Transport;

/// CA'nın verdiği sertifika.
pub type IssuedCertificate = CertificateDer;

/// `new-reg` sonucu; iki durum da başarıdır.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyRegistered,
}

/// `revoke-cert` sonucu; iki durum da başarıdır.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    Revoked,
    AlreadyRevoked,
}

/// Sertifika alımı için çağıranın sağladığı ayrıntılar.
#[derive(Debug)]
pub struct IssueOptions<'a, C: ?Sized> {
    pub contact: Option<&'a AccountContact>,
    pub challenge_directory: &'a ChallengeDirectory,
    pub confirmation: &'a C,
}

/// ACME v1 istemcisi: kayıt, alan adı doğrulama, sertifika alma ve iptal.
#[derive(Debug)]
pub struct AcmeClient<S, T> {
    signer: S,
    transport: T,
    config: ClientConfig,
    directory: AcmeDirectory,
    thumbprint: String,
}

impl<S, T> AcmeClient<S, T>
where
    S: AccountSigner,
    T: Transport,
{
    /// Uç noktaları CA kök adresinden türetir ve hesap thumbprint'ini bir kez hesaplar.
    ///
    /// # Errors
    ///
    /// Uç nokta adresleri oluşturulamazsa veya thumbprint hesaplanamazsa
    /// `AcmeError` döner.
    pub fn new(signer: S, transport: T, config: ClientConfig) -> Result<Self, AcmeError> {
        let directory = AcmeDirectory::from_base(config.ca_base())?;
        let thumbprint = signer.thumbprint()?;
        info!(ca = %config.ca_base(), thumbprint, "ACME istemcisi hazırlandı");
        Ok(Self {
            signer,
            transport,
            config,
            directory,
            thumbprint,
        })
    }

    /// Varsayılan yollar yerine CA'nın yayımladığı uç noktaları kullanır.
    #[must_use]
    pub fn with_directory(mut self, directory: AcmeDirectory) -> Self {
        self.directory = directory;
        self
    }

    #[must_use]
    pub const fn directory(&self) -> &AcmeDirectory {
        &self.directory
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    fn requester(&self) -> SignedRequester<'_, S, T> {
        SignedRequester::new(&self.signer, &self.transport, &self.directory.directory)
    }

    /// Hesabı kaydeder; hesap zaten kayıtlıysa bu da başarı sayılır.
    ///
    /// # Errors
    ///
    /// CA 201 veya 409 dışında bir durum döndürürse `AcmeError::UnexpectedStatus` döner.
    pub fn register(&self, contact: Option<&AccountContact>) -> Result<Registration, AcmeError> {
        let step = Step::Registration;
        let response = self.requester().post(
            &step,
            &self.directory.new_reg,
            &AcmeResource::new_registration(contact, self.config.agreement()),
        )?;
        match response.status {
            StatusCode::CREATED => {
                info!("hesap kaydedildi");
                Ok(Registration::Created)
            }
            StatusCode::CONFLICT => {
                info!("hesap zaten kayıtlı");
                Ok(Registration::AlreadyRegistered)
            }
            _ => Err(AcmeError::unexpected_status(step, &response)),
        }
    }

    /// Alan adlarının tümünü HTTP-01 ile doğrular.
    ///
    /// # Errors
    ///
    /// Herhangi bir alan adı başarısız olursa tüm challenge dosyaları
    /// silindikten sonra ilgili `AcmeError` döner.
    pub fn authorize<C>(
        &self,
        domains: &BTreeSet<String>,
        challenge_directory: &ChallengeDirectory,
        confirmation: &C,
    ) -> Result<Vec<DomainAuthorization>, AcmeError>
    where
        C: ManualConfirmation + ?Sized,
    {
        AuthorizationBatch::new(
            self.requester(),
            &self.config,
            &self.directory.new_authz,
            &self.thumbprint,
            challenge_directory.clone(),
            confirmation,
        )
        .run(domains.iter().map(String::as_str))
    }

    /// CSR'ı imzalatır ve DER sertifikayı döndürür.
    ///
    /// # Errors
    ///
    /// CA 201 dışında bir durum döndürürse `AcmeError::UnexpectedStatus`,
    /// gövde boşsa `AcmeError::Certificate` döner.
    pub fn request_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<IssuedCertificate, AcmeError> {
        let step = Step::NewCertificate;
        let response = self.requester().post(
            &step,
            &self.directory.new_cert,
            &AcmeResource::new_certificate(request.der()),
        )?;
        if response.status != StatusCode::CREATED {
            return Err(AcmeError::unexpected_status(step, &response));
        }
        let certificate = CertificateDer::new(response.body)?;
        info!(bytes = certificate.as_bytes().len(), "sertifika alındı");
        Ok(certificate)
    }

    /// Kayıt, tüm alan adlarının doğrulanması ve sertifika alımı.
    ///
    /// # Errors
    ///
    /// Adımlardan herhangi biri başarısız olursa `AcmeError` döner; kısmi
    /// sertifika üretilmez.
    pub fn issue<C>(
        &self,
        request: &CertificateRequest,
        options: &IssueOptions<'_, C>,
    ) -> Result<IssuedCertificate, AcmeError>
    where
        C: ManualConfirmation + ?Sized,
    {
        let domains = request.domains();
        info!(
            domains = %domains.iter().map(String::as_str).collect::<Vec<_>>().join(","),
            "sertifika süreci başladı"
        );
        self.register(options.contact)?;
        self.authorize(domains, options.challenge_directory, options.confirmation)?;
        self.request_certificate(request)
    }

    /// Sertifikayı iptal eder; zaten iptal edilmişse bu da başarı sayılır.
    ///
    /// # Errors
    ///
    /// CA 200 veya 409 dışında bir durum döndürürse `AcmeError::UnexpectedStatus` döner.
    pub fn revoke(&self, certificate: &CertificateDer) -> Result<Revocation, AcmeError> {
        let step = Step::Revocation;
        let response = self.requester().post(
            &step,
            &self.directory.revoke_cert,
            &AcmeResource::revoke_certificate(certificate.as_bytes()),
        )?;
        match response.status {
            StatusCode::OK => {
                info!("sertifika iptal edildi");
                Ok(Revocation::Revoked)
            }
            StatusCode::CONFLICT => {
                info!("sertifika zaten iptal edilmiş");
                Ok(Revocation::AlreadyRevoked)
            }
            _ => Err(AcmeError::unexpected_status(step, &response)),
        }
    }
}
