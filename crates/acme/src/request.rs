use tracing::debug;
use url::Url;

use crate::error::{AcmeError, Step};
use crate::jws::{AccountSigner, SignedEnvelope};
use crate::nonce::fetch_nonce;
use crate::resource::AcmeResource;
use crate::transport::{HttpResponse, Transport};

/// İmzalı ACME isteklerini oluşturup gönderen yardımcı.
///
/// Her çağrı imzalamadan hemen önce taze bir nonce çeker; nonce değerleri
/// istekler arasında paylaşılmaz.
pub struct SignedRequester<'a, S: ?Sized, T: ?Sized> {
    signer: &'a S,
    transport: &'a T,
    nonce_url: &'a Url,
}

impl<S: ?Sized, T: ?Sized> Clone for SignedRequester<'_, S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized, T: ?Sized> Copy for SignedRequester<'_, S, T> {}

impl<'a, S, T> SignedRequester<'a, S, T>
where
    S: AccountSigner + ?Sized,
    T: Transport + ?Sized,
{
    #[must_use]
    pub const fn new(signer: &'a S, transport: &'a T, nonce_url: &'a Url) -> Self {
        Self {
            signer,
            transport,
            nonce_url,
        }
    }

    #[must_use]
    pub const fn transport(&self) -> &'a T {
        self.transport
    }

    /// Yükü imzalayıp `url` adresine gönderir; durum kodu yorumlanmaz.
    ///
    /// # Errors
    ///
    /// Nonce alınamazsa, imza üretilemezse veya istek gönderilemezse
    /// `AcmeError` döner.
    pub fn post(
        &self,
        step: &Step,
        url: &Url,
        resource: &AcmeResource,
    ) -> Result<HttpResponse, AcmeError> {
        let nonce = fetch_nonce(self.transport, self.nonce_url, step)?;
        let body = SignedEnvelope::sign_json(self.signer, resource, &nonce)?.to_body();

        debug!(resource = resource.name(), %url, "imzalı istek gönderiliyor");
        let response = self
            .transport
            .post(url, &body)
            .map_err(|source| AcmeError::Transport {
                step: step.clone(),
                source,
            })?;
        debug!(
            resource = resource.name(),
            status = response.status.as_u16(),
            "CA yanıtı alındı"
        );
        Ok(response)
    }
}
