//! Per-domain HTTP-01 lifecycle and the shared polling loop.

use std::fmt;
use std::thread;

use http::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use super::{AuthorizationDocument, AuthorizationError, Challenge, ChallengeStatus};
use crate::challenge::{
    ArtifactSet, ChallengeDirectory, ManualConfirmation, Publication, ReachabilityProbe,
};
use crate::config::ClientConfig;
use crate::error::{AcmeError, Step};
use crate::jws::AccountSigner;
use crate::request::SignedRequester;
use crate::resource::AcmeResource;
use crate::transport::Transport;
use crate::validation::KeyAuthorization;

/// States a domain passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthorizationState {
    Requested,
    Published,
    SelfVerified,
    Notified,
    Valid,
    Invalid,
}

impl AuthorizationState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Published => "published",
            Self::SelfVerified => "self-verified",
            Self::Notified => "notified",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side record for one domain of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAuthorization {
    domain: String,
    challenge_uri: Url,
    key_authorization: KeyAuthorization,
    state: AuthorizationState,
}

impl DomainAuthorization {
    fn new(domain: &str, challenge_uri: Url, key_authorization: KeyAuthorization) -> Self {
        Self {
            domain: domain.to_owned(),
            challenge_uri,
            key_authorization,
            state: AuthorizationState::Requested,
        }
    }

    fn advance(&mut self, next: AuthorizationState) {
        debug!(
            domain = %self.domain,
            from = %self.state,
            to = %next,
            "yetkilendirme durumu değişti"
        );
        self.state = next;
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub const fn challenge_uri(&self) -> &Url {
        &self.challenge_uri
    }

    #[must_use]
    pub const fn key_authorization(&self) -> &KeyAuthorization {
        &self.key_authorization
    }

    #[must_use]
    pub const fn state(&self) -> AuthorizationState {
        self.state
    }
}

/// Runs every domain of a certificate request to `valid`, or fails the whole batch.
///
/// Domains are set up one after another (request, publish, self-check,
/// notify) and then polled together. Any failure removes every artifact
/// written so far before the error is returned.
pub struct AuthorizationBatch<'a, S: ?Sized, T: ?Sized, C: ?Sized> {
    requester: SignedRequester<'a, S, T>,
    config: &'a ClientConfig,
    new_authz: &'a Url,
    thumbprint: &'a str,
    confirmation: &'a C,
    artifacts: ArtifactSet,
    authorizations: Vec<DomainAuthorization>,
}

impl<'a, S, T, C> AuthorizationBatch<'a, S, T, C>
where
    S: AccountSigner + ?Sized,
    T: Transport + ?Sized,
    C: ManualConfirmation + ?Sized,
{
    #[must_use]
    pub fn new(
        requester: SignedRequester<'a, S, T>,
        config: &'a ClientConfig,
        new_authz: &'a Url,
        thumbprint: &'a str,
        challenge_directory: ChallengeDirectory,
        confirmation: &'a C,
    ) -> Self {
        Self {
            requester,
            config,
            new_authz,
            thumbprint,
            confirmation,
            artifacts: ArtifactSet::new(challenge_directory),
            authorizations: Vec::new(),
        }
    }

    /// Authorizes every domain and returns the final records, all `valid`.
    ///
    /// # Errors
    ///
    /// The first fatal error of any domain is returned after cleanup.
    pub fn run<'d, I>(mut self, domains: I) -> Result<Vec<DomainAuthorization>, AcmeError>
    where
        I: IntoIterator<Item = &'d str>,
    {
        match self.drive(domains) {
            Ok(()) => Ok(std::mem::take(&mut self.authorizations)),
            Err(err) => {
                let removed = self.artifacts.clear();
                info!(removed, error = %err, "hata sonrası challenge dosyaları temizlendi");
                Err(err)
            }
        }
    }

    fn drive<'d, I>(&mut self, domains: I) -> Result<(), AcmeError>
    where
        I: IntoIterator<Item = &'d str>,
    {
        for domain in domains {
            let authorization = self.prepare(domain)?;
            self.authorizations.push(authorization);
        }
        self.poll()
    }

    fn prepare(&mut self, domain: &str) -> Result<DomainAuthorization, AcmeError> {
        info!(domain, "yetkilendirme isteniyor");
        let step = Step::NewAuthorization(domain.to_owned());
        let response = self.requester.post(
            &step,
            self.new_authz,
            &AcmeResource::new_authorization(domain),
        )?;
        if response.status != StatusCode::CREATED {
            return Err(AcmeError::unexpected_status(step, &response));
        }
        let document = AuthorizationDocument::from_json_slice(&response.body)
            .map_err(|source| AcmeError::MalformedResponse {
                step: step.clone(),
                source,
            })?;
        let challenge = document.http01().ok_or_else(|| AcmeError::NoHttpChallenge {
            domain: domain.to_owned(),
        })?;
        let key_authorization =
            KeyAuthorization::new(challenge.token().unwrap_or_default(), self.thumbprint)
                .map_err(|source| AcmeError::MalformedResponse {
                    step,
                    source: AuthorizationError::from(source),
                })?;
        let mut authorization =
            DomainAuthorization::new(domain, challenge.uri().clone(), key_authorization);

        let path = self
            .artifacts
            .publish(domain, authorization.key_authorization())?;
        authorization.advance(AuthorizationState::Published);

        let probe = ReachabilityProbe::new(self.requester.transport(), self.config);
        let url = probe.challenge_url(domain, authorization.key_authorization())?;
        self.confirmation
            .confirm(&Publication {
                domain,
                path: &path,
                url: &url,
                key_authorization: authorization.key_authorization(),
            })
            .map_err(|reason| AcmeError::ConfirmationDeclined {
                domain: domain.to_owned(),
                reason,
            })?;
        probe.verify(domain, &url, authorization.key_authorization())?;
        authorization.advance(AuthorizationState::SelfVerified);

        let step = Step::ChallengeResponse(domain.to_owned());
        let response = self.requester.post(
            &step,
            authorization.challenge_uri(),
            &AcmeResource::challenge_response(authorization.key_authorization()),
        )?;
        if response.status != StatusCode::ACCEPTED {
            return Err(AcmeError::unexpected_status(step, &response));
        }
        authorization.advance(AuthorizationState::Notified);
        info!(domain, "challenge CA'ya bildirildi");
        Ok(authorization)
    }

    /// One GET per still-notified domain per pass, with the pass budget shared by all domains.
    fn poll(&mut self) -> Result<(), AcmeError> {
        let attempts = self.config.poll_attempts();
        for pass in 1..=attempts {
            for authorization in &mut self.authorizations {
                if authorization.state != AuthorizationState::Notified {
                    continue;
                }
                let Some(challenge) =
                    fetch_challenge(self.requester.transport(), authorization)?
                else {
                    continue;
                };
                match challenge.status() {
                    ChallengeStatus::Valid => {
                        authorization.advance(AuthorizationState::Valid);
                        self.artifacts.remove(&authorization.domain);
                        info!(domain = %authorization.domain, "alan adı doğrulandı");
                    }
                    ChallengeStatus::Invalid => {
                        authorization.advance(AuthorizationState::Invalid);
                        return Err(AcmeError::AuthorizationInvalid {
                            domain: authorization.domain.clone(),
                            detail: challenge
                                .error_detail()
                                .unwrap_or("CA ayrıntı vermedi")
                                .to_owned(),
                        });
                    }
                    ChallengeStatus::Pending | ChallengeStatus::Processing => {
                        debug!(
                            domain = %authorization.domain,
                            status = %challenge.status(),
                            pass,
                            "doğrulama bekleniyor"
                        );
                    }
                }
            }

            let pending = self.pending_domains();
            if pending.is_empty() {
                return Ok(());
            }
            if pass < attempts {
                thread::sleep(self.config.poll_interval());
            }
        }

        Err(AcmeError::PollBudgetExhausted {
            attempts,
            pending: self.pending_domains(),
        })
    }

    fn pending_domains(&self) -> Vec<String> {
        self.authorizations
            .iter()
            .filter(|authorization| authorization.state == AuthorizationState::Notified)
            .map(|authorization| authorization.domain.clone())
            .collect()
    }
}

/// Network failures only cost the current pass; a non-success status or a
/// malformed body is fatal.
fn fetch_challenge<T>(
    transport: &T,
    authorization: &DomainAuthorization,
) -> Result<Option<Challenge>, AcmeError>
where
    T: Transport + ?Sized,
{
    let step = Step::ChallengePoll(authorization.domain.clone());
    let response = match transport.get(&authorization.challenge_uri) {
        Ok(response) => response,
        Err(err) => {
            warn!(domain = %authorization.domain, error = %err, "challenge durumu alınamadı");
            return Ok(None);
        }
    };
    if !response.status.is_success() {
        return Err(AcmeError::unexpected_status(step, &response));
    }
    Challenge::from_json_slice(&response.body)
        .map(Some)
        .map_err(|source| AcmeError::MalformedResponse {
            step,
            source: AuthorizationError::from(source),
        })
}
