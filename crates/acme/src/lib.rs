#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

//! ACME v1 protokolü ile HTTP-01 doğrulamalı sertifika alma ve iptal etme.

mod authorization;
mod certificate;
mod challenge;
mod config;
mod csr;
mod directory;
mod error;
mod issuance;
mod jws;
mod nonce;
mod request;
mod resource;
mod transport;
mod validation;

pub use authorization::{
    AuthorizationBatch, AuthorizationDocument, AuthorizationError, AuthorizationState,
    AuthorizationStatus, Challenge, ChallengeError, ChallengeKind, ChallengeStatus,
    DomainAuthorization,
};
pub use certificate::{CertificateDer, CertificateError};
pub use challenge::{
    ArtifactSet, AutoConfirm, ChallengeDirectory, ChallengeDirectoryError, ManualConfirmation,
    Publication, ReachabilityProbe,
};
pub use config::{CaEnvironment, ClientConfig, ConfigError};
pub use csr::{CertificateRequest, CsrError};
pub use directory::{AcmeDirectory, DirectoryError, KnownEndpoint};
pub use error::{AcmeError, ErrorKind, Step};
pub use issuance::{AcmeClient, IssueOptions, IssuedCertificate, Registration, Revocation};
pub use jws::{AccountSigner, Jwk, JwsHeader, KeyError, RsaAccountKey, SignedEnvelope};
pub use nonce::{fetch_nonce, NonceError, ReplayNonce, REPLAY_NONCE_HEADER};
pub use request::SignedRequester;
pub use resource::{AccountContact, AccountContactError, AcmeResource, Identifier};
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError, USER_AGENT};
pub use validation::{sanitize_token, Http01Error, KeyAuthorization, WELL_KNOWN_PREFIX};
