#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod prompt;
mod telemetry;

use std::error::Error as _;
use std::io::{self, Write as _};
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{debug, info};

use tinycert_acme::{
    AccountContact, AccountContactError, AcmeClient, AcmeError, AutoConfirm, CaEnvironment,
    CertificateDer, CertificateError, CertificateRequest, ChallengeDirectory,
    ChallengeDirectoryError, ClientConfig, ConfigError, CsrError, IssueOptions, KeyError,
    ManualConfirmation, ReqwestTransport, Revocation, RsaAccountKey, TransportError,
};

use crate::prompt::StdinConfirmation;
use crate::telemetry::TelemetryError;

#[derive(Parser)]
#[command(
    name = "tinycert",
    version,
    about = "ACME v1 üzerinden HTTP-01 doğrulamalı sertifika alma ve iptal aracı"
)]
struct Cli {
    /// Ayrıntılı log (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Yalnızca hataları logla
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Let's Encrypt staging ortamını kullan (`--ca` değerini geçersiz kılar)
    #[arg(long, global = true)]
    staging: bool,
    /// CA kök adresi ya da ortam adı (production, staging)
    #[arg(long, value_name = "URL", env = "TINYCERT_CA", global = true)]
    ca: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CSR'daki alan adları için sertifika al ve PEM olarak stdout'a yaz
    Issue(IssueArgs),
    /// Daha önce alınmış bir sertifikayı iptal et
    Revoke(RevokeArgs),
}

#[derive(Args)]
struct IssueArgs {
    /// ACME hesap anahtarı (PKCS#1 veya PKCS#8 RSA PEM)
    #[arg(long, value_name = "PATH")]
    account_key: PathBuf,
    /// Sertifika isteği (PEM veya DER)
    #[arg(long, value_name = "PATH")]
    csr: PathBuf,
    /// `/.well-known/acme-challenge/` olarak sunulan dizin
    #[arg(long, value_name = "DIR")]
    acme_dir: PathBuf,
    /// Hesap iletişim e-postası
    #[arg(long, value_name = "EMAIL")]
    contact: Option<String>,
    /// Her challenge dosyası yazıldıktan sonra onay bekle
    #[arg(long)]
    manual: bool,
}

#[derive(Args)]
struct RevokeArgs {
    /// ACME hesap anahtarı (PKCS#1 veya PKCS#8 RSA PEM)
    #[arg(long, value_name = "PATH")]
    account_key: PathBuf,
    /// İptal edilecek sertifika (PEM veya DER)
    #[arg(long, value_name = "PATH")]
    cert: PathBuf,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Csr(#[from] CsrError),
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error(transparent)]
    ChallengeDirectory(#[from] ChallengeDirectoryError),
    #[error(transparent)]
    Contact(#[from] AccountContactError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Acme(#[from] AcmeError),
    #[error("sertifika stdout'a yazılamadı: {0}")]
    Output(#[from] io::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        if let CliError::Acme(inner) = &err {
            debug!(kind = %inner.kind(), "işlem başarısız");
        }
        eprintln!("hata: {err}");
        let mut cursor = err.source();
        while let Some(cause) = cursor {
            eprintln!("  neden: {cause}");
            cursor = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    telemetry::init_tracing(telemetry::default_filter(cli.verbose, cli.quiet))?;
    let config = client_config(cli.staging, cli.ca.as_deref())?;
    match cli.command {
        Commands::Issue(args) => handle_issue(&args, config),
        Commands::Revoke(args) => handle_revoke(&args, config),
    }
}

/// `--staging` her zaman önceliklidir; `--ca` ortam adı ya da URL olabilir.
fn client_config(staging: bool, ca: Option<&str>) -> CliResult<ClientConfig> {
    if staging {
        return Ok(ClientConfig::for_environment(CaEnvironment::Staging)?);
    }
    let config = match ca {
        None => ClientConfig::for_environment(CaEnvironment::default())?,
        Some(value) => match value.parse::<CaEnvironment>() {
            Ok(environment) => ClientConfig::for_environment(environment)?,
            Err(_) => ClientConfig::from_base_str(value)?,
        },
    };
    Ok(config)
}

fn handle_issue(args: &IssueArgs, config: ClientConfig) -> CliResult<()> {
    let key = RsaAccountKey::from_pem_file(&args.account_key)?;
    let request = CertificateRequest::from_file(&args.csr)?;
    let challenge_directory = ChallengeDirectory::new(&args.acme_dir)?;
    let contact = args
        .contact
        .as_deref()
        .map(AccountContact::email)
        .transpose()?;
    let confirmation: &dyn ManualConfirmation = if args.manual {
        &StdinConfirmation
    } else {
        &AutoConfirm
    };

    let transport = ReqwestTransport::new(&config)?;
    let client = AcmeClient::new(key, transport, config)?;
    let certificate = client.issue(
        &request,
        &IssueOptions {
            contact: contact.as_ref(),
            challenge_directory: &challenge_directory,
            confirmation,
        },
    )?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(certificate.to_pem().as_bytes())?;
    stdout.flush()?;
    info!(
        domains = request.domains().len(),
        "sertifika stdout'a yazıldı"
    );
    Ok(())
}

fn handle_revoke(args: &RevokeArgs, config: ClientConfig) -> CliResult<()> {
    let key = RsaAccountKey::from_pem_file(&args.account_key)?;
    let certificate = CertificateDer::from_file(&args.cert)?;

    let transport = ReqwestTransport::new(&config)?;
    let client = AcmeClient::new(key, transport, config)?;
    let outcome = client.revoke(&certificate)?;
    let summary = match outcome {
        Revocation::Revoked => "iptal edildi",
        Revocation::AlreadyRevoked => "zaten iptal edilmişti",
    };
    info!(cert = %args.cert.display(), summary, "iptal işlemi tamamlandı");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn staging_flag_overrides_ca() {
        let config = client_config(true, Some("https://ca.example")).unwrap();
        assert_eq!(
            config,
            ClientConfig::for_environment(CaEnvironment::Staging).unwrap()
        );
    }

    #[test]
    fn ca_accepts_environment_names_and_urls() {
        let config = client_config(false, Some("staging")).unwrap();
        assert_eq!(
            config,
            ClientConfig::for_environment(CaEnvironment::Staging).unwrap()
        );

        let config = client_config(false, Some("http://127.0.0.1:14000")).unwrap();
        assert_eq!(config.ca_base().as_str(), "http://127.0.0.1:14000/");

        let default = client_config(false, None).unwrap();
        assert_eq!(
            default,
            ClientConfig::for_environment(CaEnvironment::Production).unwrap()
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = client_config(false, Some("ftp://ca.example")).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::UnsupportedScheme { .. })));
    }
}
