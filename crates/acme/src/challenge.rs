use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::AcmeError;
use crate::transport::Transport;
use crate::validation::KeyAuthorization;

/// Challenge dizini hazırlanırken oluşan hatalar.
#[derive(Debug, Error)]
pub enum ChallengeDirectoryError {
    #[error("challenge dizini bulunamadı: {}", .path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("challenge yolu bir dizin değil: {}", .path.display())]
    NotADirectory { path: PathBuf },
}

/// Web sunucusunun `/.well-known/acme-challenge/` altında yayımladığı dizin.
///
/// Dizin önceden var olmalıdır; istemci dizin oluşturmaz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeDirectory {
    root: PathBuf,
}

impl ChallengeDirectory {
    /// # Errors
    ///
    /// Yol yoksa veya dizin değilse `ChallengeDirectoryError` döner.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ChallengeDirectoryError> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|source| ChallengeDirectoryError::Missing {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ChallengeDirectoryError::NotADirectory { path: root });
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Anahtar yetkilendirmesinin yazılacağı dosya yolu.
    #[must_use]
    pub fn artifact_path(&self, key_authorization: &KeyAuthorization) -> PathBuf {
        self.root.join(key_authorization.token())
    }
}

/// Bu çalıştırmada yazılan challenge dosyalarının sahibi.
///
/// Dosyalar `remove`/`clear` ile açıkça silinir; değer düşürüldüğünde kalan
/// dosyalar da silinir.
#[derive(Debug)]
pub struct ArtifactSet {
    directory: ChallengeDirectory,
    written: BTreeMap<String, PathBuf>,
}

impl ArtifactSet {
    #[must_use]
    pub fn new(directory: ChallengeDirectory) -> Self {
        Self {
            directory,
            written: BTreeMap::new(),
        }
    }

    /// Anahtar yetkilendirmesini dosyaya yazar ve dosyayı kayda alır.
    ///
    /// # Errors
    ///
    /// Dosya yazılamazsa `AcmeError::Publish` döner.
    pub fn publish(
        &mut self,
        domain: &str,
        key_authorization: &KeyAuthorization,
    ) -> Result<PathBuf, AcmeError> {
        let path = self.directory.artifact_path(key_authorization);
        if let Err(source) = fs::write(&path, key_authorization.as_str().as_bytes()) {
            // Yazma yarıda kalmış olabilir; yarım dosya dizinde bırakılmaz.
            remove_artifact(domain, &path);
            return Err(AcmeError::Publish {
                domain: domain.to_owned(),
                path,
                source,
            });
        }
        debug!(domain, path = %path.display(), "challenge dosyası yazıldı");
        if let Some(previous) = self.written.insert(domain.to_owned(), path.clone()) {
            if previous != path {
                remove_artifact(domain, &previous);
            }
        }
        Ok(path)
    }

    /// Alan adına ait dosyayı siler; kayıtlı dosya yoksa `false` döner.
    pub fn remove(&mut self, domain: &str) -> bool {
        match self.written.remove(domain) {
            Some(path) => {
                remove_artifact(domain, &path);
                true
            }
            None => false,
        }
    }

    /// Kayıtlı tüm dosyaları siler ve silinen kayıt sayısını döndürür.
    pub fn clear(&mut self) -> usize {
        let written = std::mem::take(&mut self.written);
        let count = written.len();
        for (domain, path) in written {
            remove_artifact(&domain, &path);
        }
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.written.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    #[must_use]
    pub fn path_for(&self, domain: &str) -> Option<&Path> {
        self.written.get(domain).map(PathBuf::as_path)
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        if !self.written.is_empty() {
            let removed = self.clear();
            info!(removed, "kalan challenge dosyaları temizlendi");
        }
    }
}

fn remove_artifact(domain: &str, path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(domain, path = %path.display(), "challenge dosyası silindi"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(domain, path = %path.display(), error = %err, "challenge dosyası silinemedi"),
    }
}

/// Manuel onay için kullanıcıya gösterilen yayın bilgisi.
#[derive(Debug, Clone, Copy)]
pub struct Publication<'a> {
    /// Doğrulanan alan adı.
    pub domain: &'a str,
    /// Yazılan dosyanın yerel yolu.
    pub path: &'a Path,
    /// CA'nın dosyayı okuyacağı adres.
    pub url: &'a Url,
    /// Dosyanın beklenen içeriği.
    pub key_authorization: &'a KeyAuthorization,
}

/// Dosya yazıldıktan sonra ve erişilebilirlik denetiminden önce çağrılır.
pub trait ManualConfirmation {
    /// Devam edilmeyecekse reddetme nedenini döndürür.
    ///
    /// # Errors
    ///
    /// Kullanıcı onay vermezse nedeni açıklayan metin döner.
    fn confirm(&self, publication: &Publication<'_>) -> Result<(), String>;
}

/// Her yayını onaylayan varsayılan uygulama.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl ManualConfirmation for AutoConfirm {
    fn confirm(&self, _publication: &Publication<'_>) -> Result<(), String> {
        Ok(())
    }
}

/// Yayımlanan dosyanın alan adı üzerinden düz HTTP ile erişilebilirliğini denetler.
#[derive(Debug)]
pub struct ReachabilityProbe<'a, T: ?Sized> {
    transport: &'a T,
    port: u16,
    attempts: u32,
    delay: Duration,
}

impl<'a, T> ReachabilityProbe<'a, T>
where
    T: Transport + ?Sized,
{
    #[must_use]
    pub const fn new(transport: &'a T, config: &ClientConfig) -> Self {
        Self {
            transport,
            port: config.challenge_port(),
            attempts: config.self_check_attempts(),
            delay: config.self_check_delay(),
        }
    }

    /// `http://{domain}[:port]/.well-known/acme-challenge/{token}` adresi.
    ///
    /// # Errors
    ///
    /// Alan adı URL'ye dönüştürülemezse `AcmeError::InvalidDomain` döner.
    pub fn challenge_url(
        &self,
        domain: &str,
        key_authorization: &KeyAuthorization,
    ) -> Result<Url, AcmeError> {
        let authority = if self.port == ClientConfig::DEFAULT_CHALLENGE_PORT {
            domain.to_owned()
        } else {
            format!("{domain}:{}", self.port)
        };
        let value = format!("http://{authority}{}", key_authorization.resource_path());
        Url::parse(&value).map_err(|source| AcmeError::InvalidDomain {
            domain: domain.to_owned(),
            source,
        })
    }

    /// İçerik bayt bayt eşleşene kadar en fazla `attempts` kez dener ve
    /// başarılı denemenin sırasını döndürür.
    ///
    /// # Errors
    ///
    /// Bütçe tükenirse son hatayı içeren `AcmeError::SelfCheckFailed` döner.
    pub fn verify(
        &self,
        domain: &str,
        url: &Url,
        key_authorization: &KeyAuthorization,
    ) -> Result<u32, AcmeError> {
        let mut last_failure = String::new();
        for attempt in 1..=self.attempts {
            match self.transport.get(url) {
                Ok(response) if !response.status.is_success() => {
                    last_failure = format!("HTTP {}", response.status);
                }
                Ok(response) => match key_authorization.verify_body(&response.body) {
                    Ok(()) => {
                        debug!(domain, attempt, "challenge dosyası erişilebilir");
                        return Ok(attempt);
                    }
                    Err(err) => last_failure = err.to_string(),
                },
                Err(err) => last_failure = err.to_string(),
            }

            warn!(
                domain,
                attempt,
                max_attempts = self.attempts,
                reason = %last_failure,
                "challenge dosyası henüz doğrulanamadı"
            );
            if attempt < self.attempts {
                thread::sleep(self.delay);
            }
        }

        Err(AcmeError::SelfCheckFailed {
            domain: domain.to_owned(),
            attempts: self.attempts,
            last_failure,
        })
    }
}
