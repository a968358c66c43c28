use std::io::{self, BufRead, Write};

use tinycert_acme::{ManualConfirmation, Publication};

/// `--manual` kipinde her challenge dosyası için kullanıcıdan onay ister.
///
/// İstem stderr'e yazılır; stdout sertifika için boş bırakılır.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirmation;

impl StdinConfirmation {
    fn ask<R, W>(publication: &Publication<'_>, input: &mut R, output: &mut W) -> Result<(), String>
    where
        R: BufRead,
        W: Write,
    {
        write!(
            output,
            "{domain} için challenge dosyası yazıldı.\n  dosya: {path}\n  adres: {url}\n  içerik: {content}\n\
             Dosya adresten sunulduğunda Enter'a basın (iptal için 'q'): ",
            domain = publication.domain,
            path = publication.path.display(),
            url = publication.url,
            content = publication.key_authorization,
        )
        .and_then(|()| output.flush())
        .map_err(|err| format!("istem yazılamadı: {err}"))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|err| format!("girdi okunamadı: {err}"))?;
        if read == 0 {
            return Err("girdi kapandı".to_owned());
        }
        if line.trim().eq_ignore_ascii_case("q") {
            return Err("kullanıcı iptal etti".to_owned());
        }
        Ok(())
    }
}

impl ManualConfirmation for StdinConfirmation {
    fn confirm(&self, publication: &Publication<'_>) -> Result<(), String> {
        Self::ask(publication, &mut io::stdin().lock(), &mut io::stderr().lock())
    }
}
