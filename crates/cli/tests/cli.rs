use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../acme/tests/fixtures")
        .join(name)
}

fn cli_command() -> Command {
    let mut cmd = Command::cargo_bin("tinycert").expect("cli bin");
    cmd.env_remove("TINYCERT_CA")
        .env_remove("TINYCERT_LOG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    cli_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("issue").and(predicate::str::contains("revoke")));
}

#[test]
fn missing_arguments_are_usage_errors() {
    cli_command()
        .arg("issue")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--account-key"));
}

#[test]
fn unreadable_account_key_fails_before_any_request() {
    let dir = TempDir::new().expect("geçici dizin");
    cli_command()
        .args(["issue", "--account-key"])
        .arg(dir.path().join("yok.pem"))
        .arg("--csr")
        .arg(fixture("domains.csr"))
        .arg("--acme-dir")
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(
            predicate::str::contains("hata: hesap anahtarı okunamadı")
                .and(predicate::str::contains("  neden: ")),
        );
}

#[test]
fn missing_challenge_directory_is_reported() {
    let dir = TempDir::new().expect("geçici dizin");
    cli_command()
        .args(["issue", "--account-key"])
        .arg(fixture("account-rsa.pem"))
        .arg("--csr")
        .arg(fixture("domains.csr"))
        .arg("--acme-dir")
        .arg(dir.path().join("acme-challenge"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("hata: challenge dizini bulunamadı"));
}

#[test]
fn invalid_contact_is_rejected() {
    let dir = TempDir::new().expect("geçici dizin");
    cli_command()
        .args(["issue", "--account-key"])
        .arg(fixture("account-pkcs8.pem"))
        .arg("--csr")
        .arg(fixture("domains.csr"))
        .arg("--acme-dir")
        .arg(dir.path())
        .args(["--contact", "yonetici"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("e-posta adresi geçersiz"));
}

#[test]
fn unsupported_ca_scheme_is_rejected() {
    cli_command()
        .args(["--ca", "ftp://ca.example", "revoke", "--account-key"])
        .arg(fixture("account-rsa.pem"))
        .arg("--cert")
        .arg(fixture("certificate.pem"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("hata: ").and(predicate::str::contains("ftp")));
}

#[test]
fn revoke_rejects_a_csr_in_place_of_a_certificate() {
    let dir = TempDir::new().expect("geçici dizin");
    let bogus = dir.path().join("cert.pem");
    fs::write(&bogus, fs::read(fixture("domains.csr")).expect("csr")).expect("yazma");

    cli_command()
        .args(["revoke", "--account-key"])
        .arg(fixture("account-rsa.pem"))
        .arg("--cert")
        .arg(&bogus)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CERTIFICATE bloğu bulunamadı"));
}
