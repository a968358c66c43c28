use std::env;
use std::io;

use thiserror::Error;
use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::layer::SubscriberExt;

/// Log kurulumu sırasında oluşabilecek hatalar.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Log filtresi geçersizdir.
    #[error("log filtresi geçersiz: {0}")]
    InvalidFilter(#[from] ParseError),
    /// Global abonelik kurulamadı.
    #[error("tracing aboneliği kurulamadı: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Komut satırı bayraklarından türetilen varsayılan filtre.
#[must_use]
pub const fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "info,tinycert=debug,tinycert_acme=debug",
        _ => "trace",
    }
}

/// Log çıktısını stderr'e yönlendiren aboneliği kurar; stdout yalnızca
/// sertifikaya ayrılmıştır.
///
/// * `TINYCERT_LOG` veya `RUST_LOG` ayarlıysa `fallback` yerine kullanılır.
///
/// # Errors
///
/// Geçersiz log filtresi ya da abonelik kurulumu başarısız olursa hata döner.
pub fn init_tracing(fallback: &str) -> Result<(), TelemetryError> {
    let filter = env::var("TINYCERT_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| fallback.to_owned());
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_timer(SystemTime)
                .with_target(false),
        );
    set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbosity() {
        assert_eq!(default_filter(2, true), "error");
        assert_eq!(default_filter(0, false), "info");
        assert_eq!(default_filter(5, false), "trace");
    }

    #[test]
    fn verbose_filter_parses() {
        for verbose in 0..3 {
            assert!(EnvFilter::try_new(default_filter(verbose, false)).is_ok());
        }
    }
}
