use crate::utils::error::{EtlError, Result};
use std::fmt;
use std::path::Path;

/// How to get past the tool's login page.
///
/// The credentials file holds either a single `login:password` line, or two
/// lines (`login_url`, then `base_url`) for an account that has to be signed
/// in by hand through a third-party page.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { login: String, password: String },
    Manual { login_url: String, base_url: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { login, .. } => f
                .debug_struct("Password")
                .field("login", login)
                .field("password", &"***")
                .finish(),
            Credentials::Manual { login_url, base_url } => f
                .debug_struct("Manual")
                .field("login_url", login_url)
                .field("base_url", base_url)
                .finish(),
        }
    }
}

impl Credentials {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content, path.as_ref())
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        match lines.as_slice() {
            [] => Err(EtlError::InputFileEmpty {
                path: path.to_path_buf(),
            }),
            [single] => match single.split_once(':') {
                Some((login, password)) if !login.is_empty() && !password.is_empty() => {
                    Ok(Credentials::Password {
                        login: login.to_string(),
                        password: password.to_string(),
                    })
                }
                _ => Err(EtlError::InputFileMalformed {
                    path: path.to_path_buf(),
                    reason: "expected a single 'login:password' line".to_string(),
                }),
            },
            [login_url, base_url] => Ok(Credentials::Manual {
                login_url: login_url.to_string(),
                base_url: base_url.to_string(),
            }),
            _ => Err(EtlError::InputFileMalformed {
                path: path.to_path_buf(),
                reason: format!("expected one or two lines, found {}", lines.len()),
            }),
        }
    }

    /// Base URL this account works against, when the file names one.
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Credentials::Manual { base_url, .. } => Some(base_url),
            Credentials::Password { .. } => None,
        }
    }
}
