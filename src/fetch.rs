// src/fetch.rs

//! Package locations and the transports that read them
//!
//! A location is whatever the user typed where a package is expected: a
//! local path, an HTTP(S) or FTP URL, or an `ssh://`/`sftp://` address. Each
//! one becomes a byte stream, and from there local and remote packages are
//! handled identically.

use crate::archive::PackageArchive;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for a failed HTTP request
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Where a package is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Http(Url),
    Ftp(Url),
    Ssh {
        user: Option<String>,
        host: String,
        port: Option<u16>,
        path: String,
    },
}

impl Location {
    /// Classify a user-supplied location
    ///
    /// Anything without a recognized `scheme://` prefix is a local path.
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.contains("://") {
            return Ok(Self::Local(PathBuf::from(raw)));
        }

        let url = Url::parse(raw)
            .map_err(|e| Error::InvalidPath(format!("bad package location '{}': {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Http(url)),
            "ftp" => Ok(Self::Ftp(url)),
            "ssh" | "sftp" => {
                let host = url
                    .host_str()
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| Error::InvalidPath(format!("no host in '{}'", raw)))?
                    .to_string();
                let path = url.path().to_string();
                if path.is_empty() || path == "/" {
                    return Err(Error::InvalidPath(format!("no remote path in '{}'", raw)));
                }
                let user = Some(url.username().to_string()).filter(|u| !u.is_empty());
                Ok(Self::Ssh {
                    user,
                    host,
                    port: url.port(),
                    path,
                })
            }
            "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|_| Error::InvalidPath(format!("bad file URL '{}'", raw))),
            other => Err(Error::InvalidPath(format!(
                "unsupported location scheme '{}' in '{}'",
                other, raw
            ))),
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Http(url) | Self::Ftp(url) => write!(f, "{}", url),
            Self::Ssh {
                user,
                host,
                port,
                path,
            } => {
                f.write_str("ssh://")?;
                if let Some(user) = user {
                    write!(f, "{}@", user)?;
                }
                f.write_str(host)?;
                if let Some(port) = port {
                    write!(f, ":{}", port)?;
                }
                f.write_str(path)
            }
        }
    }
}

/// Produces a byte stream for a location
pub trait Transport {
    fn fetch(&self, location: &Location) -> Result<Box<dyn Read>>;
}

/// Blocking HTTP(S) client with retry support
pub struct HttpTransport {
    client: Client,
    max_retries: u32,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, location: &Location) -> Result<Box<dyn Read>> {
        let Location::Http(url) = location else {
            return Err(Error::Network(format!("{} is not an HTTP location", location)));
        };
        info!("Downloading {}", url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::Network(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }
                    return Ok(Box::new(response));
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::Network(format!(
                            "failed to fetch {} after {attempt} attempts: {e}",
                            url
                        )));
                    }
                    warn!("Fetch attempt {} for {} failed: {}, retrying...", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

/// FTP through `curl`, SSH and SFTP through `ssh ... cat`
pub struct CommandTransport;

impl CommandTransport {
    /// Program and arguments that print the location's bytes to stdout
    pub fn command_line(location: &Location) -> Result<(&'static str, Vec<String>)> {
        match location {
            Location::Ftp(url) => Ok(("curl", vec!["-sSfL".to_string(), url.to_string()])),
            Location::Ssh {
                user,
                host,
                port,
                path,
            } => {
                let mut args = Vec::new();
                if let Some(port) = port {
                    args.push("-p".to_string());
                    args.push(port.to_string());
                }
                args.push(match user {
                    Some(user) => format!("{}@{}", user, host),
                    None => host.clone(),
                });
                args.push("cat".to_string());
                args.push(path.clone());
                Ok(("ssh", args))
            }
            other => Err(Error::Network(format!(
                "no command transport for {}",
                other
            ))),
        }
    }
}

impl Transport for CommandTransport {
    fn fetch(&self, location: &Location) -> Result<Box<dyn Read>> {
        let (program, args) = Self::command_line(location)?;
        info!("Fetching {} with {}", location, program);

        let output = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| Error::Network(format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(Error::Network(format!(
                "{} failed for {}: {}",
                program,
                location,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!("Fetched {} bytes from {}", output.stdout.len(), location);
        Ok(Box::new(Cursor::new(output.stdout)))
    }
}

/// Open a byte stream for any location
pub fn fetch(location: &Location) -> Result<Box<dyn Read>> {
    match location {
        Location::Local(path) => {
            let file = File::open(path).map_err(|e| Error::io(path, e))?;
            Ok(Box::new(file))
        }
        Location::Http(_) => HttpTransport::new()?.fetch(location),
        Location::Ftp(_) | Location::Ssh { .. } => CommandTransport.fetch(location),
    }
}

/// Fetch a location and read it as a package
pub fn open_archive(location: &Location) -> Result<PackageArchive> {
    let reader = fetch(location)?;
    PackageArchive::from_reader(reader, &location.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local() {
        assert_eq!(
            Location::parse("dist/tool-1.0.dpk").unwrap(),
            Location::Local(PathBuf::from("dist/tool-1.0.dpk"))
        );
        assert!(!Location::parse("/abs/pkg.dpk").unwrap().is_remote());
        assert_eq!(
            Location::parse("file:///srv/pkg.dpk").unwrap(),
            Location::Local(PathBuf::from("/srv/pkg.dpk"))
        );
    }

    #[test]
    fn test_parse_http_and_ftp() {
        assert!(matches!(
            Location::parse("https://example.org/pkgs/tool-1.0.dpk").unwrap(),
            Location::Http(_)
        ));
        assert!(matches!(
            Location::parse("http://example.org/tool.dpk").unwrap(),
            Location::Http(_)
        ));
        assert!(matches!(
            Location::parse("ftp://mirror.example.org/tool.dpk").unwrap(),
            Location::Ftp(_)
        ));
    }

    #[test]
    fn test_parse_ssh() {
        let location = Location::parse("ssh://deploy@build.example.org:2222/srv/tool.dpk").unwrap();
        assert_eq!(
            location,
            Location::Ssh {
                user: Some("deploy".to_string()),
                host: "build.example.org".to_string(),
                port: Some(2222),
                path: "/srv/tool.dpk".to_string(),
            }
        );
        assert_eq!(location.to_string(), "ssh://deploy@build.example.org:2222/srv/tool.dpk");

        assert!(matches!(
            Location::parse("sftp://host/tool.dpk").unwrap(),
            Location::Ssh { user: None, port: None, .. }
        ));
        assert!(Location::parse("ssh://host/").is_err());
        assert!(Location::parse("gopher://host/x").is_err());
    }

    #[test]
    fn test_command_lines() {
        let ssh = Location::parse("ssh://deploy@host:2222/srv/tool.dpk").unwrap();
        let (program, args) = CommandTransport::command_line(&ssh).unwrap();
        assert_eq!(program, "ssh");
        assert_eq!(args, ["-p", "2222", "deploy@host", "cat", "/srv/tool.dpk"]);

        let ftp = Location::parse("ftp://mirror/tool.dpk").unwrap();
        let (program, args) = CommandTransport::command_line(&ftp).unwrap();
        assert_eq!(program, "curl");
        assert_eq!(args, ["-sSfL", "ftp://mirror/tool.dpk"]);

        let local = Location::parse("tool.dpk").unwrap();
        assert!(CommandTransport::command_line(&local).is_err());
    }

    #[test]
    fn test_fetch_missing_local_file() {
        let location = Location::parse("/nonexistent/driftpack/tool.dpk").unwrap();
        assert!(matches!(fetch(&location), Err(Error::Io { .. })));
    }
}
