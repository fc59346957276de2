//! Connection target extracted from a `ws://` / `wss://` URL.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(wss?)://([\w.-]+):(\d+)(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
	Ws,
	Wss,
}

impl Scheme {
	pub fn as_str(self) -> &'static str {
		match self {
			Scheme::Ws => "ws",
			Scheme::Wss => "wss",
		}
	}
}

/// Host, port and path of a session. Parsed once; never reparsed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
	pub scheme: Scheme,
	pub host: String,
	pub port: u16,
	pub path: String,
}

impl Target {
	/// Parses `ws[s]://host:port[/path]`. The port is mandatory; an empty path
	/// becomes `/`.
	pub fn parse(url: &str) -> Result<Self> {
		let url = url.trim();
		let caps = URL_PATTERN
			.captures(url)
			.ok_or_else(|| Error::InvalidUrl(url.to_string()))?;

		let scheme = match &caps[1] {
			"wss" => Scheme::Wss,
			_ => Scheme::Ws,
		};
		let port: u16 = caps[3].parse().map_err(|_| Error::InvalidUrl(url.to_string()))?;

		let mut path = caps[4].trim().to_string();
		if path.is_empty() {
			path.push('/');
		}
		if !path.starts_with('/') {
			return Err(Error::InvalidUrl(url.to_string()));
		}

		Ok(Self {
			scheme,
			host: caps[2].to_string(),
			port,
			path,
		})
	}

	/// `host:port`, the resolver query.
	pub fn authority(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Full request URI used for the upgrade request.
	pub fn request_uri(&self) -> String {
		format!("{}://{}:{}{}", self.scheme.as_str(), self.host, self.port, self.path)
	}
}

impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.request_uri())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_full_url() {
		let target = Target::parse("ws://localhost:8080/v2/ws").unwrap();
		assert_eq!(target.scheme, Scheme::Ws);
		assert_eq!(target.host, "localhost");
		assert_eq!(target.port, 8080);
		assert_eq!(target.path, "/v2/ws");
		assert_eq!(target.authority(), "localhost:8080");
	}

	#[test]
	fn empty_path_defaults_to_root() {
		let target = Target::parse("wss://echo.example.org:443").unwrap();
		assert_eq!(target.scheme, Scheme::Wss);
		assert_eq!(target.path, "/");
		assert_eq!(target.request_uri(), "wss://echo.example.org:443/");
	}

	#[test]
	fn path_whitespace_is_trimmed() {
		let target = Target::parse("ws://127.0.0.1:9000/x  ").unwrap();
		assert_eq!(target.path, "/x");
	}

	#[test]
	fn rejects_malformed_urls() {
		for url in [
			"not-a-url",
			"http://localhost:8080/",
			"ws://localhost/",
			"ws://localhost:99999/",
			"ws://:8080/",
			"ws://local host:8080/",
			"ws://localhost:8080?query",
		] {
			let err = Target::parse(url).unwrap_err();
			assert!(matches!(err, Error::InvalidUrl(_)), "{url}: {err:?}");
		}
	}
}
