//! Persistent Netscape-format cookie jar.
//!
//! The jar backs the HTTP client directly (it implements
//! [`reqwest::cookie::CookieStore`]) and round-trips through the classic
//! Netscape cookie file format (7 TAB-separated fields per line). Session
//! cookies (expiry 0) are written out too: the identity cookies the login
//! flow sets are session-scoped upstream but must survive restarts.

use std::fmt;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderValue;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::StoreError;

/// A single cookie held by the jar.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive cookie data.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieRecord {
    /// The domain the cookie belongs to (e.g., `.mlb.com`).
    pub domain: String,
    /// Whether subdomains should match.
    pub tailmatch: bool,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl CookieRecord {
    /// Creates a new cookie record.
    #[must_use]
    pub fn new(
        domain: String,
        tailmatch: bool,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            tailmatch,
            path,
            secure,
            expires,
            name,
            value,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the record as one Netscape cookie file line.
    fn to_netscape_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.domain,
            if self.tailmatch { "TRUE" } else { "FALSE" },
            self.path,
            if self.secure { "TRUE" } else { "FALSE" },
            self.expires,
            self.name,
            self.value,
        )
    }

    /// True when the cookie carries an expiry that has already passed.
    /// Session cookies (expires 0) never expire here.
    fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("domain", &self.domain)
            .field("tailmatch", &self.tailmatch)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// In-memory cookie jar with Netscape-file persistence.
///
/// Wired into the HTTP client via `ClientBuilder::cookie_provider`, so every
/// `Set-Cookie` the identity endpoints send lands here, and every request
/// the session makes carries the matching cookies back. `save` must be
/// called after mutating operations; the jar does not write the file on
/// its own.
#[derive(Debug, Default)]
pub struct PersistentJar {
    records: Mutex<Vec<CookieRecord>>,
}

impl PersistentJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a jar from a Netscape-format cookie file.
    ///
    /// A missing file yields an empty jar (first run). Malformed lines are
    /// skipped with a warning rather than failing the whole load.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file exists but cannot be read.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "no cookie file, starting with empty jar");
            return Ok(Self::new());
        }
        let file = fs::File::open(path).map_err(|e| StoreError::io(path, e))?;
        let reader = std::io::BufReader::new(file);

        let mut records = Vec::new();
        for (idx, line_result) in reader.lines().enumerate() {
            let line_number = idx + 1;
            let line = line_result.map_err(|e| StoreError::io(path, e))?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_cookie_line(line) {
                Some(record) => records.push(record),
                None => {
                    warn!(line = line_number, "skipping malformed cookie line");
                }
            }
        }
        debug!(path = %path.display(), cookies = records.len(), "loaded cookie jar");
        Ok(Self {
            records: Mutex::new(records),
        })
    }

    /// Writes the jar to a Netscape-format cookie file with an atomic
    /// overwrite. Session cookies are included (`ignore_discard` semantics).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on any filesystem failure.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let records = self.lock();
        let mut out = String::from("# Netscape HTTP Cookie File\n");
        for record in records.iter() {
            out.push_str(&record.to_netscape_line());
            out.push('\n');
        }
        drop(records);

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, out).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
        Ok(())
    }

    /// Returns the value of the first unexpired cookie with `name`,
    /// regardless of domain.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<String> {
        let now = now_unix();
        self.lock()
            .iter()
            .find(|c| c.name == name && !c.is_expired(now))
            .map(|c| c.value.clone())
    }

    /// Removes all cookies from the jar (the on-disk file is untouched
    /// until the next `save`).
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cookies currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Inserts a cookie, replacing any existing cookie with the same
    /// (name, domain, path). A cookie that arrives already expired acts as
    /// a deletion.
    pub fn insert(&self, record: CookieRecord) {
        let mut records = self.lock();
        records
            .retain(|c| !(c.name == record.name && c.domain == record.domain && c.path == record.path));
        if !record.is_expired(now_unix()) {
            records.push(record);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CookieRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl reqwest::cookie::CookieStore for PersistentJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                warn!("ignoring non-UTF8 Set-Cookie header");
                continue;
            };
            match parse_set_cookie(raw, url) {
                Some(record) => {
                    debug!(domain = %record.domain, name = %record.name, "stored cookie");
                    self.insert(record);
                }
                None => warn!("ignoring unparseable Set-Cookie header"),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let https = url.scheme() == "https";
        let now = now_unix();

        let records = self.lock();
        let header = records
            .iter()
            .filter(|c| !c.is_expired(now))
            .filter(|c| domain_matches(c, host))
            .filter(|c| url.path().starts_with(c.path.as_str()))
            .filter(|c| https || !c.secure)
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        drop(records);

        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }
}

/// Parses a single Netscape cookie line (7 TAB-separated fields).
fn parse_cookie_line(line: &str) -> Option<CookieRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return None;
    }
    let domain = fields[0];
    let name = fields[5];
    if domain.is_empty() || name.is_empty() {
        return None;
    }
    let tailmatch = parse_bool_field(fields[1])?;
    let secure = parse_bool_field(fields[3])?;
    let expires = fields[4].parse::<u64>().ok()?;

    Some(CookieRecord::new(
        domain.to_string(),
        tailmatch,
        fields[2].to_string(),
        secure,
        expires,
        name.to_string(),
        fields[6].to_string(),
    ))
}

fn parse_bool_field(value: &str) -> Option<bool> {
    match value {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

/// Parses a `Set-Cookie` header into a record, defaulting the domain to the
/// response host when no `Domain` attribute is present (host-only cookie).
fn parse_set_cookie(raw: &str, url: &Url) -> Option<CookieRecord> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut domain = url.host_str()?.to_string();
    let mut tailmatch = false;
    let mut path = "/".to_string();
    let mut secure = false;
    let mut expires = 0u64;

    for attr in parts {
        let attr = attr.trim();
        let (key, attr_value) = match attr.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
            None => (attr.to_ascii_lowercase(), ""),
        };
        match key.as_str() {
            "domain" if !attr_value.is_empty() => {
                // A Domain attribute makes the cookie match subdomains.
                domain = attr_value.trim_start_matches('.').to_string();
                tailmatch = true;
            }
            "path" if !attr_value.is_empty() => path = attr_value.to_string(),
            "secure" => secure = true,
            "max-age" => {
                if let Ok(seconds) = attr_value.parse::<i64>() {
                    // Max-Age <= 0 means delete; an expiry of 1 is always past.
                    expires = if seconds <= 0 {
                        1
                    } else {
                        now_unix().saturating_add(seconds.unsigned_abs())
                    };
                }
            }
            "expires" if expires == 0 => {
                if let Ok(time) = httpdate::parse_http_date(attr_value) {
                    expires = time
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(1);
                }
            }
            _ => {}
        }
    }

    Some(CookieRecord::new(
        domain,
        tailmatch,
        path,
        secure,
        expires,
        name.to_string(),
        value.trim().to_string(),
    ))
}

/// Domain matching: exact host match always; suffix match only for cookies
/// set with a `Domain` attribute (tailmatch).
fn domain_matches(record: &CookieRecord, host: &str) -> bool {
    let domain = record.domain.strip_prefix('.').unwrap_or(&record.domain);
    if host == domain {
        return true;
    }
    record.tailmatch && host.ends_with(&format!(".{domain}"))
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
