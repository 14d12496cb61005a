//! Opaque file downloads (PDF reports, Excel exports).

#[cfg(test)]
#[path = "download_test.rs"]
mod download_test;

use std::io;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

/// Expected file family, used to synthesize a name when the server sends none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Excel,
}

impl FileKind {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "xlsx",
        }
    }
}

/// A downloaded file held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Download {
    pub(crate) fn from_response(
        disposition: Option<&str>,
        content_type: Option<String>,
        bytes: Vec<u8>,
        stem: &str,
        kind: FileKind,
    ) -> Self {
        let filename = disposition
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| synthesize_filename(stem, kind, OffsetDateTime::now_utc()));
        Self { filename, content_type, bytes }
    }

    /// Write into `dir` under the suggested filename, returning the path.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub fn save_into(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// `filename*=UTF-8''…` wins over `filename=`. Directory components are
/// stripped so a hostile header cannot point outside the target directory.
#[must_use]
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_ext_value(value.trim()),
            "filename" => plain = Some(unquote(value.trim())),
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| sanitize_filename(&name))
}

/// Split header parameters on `;` outside quoted strings.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(header[start..].trim());
    params
}

/// Strip surrounding quotes and resolve `\"` escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_owned();
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// `<stem>_<YYYYMMDD_HHMM>.<ext>`.
#[must_use]
pub fn synthesize_filename(stem: &str, kind: FileKind, at: OffsetDateTime) -> String {
    format!(
        "{stem}_{:04}{:02}{:02}_{:02}{:02}.{}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        kind.extension()
    )
}

/// RFC 5987 `charset'lang'pct-encoded`.
fn decode_ext_value(raw: &str) -> Option<String> {
    let mut parts = raw.splitn(3, '\'');
    let charset = parts.next()?;
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    percent_decode(encoded)
}

fn percent_decode(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_owned())
}
