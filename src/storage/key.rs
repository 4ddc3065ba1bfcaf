use chrono::{DateTime, Utc};
use uuid::Uuid;

const KEY_PREFIX: &str = "documents";
const FALLBACK_STEM: &str = "file";

/// Replaces every character outside ASCII letters, digits, `_` and `-` with `_`.
#[must_use]
pub fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derives the storage key for an upload:
/// `documents/{user_id}/{YYYYMMDDHHMMSSffffff}_{stem}_{nonce}{.ext}`.
///
/// The nonce keeps two same-named files uploaded within one microsecond apart.
#[must_use]
pub fn storage_key(user_id: i64, uploaded_at: DateTime<Utc>, filename: &str) -> String {
    let (stem, ext) = split_filename(base_name(filename));

    let stem = sanitize_component(stem);
    let stem = if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    };

    let ext = ext
        .map(|e| sanitize_component(&e.to_ascii_lowercase()))
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let nonce = &Uuid::new_v4().simple().to_string()[..8];

    format!(
        "{KEY_PREFIX}/{user_id}/{}_{stem}_{nonce}{ext}",
        uploaded_at.format("%Y%m%d%H%M%S%6f")
    )
}

/// Strips any directory components a client may send along with the name.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

fn split_filename(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap()
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("annual report (v2)"), "annual_report__v2_");
        assert_eq!(sanitize_component("already-safe_name"), "already-safe_name");
        assert_eq!(sanitize_component("factura_ñ"), "factura__");
    }

    #[test]
    fn test_storage_key_layout() {
        let key = storage_key(42, at(), "Annual Report.PDF");

        assert!(key.starts_with("documents/42/20261019083005000000_Annual_Report_"));
        assert!(key.ends_with(".pdf"));
        assert!(!key.contains(' '));
    }

    #[test]
    fn test_storage_key_strips_directories() {
        let key = storage_key(1, at(), "C:\\Users\\me\\..\\tax.xlsx");
        assert!(key.starts_with("documents/1/20261019083005000000_tax_"));
        assert!(!key.contains(".."));

        let key = storage_key(1, at(), "../../etc/passwd");
        assert!(key.starts_with("documents/1/20261019083005000000_passwd_"));
    }

    #[test]
    fn test_storage_key_without_extension() {
        let key = storage_key(1, at(), "README");
        assert!(!key.contains('.'));

        let key = storage_key(1, at(), ".env");
        assert!(key.contains("__env_"));
    }

    #[test]
    fn test_storage_key_empty_stem_falls_back() {
        let key = storage_key(1, at(), "");
        assert!(key.starts_with("documents/1/20261019083005000000_file_"));
    }

    #[test]
    fn test_storage_keys_do_not_collide() {
        assert_ne!(storage_key(1, at(), "a.pdf"), storage_key(1, at(), "a.pdf"));
    }
}
