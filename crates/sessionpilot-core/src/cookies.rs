//! Cookie Translator.
//!
//! Converts cookie entries exported by a browser extension (EditThisCookie,
//! Cookie-Editor and similar) into [`BrowserCookie`] values accepted by a
//! remote-controlled browser. Pure data transform: no I/O happens here.
//!
//! Rules:
//! - entries without a non-empty string `name`, or without a `value`, are dropped
//! - `sameSite` is normalized to `Lax`/`Strict`/`None`; unknown values are omitted
//! - `sameSite = None` forces `secure = true`
//! - `expirationDate` (or `expiry`) above 1e12 is read as milliseconds
//! - every cookie is anchored to `anchor_url` instead of domain/path

use crate::models::{BrowserCookie, SameSite};
use serde_json::{Map, Value};

/// Epoch values above this are milliseconds, not seconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Counts produced by [`translate_with_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationReport {
    pub kept: usize,
    pub dropped: usize,
}

/// Translate raw export entries, silently dropping invalid ones.
pub fn translate(entries: &[Value], anchor_url: &str) -> Vec<BrowserCookie> {
    translate_with_report(entries, anchor_url).0
}

/// Same as [`translate`], also reporting how many entries were dropped.
pub fn translate_with_report(
    entries: &[Value],
    anchor_url: &str,
) -> (Vec<BrowserCookie>, TranslationReport) {
    let cookies: Vec<BrowserCookie> = entries
        .iter()
        .filter_map(|entry| translate_entry(entry, anchor_url))
        .collect();
    let report = TranslationReport {
        kept: cookies.len(),
        dropped: entries.len() - cookies.len(),
    };
    (cookies, report)
}

/// Translate one entry; `None` when the entry must be dropped.
pub fn translate_entry(entry: &Value, anchor_url: &str) -> Option<BrowserCookie> {
    let object = entry.as_object()?;

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;
    let value = stringify(object.get("value")?)?;

    let same_site = object
        .get("sameSite")
        .and_then(Value::as_str)
        .and_then(SameSite::from_export);
    let secure = same_site == Some(SameSite::None) || flag(object, "secure");

    let expires = present(object, "expirationDate")
        .or_else(|| present(object, "expiry"))
        .and_then(Value::as_f64)
        .and_then(normalize_expiry);

    Some(BrowserCookie {
        name: name.to_string(),
        value,
        url: anchor_url.to_string(),
        http_only: flag(object, "httpOnly"),
        secure,
        same_site,
        expires,
    })
}

/// Normalize an export timestamp to whole seconds.
///
/// Returns `None` for non-finite or non-positive input, and for values that
/// floor to zero.
pub fn normalize_expiry(raw: f64) -> Option<i64> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let seconds = if raw > MILLIS_THRESHOLD {
        raw / 1000.0
    } else {
        raw
    };
    let seconds = seconds.floor() as i64;
    (seconds > 0).then_some(seconds)
}

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn flag(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

// null counts as a missing value
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ANCHOR: &str = "https://www.tiktok.com";

    #[test]
    fn test_drops_entries_without_name_or_value() {
        let entries = vec![
            json!({"name": "sessionid", "value": "abc"}),
            json!({"value": "no-name"}),
            json!({"name": "", "value": "empty-name"}),
            json!({"name": "no_value"}),
            json!({"name": 42, "value": "numeric-name"}),
            json!("not-an-object"),
        ];

        let (cookies, report) = translate_with_report(&entries, ANCHOR);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "sessionid");
        assert_eq!(report, TranslationReport { kept: 1, dropped: 5 });
    }

    #[test]
    fn test_empty_value_is_kept() {
        let cookies = translate(&[json!({"name": "flag", "value": ""})], ANCHOR);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "");
    }

    #[test]
    fn test_value_is_stringified() {
        let cookies = translate(
            &[
                json!({"name": "count", "value": 7}),
                json!({"name": "enabled", "value": true}),
            ],
            ANCHOR,
        );
        assert_eq!(cookies[0].value, "7");
        assert_eq!(cookies[1].value, "true");
    }

    #[test]
    fn test_defaults_and_anchor() {
        let cookies = translate(&[json!({"name": "a", "value": "b"})], ANCHOR);
        let cookie = &cookies[0];
        assert_eq!(cookie.url, ANCHOR);
        assert!(!cookie.http_only);
        assert!(!cookie.secure);
        assert_eq!(cookie.same_site, None);
        assert_eq!(cookie.expires, None);
    }

    #[test]
    fn test_same_site_none_forces_secure() {
        for raw in ["no_restriction", "none", "NONE", "No_Restriction"] {
            let cookies = translate(
                &[json!({"name": "a", "value": "b", "sameSite": raw, "secure": false})],
                ANCHOR,
            );
            assert_eq!(cookies[0].same_site, Some(SameSite::None), "input {raw}");
            assert!(cookies[0].secure, "input {raw}");
        }
    }

    #[test]
    fn test_other_same_site_values_keep_secure_flag() {
        let cookies = translate(
            &[
                json!({"name": "a", "value": "1", "sameSite": "lax"}),
                json!({"name": "b", "value": "2", "sameSite": "Strict", "secure": true}),
                json!({"name": "c", "value": "3", "sameSite": "unspecified", "httpOnly": true}),
            ],
            ANCHOR,
        );
        assert_eq!(cookies[0].same_site, Some(SameSite::Lax));
        assert!(!cookies[0].secure);
        assert_eq!(cookies[1].same_site, Some(SameSite::Strict));
        assert!(cookies[1].secure);
        assert_eq!(cookies[2].same_site, None);
        assert!(cookies[2].http_only);
    }

    #[test]
    fn test_expiry_normalization() {
        assert_eq!(normalize_expiry(1_999_999_999.0), Some(1_999_999_999));
        assert_eq!(normalize_expiry(1_999_999_999.75), Some(1_999_999_999));
        assert_eq!(normalize_expiry(1_999_999_999_000.0), Some(1_999_999_999));
        assert_eq!(normalize_expiry(1_999_999_999_999.0), Some(1_999_999_999));
        assert_eq!(normalize_expiry(0.0), None);
        assert_eq!(normalize_expiry(-5.0), None);
        assert_eq!(normalize_expiry(f64::NAN), None);
        assert_eq!(normalize_expiry(f64::INFINITY), None);
    }

    #[test]
    fn test_expiry_field_precedence() {
        let cookies = translate(
            &[
                json!({"name": "a", "value": "1", "expirationDate": 1700000000.5, "expiry": 5}),
                json!({"name": "b", "value": "2", "expiry": 1700000000}),
                json!({"name": "c", "value": "3", "expirationDate": null, "expiry": 1700000001}),
                json!({"name": "d", "value": "4", "expirationDate": "soon"}),
            ],
            ANCHOR,
        );
        assert_eq!(cookies[0].expires, Some(1_700_000_000));
        assert_eq!(cookies[1].expires, Some(1_700_000_000));
        assert_eq!(cookies[2].expires, Some(1_700_000_001));
        assert_eq!(cookies[3].expires, None);
    }

    #[test]
    fn test_extension_export_end_to_end() {
        let raw = vec![json!({
            "name": "sessionid",
            "value": "abc",
            "sameSite": "no_restriction",
            "expirationDate": 1999999999000u64
        })];

        let cookies = translate(&raw, ANCHOR);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].same_site, Some(SameSite::None));
        assert!(cookies[0].secure);
        assert_eq!(cookies[0].expires, Some(1_999_999_999));
    }
}
