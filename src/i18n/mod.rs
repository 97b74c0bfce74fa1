//! Bundled translation catalogs and coverage reporting.

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;

pub const DEFAULT_LOCALE: &str = "en";
/// Bundles are immutable per release, so clients may cache them for a day.
pub const BUNDLE_MAX_AGE_SECS: u32 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LocaleInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub direction: TextDirection,
}

pub const SUPPORTED_LOCALES: [LocaleInfo; 3] = [
    LocaleInfo { code: "en", name: "English", direction: TextDirection::Ltr },
    LocaleInfo { code: "ar", name: "العربية", direction: TextDirection::Rtl },
    LocaleInfo { code: "hi", name: "हिन्दी", direction: TextDirection::Ltr },
];

const BUNDLED: [(&str, &str); 3] = [
    ("en", include_str!("../../locales/en.json")),
    ("ar", include_str!("../../locales/ar.json")),
    ("hi", include_str!("../../locales/hi.json")),
];

static CATALOG: Lazy<TranslationCatalog> = Lazy::new(TranslationCatalog::bundled);

/// Process-wide catalog built from the bundled locale files.
pub fn catalog() -> &'static TranslationCatalog {
    &CATALOG
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageCoverage {
    pub code: &'static str,
    pub name: &'static str,
    pub direction: TextDirection,
    pub total_keys: usize,
    pub translated_keys: usize,
    pub coverage_percent: f64,
    pub missing_keys: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TranslationCatalog {
    bundles: BTreeMap<&'static str, Value>,
}

impl TranslationCatalog {
    pub fn bundled() -> Self {
        let mut bundles = BTreeMap::new();
        for (code, raw) in BUNDLED {
            match serde_json::from_str::<Value>(raw) {
                Ok(bundle) if bundle.is_object() => {
                    bundles.insert(code, bundle);
                }
                Ok(_) => error!(locale = code, "Translation bundle is not a JSON object"),
                Err(e) => error!(locale = code, "Failed to parse translation bundle: {}", e),
            }
        }
        Self { bundles }
    }

    pub fn from_bundles(bundles: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            bundles: bundles.into_iter().collect(),
        }
    }

    /// Bundle for `locale`. Accepts region-qualified tags such as `en-US`.
    pub fn bundle(&self, locale: &str) -> Option<&Value> {
        let code = normalize_locale(locale)?;
        self.bundles.get(code.as_str())
    }

    /// Per-language key coverage measured against the default locale.
    pub fn coverage(&self) -> Vec<LanguageCoverage> {
        let reference: BTreeSet<String> = self
            .bundles
            .get(DEFAULT_LOCALE)
            .map(leaf_keys)
            .unwrap_or_default();

        SUPPORTED_LOCALES
            .iter()
            .map(|locale| {
                let present = self.bundles.get(locale.code).map(leaf_keys).unwrap_or_default();
                let missing_keys: Vec<String> = reference.difference(&present).cloned().collect();
                let translated_keys = reference.len() - missing_keys.len();
                let coverage_percent = if reference.is_empty() {
                    0.0
                } else {
                    (translated_keys as f64 * 1000.0 / reference.len() as f64).round() / 10.0
                };

                LanguageCoverage {
                    code: locale.code,
                    name: locale.name,
                    direction: locale.direction,
                    total_keys: reference.len(),
                    translated_keys,
                    coverage_percent,
                    missing_keys,
                }
            })
            .collect()
    }
}

fn normalize_locale(locale: &str) -> Option<String> {
    let primary = locale.trim().split(['-', '_']).next()?.to_ascii_lowercase();
    if primary.is_empty() || !primary.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some(primary)
}

/// Dotted paths of every non-empty string leaf.
fn leaf_keys(bundle: &Value) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect_leaves(bundle, String::new(), &mut keys);
    keys
}

fn collect_leaves(value: &Value, prefix: String, keys: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                collect_leaves(child, path, keys);
            }
        }
        Value::String(s) if !s.trim().is_empty() => {
            keys.insert(prefix);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bundled_catalog_serves_supported_locales() {
        let catalog = catalog();
        for locale in SUPPORTED_LOCALES {
            assert!(catalog.bundle(locale.code).is_some(), "missing bundle {}", locale.code);
        }
        assert!(catalog.bundle("en-US").is_some());
        assert!(catalog.bundle("fr").is_none());
        assert!(catalog.bundle("../en").is_none());
    }

    #[test]
    fn default_locale_is_fully_covered() {
        let coverage = catalog().coverage();
        let en = coverage.iter().find(|c| c.code == "en").unwrap();
        assert_eq!(en.coverage_percent, 100.0);
        assert!(en.missing_keys.is_empty());

        let ar = coverage.iter().find(|c| c.code == "ar").unwrap();
        assert_eq!(ar.direction, TextDirection::Rtl);
        assert!(ar.translated_keys < ar.total_keys);
    }

    #[test]
    fn coverage_ignores_blank_strings() {
        let catalog = TranslationCatalog::from_bundles([
            ("en", json!({"a": "A", "b": {"c": "C"}})),
            ("hi", json!({"a": " ", "b": {"c": "सी"}})),
        ]);
        let hi = catalog.coverage().into_iter().find(|c| c.code == "hi").unwrap();
        assert_eq!(hi.total_keys, 2);
        assert_eq!(hi.translated_keys, 1);
        assert_eq!(hi.missing_keys, vec!["a".to_string()]);
        assert_eq!(hi.coverage_percent, 50.0);
    }
}
