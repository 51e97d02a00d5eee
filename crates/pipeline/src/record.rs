//! Name record domain model.
//!
//! A `NameRecord` is one entry in the corpus. Records arrive from chunk
//! files with uneven shapes (string-or-list origins, two rank fields,
//! assorted extra keys from years of one-off scripts), so the struct
//! normalizes at the serde boundary and round-trips unknown fields
//! untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sentinel rank meaning "unranked".
pub const UNRANKED: u32 = 999_999;

/// Gender classification for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    /// Derive a gender from a probabilistic `{male, female}` pair.
    ///
    /// One consistent rule: male share strictly above 0.65 is male, strictly
    /// below 0.35 is female, and the inclusive band [0.35, 0.65] is unisex.
    /// A pair with no observations is unisex.
    pub fn from_counts(male: f64, female: f64) -> Self {
        let total = male + female;
        if total <= 0.0 {
            return Gender::Unisex;
        }

        let male_share = male / total;
        if male_share > 0.65 {
            Gender::Male
        } else if male_share < 0.35 {
            Gender::Female
        } else {
            Gender::Unisex
        }
    }
}

/// Observed gender usage counts (or probabilities) for a name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenderCounts {
    pub male: f64,
    pub female: f64,
}

/// Cultural origin(s) of a name.
///
/// The corpus stores origins as either a single string or a list; this
/// untagged union accepts both and normalizes through [`Origin::as_list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Origin {
    One(String),
    Many(Vec<String>),
}

impl Origin {
    /// View the origin as a list regardless of stored shape.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Origin::One(s) => vec![s.as_str()],
            Origin::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// True when every stored origin is an unknown placeholder.
    pub fn is_unknown(&self) -> bool {
        self.as_list().iter().all(|s| is_unknown_origin(s))
    }
}

/// True for origin strings that mean "we don't know".
pub fn is_unknown_origin(origin: &str) -> bool {
    let s = origin.trim().to_lowercase();
    s.is_empty() || s == "unknown" || s == "unknown origin" || s == "not available" || s == "n/a"
}

/// Collapse regional origin variants the corpus does not distinguish.
///
/// Any origin mentioning "african" becomes the single "African" bucket.
pub fn normalize_origin(origin: &str) -> String {
    if origin.to_lowercase().contains("african") {
        "African".to_string()
    } else {
        origin.to_string()
    }
}

/// Likely origin for a primary-country code, used as a fallback when the
/// model cannot name one.
pub fn origin_for_country(country: &str) -> Option<&'static str> {
    let origin = match country.to_uppercase().as_str() {
        "ES" | "MX" | "CO" | "AR" | "CL" | "PE" | "VE" | "EC" | "GT" | "CU" | "BO" | "DO"
        | "HN" | "PY" | "SV" | "NI" | "CR" | "PA" | "UY" | "PR" | "PH" => "Spanish",
        "BR" | "PT" => "Portuguese",
        "FR" => "French",
        "IT" => "Italian",
        "DE" => "Germanic",
        "GB" | "US" => "English",
        "IE" => "Irish",
        "IN" => "Indian",
        "CN" => "Chinese",
        "JP" => "Japanese",
        "KR" => "Korean",
        "RU" => "Russian",
        "PL" => "Polish",
        "TR" => "Turkish",
        "IR" => "Persian",
        "SA" | "EG" | "AE" => "Arabic",
        "IL" => "Hebrew",
        "GR" => "Greek",
        "NG" | "KE" | "ZA" | "GH" | "ET" => "African",
        _ => return None,
    };
    Some(origin)
}

/// One entry in the name corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameRecord {
    /// Name identifier; non-empty, not unique across genders
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    /// Raw gender observation counts, when the importer recorded them
    #[serde(rename = "genderCounts", skip_serializing_if = "Option::is_none")]
    pub gender_counts: Option<GenderCounts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,

    /// Alternate meanings, when the model listed several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meanings: Option<Vec<String>>,

    #[serde(rename = "culturalContext", skip_serializing_if = "Option::is_none")]
    pub cultural_context: Option<String>,

    #[serde(rename = "popularityRank", skip_serializing_if = "Option::is_none")]
    pub popularity_rank: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,

    /// Set once enrichment succeeds for this record
    #[serde(default)]
    pub enriched: bool,

    #[serde(rename = "enrichedAt", skip_serializing_if = "Option::is_none")]
    pub enriched_at: Option<DateTime<Utc>>,

    /// Country-code hint passed to the enrichment prompt
    #[serde(rename = "primaryCountry", skip_serializing_if = "Option::is_none")]
    pub primary_country: Option<String>,

    /// Fields this pipeline does not interpret; preserved on save
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NameRecord {
    /// Create a bare record with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gender: None,
            gender_counts: None,
            origin: None,
            meaning: None,
            meanings: None,
            cultural_context: None,
            popularity_rank: None,
            rank: None,
            enriched: false,
            enriched_at: None,
            primary_country: None,
            extra: BTreeMap::new(),
        }
    }

    /// Fill `gender` from the recorded counts when it is missing.
    pub fn resolve_gender(&mut self) {
        if self.gender.is_none() {
            if let Some(counts) = self.gender_counts {
                self.gender = Some(Gender::from_counts(counts.male, counts.female));
            }
        }
    }

    /// A record is complete only when meaning and origin are both present
    /// and non-empty, and the origin is not an unknown placeholder.
    pub fn is_complete(&self) -> bool {
        let has_meaning = self
            .meaning
            .as_ref()
            .map(|m| !m.trim().is_empty())
            .unwrap_or(false);

        let has_origin = self
            .origin
            .as_ref()
            .map(|o| !o.is_unknown())
            .unwrap_or(false);

        has_meaning && has_origin
    }

    /// True when the record should be sent through enrichment.
    pub fn needs_enrichment(&self) -> bool {
        !self.enriched || !self.is_complete()
    }

    /// True when the rank is absent or the unranked sentinel.
    pub fn is_unranked(&self) -> bool {
        match self.popularity_rank.or(self.rank) {
            Some(rank) => rank >= UNRANKED,
            None => true,
        }
    }

    /// Apply a successful enrichment result.
    pub fn apply_enrichment(
        &mut self,
        meaning: Option<String>,
        origin: Option<Origin>,
        cultural_context: Option<String>,
        enriched_at: DateTime<Utc>,
    ) {
        if let Some(meaning) = meaning {
            if !meaning.trim().is_empty() {
                self.meaning = Some(meaning);
            }
        }

        let origin = origin.map(|o| {
            let mut normalized: Vec<String> =
                o.as_list().iter().map(|s| normalize_origin(s)).collect();
            if normalized.len() == 1 {
                Origin::One(normalized.swap_remove(0))
            } else {
                Origin::Many(normalized)
            }
        });

        // The model occasionally still answers "Unknown"; fall back to the
        // country hint before giving up.
        let origin = match origin {
            Some(o) if o.is_unknown() => self
                .primary_country
                .as_deref()
                .and_then(origin_for_country)
                .map(|s| Origin::One(s.to_string()))
                .or(Some(o)),
            other => other,
        };

        if let Some(origin) = origin {
            self.origin = Some(origin);
        }

        if let Some(ctx) = cultural_context {
            if !ctx.trim().is_empty() {
                self.cultural_context = Some(ctx);
            }
        }

        self.enriched = true;
        self.enriched_at = Some(enriched_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_derivation_thresholds() {
        assert_eq!(Gender::from_counts(0.7, 0.3), Gender::Male);
        assert_eq!(Gender::from_counts(0.5, 0.5), Gender::Unisex);
        assert_eq!(Gender::from_counts(0.4, 0.6), Gender::Unisex);
        // Band edges are inclusive
        assert_eq!(Gender::from_counts(0.65, 0.35), Gender::Unisex);
        assert_eq!(Gender::from_counts(0.35, 0.65), Gender::Unisex);
        assert_eq!(Gender::from_counts(0.34, 0.66), Gender::Female);
        // Raw counts work the same as probabilities
        assert_eq!(Gender::from_counts(5204.0, 310.0), Gender::Male);
        assert_eq!(Gender::from_counts(0.0, 0.0), Gender::Unisex);
    }

    #[test]
    fn test_resolve_gender_fills_missing_only() {
        let mut record = NameRecord::new("Avery");
        record.gender_counts = Some(GenderCounts {
            male: 0.48,
            female: 0.52,
        });
        record.resolve_gender();
        assert_eq!(record.gender, Some(Gender::Unisex));

        let mut explicit = NameRecord::new("Maria");
        explicit.gender = Some(Gender::Female);
        explicit.gender_counts = Some(GenderCounts {
            male: 0.9,
            female: 0.1,
        });
        explicit.resolve_gender();
        assert_eq!(explicit.gender, Some(Gender::Female));
    }

    #[test]
    fn test_origin_accepts_string_and_list() {
        let one: NameRecord =
            serde_json::from_str(r#"{"name": "Ada", "origin": "Germanic"}"#).unwrap();
        let many: NameRecord =
            serde_json::from_str(r#"{"name": "Ada", "origin": ["Germanic", "Hebrew"]}"#).unwrap();

        assert_eq!(one.origin.unwrap().as_list(), vec!["Germanic"]);
        assert_eq!(many.origin.unwrap().as_list(), vec!["Germanic", "Hebrew"]);
    }

    #[test]
    fn test_unknown_origin_detection() {
        assert!(is_unknown_origin("Unknown"));
        assert!(is_unknown_origin("not available"));
        assert!(is_unknown_origin("N/A"));
        assert!(is_unknown_origin("  "));
        assert!(!is_unknown_origin("Hebrew"));
    }

    #[test]
    fn test_completeness_requires_meaning_and_known_origin() {
        let mut record = NameRecord::new("Zuri");
        assert!(!record.is_complete());

        record.meaning = Some("beautiful".to_string());
        assert!(!record.is_complete());

        record.origin = Some(Origin::One("Unknown".to_string()));
        assert!(!record.is_complete());

        record.origin = Some(Origin::One("African".to_string()));
        assert!(record.is_complete());
    }

    #[test]
    fn test_unranked_sentinel() {
        let mut record = NameRecord::new("Ada");
        assert!(record.is_unranked());

        record.popularity_rank = Some(UNRANKED);
        assert!(record.is_unranked());

        record.popularity_rank = Some(42);
        assert!(!record.is_unranked());
    }

    #[test]
    fn test_apply_enrichment_normalizes_african_origins() {
        let mut record = NameRecord::new("Zuri");
        record.apply_enrichment(
            Some("beautiful".to_string()),
            Some(Origin::One("West African".to_string())),
            None,
            Utc::now(),
        );

        assert!(record.enriched);
        assert_eq!(record.origin, Some(Origin::One("African".to_string())));
        assert!(record.enriched_at.is_some());
    }

    #[test]
    fn test_apply_enrichment_falls_back_to_country_hint() {
        let mut record = NameRecord::new("Yaritza");
        record.primary_country = Some("PR".to_string());
        record.apply_enrichment(
            Some("small butterfly".to_string()),
            Some(Origin::One("Unknown".to_string())),
            None,
            Utc::now(),
        );

        assert_eq!(record.origin, Some(Origin::One("Spanish".to_string())));
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let json = r#"{"name": "Ada", "syllables": 2, "firstLetter": "A"}"#;
        let record: NameRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.extra.len(), 2);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["syllables"], 2);
        assert_eq!(out["firstLetter"], "A");
    }
}
