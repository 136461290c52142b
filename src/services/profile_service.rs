//! Citizen profile scraping.
//!
//! The profile markup carries no stable ids, so every field is read through an
//! ordered list of [`Strategy`] values; the first one that yields non-empty
//! text wins. Reordering a field's strategies changes which value is stored.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::models::application::ProfileFields;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePage {
    pub bio: String,
    /// Display handle as shown on the page; informational only, not persisted.
    pub handle_name: Option<String>,
    pub fields: ProfileFields,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch_profile(&self, handle: &str) -> Result<ProfilePage>;
}

#[derive(Clone)]
pub struct RsiProfileService {
    client: Client,
    base_url: String,
    asset_origin: String,
}

impl RsiProfileService {
    pub fn new(client: Client, base_url: String, asset_origin: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            asset_origin,
        }
    }

    /// `<base>/<handle>` with the handle as a single percent-encoded path
    /// segment, so `/`, `?` or `#` in a handle cannot point at another page.
    pub fn profile_url(&self, handle: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Fetch(format!("invalid profile base {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Fetch(format!("profile base {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(handle);
        Ok(url)
    }
}

#[async_trait]
impl ProfileFetcher for RsiProfileService {
    async fn fetch_profile(&self, handle: &str) -> Result<ProfilePage> {
        let url = self.profile_url(handle)?;
        tracing::info!(%url, "Fetching citizen profile");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned {}", url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("reading {} failed: {}", url, e)))?;

        Ok(parse_profile(&body, &self.asset_origin))
    }
}

/// Section roots of the profile page.
const PERSONAL: &str = ".info";
const MAIN_ORG: &str = ".main-org .info";
const LEFT_COL: &str = ".left-col .inner";

const ENTRY_STRONG: &str = "p.entry strong.value";

/// One way of reading a field out of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Text of every `value` match inside every `section`, concatenated.
    AllText {
        section: &'static str,
        value: &'static str,
    },
    /// Text of `value` inside `p.entry` elements whose text contains `label`.
    Labeled {
        section: &'static str,
        label: &'static str,
        value: &'static str,
    },
    /// Text of the `index`-th `value` match across all `section` elements.
    Positional {
        section: &'static str,
        value: &'static str,
        index: usize,
    },
    /// `attr` of the first match.
    Attribute {
        selector: &'static str,
        attr: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Bio,
    HandleName,
    RealName,
    Title,
    OrgName,
    OrgSid,
    OrgRank,
    EnlistedDate,
    Location,
    Fluency,
    ProfileImageUrl,
    OrgLogoUrl,
}

pub struct FieldRule {
    pub field: Field,
    pub strategies: &'static [Strategy],
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Bio,
        strategies: &[Strategy::AllText { section: ".bio", value: ".value" }],
    },
    FieldRule {
        field: Field::RealName,
        strategies: &[Strategy::Positional { section: PERSONAL, value: ENTRY_STRONG, index: 0 }],
    },
    FieldRule {
        field: Field::HandleName,
        strategies: &[
            Strategy::Labeled { section: PERSONAL, label: "Handle name", value: "strong.value" },
            Strategy::Positional { section: PERSONAL, value: ENTRY_STRONG, index: 1 },
        ],
    },
    FieldRule {
        field: Field::Title,
        strategies: &[Strategy::AllText { section: PERSONAL, value: "p.entry span.value" }],
    },
    FieldRule {
        field: Field::OrgName,
        strategies: &[Strategy::AllText { section: MAIN_ORG, value: "p.entry a.value" }],
    },
    FieldRule {
        field: Field::OrgSid,
        strategies: &[
            Strategy::Labeled { section: MAIN_ORG, label: "SID", value: "strong.value" },
            Strategy::Positional { section: MAIN_ORG, value: ENTRY_STRONG, index: 0 },
        ],
    },
    FieldRule {
        field: Field::OrgRank,
        strategies: &[
            Strategy::Labeled { section: MAIN_ORG, label: "rank", value: "strong.value" },
            Strategy::Positional { section: MAIN_ORG, value: ENTRY_STRONG, index: 1 },
        ],
    },
    FieldRule {
        field: Field::EnlistedDate,
        strategies: &[
            Strategy::Labeled { section: LEFT_COL, label: "Enlisted", value: "strong.value" },
            Strategy::Positional { section: LEFT_COL, value: ENTRY_STRONG, index: 0 },
        ],
    },
    FieldRule {
        field: Field::Location,
        strategies: &[
            Strategy::Labeled { section: LEFT_COL, label: "Location", value: "strong.value" },
            Strategy::Positional { section: LEFT_COL, value: ENTRY_STRONG, index: 1 },
        ],
    },
    FieldRule {
        field: Field::Fluency,
        strategies: &[
            Strategy::Labeled { section: LEFT_COL, label: "Fluency", value: "strong.value" },
            Strategy::Positional { section: LEFT_COL, value: ENTRY_STRONG, index: 2 },
        ],
    },
    FieldRule {
        field: Field::ProfileImageUrl,
        strategies: &[
            Strategy::Attribute { selector: ".profile .thumb img", attr: "src" },
            Strategy::Attribute { selector: ".thumb img", attr: "src" },
        ],
    },
    FieldRule {
        field: Field::OrgLogoUrl,
        strategies: &[Strategy::Attribute { selector: ".main-org .thumb img", attr: "src" }],
    },
];

/// Extracts the bio and profile fields. Missing markup leaves fields `None`.
pub fn parse_profile(html: &str, asset_origin: &str) -> ProfilePage {
    let document = Html::parse_document(html);
    let mut page = ProfilePage::default();

    for rule in FIELD_RULES {
        let value = extract(&document, rule.strategies);
        match rule.field {
            Field::Bio => page.bio = value.unwrap_or_default(),
            Field::HandleName => page.handle_name = value,
            Field::RealName => page.fields.real_name = value,
            Field::Title => page.fields.title = value,
            Field::OrgName => page.fields.org_name = value,
            Field::OrgSid => page.fields.org_sid = value,
            Field::OrgRank => page.fields.org_rank = value,
            Field::EnlistedDate => page.fields.enlisted_date = value,
            Field::Location => page.fields.location = value,
            Field::Fluency => page.fields.fluency = value,
            Field::ProfileImageUrl => {
                page.fields.profile_image_url = value.map(|v| absolutize(&v, asset_origin))
            }
            Field::OrgLogoUrl => {
                page.fields.org_logo_url = value.map(|v| absolutize(&v, asset_origin))
            }
        }
    }

    page
}

/// First non-empty result of `strategies`, trimmed.
pub fn extract(document: &Html, strategies: &[Strategy]) -> Option<String> {
    strategies
        .iter()
        .filter_map(|strategy| apply(document, strategy))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn apply(document: &Html, strategy: &Strategy) -> Option<String> {
    match *strategy {
        Strategy::AllText { section, value } => {
            let value_sel = selector(value)?;
            let text = sections(document, section)?
                .iter()
                .flat_map(|root| root.select(&value_sel))
                .map(element_text)
                .collect::<String>();
            Some(text)
        }
        Strategy::Labeled { section, label, value } => {
            let entry_sel = selector("p.entry")?;
            let value_sel = selector(value)?;
            let text = sections(document, section)?
                .iter()
                .flat_map(|root| root.select(&entry_sel))
                .filter(|entry| element_text(*entry).contains(label))
                .flat_map(|entry| entry.select(&value_sel))
                .map(element_text)
                .collect::<String>();
            Some(text)
        }
        Strategy::Positional { section, value, index } => {
            let value_sel = selector(value)?;
            let mut seen: Vec<ElementRef<'_>> = Vec::new();
            for root in sections(document, section)? {
                for el in root.select(&value_sel) {
                    if !seen.iter().any(|s| s.id() == el.id()) {
                        seen.push(el);
                    }
                }
            }
            seen.get(index).map(|el| element_text(*el))
        }
        Strategy::Attribute { selector: css, attr } => {
            let sel = selector(css)?;
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(str::to_string)
        }
    }
}

fn sections<'a>(document: &'a Html, css: &str) -> Option<Vec<ElementRef<'a>>> {
    let sel = selector(css)?;
    Some(document.select(&sel).collect())
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Leaves `http(s)` URLs alone and resolves anything else against `origin`.
pub fn absolutize(src: &str, origin: &str) -> String {
    if src.starts_with("http") {
        return src.to_string();
    }
    Url::parse(origin)
        .and_then(|base| base.join(src))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("{}{}", origin.trim_end_matches('/'), src))
}
