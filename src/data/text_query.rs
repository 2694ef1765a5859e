use anyhow::{Context, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::data::datatable::DataValue;

/// How the free-text grid query is matched against cell values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextQueryMode {
    #[default]
    Substring,
    Regex,
    Fuzzy,
}

impl TextQueryMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            TextQueryMode::Substring => "Substring",
            TextQueryMode::Regex => "Regex",
            TextQueryMode::Fuzzy => "Fuzzy",
        }
    }
}

/// A compiled text query. Built once per query change and reused for every
/// row/column pair.
pub struct TextQueryMatcher {
    query: String,
    lowered: String,
    case_insensitive: bool,
    kind: MatcherKind,
}

enum MatcherKind {
    Substring,
    Regex(Regex),
    Fuzzy(SkimMatcherV2),
}

impl TextQueryMatcher {
    pub fn new(query: &str, mode: TextQueryMode, case_insensitive: bool) -> Result<Self> {
        let kind = match mode {
            TextQueryMode::Substring => MatcherKind::Substring,
            TextQueryMode::Regex => {
                let regex = RegexBuilder::new(query)
                    .case_insensitive(case_insensitive)
                    .build()
                    .with_context(|| format!("Invalid text query pattern '{}'", query))?;
                MatcherKind::Regex(regex)
            }
            TextQueryMode::Fuzzy => {
                let matcher = if case_insensitive {
                    SkimMatcherV2::default().ignore_case()
                } else {
                    SkimMatcherV2::default().respect_case()
                };
                MatcherKind::Fuzzy(matcher)
            }
        };

        Ok(Self {
            query: query.to_string(),
            lowered: query.to_lowercase(),
            case_insensitive,
            kind,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn is_match(&self, value: &DataValue) -> bool {
        if value.is_null() {
            return false;
        }
        let text = value.to_string();
        match &self.kind {
            MatcherKind::Substring => {
                if self.case_insensitive {
                    text.to_lowercase().contains(&self.lowered)
                } else {
                    text.contains(&self.query)
                }
            }
            MatcherKind::Regex(regex) => regex.is_match(&text),
            MatcherKind::Fuzzy(matcher) => matcher
                .fuzzy_match(&text, &self.query)
                .is_some_and(|score| score > 0),
        }
    }
}
