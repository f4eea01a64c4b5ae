//! Playback segment selection
//!
//! Picks which segment a visitor hears. Rules are tried in priority order and the first
//! one that matches wins:
//!
//! 1. UTM source matches a `utm_source` segment
//! 2. returning visitor and a `returning_visitor` segment exists
//! 3. a `language` segment matches one of the visitor's languages, in preference order
//! 4. new visitor and a `new_visitor` segment exists
//! 5. the first segment
//!
//! Within a rule, list order decides.

use serde::Serialize;

use super::project::{Segment, SegmentCondition};

/// What is known about the visitor requesting playback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorContext {
    pub utm_source: Option<String>,
    pub returning: bool,
    /// Language tags, most preferred first
    pub languages: Vec<String>,
}

impl VisitorContext {
    /// Build the context from playback query parameters and the `Accept-Language` header.
    ///
    /// An explicit `lang` parameter replaces the header entirely.
    pub fn from_request(
        utm_source: Option<&str>,
        returning: Option<&str>,
        lang: Option<&str>,
        accept_language: Option<&str>,
    ) -> Self {
        let utm_source = utm_source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let returning = returning
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let languages = match lang.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => parse_accept_language(lang),
            None => accept_language.map(parse_accept_language).unwrap_or_default(),
        };

        Self {
            utm_source,
            returning,
            languages,
        }
    }
}

/// Parse an `Accept-Language` value into tags ordered by q-value.
///
/// Entries with `q=0`, wildcards and malformed q-values are dropped. Equal weights keep
/// header order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim().replace('_', "-");
            if tag.is_empty() || tag == "*" {
                return None;
            }

            let mut q = 1.0_f32;
            for param in parts {
                if let Some(value) = param.trim().strip_prefix("q=") {
                    q = value.trim().parse().ok()?;
                }
            }
            (q > 0.0).then_some((tag, q))
        })
        .collect();

    // Stable sort keeps header order for equal weights
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
    weighted.into_iter().map(|(tag, _)| tag).collect()
}

/// Which rule picked the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    UtmSource,
    ReturningVisitor,
    Language,
    NewVisitor,
    Fallback,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::UtmSource => "utm_source",
            SelectionReason::ReturningVisitor => "returning_visitor",
            SelectionReason::Language => "language",
            SelectionReason::NewVisitor => "new_visitor",
            SelectionReason::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub segment: &'a Segment,
    pub reason: SelectionReason,
}

/// Select among all segments
pub fn select_segment<'a>(
    segments: &'a [Segment],
    visitor: &VisitorContext,
) -> Option<Selection<'a>> {
    select_from(segments.iter().collect(), visitor)
}

/// Select among segments that already have audio
pub fn select_playable_segment<'a>(
    segments: &'a [Segment],
    visitor: &VisitorContext,
) -> Option<Selection<'a>> {
    select_from(segments.iter().filter(|s| s.has_audio()).collect(), visitor)
}

fn select_from<'a>(
    candidates: Vec<&'a Segment>,
    visitor: &VisitorContext,
) -> Option<Selection<'a>> {
    if let Some(utm) = visitor.utm_source.as_deref().map(str::trim) {
        let found = find_first(&candidates, |s| {
            matches!(&s.condition, SegmentCondition::UtmSource { source }
                if source.trim().eq_ignore_ascii_case(utm))
        });
        if let Some(segment) = found {
            return Some(Selection {
                segment,
                reason: SelectionReason::UtmSource,
            });
        }
    }

    if visitor.returning
        && let Some(segment) =
            find_first(&candidates, |s| s.condition == SegmentCondition::ReturningVisitor)
    {
        return Some(Selection {
            segment,
            reason: SelectionReason::ReturningVisitor,
        });
    }

    for wanted in &visitor.languages {
        let exact = find_first(&candidates, |s| {
            language_of(s).is_some_and(|l| l.eq_ignore_ascii_case(wanted))
        });
        // `en-GB` also matches an `en` or `en-US` segment
        let found = exact.or_else(|| {
            let wanted_primary = primary_subtag(wanted);
            find_first(&candidates, |s| {
                language_of(s)
                    .is_some_and(|l| primary_subtag(l).eq_ignore_ascii_case(wanted_primary))
            })
        });
        if let Some(segment) = found {
            return Some(Selection {
                segment,
                reason: SelectionReason::Language,
            });
        }
    }

    if !visitor.returning
        && let Some(segment) =
            find_first(&candidates, |s| s.condition == SegmentCondition::NewVisitor)
    {
        return Some(Selection {
            segment,
            reason: SelectionReason::NewVisitor,
        });
    }

    candidates.first().copied().map(|segment| Selection {
        segment,
        reason: SelectionReason::Fallback,
    })
}

fn find_first<'a>(
    candidates: &[&'a Segment],
    rule: impl Fn(&Segment) -> bool,
) -> Option<&'a Segment> {
    candidates.iter().copied().find(|s| rule(*s))
}

fn language_of(segment: &Segment) -> Option<&str> {
    match &segment.condition {
        SegmentCondition::Language { language } => Some(language),
        _ => None,
    }
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}
