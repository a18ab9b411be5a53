use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{
    profile::{CandidateProfile, ProfileUrl, RawResultItem, SourceBackend},
    query_builder::EXECUTIVE_TITLES,
};

/// Titles recognised in result text, in priority order.
const EXTRACTED_TITLES: &[&str] = &[
    "cto",
    "chief technology officer",
    "vp technology",
    "head of technology",
    "technology director",
    "vp engineering",
    "chief technical officer",
    "head of engineering",
    "tech lead",
    "engineering director",
    "technology vp",
];

const FALSE_POSITIVE_MARKERS: &[&str] = &["student", "intern", "former", "ex-", "previous"];

const KNOWN_CITIES: &[&str] = &[
    "San Francisco",
    "New York",
    "Los Angeles",
    "Seattle",
    "Boston",
    "Austin",
    "Chicago",
    "London",
    "Berlin",
    "Paris",
    "Amsterdam",
    "Toronto",
    "Singapore",
    "Sydney",
    "Tel Aviv",
    "Bangalore",
    "Dubai",
    "Tokyo",
];

// Words that end a company name captured from free text
const COMPANY_STOP_WORDS: &[&str] = &[
    "in", "and", "since", "where", "with", "for", "based", "who", "as", "from", "linkedin", "-",
    "–",
];

const MAX_COMPANY_WORDS: usize = 5;
const MIN_NAME_CHARS: usize = 2;

static TITLE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    EXTRACTED_TITLES
        .iter()
        .map(|title| {
            let pattern = format!(r"\b{}\b", regex::escape(title));
            (*title, Regex::new(&pattern).expect("valid title regex"))
        })
        .collect()
});

static COMPANY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // "cto at acme"
        r"\bat\s+([a-z0-9][^\n,.;:|()!?]*)",
        // "cto @ acme"
        r"@\s*([a-z0-9][^\n,.;:|()!?]*)",
        // "jane doe - cto - acme | linkedin"
        r"^[^\n]*?\s[-–]\s[^\n]*?\s[-–]\s([^\n|]+)",
        // "acme labs - cto"
        r"([^\n,]+?)\s+[-–]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid company regex"))
    .collect()
});

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:[Bb]ased|[Ll]ocated)\s+(?:in|at)\s+([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)",
        r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*,\s+[A-Z]{2})\b",
        r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+[Aa]rea\b",
        r"\bin\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
        r"\bat\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid location regex"))
    .collect()
});

static FALSE_POSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    FALSE_POSITIVE_MARKERS
        .iter()
        .map(|marker| {
            // inflections count ("interns", "formerly") but "international" does not
            let pattern = match marker.ends_with(|c: char| c.is_alphanumeric()) {
                true => format!(r"\b{}(?:s|ly|ship|ships)?\b", regex::escape(marker)),
                false => format!(r"\b{}", regex::escape(marker)),
            };
            Regex::new(&pattern).expect("valid marker regex")
        })
        .collect()
});

pub struct ScoreInput<'a> {
    pub job_title: &'a str,
    pub company: &'a str,
    pub snippet: &'a str,
    pub context: &'a str,
}

/// Turns extracted fields into a confidence score in `[0, 100]` and decides
/// which scores are good enough to keep.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, input: &ScoreInput<'_>) -> f64;
    fn accepts(&self, score: f64) -> bool;
}

/// Title relevance, context echo and completeness. Keeps scores of at least 20.
///
/// A blank search context earns neither the company nor the snippet context
/// bonus, even though an empty string is contained in any text.
pub struct WeightedScoring;

impl WeightedScoring {
    pub const MIN_SCORE: f64 = 20.0;
}

impl ScoringStrategy for WeightedScoring {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let mut score = 0.0;

        if EXECUTIVE_TITLES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(input.job_title))
        {
            score += 40.0;
        }

        let context = input.context.trim().to_lowercase();
        if !context.is_empty() {
            if input.company.to_lowercase().contains(&context) {
                score += 30.0;
            } else if input.snippet.to_lowercase().contains(&context) {
                score += 20.0;
            }
        }

        if !input.job_title.is_empty() && !input.company.is_empty() {
            score += 20.0;
        }
        if input.snippet.chars().count() > 100 {
            score += 10.0;
        }

        f64::min(score, 100.0)
    }

    fn accepts(&self, score: f64) -> bool {
        score >= Self::MIN_SCORE
    }
}

/// Keyword hits with penalties for students, interns and past roles. Keeps
/// scores above 10.
pub struct KeywordScoring;

impl KeywordScoring {
    pub const MIN_SCORE: f64 = 10.0;
}

impl ScoringStrategy for KeywordScoring {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let mut score = 0.0;
        let title = input.job_title.to_lowercase();
        let snippet = input.snippet.to_lowercase();

        if !title.is_empty() {
            score += 30.0;
            if title.contains("cto") || title.contains("chief technology officer") {
                score += 40.0;
            }
        }
        if !input.company.is_empty() {
            score += 20.0;
        }

        let context_hits = input
            .context
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.chars().count() > 3)
            .unique()
            .filter(|word| snippet.contains(word))
            .count();
        score += 2.0 * context_hits as f64;

        let markers = FALSE_POSITIVE_PATTERNS
            .iter()
            .filter(|marker| marker.is_match(&snippet))
            .count();
        score -= 20.0 * markers as f64;

        score.clamp(0.0, 100.0)
    }

    fn accepts(&self, score: f64) -> bool {
        score > Self::MIN_SCORE
    }
}

pub struct ProfileExtractor {
    source: SourceBackend,
    strategy: Box<dyn ScoringStrategy>,
}

impl ProfileExtractor {
    /// The primary backend scores with [`WeightedScoring`], the alternate one
    /// with [`KeywordScoring`].
    pub fn for_backend(source: SourceBackend) -> Self {
        let strategy: Box<dyn ScoringStrategy> = match source {
            SourceBackend::Primary => Box::new(WeightedScoring),
            SourceBackend::Alternate => Box::new(KeywordScoring),
        };
        ProfileExtractor { source, strategy }
    }

    pub fn with_strategy(source: SourceBackend, strategy: Box<dyn ScoringStrategy>) -> Self {
        ProfileExtractor { source, strategy }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Valid profiles in result order.
    pub fn extract(&self, items: &[RawResultItem], context: &str) -> Vec<CandidateProfile> {
        let profiles: Vec<CandidateProfile> = items
            .iter()
            .filter_map(|item| self.extract_one(item, context))
            .filter(|profile| self.is_valid(profile))
            .collect();

        log::info!(
            "Kept {} of {} results using {} scoring",
            profiles.len(),
            items.len(),
            self.strategy.name()
        );
        profiles
    }

    /// `None` only when the link is not a profile URL.
    pub fn extract_one(&self, item: &RawResultItem, context: &str) -> Option<CandidateProfile> {
        let profile_url = match ProfileUrl::parse(&item.link) {
            Some(url) => url,
            None => {
                log::debug!("Skipping non-profile link {}", item.link);
                return None;
            }
        };

        let text = format!("{}\n{}", item.title, item.snippet).to_lowercase();
        let name = extract_name(&item.title);
        let job_title = extract_job_title(&text);
        let company = extract_company(&text);
        let location_hint = extract_location(&item.snippet);

        let confidence_score = self.strategy.score(&ScoreInput {
            job_title: &job_title,
            company: &company,
            snippet: &item.snippet,
            context,
        });

        Some(CandidateProfile {
            name,
            job_title,
            company,
            profile_url,
            snippet: item.snippet.clone(),
            location_hint,
            confidence_score,
            source_backend: self.source,
        })
    }

    pub fn is_valid(&self, profile: &CandidateProfile) -> bool {
        profile.name.chars().count() >= MIN_NAME_CHARS
            && !profile.profile_url.as_str().is_empty()
            && self.strategy.accepts(profile.confidence_score)
    }
}

/// Leading part of the title up to the first `-`, `|` or `:`.
pub fn extract_name(title: &str) -> String {
    title
        .split(['-', '|', ':'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// First known title found in `text` (already lower-cased), title-cased.
pub fn extract_job_title(text: &str) -> String {
    TITLE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(title, _)| title_case(title))
        .unwrap_or_default()
}

/// Company named in `text` (already lower-cased), title-cased.
pub fn extract_company(text: &str) -> String {
    COMPANY_PATTERNS
        .iter()
        .filter_map(|pattern| pattern.captures(text))
        .filter_map(|captures| captures.get(1).map(|m| clean_company(m.as_str())))
        .find(|company| !company.is_empty())
        .map(|company| title_case(&company))
        .unwrap_or_default()
}

pub fn extract_location(snippet: &str) -> Option<String> {
    LOCATION_PATTERNS
        .iter()
        .filter_map(|pattern| pattern.captures(snippet))
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().trim().to_string()))
        .find(|location| !location.is_empty())
        .or_else(|| {
            let lower = snippet.to_lowercase();
            KNOWN_CITIES
                .iter()
                .find(|city| lower.contains(&city.to_lowercase()))
                .map(|city| city.to_string())
        })
}

fn clean_company(raw: &str) -> String {
    raw.split_whitespace()
        .take_while(|word| !COMPANY_STOP_WORDS.contains(word))
        .take(MAX_COMPANY_WORDS)
        .join(" ")
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{
        extract_company, extract_job_title, extract_location, extract_name, title_case,
        KeywordScoring, ProfileExtractor, ScoreInput, ScoringStrategy, WeightedScoring,
    };
    use crate::{
        domain::profile::{RawResultItem, SourceBackend},
        services::test_support::jane_doe,
    };

    fn item(title: &str, link: &str, snippet: &str) -> RawResultItem {
        RawResultItem {
            title: title.to_string(),
            link: link.to_string(),
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn extract_name_valid() {
        assert_eq!(extract_name("Jane Doe - CTO at Acme"), "Jane Doe");
        assert_eq!(extract_name("John Roe | LinkedIn"), "John Roe");
        assert_eq!(extract_name("Ann Lee: Head of Engineering"), "Ann Lee");
        assert_eq!(extract_name("  Solo Name  "), "Solo Name");
        assert_eq!(extract_name("- CTO"), "");
    }

    #[test]
    fn extract_job_title_follows_priority_order() {
        assert_eq!(
            extract_job_title("jane doe\nchief technology officer and cto"),
            "Cto"
        );
        assert_eq!(
            extract_job_title("head of engineering at acme"),
            "Head Of Engineering"
        );
        assert_eq!(extract_job_title("senior director of sales"), "");
    }

    #[test]
    fn extract_job_title_ignores_partial_words() {
        // "director" contains "cto"
        assert_eq!(
            extract_job_title("engineering director at acme"),
            "Engineering Director"
        );
    }

    #[test]
    fn extract_company_patterns() {
        assert_eq!(extract_company("jane doe - cto at acme\nmore text"), "Acme");
        assert_eq!(
            extract_company("cto at blue river labs, san francisco"),
            "Blue River Labs"
        );
        assert_eq!(extract_company("building things @ globex since 2019"), "Globex");
        assert_eq!(
            extract_company("jane doe - vp engineering - initech | linkedin"),
            "Initech"
        );
        assert_eq!(
            extract_company("cto at hooli in palo alto"),
            "Hooli"
        );
        assert_eq!(extract_company("no company mentioned here"), "");
    }

    #[test]
    fn extract_company_falls_back_to_text_before_dash() {
        assert_eq!(extract_company("jane doe - cto | linkedin"), "Jane Doe");
        assert_eq!(
            extract_company("initech labs - engineering\nbuilding things"),
            "Initech Labs"
        );
        // "at" still wins over the dash fallback
        assert_eq!(extract_company("jane doe - cto at acme"), "Acme");
    }

    #[test]
    fn extract_location_patterns() {
        assert_eq!(
            extract_location("CTO. Based in New York City. Loves Rust."),
            Some("New York City".to_string())
        );
        assert_eq!(
            extract_location("Engineering leader, Austin, TX."),
            Some("Austin, TX".to_string())
        );
        assert_eq!(
            extract_location("Working from the San Francisco Bay Area"),
            Some("San Francisco Bay".to_string())
        );
        assert_eq!(
            extract_location("cto building payments in Berlin"),
            Some("Berlin".to_string())
        );
        assert_eq!(
            extract_location("remote-first, sometimes london"),
            Some("London".to_string())
        );
        assert_eq!(extract_location("nothing to see"), None);
    }

    #[test]
    fn extract_location_after_at() {
        assert_eq!(
            extract_location("CTO working at Acme Labs"),
            Some("Acme Labs".to_string())
        );
        // place phrases outrank a bare "at"
        assert_eq!(
            extract_location("CTO at Acme, San Francisco Area"),
            Some("San Francisco".to_string())
        );
        assert_eq!(
            extract_location("CTO at Acme in Berlin"),
            Some("Berlin".to_string())
        );
    }

    #[test]
    fn title_case_valid() {
        assert_eq!(title_case("cto"), "Cto");
        assert_eq!(title_case("HEAD of   tech"), "Head Of Tech");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn non_profile_links_are_discarded() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);
        let raw = item(
            "Jane Doe - CTO at Acme",
            "https://example.com/not-a-profile",
            "Jane Doe is the CTO at Acme",
        );

        assert!(extractor.extract_one(&raw, "").is_none());
        assert!(extractor.extract(&[raw], "").is_empty());
    }

    #[test]
    fn profile_links_yield_one_candidate_regardless_of_case() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);
        for link in [
            "https://www.linkedin.com/in/jane-doe",
            "HTTPS://WWW.LINKEDIN.COM/in/jane-doe",
            "http://LinkedIn.com/in/jane-doe",
        ] {
            let raw = item("Jane Doe - CTO at Acme", link, "Jane Doe is the CTO at Acme");
            let profiles = extractor.extract(&[raw], "");

            assert_eq!(profiles.len(), 1, "{}", link);
            assert_eq!(profiles[0].profile_url.as_str(), link);
        }
    }

    #[test]
    fn weighted_scoring_components() {
        let strategy = WeightedScoring;
        let long_snippet = "x".repeat(101);

        let title_only = strategy.score(&ScoreInput {
            job_title: "Cto",
            company: "",
            snippet: "",
            context: "",
        });
        let company_context = strategy.score(&ScoreInput {
            job_title: "Cto",
            company: "Acme Fintech Berlin",
            snippet: "",
            context: "fintech berlin",
        });
        let snippet_context = strategy.score(&ScoreInput {
            job_title: "",
            company: "",
            snippet: "payments in Berlin",
            context: "berlin",
        });
        let everything = strategy.score(&ScoreInput {
            job_title: "Cto",
            company: "Berlin",
            snippet: &long_snippet,
            context: "berlin",
        });

        assert_eq!(title_only, 40.0);
        assert_eq!(company_context, 90.0);
        assert_eq!(snippet_context, 20.0);
        assert_eq!(everything, 100.0);
    }

    #[test]
    fn weighted_scoring_ignores_empty_context() {
        let score = WeightedScoring.score(&ScoreInput {
            job_title: "",
            company: "",
            snippet: "anything",
            context: "   ",
        });

        assert_eq!(score, 0.0);
    }

    #[test]
    fn keyword_scoring_components() {
        let strategy = KeywordScoring;

        let cto = strategy.score(&ScoreInput {
            job_title: "Cto",
            company: "Acme",
            snippet: "payments platform in berlin, fintech",
            context: "Berlin fintech big",
        });
        let penalised = strategy.score(&ScoreInput {
            job_title: "Head Of Engineering",
            company: "",
            snippet: "Former intern, previous student",
            context: "",
        });
        let international = strategy.score(&ScoreInput {
            job_title: "Tech Lead",
            company: "",
            snippet: "international expansion",
            context: "",
        });

        let plurals = strategy.score(&ScoreInput {
            job_title: "Cto",
            company: "Acme",
            snippet: "Mentor to interns and students at Acme",
            context: "",
        });
        let formerly = strategy.score(&ScoreInput {
            job_title: "Cto",
            company: "Acme",
            snippet: "Formerly at Globex, internships lead",
            context: "",
        });

        // 30 + 40 + 20 + 2 * 2
        assert_eq!(cto, 94.0);
        assert_eq!(penalised, 0.0);
        assert_eq!(international, 30.0);
        // 90 - 2 * 20
        assert_eq!(plurals, 50.0);
        assert_eq!(formerly, 50.0);
    }

    #[test]
    fn keyword_scoring_ex_marker() {
        let score = KeywordScoring.score(&ScoreInput {
            job_title: "Cto",
            company: "Acme",
            snippet: "ex-CTO at Acme",
            context: "",
        });

        assert_eq!(score, 70.0);
    }

    #[test]
    fn scores_stay_in_bounds() {
        let strategies: [Box<dyn ScoringStrategy>; 2] =
            [Box::new(WeightedScoring), Box::new(KeywordScoring)];
        let long_snippet = "cto ".repeat(200);
        let inputs = [
            ("", "", "", ""),
            ("Cto", "Acme", long_snippet.as_str(), "acme"),
            ("Cto", "Acme", "student intern former ex- previous", "x"),
            (
                "Chief Technology Officer",
                "San Francisco Software",
                "san francisco software san francisco software bigword another massive",
                "san francisco software bigword another massive wordy",
            ),
        ];

        for strategy in strategies.iter() {
            for (job_title, company, snippet, context) in inputs {
                let score = strategy.score(&ScoreInput {
                    job_title,
                    company,
                    snippet,
                    context,
                });
                assert!(
                    (0.0..=100.0).contains(&score),
                    "{} produced {}",
                    strategy.name(),
                    score
                );
            }
        }
    }

    #[test]
    fn weighted_threshold_is_inclusive() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);
        let mut profile = extractor
            .extract_one(&jane_doe(), "")
            .expect("profile url is valid");

        profile.confidence_score = 20.0;
        assert!(extractor.is_valid(&profile));

        profile.confidence_score = 19.99;
        assert!(!extractor.is_valid(&profile));
    }

    #[test]
    fn keyword_threshold_is_exclusive() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Alternate);
        let mut profile = extractor
            .extract_one(&jane_doe(), "")
            .expect("profile url is valid");

        profile.confidence_score = 10.0;
        assert!(!extractor.is_valid(&profile));

        profile.confidence_score = 10.01;
        assert!(extractor.is_valid(&profile));
    }

    #[test]
    fn short_names_are_dropped() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);
        let raw = item(
            "J - CTO at Acme",
            "https://www.linkedin.com/in/j",
            "CTO at Acme",
        );

        assert!(extractor.extract(&[raw], "").is_empty());
    }

    #[test]
    fn malformed_text_degrades_to_empty_fields() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);
        let raw = item("", "https://www.linkedin.com/in/x", "@@@ ||| ::: at , @");

        let profile = extractor.extract_one(&raw, "").expect("profile url is valid");

        assert_eq!(profile.name, "");
        assert_eq!(profile.job_title, "");
        assert_eq!(profile.company, "");
        assert_eq!(profile.location_hint, None);
        assert!(!extractor.is_valid(&profile));
    }

    #[test]
    fn extract_preserves_order() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);
        let items = vec![
            item("Ann Lee - CTO at Initech", "https://linkedin.com/in/ann", ""),
            item("Nope - CTO", "https://example.com/x", ""),
            item("Bob Ray - CTO at Globex", "https://linkedin.com/in/bob", ""),
        ];

        let names: Vec<String> = extractor
            .extract(&items, "")
            .into_iter()
            .map(|p| p.name)
            .collect();

        assert_eq!(names, vec!["Ann Lee", "Bob Ray"]);
    }

    #[test]
    fn end_to_end_jane_doe() {
        let extractor = ProfileExtractor::for_backend(SourceBackend::Primary);

        let profiles = extractor.extract(&[jane_doe()], "San Francisco software");

        assert_eq!(profiles.len(), 1);
        let profile = &profiles[0];
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.job_title, "Cto");
        assert_eq!(profile.company, "Acme");
        assert_eq!(profile.location_hint.as_deref(), Some("San Francisco"));
        assert_eq!(profile.source_backend, SourceBackend::Primary);
        assert!(profile.confidence_score >= 20.0);
    }
}
