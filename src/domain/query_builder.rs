use itertools::Itertools;

use super::search_filters::SearchFilters;

pub const NAMESPACE_CLAUSE: &str = "site:linkedin.com/in/";

/// Default title disjunction, used when the caller asks for no particular title
/// or for any CTO variant.
pub const EXECUTIVE_TITLES: &[&str] = &[
    "CTO",
    "Chief Technology Officer",
    "VP Technology",
    "Head of Technology",
    "Technology Director",
    "VP Engineering",
    "Chief Technical Officer",
    "Head of Engineering",
    "Tech Lead",
    "Engineering Director",
    "Technology VP",
    "VP of Technology",
    "VP of Engineering",
    "Head of Tech",
];

const TITLE_SYNONYMS: &[(&str, &[&str])] = &[
    ("cto", EXECUTIVE_TITLES),
    (
        "ceo",
        &[
            "CEO",
            "Chief Executive Officer",
            "Founder & CEO",
            "Co-Founder & CEO",
            "Managing Director",
        ],
    ),
    (
        "cfo",
        &[
            "CFO",
            "Chief Financial Officer",
            "VP Finance",
            "Head of Finance",
            "Finance Director",
        ],
    ),
    (
        "coo",
        &[
            "COO",
            "Chief Operating Officer",
            "VP Operations",
            "Head of Operations",
            "Operations Director",
        ],
    ),
    (
        "cmo",
        &[
            "CMO",
            "Chief Marketing Officer",
            "VP Marketing",
            "Head of Marketing",
            "Marketing Director",
        ],
    ),
    (
        "cpo",
        &[
            "CPO",
            "Chief Product Officer",
            "VP Product",
            "Head of Product",
            "Product Director",
        ],
    ),
];

const SECTOR_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "fintech",
        &["fintech", "financial technology", "finance", "banking"],
    ),
    ("software", &["software", "SaaS", "technology", "tech"]),
    (
        "healthcare",
        &["healthcare", "healthtech", "medical", "health technology"],
    ),
    (
        "ecommerce",
        &["e-commerce", "ecommerce", "online retail", "marketplace"],
    ),
    (
        "ai",
        &[
            "artificial intelligence",
            "AI",
            "machine learning",
            "ML",
        ],
    ),
    (
        "edtech",
        &["edtech", "education technology", "e-learning", "education"],
    ),
    (
        "cybersecurity",
        &["cybersecurity", "information security", "security", "infosec"],
    ),
    (
        "biotech",
        &["biotech", "biotechnology", "life sciences", "pharma"],
    ),
    ("gaming", &["gaming", "game development", "video games", "esports"]),
    (
        "logistics",
        &["logistics", "supply chain", "shipping", "transportation"],
    ),
];

const COMPANY_TYPE_KEYWORDS: &[(&str, &[&str])] = &[
    ("startup", &["startup", "early stage", "seed", "series A"]),
    (
        "sme",
        &["SME", "small business", "medium business", "growing company"],
    ),
    (
        "enterprise",
        &["enterprise", "corporation", "Fortune 500", "multinational"],
    ),
    (
        "unicorn",
        &["unicorn", "billion valuation", "high growth", "scale-up"],
    ),
    (
        "public",
        &["public company", "publicly traded", "NYSE", "NASDAQ"],
    ),
];

pub const EXCLUDED_TERMS: &[&str] = &["Intern", "Student", "Former", "Ex-", "Previous", "Consultant"];

/// Builds the boolean query for `filters`.
///
/// Clause order is fixed: namespace, titles, region, sector, company type,
/// exclusions. Absent filters drop their clause and nothing else.
pub fn build_query(filters: &SearchFilters) -> String {
    let mut clauses = vec![NAMESPACE_CLAUSE.to_string()];

    clauses.extend(title_clause(filters));
    clauses.extend(filters.region().and_then(quote));
    clauses.extend(
        filters
            .company_sector()
            .and_then(|sector| disjunction(keywords_for(SECTOR_KEYWORDS, sector).into_iter())),
    );
    clauses.extend(
        filters
            .company_type()
            .and_then(|kind| disjunction(keywords_for(COMPANY_TYPE_KEYWORDS, kind).into_iter())),
    );
    clauses.push(
        EXCLUDED_TERMS
            .iter()
            .map(|term| format!("-\"{}\"", term))
            .join(" "),
    );

    clauses.join(" ")
}

/// Space-joined filter values echoed back by relevant results, used for scoring.
pub fn search_context(filters: &SearchFilters) -> String {
    [
        filters.region(),
        filters.company_sector(),
        filters.company_type(),
        filters.company_size(),
    ]
    .into_iter()
    .flatten()
    .join(" ")
}

/// Synonyms for a requested title, or the title itself when it is unknown.
pub fn title_synonyms(title: &str) -> Vec<&str> {
    TITLE_SYNONYMS
        .iter()
        .find(|(key, synonyms)| {
            key.eq_ignore_ascii_case(title) || synonyms.iter().any(|s| s.eq_ignore_ascii_case(title))
        })
        .map(|(_, synonyms)| synonyms.to_vec())
        .unwrap_or_else(|| vec![title])
}

fn title_clause(filters: &SearchFilters) -> Option<String> {
    let base = match filters.job_title() {
        Some(title) => title_synonyms(title),
        None => EXECUTIVE_TITLES.to_vec(),
    };

    disjunction(
        base.into_iter()
            .chain(filters.additional_titles.iter().map(String::as_str)),
    )
}

fn keywords_for<'a>(table: &[(&str, &'a [&'a str])], value: &'a str) -> Vec<&'a str> {
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(value))
        .map(|(_, keywords)| keywords.to_vec())
        .unwrap_or_else(|| vec![value])
}

fn clean_term(term: &str) -> String {
    term.replace('"', "").trim().to_string()
}

fn quote(term: &str) -> Option<String> {
    let term = clean_term(term);
    match term.is_empty() {
        true => None,
        false => Some(format!("\"{}\"", term)),
    }
}

fn disjunction<'a>(terms: impl Iterator<Item = &'a str>) -> Option<String> {
    let terms: Vec<String> = terms
        .map(clean_term)
        .filter(|t| !t.is_empty())
        .unique_by(|t| t.to_lowercase())
        .collect();

    match terms.is_empty() {
        true => None,
        false => Some(format!(
            "({})",
            terms.iter().map(|t| format!("\"{}\"", t)).join(" OR ")
        )),
    }
}
