//! Finance glossary: term -> short definition shown next to the term
//!
//! Entries are kept ordered by term length (longest first) so that
//! multi-word terms such as "capital gain" are matched before the shorter
//! terms they contain.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Built-in vocabulary, worded for teens and young adults
const FINANCE_TERMS: &[(&str, &str)] = &[
    ("bank", "A place to keep your money safe."),
    ("savings", "Money you keep for later."),
    ("income", "Money you earn from work or other sources."),
    ("job", "Work you do to earn money."),
    ("salary", "A fixed amount of money you get for your job."),
    ("wage", "Money you earn based on hours worked."),
    ("paycheck", "The money your job pays you."),
    ("tax", "Money you pay to the government."),
    ("income tax", "Tax taken from the money you earn."),
    ("sales tax", "Extra money you pay when buying things."),
    ("refund", "Money the government gives back if you paid too much tax."),
    ("loan", "Money you borrow that you must pay back."),
    ("credit", "Borrowed money you can use now and pay later."),
    ("credit score", "A number that shows how good you are at paying back borrowed money."),
    ("interest", "Extra money you pay when borrowing or earn when saving."),
    ("compound interest", "Earning interest on both your money and past interest."),
    ("debt", "Money you owe."),
    ("budget", "A plan for how to use your money."),
    ("expense", "Money you spend."),
    ("profit", "When you earn more than you spend."),
    ("loss", "When you spend more than you earn."),
    ("investment", "Using money to try to make more money."),
    ("stock", "A small piece of a company you can buy."),
    ("share", "One unit of stock."),
    ("bond", "A loan to a company or government."),
    ("mutual fund", "A group of investments managed together."),
    ("etf", "A group of investments that trades like a stock."),
    ("portfolio", "All your investments."),
    ("return", "Money you make or lose from investing."),
    ("risk", "The chance you could lose money."),
    ("dividend", "Money some companies pay you for owning their stock."),
    ("capital gain", "Profit from selling something for more than you paid."),
    ("broker", "Someone or an app that helps buy and sell investments."),
    ("stock market", "Where people buy and sell stocks."),
    ("ticker symbol", "A short code for a stock."),
    ("index fund", "A fund that follows a group of stocks."),
    ("diversification", "Spreading money into different things to lower risk."),
    ("asset", "Something valuable you own, like money, stocks, or property."),
    ("liquidity", "How easy it is to turn something into cash."),
    ("real estate", "Land or buildings you can own or invest in."),
    ("bank account", "A place at the bank to hold your money."),
    ("checking account", "A bank account for spending and paying bills."),
    ("savings account", "A bank account for saving money and earning interest."),
    ("mobile banking", "Using your phone to manage your money."),
    ("digital wallet", "An app that stores your payment info, like Apple Pay."),
    ("online banking", "Managing your bank account using the internet."),
    ("financial goal", "Something you want to save or plan money for."),
    ("emergency fund", "Money saved for unexpected costs."),
    ("payday", "The day you get your paycheck."),
    ("direct deposit", "Getting paid straight into your bank account."),
    ("cash", "Money in coins or bills."),
    ("receipt", "A paper or email showing what you paid for."),
    ("transaction", "Any money going in or out of your account."),
    ("fee", "Extra charge you pay for something."),
    ("subscription", "Paying regularly for a service, like Netflix."),
    ("scam", "A trick to steal your money."),
    ("fraud", "Lying to get money illegally."),
    ("identity theft", "Someone using your personal info to steal or buy things."),
];

/// A glossary entry before compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub term: String,
    pub definition: String,
    /// Overrides the glossary-wide plural policy for this term
    pub plural: Option<bool>,
}

impl GlossaryEntry {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            plural: None,
        }
    }

    pub fn with_plural(mut self, plural: bool) -> Self {
        self.plural = Some(plural);
        self
    }
}

/// On-disk form: either `"term": "definition"` or
/// `"term": { "definition": "...", "plural": false }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Definition(String),
    Detailed {
        definition: String,
        #[serde(default)]
        plural: Option<bool>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledTerm {
    pub(crate) term: String,
    pub(crate) definition: String,
    pub(crate) plural: bool,
    pub(crate) pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct Glossary {
    terms: Vec<CompiledTerm>,
    plurals: bool,
}

impl Glossary {
    /// Build a glossary. `plurals` is the default policy for entries that
    /// don't set their own.
    pub fn new(entries: impl IntoIterator<Item = GlossaryEntry>, plurals: bool) -> Self {
        // Normalise and dedupe; BTreeMap gives a stable tie order for equal lengths
        let mut by_term: BTreeMap<String, GlossaryEntry> = BTreeMap::new();
        for entry in entries {
            let term = entry.term.trim().to_lowercase();
            if term.is_empty() {
                continue;
            }
            by_term.insert(term, entry);
        }

        let mut terms: Vec<CompiledTerm> = by_term
            .into_iter()
            .filter_map(|(term, entry)| {
                let plural = entry.plural.unwrap_or(plurals);
                match term_pattern(&term, plural) {
                    Ok(pattern) => Some(CompiledTerm {
                        term,
                        definition: entry.definition,
                        plural,
                        pattern,
                    }),
                    Err(err) => {
                        warn!(term = %term, error = %err, "skipping glossary term");
                        None
                    }
                }
            })
            .collect();

        // Stable sort keeps alphabetical order among equal lengths
        terms.sort_by(|a, b| b.term.chars().count().cmp(&a.term.chars().count()));

        Self { terms, plurals }
    }

    pub fn from_pairs(pairs: &[(&str, &str)], plurals: bool) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(term, definition)| GlossaryEntry::new(*term, *definition)),
            plurals,
        )
    }

    /// The built-in finance vocabulary
    pub fn builtin(plurals: bool) -> Self {
        Self::from_pairs(FINANCE_TERMS, plurals)
    }

    pub fn from_json_str(json: &str, plurals: bool) -> Result<Self> {
        let raw: BTreeMap<String, RawEntry> =
            serde_json::from_str(json).context("Glossary must be a JSON object of term -> definition")?;

        let entries = raw.into_iter().map(|(term, raw)| match raw {
            RawEntry::Definition(definition) => GlossaryEntry::new(term, definition),
            RawEntry::Detailed { definition, plural } => GlossaryEntry {
                term,
                definition,
                plural,
            },
        });

        Ok(Self::new(entries, plurals))
    }

    pub fn load(path: &Path, plurals: bool) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary {}", path.display()))?;
        let glossary = Self::from_json_str(&content, plurals)
            .with_context(|| format!("Failed to parse glossary {}", path.display()))?;
        info!(path = %path.display(), terms = glossary.len(), "loaded glossary");
        Ok(glossary)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Default plural policy
    pub fn plurals(&self) -> bool {
        self.plurals
    }

    /// Look up a definition by term, ignoring case
    pub fn definition(&self, term: &str) -> Option<&str> {
        let term = term.trim().to_lowercase();
        self.terms
            .iter()
            .find(|t| t.term == term)
            .map(|t| t.definition.as_str())
    }

    /// `(term, definition)` pairs, longest term first
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms
            .iter()
            .map(|t| (t.term.as_str(), t.definition.as_str()))
    }

    pub(crate) fn compiled(&self) -> &[CompiledTerm] {
        &self.terms
    }
}

impl Default for Glossary {
    fn default() -> Self {
        Self::builtin(true)
    }
}

/// Case-insensitive whole-word pattern, optionally allowing a trailing "s"
fn term_pattern(term: &str, plural: bool) -> Result<Regex, regex::Error> {
    let suffix = if plural { "s?" } else { "" };
    Regex::new(&format!(r"(?i)\b{}{}\b", regex::escape(term), suffix))
}
