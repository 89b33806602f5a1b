//! Extractive multiple-choice question generator.
//!
//! Works on the text alone, no model calls: sentences are ranked by the
//! normalized term frequency of their words, an answer phrase is picked
//! from each top sentence and blanked out to form a cloze question, and
//! distractors are drawn from the other frequent document terms.

use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use rand::{Rng, seq::SliceRandom};
use regex::Regex;

use crate::models::mcq::Mcq;

const BLANK: &str = "_____";
const DISTRACTOR_COUNT: usize = 3;
const FALLBACK_QUESTION: &str = "Which term is mentioned in the document?";

const STOPWORDS: &[&str] = &[
    "the", "and", "is", "in", "of", "to", "a", "for", "that", "with", "as", "it", "on", "are",
    "be", "this", "by", "from", "an", "or", "which", "you", "your", "was", "at", "have", "has",
    "will", "can", "may", "these", "those", "such", "their", "its", "into", "between", "but",
    "not", "we", "they", "he", "she", "i",
];

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9][A-Za-z0-9\-']+\b").expect("valid word regex"));
static PROPER_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]{2,}(?:\s+[A-Z][a-z]{2,})*)\b").expect("valid proper noun regex")
});

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Content term: not a stopword, not purely numeric, longer than two chars.
fn is_content_term(token: &str) -> bool {
    !is_stopword(token) && !token.chars().all(|c| c.is_ascii_digit()) && token.len() > 2
}

fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(text) {
        // Keep the punctuation mark with its sentence.
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Content-term counts plus the terms ordered by first occurrence.
struct TermFrequencies {
    counts: HashMap<String, usize>,
    order: Vec<String>,
}

impl TermFrequencies {
    fn from_text(text: &str) -> Self {
        let mut counts = HashMap::new();
        let mut order = Vec::new();

        for token in tokenize(text) {
            if !is_content_term(&token) {
                continue;
            }
            let count = counts.entry(token.clone()).or_insert(0);
            if *count == 0 {
                order.push(token);
            }
            *count += 1;
        }

        Self { counts, order }
    }

    /// Terms by descending count; ties keep first-occurrence order.
    fn ranked_terms(&self) -> Vec<String> {
        let mut terms = self.order.clone();
        terms.sort_by(|a, b| self.counts[b].cmp(&self.counts[a]));
        terms
    }

    fn normalized(&self) -> HashMap<&str, f64> {
        let max = self.counts.values().copied().max().unwrap_or(1).max(1) as f64;
        self.counts
            .iter()
            .map(|(term, count)| (term.as_str(), *count as f64 / max))
            .collect()
    }
}

/// Sentences with their importance score, highest first.
fn score_sentences<'a>(sentences: &[&'a str], freqs: &TermFrequencies) -> Vec<(&'a str, f64)> {
    let weights = freqs.normalized();
    let mut seen = HashSet::new();
    let mut scored = Vec::new();

    for sentence in sentences {
        if !seen.insert(*sentence) {
            continue;
        }
        let tokens = tokenize(sentence);
        let score = if tokens.is_empty() {
            0.0
        } else {
            tokens
                .iter()
                .map(|t| weights.get(t.as_str()).copied().unwrap_or(0.0))
                .sum::<f64>()
                / tokens.len() as f64
        };
        scored.push((*sentence, score));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

fn contains_whole_word(sentence: &str, term: &str) -> bool {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term)))
        .map(|re| re.is_match(sentence))
        .unwrap_or(false)
}

/// Picks the answer phrase for a sentence.
///
/// Preference: capitalized multi-word sequences, then the first pair of
/// adjacent content words, then the first frequent document term present,
/// then the longest content word.
fn select_candidate_answer(sentence: &str, doc_terms: &[String]) -> Option<String> {
    let mut proper_nouns: Vec<&str> = PROPER_NOUN
        .find_iter(sentence)
        .map(|m| m.as_str())
        .collect();
    proper_nouns.sort_by(|a, b| {
        b.split_whitespace()
            .count()
            .cmp(&a.split_whitespace().count())
    });
    if let Some(candidate) = proper_nouns.iter().find(|cand| {
        cand.split_whitespace()
            .any(|w| !is_stopword(&w.to_lowercase()))
    }) {
        return Some(candidate.trim().to_string());
    }

    let words: Vec<&str> = WORD.find_iter(sentence).map(|m| m.as_str()).collect();
    let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

    for i in 0..words.len().saturating_sub(1) {
        let (a, b) = (&lowered[i], &lowered[i + 1]);
        if !is_stopword(a) && !is_stopword(b) && a.len() > 2 && b.len() > 2 {
            return Some(format!("{} {}", words[i], words[i + 1]));
        }
    }

    if let Some(term) = doc_terms.iter().find(|t| contains_whole_word(sentence, t)) {
        return Some(term.clone());
    }

    words
        .iter()
        .filter(|w| !is_stopword(&w.to_lowercase()) && w.len() > 2)
        .fold(None, |best: Option<&str>, w| match best {
            Some(b) if b.len() >= w.len() => Some(b),
            _ => Some(w),
        })
        .map(|w| w.to_string())
}

/// Blanks out the first case-insensitive occurrence of `answer`.
fn make_cloze_question(sentence: &str, answer: &str) -> String {
    if answer.is_empty() {
        return FALLBACK_QUESTION.to_string();
    }

    let pattern = match Regex::new(&format!("(?i){}", regex::escape(answer))) {
        Ok(re) => re,
        Err(_) => return FALLBACK_QUESTION.to_string(),
    };

    if pattern.is_match(sentence) {
        let question = pattern.replacen(sentence, 1, BLANK).into_owned();
        if question.ends_with('?') {
            question
        } else {
            format!("{}?", question.trim_end_matches('.'))
        }
    } else {
        format!(
            "Which term best completes the following sentence: \"{}\"",
            sentence.trim()
        )
    }
}

/// `k` distractors from the document terms, excluding the answer.
/// Pads with unique synthetic placeholders when the document is too small.
fn build_distractors<R: Rng + ?Sized>(
    answer: &str,
    doc_terms: &[String],
    k: usize,
    rng: &mut R,
) -> Vec<String> {
    let answer_lower = answer.to_lowercase();
    let mut candidates: Vec<&String> = doc_terms
        .iter()
        .filter(|t| t.to_lowercase() != answer_lower)
        .collect();
    candidates.shuffle(rng);

    let mut chosen: Vec<String> = candidates
        .into_iter()
        .filter(|c| c.chars().filter(|ch| ch.is_alphanumeric() || *ch == '_').count() >= 2)
        .take(k)
        .cloned()
        .collect();

    while chosen.len() < k {
        let placeholder = format!("option{}", rng.random_range(10..100));
        if placeholder != answer_lower && !chosen.contains(&placeholder) {
            chosen.push(placeholder);
        }
    }
    chosen
}

fn assemble<R: Rng + ?Sized>(
    question: String,
    answer: String,
    doc_terms: &[String],
    rng: &mut R,
) -> Mcq {
    let mut options = build_distractors(&answer, doc_terms, DISTRACTOR_COUNT, rng);
    options.push(answer.clone());
    options.shuffle(rng);
    Mcq {
        question,
        options,
        answer,
    }
}

/// Generates up to `num_questions` MCQs from `text`.
pub fn generate_mcqs(text: &str, num_questions: usize) -> Vec<Mcq> {
    generate_with_rng(text, num_questions, &mut rand::rng())
}

/// Same as [`generate_mcqs`] with caller-provided randomness.
pub fn generate_with_rng<R: Rng + ?Sized>(text: &str, num_questions: usize, rng: &mut R) -> Vec<Mcq> {
    if num_questions == 0 || text.trim().is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let freqs = TermFrequencies::from_text(text);
    let doc_terms = freqs.ranked_terms();
    let top_n = (num_questions * 3).max(8);

    let mut mcqs = Vec::with_capacity(num_questions);
    let mut used_answers: HashSet<String> = HashSet::new();

    for (sentence, _) in score_sentences(&sentences, &freqs).into_iter().take(top_n) {
        if mcqs.len() >= num_questions {
            break;
        }
        let Some(answer) = select_candidate_answer(sentence, &doc_terms) else {
            continue;
        };
        if !used_answers.insert(answer.to_lowercase()) {
            continue;
        }
        let question = make_cloze_question(sentence, &answer);
        mcqs.push(assemble(question, answer, &doc_terms, rng));
    }

    let mut extra_terms = doc_terms
        .iter()
        .filter(|t| !used_answers.contains(&t.to_lowercase()));
    while mcqs.len() < num_questions {
        let Some(term) = extra_terms.next() else {
            break;
        };
        mcqs.push(assemble(
            FALLBACK_QUESTION.to_string(),
            term.clone(),
            &doc_terms,
            rng,
        ));
    }

    tracing::debug!("Generated {} MCQs from {} sentences", mcqs.len(), sentences.len());
    mcqs.truncate(num_questions);
    mcqs
}
