//! Lexicon-based sentiment scoring for news headlines and summaries.
//!
//! Scores are compound values in [-1, 1]: token valences are summed (with a
//! short negation window) and squashed through `s / sqrt(s^2 + 15)`. Labels
//! use the conventional +-0.05 cutoffs.

use std::collections::HashMap;

/// Valence entries for finance-flavored news vocabulary.
const LEXICON: &[(&str, f64)] = &[
    // positive
    ("gain", 1.6),
    ("gains", 1.6),
    ("rally", 2.0),
    ("rallies", 2.0),
    ("surge", 2.1),
    ("surges", 2.1),
    ("soar", 2.2),
    ("soars", 2.2),
    ("jump", 1.5),
    ("jumps", 1.5),
    ("climb", 1.3),
    ("climbs", 1.3),
    ("rise", 1.2),
    ("rises", 1.2),
    ("rebound", 1.7),
    ("recovery", 1.6),
    ("record", 1.4),
    ("profit", 1.8),
    ("profits", 1.8),
    ("beat", 1.5),
    ("beats", 1.5),
    ("upgrade", 1.9),
    ("upgraded", 1.9),
    ("growth", 1.5),
    ("strong", 1.4),
    ("strength", 1.4),
    ("bullish", 2.0),
    ("optimism", 1.7),
    ("optimistic", 1.7),
    ("boom", 1.8),
    ("win", 1.3),
    ("wins", 1.3),
    ("exceed", 1.4),
    ("exceeds", 1.4),
    ("outperform", 1.6),
    ("outperforms", 1.6),
    ("positive", 1.3),
    ("upbeat", 1.5),
    ("best", 1.2),
    ("success", 1.4),
    // negative
    ("loss", -1.8),
    ("losses", -1.8),
    ("plunge", -2.2),
    ("plunges", -2.2),
    ("crash", -2.5),
    ("crashes", -2.5),
    ("slump", -1.9),
    ("slumps", -1.9),
    ("fall", -1.3),
    ("falls", -1.3),
    ("drop", -1.3),
    ("drops", -1.3),
    ("decline", -1.4),
    ("declines", -1.4),
    ("tumble", -1.9),
    ("tumbles", -1.9),
    ("sink", -1.7),
    ("sinks", -1.7),
    ("selloff", -2.0),
    ("miss", -1.4),
    ("misses", -1.4),
    ("downgrade", -1.9),
    ("downgraded", -1.9),
    ("recession", -2.1),
    ("fear", -1.6),
    ("fears", -1.6),
    ("panic", -2.2),
    ("bearish", -2.0),
    ("weak", -1.4),
    ("weakness", -1.4),
    ("layoffs", -1.8),
    ("bankruptcy", -2.5),
    ("fraud", -2.4),
    ("crisis", -2.1),
    ("default", -1.9),
    ("warning", -1.3),
    ("warns", -1.3),
    ("cut", -1.1),
    ("cuts", -1.1),
    ("negative", -1.3),
    ("worst", -1.7),
    ("volatile", -1.0),
    ("volatility", -1.0),
    ("inflation", -1.1),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "without", "neither", "nor"];

/// How many tokens after a negation still get their valence flipped.
const NEGATION_WINDOW: u8 = 3;

pub struct SentimentAnalyzer {
    lexicon: HashMap<&'static str, f64>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }

    /// Compound sentiment score for `text`, in [-1, 1].
    pub fn score(&self, text: &str) -> f64 {
        let mut total = 0.0_f64;
        let mut negation_window = 0u8;

        for raw in text.split_whitespace() {
            let token: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            if NEGATIONS.contains(&token.as_str()) {
                negation_window = NEGATION_WINDOW;
                continue;
            }
            if let Some(&valence) = self.lexicon.get(token.as_str()) {
                total += if negation_window > 0 { -valence } else { valence };
            }
            negation_window = negation_window.saturating_sub(1);
        }

        if total == 0.0 {
            return 0.0;
        }
        (total / (total * total + 15.0).sqrt()).clamp(-1.0, 1.0)
    }

    /// Label for a compound score: positive / negative / neutral at +-0.05.
    pub fn label(score: f64) -> &'static str {
        if score >= 0.05 {
            "positive"
        } else if score <= -0.05 {
            "negative"
        } else {
            "neutral"
        }
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_headline_scores_positive() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.score("Stocks rally as tech profits surge past estimates");
        assert!(score >= 0.05, "expected positive, got {score}");
        assert_eq!(SentimentAnalyzer::label(score), "positive");
    }

    #[test]
    fn negative_headline_scores_negative() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.score("Markets plunge on recession fears, banks warn of losses");
        assert!(score <= -0.05, "expected negative, got {score}");
        assert_eq!(SentimentAnalyzer::label(score), "negative");
    }

    #[test]
    fn bland_text_is_neutral() {
        let analyzer = SentimentAnalyzer::new();
        let score = analyzer.score("The committee will meet on Tuesday");
        assert_eq!(score, 0.0);
        assert_eq!(SentimentAnalyzer::label(score), "neutral");
    }

    #[test]
    fn empty_text_is_neutral() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.score(""), 0.0);
    }

    #[test]
    fn negation_flips_valence() {
        let analyzer = SentimentAnalyzer::new();
        let plain = analyzer.score("profits are strong");
        let negated = analyzer.score("profits are not strong");
        assert!(plain > 0.0);
        assert!(negated < plain);
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        let analyzer = SentimentAnalyzer::new();
        assert!(analyzer.score("RALLY!") > 0.0);
        assert!(analyzer.score("\"Crash,\"") < 0.0);
    }

    #[test]
    fn score_is_bounded() {
        let analyzer = SentimentAnalyzer::new();
        let piled_on = "surge soar rally boom profit upgrade growth bullish ".repeat(20);
        let score = analyzer.score(&piled_on);
        assert!(score <= 1.0);
        assert!(score > 0.9);
    }

    #[test]
    fn label_cutoffs() {
        assert_eq!(SentimentAnalyzer::label(0.05), "positive");
        assert_eq!(SentimentAnalyzer::label(0.0499), "neutral");
        assert_eq!(SentimentAnalyzer::label(-0.0499), "neutral");
        assert_eq!(SentimentAnalyzer::label(-0.05), "negative");
    }
}
