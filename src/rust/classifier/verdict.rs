use serde::Serialize;

use super::model::ClassProbabilities;
use super::utils::round_one_decimal;

/// The class a message is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Legitimate,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Legitimate => "legitimate",
        }
    }

    /// Human-readable result line shown to callers
    pub fn display_message(&self) -> &'static str {
        match self {
            Self::Spam => "This message is 🚨 SPAM",
            Self::Legitimate => "This message is 💬 LEGITIMATE",
        }
    }
}

/// Confidence-scored result of one prediction.
///
/// Percentages are unrounded; use [`Verdict::rounded`] for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub label: Label,
    /// Winning class probability times 100
    pub confidence_percent: f64,
    pub spam_confidence_percent: f64,
    pub ham_confidence_percent: f64,
    pub probabilities: ClassProbabilities,
}

/// Percentages rounded to one decimal place.
///
/// `ham` is derived from the rounded `spam` so the pair still sums to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedConfidence {
    pub confidence: f64,
    pub spam: f64,
    pub ham: f64,
}

impl Verdict {
    /// Derives the verdict from class probabilities.
    ///
    /// An exact 0.5/0.5 split resolves to [`Label::Legitimate`] so ties never
    /// flag a message as spam.
    pub fn from_probabilities(probabilities: ClassProbabilities) -> Self {
        let label = if probabilities.spam > probabilities.ham {
            Label::Spam
        } else {
            Label::Legitimate
        };
        let spam_confidence_percent = probabilities.spam * 100.0;
        let ham_confidence_percent = probabilities.ham * 100.0;

        Self {
            label,
            confidence_percent: spam_confidence_percent.max(ham_confidence_percent),
            spam_confidence_percent,
            ham_confidence_percent,
            probabilities,
        }
    }

    pub fn is_spam(&self) -> bool {
        self.label == Label::Spam
    }

    pub fn rounded(&self) -> RoundedConfidence {
        let spam = round_one_decimal(self.spam_confidence_percent);
        let ham = round_one_decimal(100.0 - spam);
        RoundedConfidence {
            confidence: spam.max(ham),
            spam,
            ham,
        }
    }
}
