//! Held-out evaluation: per-class precision / recall / F1

use serde::Serialize;
use std::fmt;

/// Scores for one class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true rows of this class
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        // 0/0 is reported as 0
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Classification report over the test partition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Label 0
    pub stable: ClassMetrics,
    /// Label 1
    pub crisis: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// `confusion[actual][predicted]`
    pub confusion: [[usize; 2]; 2],
}

impl EvaluationReport {
    /// Build from parallel slices of true and predicted labels
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> Self {
        let mut confusion = [[0usize; 2]; 2];
        for (&a, &p) in actual.iter().zip(predicted) {
            confusion[usize::from(a.min(1))][usize::from(p.min(1))] += 1;
        }

        let stable = ClassMetrics::from_counts(confusion[0][0], confusion[1][0], confusion[0][1]);
        let crisis = ClassMetrics::from_counts(confusion[1][1], confusion[0][1], confusion[1][0]);

        let total = stable.support + crisis.support;
        let accuracy = if total == 0 {
            0.0
        } else {
            (confusion[0][0] + confusion[1][1]) as f64 / total as f64
        };

        let macro_avg = ClassMetrics {
            precision: (stable.precision + crisis.precision) / 2.0,
            recall: (stable.recall + crisis.recall) / 2.0,
            f1: (stable.f1 + crisis.f1) / 2.0,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                (f(&stable) * stable.support as f64 + f(&crisis) * crisis.support as f64)
                    / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            stable,
            crisis,
            accuracy,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }

    pub fn support(&self) -> usize {
        self.stable.support + self.crisis.support
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (name, m) in [("0", &self.stable), ("1", &self.crisis)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.support()
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let actual = [0, 0, 0, 0, 1, 1];
        let predicted = [0, 0, 1, 0, 1, 0];
        let r = EvaluationReport::from_labels(&actual, &predicted);

        assert_eq!(r.confusion, [[3, 1], [1, 1]]);
        assert_eq!(r.stable.support, 4);
        assert_eq!(r.crisis.support, 2);
        assert!((r.stable.precision - 0.75).abs() < 1e-12);
        assert!((r.stable.recall - 0.75).abs() < 1e-12);
        assert!((r.crisis.precision - 0.5).abs() < 1e-12);
        assert!((r.crisis.recall - 0.5).abs() < 1e-12);
        assert!((r.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((r.macro_avg.f1 - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_missing_class_scores_zero() {
        // No crisis rows and none predicted
        let r = EvaluationReport::from_labels(&[0, 0, 0], &[0, 0, 0]);
        assert_eq!(r.crisis, ClassMetrics::default());
        assert_eq!(r.stable.f1, 1.0);
        assert_eq!(r.accuracy, 1.0);
    }

    #[test]
    fn test_display_has_class_rows() {
        let r = EvaluationReport::from_labels(&[0, 1], &[0, 1]);
        let text = r.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
    }
}
