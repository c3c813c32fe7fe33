//! Greedy CTC decoding for text recognition models.
//!
//! The model emits a `[T, C]` probability matrix per line. Class 0 is the CTC
//! blank; classes `1..=N` map to the dictionary lines, and the final class is
//! the space character appended after the dictionary.

use ndarray::ArrayView2;

/// Maps CTC class indices to characters.
#[derive(Debug, Clone)]
pub struct CtcLabelDecode {
    character: Vec<String>,
}

impl CtcLabelDecode {
    /// Builds the decoder from dictionary lines (one symbol per line).
    pub fn new(dict_lines: impl IntoIterator<Item = String>, use_space_char: bool) -> Self {
        let mut character = vec!["blank".to_string()];
        character.extend(dict_lines.into_iter().filter(|s| !s.is_empty()));
        if use_space_char {
            character.push(" ".to_string());
        }
        Self { character }
    }

    /// Builds the decoder from the contents of a dictionary file.
    pub fn from_dict_str(dict: &str) -> Self {
        Self::new(
            dict.lines().map(|l| l.trim_end_matches('\r').to_string()),
            true,
        )
    }

    /// Number of classes including the blank.
    pub fn num_classes(&self) -> usize {
        self.character.len()
    }

    /// Decodes one `[T, C]` probability matrix.
    ///
    /// Consecutive duplicates collapse and blanks are skipped. At most
    /// `max_chars` characters are emitted.
    ///
    /// # Returns
    ///
    /// The decoded text and the mean probability of the emitted characters
    /// (0.0 when nothing was emitted).
    pub fn decode(&self, probs: &ArrayView2<f32>, max_chars: usize) -> (String, f32) {
        let mut text = String::new();
        let mut confidence_sum = 0.0;
        let mut emitted = 0usize;
        let mut previous: Option<usize> = None;

        for row in probs.rows() {
            let (best_idx, best_prob) = row
                .iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |acc, (i, &p)| {
                    if p > acc.1 { (i, p) } else { acc }
                });

            let repeated = previous == Some(best_idx);
            previous = Some(best_idx);
            if best_idx == 0 || repeated {
                continue;
            }
            if emitted >= max_chars {
                break;
            }

            if let Some(ch) = self.character.get(best_idx) {
                text.push_str(ch);
                confidence_sum += best_prob;
                emitted += 1;
            }
        }

        let confidence = if emitted == 0 {
            0.0
        } else {
            confidence_sum / emitted as f32
        };
        (text, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn one_hot(indices: &[usize], classes: usize) -> Array2<f32> {
        let mut probs = Array2::<f32>::zeros((indices.len(), classes));
        for (t, &i) in indices.iter().enumerate() {
            probs[[t, i]] = 0.9;
        }
        probs
    }

    #[test]
    fn test_decode_collapses_duplicates_and_blanks() {
        let decoder = CtcLabelDecode::from_dict_str("a\nb\nc\n");
        assert_eq!(decoder.num_classes(), 5);

        // a a _ a b _ <space> c
        let probs = one_hot(&[1, 1, 0, 1, 2, 0, 4, 3], 5);
        let (text, score) = decoder.decode(&probs.view(), 100);
        assert_eq!(text, "aab c");
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_decode_respects_max_chars() {
        let decoder = CtcLabelDecode::from_dict_str("a\nb\n");
        let probs = one_hot(&[1, 0, 2, 0, 1], 4);
        let (text, _) = decoder.decode(&probs.view(), 2);
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_decode_all_blank() {
        let decoder = CtcLabelDecode::from_dict_str("a\n");
        let probs = one_hot(&[0, 0, 0], 3);
        assert_eq!(decoder.decode(&probs.view(), 10), (String::new(), 0.0));
    }
}
