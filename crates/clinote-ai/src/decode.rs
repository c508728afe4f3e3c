//! Beam-search bookkeeping, independent of the model runtime.
//!
//! The generator feeds last-position logits for every live beam into
//! [`BeamSearch::step`]; this module owns scoring, expansion, and the
//! finished-hypothesis ranking. There is no sampling, so decoding is fully
//! deterministic.

/// One partial or finished output sequence.
#[derive(Debug, Clone)]
pub struct Hypothesis {
    /// Decoder tokens, starting with the decoder-start token. Finished
    /// hypotheses do not include the terminal EOS.
    pub tokens: Vec<i64>,
    /// Sum of token log-probabilities.
    pub score: f32,
}

impl Hypothesis {
    /// Number of generated tokens (excludes the decoder-start token).
    fn generated_len(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    /// Score used to rank finished hypotheses.
    fn ranking_score(&self, length_penalty: f32) -> f32 {
        let len = self.generated_len().max(1) as f32;
        self.score / len.powf(length_penalty)
    }
}

/// Beam-search state across decode steps.
///
/// Invariant: all live hypotheses have the same token length, so a step's
/// decoder call can batch them into one `[beams, len]` tensor.
pub struct BeamSearch {
    num_beams: usize,
    max_length: usize,
    eos_token_id: i64,
    length_penalty: f32,
    early_stopping: bool,
    live: Vec<Hypothesis>,
    finished: Vec<Hypothesis>,
}

impl BeamSearch {
    pub fn new(
        num_beams: usize,
        max_length: usize,
        decoder_start_token_id: i64,
        eos_token_id: i64,
        length_penalty: f32,
        early_stopping: bool,
    ) -> Self {
        Self {
            num_beams: num_beams.max(1),
            max_length: max_length.max(1),
            eos_token_id,
            length_penalty,
            early_stopping,
            live: vec![Hypothesis {
                tokens: vec![decoder_start_token_id],
                score: 0.0,
            }],
            finished: Vec::new(),
        }
    }

    /// Live hypotheses, in rank order. All have equal length.
    pub fn live(&self) -> &[Hypothesis] {
        &self.live
    }

    /// Expand every live beam with one step of last-position logits.
    ///
    /// `logits` is row-major `[live.len(), vocab_size]`, raw (unnormalized).
    pub fn step(&mut self, logits: &[f32], vocab_size: usize) {
        assert_eq!(
            logits.len(),
            self.live.len() * vocab_size,
            "logits shape mismatch"
        );

        // Candidate pool: top (num_beams + 1) continuations per live beam,
        // so EOS picks cannot starve the live set.
        let per_beam = self.num_beams + 1;
        let mut candidates: Vec<(usize, i64, f32)> = Vec::with_capacity(self.live.len() * per_beam);

        for (row, beam) in self.live.iter().enumerate() {
            let row_logits = &logits[row * vocab_size..(row + 1) * vocab_size];
            let log_probs = log_softmax(row_logits);
            for token in top_k(&log_probs, per_beam) {
                candidates.push((row, token as i64, beam.score + log_probs[token]));
            }
        }

        candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        let mut next_live = Vec::with_capacity(self.num_beams);
        for (row, token, score) in candidates {
            if next_live.len() == self.num_beams {
                break;
            }
            if token == self.eos_token_id {
                self.finished.push(Hypothesis {
                    tokens: self.live[row].tokens.clone(),
                    score,
                });
            } else {
                let mut tokens = self.live[row].tokens.clone();
                tokens.push(token);
                next_live.push(Hypothesis { tokens, score });
            }
        }
        self.live = next_live;
    }

    /// Whether decoding should stop before the next step.
    pub fn is_done(&self) -> bool {
        if self.live.is_empty() {
            return true;
        }
        if self.early_stopping && self.finished.len() >= self.num_beams {
            return true;
        }
        self.live[0].generated_len() >= self.max_length
    }

    /// Best hypothesis, ranked with the length penalty. Generated tokens
    /// only: the decoder-start token is stripped.
    pub fn into_best(mut self) -> Vec<i64> {
        if self.finished.is_empty() {
            // Budget exhausted with nothing terminal; keep the best live beam.
            self.finished.append(&mut self.live);
        }
        let length_penalty = self.length_penalty;
        let best = self
            .finished
            .into_iter()
            .max_by(|a, b| {
                a.ranking_score(length_penalty)
                    .partial_cmp(&b.ranking_score(length_penalty))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("beam search always holds at least one hypothesis");
        best.tokens[1..].to_vec()
    }
}

/// Numerically stable log-softmax over one logits row.
pub fn log_softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum: f32 = row.iter().map(|&x| (x - max).exp()).sum::<f32>().ln();
    row.iter().map(|&x| x - max - log_sum).collect()
}

/// Indices of the `k` largest values, in descending order.
pub fn top_k(values: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(k);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: i64 = 0;
    const EOS: i64 = 1;

    fn run(beams: usize, max_len: usize, steps: &[Vec<f32>], vocab: usize) -> Vec<i64> {
        let mut search = BeamSearch::new(beams, max_len, START, EOS, 1.0, true);
        let mut step = 0;
        while !search.is_done() {
            let rows = search.live().len();
            // Repeat the step's logits for every live beam.
            let logits: Vec<f32> = steps[step.min(steps.len() - 1)]
                .iter()
                .cycle()
                .take(rows * vocab)
                .copied()
                .collect();
            search.step(&logits, vocab);
            step += 1;
        }
        search.into_best()
    }

    #[test]
    fn log_softmax_is_normalized() {
        let lp = log_softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = lp.iter().map(|x| x.exp()).sum();
        assert!((total - 1.0).abs() < 1e-5);
        // Order preserved.
        assert!(lp[2] > lp[1] && lp[1] > lp[0]);
    }

    #[test]
    fn top_k_returns_descending_indices() {
        let idx = top_k(&[0.1, 0.9, 0.5, 0.7], 3);
        assert_eq!(idx, vec![1, 3, 2]);
    }

    #[test]
    fn greedy_follows_argmax_until_eos() {
        // vocab 4: step 1 favors token 3, step 2 favors token 2, step 3 EOS.
        let steps = vec![
            vec![0.0, 0.0, 0.0, 5.0],
            vec![0.0, 0.0, 5.0, 0.0],
            vec![0.0, 5.0, 0.0, 0.0],
        ];
        let out = run(1, 10, &steps, 4);
        assert_eq!(out, vec![3, 2]);
    }

    #[test]
    fn eos_on_first_step_yields_empty_output() {
        let steps = vec![vec![0.0, 5.0, 0.0, 0.0]];
        let out = run(1, 10, &steps, 4);
        assert!(out.is_empty());
    }

    #[test]
    fn max_length_bounds_generation() {
        // EOS never favored; must stop at the budget.
        let steps = vec![vec![0.0, -10.0, 5.0, 0.0]];
        let out = run(2, 3, &steps, 4);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn early_stopping_fills_finished_set() {
        // EOS always top candidate: each step moves beams into finished.
        let steps = vec![vec![0.0, 5.0, 4.0, 3.0]];
        let mut search = BeamSearch::new(2, 10, START, EOS, 1.0, true);
        let mut guard = 0;
        while !search.is_done() {
            let rows = search.live().len();
            let logits: Vec<f32> = steps[0].iter().cycle().take(rows * 4).copied().collect();
            search.step(&logits, 4);
            guard += 1;
            assert!(guard < 10, "early stopping never triggered");
        }
        assert!(guard <= 2, "should stop once two hypotheses finish");
    }

    #[test]
    fn length_penalty_favors_longer_hypotheses() {
        let short = Hypothesis {
            tokens: vec![START, 5],
            score: -2.0,
        };
        let long = Hypothesis {
            tokens: vec![START, 5, 6, 7, 8],
            score: -4.0,
        };
        // Flat ranking prefers the short one; a strong penalty flips it.
        assert!(short.ranking_score(1.0) > long.ranking_score(1.0));
        assert!(long.ranking_score(2.0) > short.ranking_score(2.0));
    }

    #[test]
    fn decoding_is_deterministic() {
        let steps = vec![
            vec![0.1, 0.2, 1.5, 1.4],
            vec![0.3, 2.0, 0.1, 0.9],
        ];
        let a = run(3, 8, &steps, 4);
        let b = run(3, 8, &steps, 4);
        assert_eq!(a, b);
    }
}
