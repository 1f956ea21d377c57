use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_OPTION_COUNT: usize = 4;
pub const MAX_OPTION_COUNT: usize = 10;

/// Correct meaning plus up to `count - 1` distinct distractors, shuffled.
pub fn build_options<R: Rng + ?Sized>(
    correct: &str,
    distractor_pool: &[String],
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let correct = correct.trim();
    let mut candidates: Vec<String> = Vec::with_capacity(distractor_pool.len());
    for meaning in distractor_pool {
        let meaning = meaning.trim();
        if meaning.is_empty() || meaning == correct {
            continue;
        }
        if !candidates.iter().any(|c| c == meaning) {
            candidates.push(meaning.to_string());
        }
    }

    candidates.shuffle(rng);
    candidates.truncate(count.saturating_sub(1));

    let mut options = Vec::with_capacity(candidates.len() + 1);
    options.push(correct.to_string());
    options.extend(candidates);
    options.shuffle(rng);
    options
}

/// [`build_options`] with the thread-local generator.
pub fn multiple_choice(correct: &str, distractor_pool: &[String], count: usize) -> Vec<String> {
    build_options(correct, distractor_pool, count, &mut rand::rng())
}
