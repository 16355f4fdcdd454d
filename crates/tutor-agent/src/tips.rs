use rand::seq::IndexedRandom;
use rand::Rng;

pub const TIPS: &[&str] = &[
    "Always look at your data before modelling it: df.head(), df.info() and df.describe() catch most surprises.",
    "Split your data into train and test sets before any preprocessing to avoid leakage.",
    "Correlation is not causation. Look for confounders before drawing conclusions.",
    "Start with a simple baseline model. A fancy model is only impressive if it beats the baseline.",
    "Scale numeric features before using distance-based methods such as k-means or k-NN.",
    "Use cross-validation instead of a single split when your dataset is small.",
    "Plot distributions as well as summary statistics. Very different datasets can share a mean and variance.",
    "Accuracy is misleading on imbalanced classes. Check precision, recall and the confusion matrix.",
    "Keep your notebooks reproducible: fix random seeds and record library versions.",
    "Missing values carry information. Ask why they are missing before you fill them in.",
    "Vectorize with NumPy or Pandas instead of looping over rows in Python.",
    "A p-value is not the probability that the null hypothesis is true.",
];

/// One tip chosen at random.
pub fn random_tip<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    TIPS.choose(rng).copied().unwrap_or(TIPS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tip_comes_from_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(TIPS.contains(&random_tip(&mut rng)));
        }
    }

    #[test]
    fn test_seeded_tip_is_repeatable() {
        let a = random_tip(&mut StdRng::seed_from_u64(42));
        let b = random_tip(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
