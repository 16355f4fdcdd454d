use tracing::debug;

pub const DATA_SCIENCE_KEYWORDS: &[&str] = &[
    "data",
    "science",
    "machine learning",
    "statistic",
    "python",
    "pandas",
    "numpy",
    "regression",
    "classification",
    "model",
    "algorithm",
    "visualization",
    "sklearn",
    "scikit",
    "tensorflow",
    "pytorch",
    "deep learning",
    "neural network",
    "probability",
    "hypothesis",
    "clustering",
    "sql",
    "matplotlib",
    "seaborn",
    "overfitting",
    "correlation",
    "variance",
];

pub const OFF_TOPIC_REPLY: &str = "Hmm, that doesn't sound like a data science question! \
I'm here to nerd out about data, statistics and coding. Which data science topic can I help you with?";

/// Keyword gate that keeps the conversation on data science.
#[derive(Debug, Clone, Default)]
pub struct TopicGate {
    extra_keywords: Vec<String>,
}

impl TopicGate {
    pub fn new(extra_keywords: &[String]) -> Self {
        Self {
            extra_keywords: extra_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_on_topic(&self, question: &str) -> bool {
        let question = question.to_lowercase();
        let on_topic = DATA_SCIENCE_KEYWORDS.iter().any(|k| question.contains(k))
            || self.extra_keywords.iter().any(|k| question.contains(k.as_str()));

        if !on_topic {
            debug!("Question did not match any data science keyword");
        }
        on_topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keywords_case_insensitive() {
        let gate = TopicGate::default();
        assert!(gate.is_on_topic("How do I use Pandas groupby?"));
        assert!(gate.is_on_topic("Explain LINEAR REGRESSION"));
        assert!(gate.is_on_topic("what's a statistical test"));
        assert!(!gate.is_on_topic("What's the best pizza topping?"));
    }

    #[test]
    fn test_extra_keywords() {
        let gate = TopicGate::new(&["  Bayes ".to_string(), String::new()]);
        assert!(gate.is_on_topic("tell me about bayes' theorem"));
        assert!(!gate.is_on_topic("tell me a joke"));
    }
}
