/// Canned Python examples appended to "how"/"example" questions. Checked
/// in order; the first topic the question mentions wins.
const SNIPPETS: &[(&str, &str)] = &[
    (
        "pandas",
        "\n\nHere's a quick Pandas example:\n```python\nimport pandas as pd\n\ndf = pd.DataFrame({'Name': ['Alice', 'Bob'], 'Score': [85, 92]})\nprint(df[df['Score'] > 90])\n```\nFiltering rows is a one-liner!",
    ),
    (
        "regression",
        "\n\nHere's a small regression snippet:\n```python\nfrom sklearn.linear_model import LinearRegression\n\nX = [[1], [2], [3]]\ny = [2, 4, 6]\nmodel = LinearRegression().fit(X, y)\nprint(model.predict([[4]]))\n```\nFit, then predict.",
    ),
    (
        "numpy",
        "\n\nHere's a NumPy example:\n```python\nimport numpy as np\n\nscores = np.array([85, 92, 78, 64])\nprint(scores.mean(), scores.std())\nprint(scores[scores > 80])\n```\nVectorized math with no loops.",
    ),
    (
        "matplotlib",
        "\n\nHere's a Matplotlib example:\n```python\nimport matplotlib.pyplot as plt\n\nx = [1, 2, 3, 4]\ny = [1, 4, 9, 16]\nplt.plot(x, y, marker='o')\nplt.xlabel('x')\nplt.ylabel('x squared')\nplt.show()\n```\nA labelled line chart in a few lines.",
    ),
    (
        "clustering",
        "\n\nHere's a clustering example:\n```python\nfrom sklearn.cluster import KMeans\n\npoints = [[1, 1], [1.5, 2], [8, 8], [9, 8.5]]\nkmeans = KMeans(n_clusters=2, n_init=10).fit(points)\nprint(kmeans.labels_)\n```\nTwo tidy groups.",
    ),
];

/// The snippet to append for `question`, if it asks "how" or for an
/// "example" about a topic with a canned snippet.
pub fn snippet_for(question: &str) -> Option<&'static str> {
    let question = question.to_lowercase();
    if !(question.contains("how") || question.contains("example")) {
        return None;
    }

    SNIPPETS
        .iter()
        .find(|(topic, _)| question.contains(topic))
        .map(|(_, snippet)| *snippet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_how_or_example() {
        assert!(snippet_for("What is pandas?").is_none());
        assert!(snippet_for("How do I filter with pandas?").is_some());
        assert!(snippet_for("Show me a NumPy example").is_some());
    }

    #[test]
    fn test_first_matching_topic_wins() {
        let snippet = snippet_for("how to run a regression on a pandas frame").unwrap();
        assert!(snippet.contains("import pandas"));
    }

    #[test]
    fn test_unknown_topic() {
        assert!(snippet_for("how does a transformer attend?").is_none());
    }

    #[test]
    fn test_snippets_are_fenced_python() {
        for (_, snippet) in SNIPPETS {
            assert_eq!(snippet.matches("```").count(), 2);
            assert!(snippet.contains("```python\n"));
        }
    }
}
