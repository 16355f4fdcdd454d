use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::env;
use tutor_core::{Result, TutorError};

// Supports both ${VAR} and ${VAR:-default}
static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Recursively substitute environment variables in every string scalar of a
/// YAML document. Keys are left untouched.
///
/// A scalar that is exactly one placeholder takes the type of what it
/// expands to, so `max_tokens: ${MAX_TOKENS:-512}` becomes a number. Numbers
/// and booleans only; anything else stays a string.
pub fn substitute_env_vars(value: &mut Value) -> Result<()> {
    let mut missing = Vec::new();
    walk(value, &mut missing);

    if missing.is_empty() {
        return Ok(());
    }

    missing.sort();
    missing.dedup();
    Err(TutorError::Config(format!(
        "Missing required environment variables: {}. Please set these variables before loading the configuration.",
        missing.join(", ")
    )))
}

fn walk(value: &mut Value, missing: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let whole = is_single_placeholder(s);
            let substituted = substitute_in_string(s, missing);
            *value = if whole {
                typed_scalar(substituted)
            } else {
                Value::String(substituted)
            };
        }
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                walk(v, missing);
            }
        }
        Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                walk(v, missing);
            }
        }
        Value::Tagged(tagged) => walk(&mut tagged.value, missing),
        _ => {}
    }
}

fn is_single_placeholder(input: &str) -> bool {
    ENV_VAR_REGEX
        .find(input)
        .is_some_and(|m| m.start() == 0 && m.end() == input.len())
}

fn typed_scalar(text: String) -> Value {
    match serde_yaml::from_str::<Value>(&text) {
        Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
        _ => Value::String(text),
    }
}

fn substitute_in_string(input: &str, missing: &mut Vec<String>) -> String {
    ENV_VAR_REGEX
        .replace_all(input, |cap: &Captures| {
            let var_name = &cap[1];
            match env::var(var_name) {
                Ok(value) => value,
                Err(_) => match cap.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => {
                        missing.push(var_name.to_string());
                        cap[0].to_string()
                    }
                },
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_env_vars() {
        env::set_var("TUTOR_TEST_KEY", "secret-123");

        let mut value: Value = serde_yaml::from_str(
            r#"
model:
  api_key: "${TUTOR_TEST_KEY}"
  endpoint: "${TUTOR_TEST_UNSET_ENDPOINT:-http://localhost:11434}"
speech:
  synthesize_command: ["espeak", "--voice=${TUTOR_TEST_UNSET_VOICE:-en}"]
"#,
        )
        .unwrap();

        substitute_env_vars(&mut value).unwrap();

        assert_eq!(value["model"]["api_key"], Value::from("secret-123"));
        assert_eq!(
            value["model"]["endpoint"],
            Value::from("http://localhost:11434")
        );
        assert_eq!(
            value["speech"]["synthesize_command"][1],
            Value::from("--voice=en")
        );

        env::remove_var("TUTOR_TEST_KEY");
    }

    #[test]
    fn test_single_placeholder_takes_scalar_type() {
        env::set_var("TUTOR_TEST_TURNS", "7");

        let mut value: Value = serde_yaml::from_str(
            r#"
max_tokens: ${TUTOR_TEST_UNSET_MAX_TOKENS:-512}
max_history_turns: ${TUTOR_TEST_TURNS}
enabled: ${TUTOR_TEST_UNSET_ENABLED:-true}
model_id: ${TUTOR_TEST_UNSET_MODEL:-llama3.2:1b}
label: "turns=${TUTOR_TEST_TURNS}"
"#,
        )
        .unwrap();

        substitute_env_vars(&mut value).unwrap();

        assert_eq!(value["max_tokens"].as_u64(), Some(512));
        assert_eq!(value["max_history_turns"].as_u64(), Some(7));
        assert_eq!(value["enabled"].as_bool(), Some(true));
        assert_eq!(value["model_id"], Value::from("llama3.2:1b"));
        assert_eq!(value["label"], Value::from("turns=7"));

        env::remove_var("TUTOR_TEST_TURNS");
    }

    #[test]
    fn test_missing_variable_is_reported() {
        let mut value: Value =
            serde_yaml::from_str("api_key: \"${TUTOR_TEST_DEFINITELY_MISSING}\"").unwrap();

        let err = substitute_env_vars(&mut value).unwrap_err();
        assert!(err.to_string().contains("TUTOR_TEST_DEFINITELY_MISSING"));
    }
}
