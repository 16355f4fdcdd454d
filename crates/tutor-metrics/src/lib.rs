use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::debug;
use tutor_config::{ModelPricing, TutorConfig};
use tutor_core::TokenStatistics;

/// Session-wide token counts, split per model.
#[derive(Default)]
pub struct TokenTracker {
    input_tokens: AtomicUsize,
    output_tokens: AtomicUsize,
    model_stats: RwLock<HashMap<String, ModelTokenStats>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTokenStats {
    pub model_id: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub requests: usize,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one model call.
    pub fn add_usage(&self, usage: &TokenStatistics, model: &str) {
        self.input_tokens.fetch_add(usage.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(usage.output_tokens, Ordering::Relaxed);

        let mut stats = self
            .model_stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = stats
            .entry(model.to_string())
            .or_insert_with(|| ModelTokenStats {
                model_id: model.to_string(),
                ..Default::default()
            });
        entry.input_tokens += usage.input_tokens;
        entry.output_tokens += usage.output_tokens;
        entry.requests += 1;
    }

    pub fn get_stats(&self) -> TokenStatistics {
        TokenStatistics::new(
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }

    pub fn get_model_stats(&self) -> HashMap<String, ModelTokenStats> {
        self.model_stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostDetails {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub currency: String,
    pub model: String,
}

pub struct CostCalculator {
    pricing: HashMap<String, ModelPricing>,
    total_cost: RwLock<f64>,
}

impl CostCalculator {
    pub fn new(pricing: HashMap<String, ModelPricing>) -> Self {
        Self {
            pricing,
            total_cost: RwLock::new(0.0),
        }
    }

    pub fn from_config(config: &TutorConfig) -> Self {
        Self::new(config.pricing.clone())
    }

    /// Price one call and add it to the running total. Models without a
    /// pricing entry cost nothing.
    pub fn calculate(&self, tokens: &TokenStatistics, model: &str) -> CostDetails {
        let Some(p) = self.pricing.get(model) else {
            debug!("No pricing found for model: {}", model);
            return CostDetails {
                model: model.to_string(),
                currency: "USD".to_string(),
                ..Default::default()
            };
        };

        let input_cost = (tokens.input_tokens as f64 / 1000.0) * p.input_per_1k;
        let output_cost = (tokens.output_tokens as f64 / 1000.0) * p.output_per_1k;
        let total = input_cost + output_cost;

        *self
            .total_cost
            .write()
            .unwrap_or_else(PoisonError::into_inner) += total;

        CostDetails {
            input_cost,
            output_cost,
            total_cost: total,
            currency: p.currency.clone(),
            model: model.to_string(),
        }
    }

    pub fn has_pricing(&self, model: &str) -> bool {
        self.pricing.contains_key(model)
    }

    pub fn get_total_cost(&self) -> f64 {
        *self.total_cost.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Request counts and latency for the current session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsCollector {
    pub requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub off_topic_questions: usize,
    pub total_latency_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn record_request(&mut self, duration_ms: u64, success: bool) {
        self.requests += 1;
        self.total_latency_ms += duration_ms;

        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }

    /// Questions turned away by the topic gate never reach the model.
    pub fn record_off_topic(&mut self) {
        self.off_topic_questions += 1;
    }

    pub fn get_average_latency(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.requests as f64
        }
    }

    pub fn get_success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.successful_requests as f64 / self.requests as f64 * 100.0
        }
    }

    pub fn get_summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_requests: self.requests,
            off_topic_questions: self.off_topic_questions,
            success_rate: self.get_success_rate(),
            average_latency_ms: self.get_average_latency(),
            uptime_seconds: self
                .started_at
                .map(|start| (Utc::now() - start).num_seconds().max(0) as u64)
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_requests: usize,
    pub off_topic_questions: usize,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub uptime_seconds: u64,
}

/// Rough token count for providers that report no usage.
pub fn estimate_tokens(text: &str, model: &str) -> usize {
    let chars_per_token = if model.contains("claude") { 3.5 } else { 4.0 };
    (text.chars().count() as f64 / chars_per_token).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAIKU: &str = "anthropic.claude-3-haiku-20240307-v1:0";

    fn pricing() -> HashMap<String, ModelPricing> {
        let mut pricing = HashMap::new();
        pricing.insert(
            HAIKU.to_string(),
            ModelPricing {
                input_per_1k: 0.25,
                output_per_1k: 1.25,
                currency: "USD".to_string(),
            },
        );
        pricing
    }

    #[test]
    fn test_token_tracker() {
        let tracker = TokenTracker::new();

        tracker.add_usage(&TokenStatistics::new(100, 50), HAIKU);
        tracker.add_usage(&TokenStatistics::new(20, 10), HAIKU);
        tracker.add_usage(&TokenStatistics::new(5, 5), "llama3.2:1b");

        let stats = tracker.get_stats();
        assert_eq!(stats.input_tokens, 125);
        assert_eq!(stats.output_tokens, 65);
        assert_eq!(stats.total_tokens, 190);

        let model_stats = tracker.get_model_stats();
        assert_eq!(model_stats[HAIKU].requests, 2);
        assert_eq!(model_stats["llama3.2:1b"].output_tokens, 5);
    }

    #[test]
    fn test_cost_calculation() {
        let calc = CostCalculator::new(pricing());

        let cost = calc.calculate(&TokenStatistics::new(2000, 1000), HAIKU);
        assert!((cost.input_cost - 0.5).abs() < 1e-9);
        assert!((cost.output_cost - 1.25).abs() < 1e-9);
        assert!((cost.total_cost - 1.75).abs() < 1e-9);

        calc.calculate(&TokenStatistics::new(1000, 0), HAIKU);
        assert!((calc.get_total_cost() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unpriced_model_is_free() {
        let calc = CostCalculator::new(pricing());
        assert!(!calc.has_pricing("gemini-1.5-flash"));

        let cost = calc.calculate(&TokenStatistics::new(5000, 5000), "gemini-1.5-flash");
        assert_eq!(cost.total_cost, 0.0);
        assert_eq!(cost.currency, "USD");
        assert_eq!(calc.get_total_cost(), 0.0);
    }

    #[test]
    fn test_metrics_collector() {
        let mut collector = MetricsCollector::new();

        collector.record_request(100, true);
        collector.record_request(200, true);
        collector.record_request(150, false);
        collector.record_off_topic();

        assert_eq!(collector.requests, 3);
        assert_eq!(collector.successful_requests, 2);
        assert_eq!(collector.failed_requests, 1);
        assert_eq!(collector.get_average_latency(), 150.0);
        assert!((collector.get_success_rate() - 66.67).abs() < 0.01);

        let summary = collector.get_summary();
        assert_eq!(summary.off_topic_questions, 1);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_requests"], 3);
    }

    #[test]
    fn test_empty_collector() {
        let collector = MetricsCollector::new();
        assert_eq!(collector.get_average_latency(), 0.0);
        assert_eq!(collector.get_success_rate(), 0.0);
    }

    #[test]
    fn test_token_estimation() {
        let text = "What is the difference between mean and median?";
        let tokens = estimate_tokens(text, "anthropic.claude-3-haiku");
        assert!(tokens > 0);
        assert!(tokens < text.len());
        assert!(estimate_tokens(text, "llama3.2:1b") <= tokens);
        assert_eq!(estimate_tokens("", "llama3.2:1b"), 0);
    }
}
