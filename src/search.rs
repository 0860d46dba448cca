//! Search-index settings published for the external search engine.
//!
//! The registry does not index anything itself; it only hands out the
//! analyzer configuration the engine should be created with: a custom
//! default analyzer (standard tokenizer, lowercasing, stop words, k-stemming)
//! followed by an n-gram filter whose bounds come from `[search]`.

use serde_json::{json, Value};

use crate::config::SearchConfig;

/// Token filters of the default analyzer, applied in order.
pub const ANALYZER_FILTERS: &[&str] = &["standard", "lowercase", "stop", "kstem", "ngram"];

pub fn index_settings(config: &SearchConfig) -> Value {
    json!({
        "settings": {
            "analysis": {
                "analyzer": {
                    "default": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ANALYZER_FILTERS
                    }
                },
                "filter": {
                    "ngram": {
                        "type": "ngram",
                        "min_gram": config.min_gram,
                        "max_gram": config.max_gram
                    }
                }
            }
        }
    })
}

/// CLI entry point: prints the settings as pretty JSON.
pub fn print_index_settings(config: &SearchConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&index_settings(config))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_payload() {
        let settings = index_settings(&SearchConfig::default());
        let analysis = &settings["settings"]["analysis"];

        assert_eq!(analysis["analyzer"]["default"]["type"], "custom");
        assert_eq!(analysis["analyzer"]["default"]["tokenizer"], "standard");
        assert_eq!(
            analysis["analyzer"]["default"]["filter"],
            json!(["standard", "lowercase", "stop", "kstem", "ngram"])
        );
        assert_eq!(analysis["filter"]["ngram"]["type"], "ngram");
        assert_eq!(analysis["filter"]["ngram"]["min_gram"], 4);
        assert_eq!(analysis["filter"]["ngram"]["max_gram"], 15);
    }

    #[test]
    fn test_ngram_bounds_follow_config() {
        let settings = index_settings(&SearchConfig {
            min_gram: 2,
            max_gram: 8,
        });
        let ngram = &settings["settings"]["analysis"]["filter"]["ngram"];
        assert_eq!(ngram["min_gram"], 2);
        assert_eq!(ngram["max_gram"], 8);
    }
}
