//! Classification oracle wrapper
//!
//! Wraps a [`TextGenerator`] to implement the routing classification:
//! free text in, one label from the closed set out. Raw oracle output is
//! normalized (trim, lowercase, strip one trailing period, exact match);
//! anything unrecognized resolves to `unknown`. A provider failure also
//! resolves to `unknown` - classification is policy, never an error, and
//! is never retried.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::provider::{GenerationRequest, TextGenerator};
use crate::state::RouteLabel;

const CLASSIFIER_INSTRUCTIONS: &str = "\
You are a routing classifier for an operations assistant. Classify the user \
input into exactly one of: 'work_order', 'relational', 'search', 'report', \
'unknown'.

Guidance:
- Questions about work orders, assets, sites, or maintenance operations are 'work_order'.
- Questions answered by querying database tables (counts, listings, aggregations) are 'relational'.
- Questions answered from documentation or knowledge passages are 'search'.
- Requests for a chart, table, or report artifact over stored data are 'report'.
- Anything else is 'unknown'.

Respond with the single label only, no other words.";

/// LLM-backed route classifier
pub struct RouteClassifier {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f32,
}

impl RouteClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
            // Low temperature keeps label output stable
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Classify free text into a routing label
    pub async fn classify(&self, text: &str) -> RouteLabel {
        let request = GenerationRequest::new(&self.model, CLASSIFIER_INSTRUCTIONS, text)
            .with_temperature(self.temperature)
            .with_max_tokens(16);

        match self.generator.generate(request).await {
            Ok(response) => {
                let label = RouteLabel::parse(&response.content);
                debug!(
                    raw = %response.content,
                    label = %label,
                    "Classification oracle returned"
                );
                label
            }
            Err(error) => {
                warn!(error = %error, "Classification oracle failed, resolving to unknown");
                RouteLabel::Unknown
            }
        }
    }
}
