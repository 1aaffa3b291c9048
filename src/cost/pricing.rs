use serde::Deserialize;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

const OPUS_4_5: ModelPricing = ModelPricing {
    input: 5.0,
    output: 25.0,
    cache_write: 6.25,
    cache_read: 0.50,
};

const OPUS: ModelPricing = ModelPricing {
    input: 15.0,
    output: 75.0,
    cache_write: 18.75,
    cache_read: 1.50,
};

const SONNET: ModelPricing = ModelPricing {
    input: 3.0,
    output: 15.0,
    cache_write: 3.75,
    cache_read: 0.30,
};

const HAIKU_4_5: ModelPricing = ModelPricing {
    input: 1.0,
    output: 5.0,
    cache_write: 1.25,
    cache_read: 0.10,
};

const HAIKU_3_5: ModelPricing = ModelPricing {
    input: 0.80,
    output: 4.0,
    cache_write: 1.0,
    cache_read: 0.08,
};

/// Ordered: the first matching needle wins, so specific versions come before
/// family names.
const TABLE: &[(&[&str], ModelPricing)] = &[
    (&["opus-4-5", "opus-4.5", "opus-4-6", "opus-4.6"], OPUS_4_5),
    (&["opus"], OPUS),
    (&["haiku-4-5", "haiku-4.5"], HAIKU_4_5),
    (&["haiku"], HAIKU_3_5),
    (&["sonnet"], SONNET),
];

/// Pricing for a model id. Unknown models are billed as mid-tier Sonnet.
pub fn pricing_for(model: &str) -> ModelPricing {
    let model = model.to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| model.contains(n)))
        .map(|(_, p)| *p)
        .unwrap_or(SONNET)
}

/// Token counts from a transcript `message.usage` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
}

impl TokenUsage {
    pub fn cost_usd(&self, model: &str) -> f64 {
        let p = pricing_for(model);
        (self.input_tokens as f64 * p.input
            + self.output_tokens as f64 * p.output
            + self.cache_creation_input_tokens as f64 * p.cache_write
            + self.cache_read_input_tokens as f64 * p.cache_read)
            / 1_000_000.0
    }
}
