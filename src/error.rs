use thiserror::Error;

/// Errors from parsing host configuration (command line, option bags).
///
/// The effects themselves never fail; only the surface around them does.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid option '{input}', expected KEY=VALUE")]
    InvalidOptionPair { input: String },

    #[error("invalid options JSON: {source}")]
    InvalidOptionsJson {
        #[from]
        source: serde_json::Error,
    },

    #[error("options JSON must be an object, got {kind}")]
    OptionsNotObject { kind: &'static str },

    #[error("invalid hex color '{input}', expected RRGGBB (e.g. 1a1b26)")]
    InvalidHexColor { input: String },
}
