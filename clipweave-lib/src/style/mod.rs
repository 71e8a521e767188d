pub mod dedupe;
pub mod gradients;
pub mod minify;
pub mod router;
pub mod rules;
pub mod selector;
pub mod variables;
pub mod weave_css;
