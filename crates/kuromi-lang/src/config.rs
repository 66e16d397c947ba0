//! Knobs for the two back ends.

/// Which scope a called function's fresh scope hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionScope {
    /// The global scope. Function bodies see globals and their own locals only.
    #[default]
    Global,
    /// The scope active where the function was declared.
    Lexical,
}

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub function_scope: FunctionScope,
    /// Seed for `random(min, max)`. `None` draws a seed from the OS.
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_function_scope(mut self, scope: FunctionScope) -> Self {
        self.function_scope = scope;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Document `<title>`.
    pub title: String,
    /// Prefix for image and sound paths, relative to the document.
    pub asset_dir: String,
    /// Canvas size used when the program has no `game W H` block.
    pub default_width: f64,
    pub default_height: f64,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            title: "Kuromi".to_string(),
            asset_dir: "assets/".to_string(),
            default_width: 800.0,
            default_height: 600.0,
        }
    }
}
