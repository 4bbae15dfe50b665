use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SKILLET_GLOBAL_PATH")
            && !v.is_empty()
        {
            self.global_path = v;
        }
        if let Ok(v) = std::env::var("SKILLET_DEFAULT_STRATEGY") {
            match v.parse() {
                Ok(strategy) => self.default_strategy = strategy,
                Err(_) => tracing::warn!("ignoring invalid SKILLET_DEFAULT_STRATEGY value: {v}"),
            }
        }
    }
}
