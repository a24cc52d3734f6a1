use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Approximate number of points rendered per fetch.
pub const DEFAULT_BATCH_CAP: usize = 300;

pub const DEBOUNCE_ENV: &str = "STOCKDATA_DEBOUNCE_MS";
pub const BATCH_CAP_ENV: &str = "STOCKDATA_BATCH_CAP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Quiet period after the last range change before a refetch.
    pub debounce: Duration,
    /// Upper bound on points requested per fetch.
    pub batch_cap: usize,
}

impl RefreshConfig {
    pub fn new(debounce: Duration, batch_cap: usize) -> Self {
        Self {
            debounce,
            batch_cap,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_batch_cap(mut self, batch_cap: usize) -> Self {
        self.batch_cap = batch_cap;
        self
    }

    /// Built-in defaults without consulting the environment.
    pub fn builtin() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS), DEFAULT_BATCH_CAP)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debounce_ms = parse_var(&lookup, DEBOUNCE_ENV).unwrap_or(DEFAULT_DEBOUNCE_MS);
        let batch_cap = parse_var(&lookup, BATCH_CAP_ENV)
            .filter(|cap| *cap > 0)
            .unwrap_or(DEFAULT_BATCH_CAP);
        Self::new(Duration::from_millis(debounce_ms), batch_cap)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = RefreshConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, RefreshConfig::builtin());
        assert_eq!(cfg.debounce, Duration::from_millis(500));
        assert_eq!(cfg.batch_cap, 300);
    }

    #[test]
    fn env_overrides_and_rejects_garbage() {
        let cfg = RefreshConfig::from_lookup(lookup(&[
            (DEBOUNCE_ENV, " 250 "),
            (BATCH_CAP_ENV, "120"),
        ]));
        assert_eq!(cfg.debounce, Duration::from_millis(250));
        assert_eq!(cfg.batch_cap, 120);

        let cfg = RefreshConfig::from_lookup(lookup(&[
            (DEBOUNCE_ENV, "soon"),
            (BATCH_CAP_ENV, "0"),
        ]));
        assert_eq!(cfg, RefreshConfig::builtin());
    }
}
