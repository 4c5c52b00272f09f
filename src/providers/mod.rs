pub mod util;
pub mod yahoo_finance;

use std::collections::BTreeMap;

use crate::core::config::AppConfig;
use crate::core::{DataSource, Error, Getter, Result};

pub use util::RetryPolicy;
pub use yahoo_finance::YahooFinanceSource;

/// Builds a source from application config.
pub type SourceConstructor = fn(&AppConfig) -> Box<dyn DataSource>;

/// Data sources selectable by label.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    constructors: BTreeMap<&'static str, SourceConstructor>,
}

impl Default for SourceRegistry {
    /// A registry with every built-in source.
    fn default() -> Self {
        let mut registry = SourceRegistry::empty();
        registry.register(yahoo_finance::LABEL, |config| -> Box<dyn DataSource> {
            Box::new(YahooFinanceSource::from_config(config))
        });
        registry
    }
}

impl SourceRegistry {
    pub fn empty() -> Self {
        SourceRegistry {
            constructors: BTreeMap::new(),
        }
    }

    /// Adds a source, replacing any already registered under `label`.
    pub fn register(&mut self, label: &'static str, constructor: SourceConstructor) {
        self.constructors.insert(label, constructor);
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }

    pub fn create(&self, label: &str, config: &AppConfig) -> Result<Box<dyn DataSource>> {
        let constructor = self
            .constructors
            .get(label)
            .ok_or_else(|| Error::UnknownProvider {
                label: label.to_string(),
                known: format!("{:?}", self.labels().collect::<Vec<_>>()),
            })?;
        Ok(constructor(config))
    }

    /// A getter with an empty cache over the source registered as `label`.
    pub fn getter(&self, label: &str, config: &AppConfig) -> Result<Getter> {
        Ok(Getter::new(self.create(label, config)?))
    }
}

/// Returns a getter for one of the built-in sources.
pub fn data_getter_factory(label: &str, config: &AppConfig) -> Result<Getter> {
    SourceRegistry::default().getter(label, config)
}
