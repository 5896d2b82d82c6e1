//! The three-scope variable store and template resolver.
//!
//! Owns the collection, environment and global scopes plus the derived
//! flattened map. The flattened map is a pure function of the scopes
//! and is rebuilt synchronously by every mutator, so reads are always
//! consistent with the last write.

use std::collections::{BTreeMap, HashMap};

use courier_domain::EnvironmentSet;

use super::parser::{has_tokens, parse_tokens};

/// Variable store: collection defaults, the active environment, and
/// globals, flattened in precedence order (global highest).
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    collection: BTreeMap<String, String>,
    environment: EnvironmentSet,
    globals: BTreeMap<String, String>,
    flattened: HashMap<String, String>,
}

impl VariableStore {
    /// Creates a store from the three scopes and builds the flattened
    /// map.
    #[must_use]
    pub fn new(
        collection: BTreeMap<String, String>,
        environment: EnvironmentSet,
        globals: BTreeMap<String, String>,
    ) -> Self {
        let mut store = Self {
            collection,
            environment,
            globals,
            flattened: HashMap::new(),
        };
        store.rebuild();
        store
    }

    /// Rebuilds the flattened map from scratch. Precedence, lowest to
    /// highest: collection defaults, enabled environment entries,
    /// globals. Disabled environment entries neither contribute nor
    /// shadow.
    fn rebuild(&mut self) {
        let mut flattened = HashMap::new();
        for (key, value) in &self.collection {
            flattened.insert(key.clone(), value.clone());
        }
        for entry in self.environment.enabled() {
            flattened.insert(entry.key.clone(), entry.value.clone());
        }
        for (key, value) in &self.globals {
            flattened.insert(key.clone(), value.clone());
        }
        self.flattened = flattened;
    }

    /// Swaps in a whole new active environment.
    pub fn set_environment(&mut self, environment: EnvironmentSet) {
        self.environment = environment;
        self.rebuild();
    }

    /// Returns the active environment.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentSet {
        &self.environment
    }

    /// Reads a value from the flattened map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.flattened.get(key).map(String::as_str)
    }

    /// Reads a value from the environment scope only.
    #[must_use]
    pub fn get_environment(&self, key: &str) -> Option<&str> {
        self.environment.get(key)
    }

    /// Reads a value from the global scope only.
    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    /// Reads a value from the collection scope only.
    #[must_use]
    pub fn get_collection(&self, key: &str) -> Option<&str> {
        self.collection.get(key).map(String::as_str)
    }

    /// Writes an environment variable and rebuilds.
    pub fn set_environment_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.set(key, value);
        self.rebuild();
    }

    /// Removes an environment variable and rebuilds.
    pub fn unset_environment_var(&mut self, key: &str) {
        self.environment.unset(key);
        self.rebuild();
    }

    /// Writes a global variable and rebuilds.
    pub fn set_global_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.globals.insert(key.into(), value.into());
        self.rebuild();
    }

    /// Removes a global variable and rebuilds.
    pub fn unset_global_var(&mut self, key: &str) {
        self.globals.remove(key);
        self.rebuild();
    }

    /// Writes a collection variable and mirrors the write into the
    /// active environment so the value is visible immediately without a
    /// rebuild race, then rebuilds.
    pub fn set_collection_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.collection.insert(key.clone(), value.clone());
        self.environment.set(key, value);
        self.rebuild();
    }

    /// Removes a collection variable and rebuilds.
    pub fn unset_collection_var(&mut self, key: &str) {
        self.collection.remove(key);
        self.rebuild();
    }

    /// Resolves all `{{ name }}` tokens in a template.
    ///
    /// Lookup order per token: `locals` (when given), then the
    /// flattened map (non-empty values only), then the collection
    /// defaults as a final fallback. Unresolved tokens render as empty
    /// string. A single left-to-right pass over the original spans
    /// makes resolution idempotent: token-looking text inside a
    /// substituted value is never rescanned.
    #[must_use]
    pub fn resolve(&self, template: &str, locals: Option<&HashMap<String, String>>) -> String {
        if !has_tokens(template) {
            return template.to_string();
        }
        let tokens = parse_tokens(template);
        if tokens.is_empty() {
            return template.to_string();
        }

        let mut result = String::with_capacity(template.len());
        let mut last_end = 0;

        for token in &tokens {
            result.push_str(&template[last_end..token.span.start]);
            result.push_str(self.lookup(&token.name, locals));
            last_end = token.span.end;
        }

        result.push_str(&template[last_end..]);
        result
    }

    fn lookup<'a>(&'a self, name: &str, locals: Option<&'a HashMap<String, String>>) -> &'a str {
        if let Some(value) = locals.and_then(|l| l.get(name)) {
            return value;
        }
        if let Some(value) = self.flattened.get(name) {
            if !value.is_empty() {
                return value;
            }
        }
        if let Some(value) = self.collection.get(name) {
            return value;
        }
        ""
    }

    /// Returns the token names in a template that resolve to nothing in
    /// any scope. The UI marks these before resolution; the resolver
    /// itself renders them as empty.
    #[must_use]
    pub fn missing_tokens(&self, template: &str) -> Vec<String> {
        parse_tokens(template)
            .into_iter()
            .map(|t| t.name)
            .filter(|name| !self.flattened.contains_key(name) && !self.collection.contains_key(name))
            .collect()
    }
}
