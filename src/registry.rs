//! Named engine factories.
//!
//! The process exposes a fixed set of engine names; selection is a pure
//! lookup into an immutable map. Each factory takes the configuration
//! bundle by value, so there is no shared mutable state behind a name.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::engine::{Config, Engine, Method};
use crate::error::Error;

/// Builds an engine from a configuration bundle.
pub type EngineFactory = fn(Config) -> Engine;

static ENGINES: Lazy<BTreeMap<&'static str, EngineFactory>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, EngineFactory> = BTreeMap::new();
    map.insert("euler_engine", |config| Engine::new(Method::Euler, config));
    map.insert("rk4_engine", |config| {
        Engine::new(Method::RungeKutta4, config)
    });
    map.insert("verlet_engine", |config| Engine::new(Method::Verlet, config));
    map
});

/// Create an engine by registry name.
pub fn create(name: &str, config: Config) -> Result<Engine, Error> {
    match ENGINES.get(name) {
        Some(factory) => Ok(factory(config)),
        None => Err(Error::UnknownEngine {
            name: name.to_string(),
        }),
    }
}

/// The registered engine names, in sorted order.
pub fn names() -> impl Iterator<Item = &'static str> {
    ENGINES.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        for name in ["euler_engine", "rk4_engine", "verlet_engine"] {
            let engine = create(name, Config::default()).unwrap();
            let _ = engine.method();
        }
        assert_eq!(names().count(), 3);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let result = create("leapfrog_engine", Config::default());
        match result {
            Err(Error::UnknownEngine { name }) => assert_eq!(name, "leapfrog_engine"),
            other => panic!("expected UnknownEngine, got {other:?}"),
        }
    }

    #[test]
    fn engines_resolve_to_their_methods() {
        assert_eq!(
            create("rk4_engine", Config::default()).unwrap().method(),
            Method::RungeKutta4
        );
        assert_eq!(
            create("verlet_engine", Config::default()).unwrap().method(),
            Method::Verlet
        );
    }
}
