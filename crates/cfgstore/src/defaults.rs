//! Opt-in process-wide stores
//!
//! Nothing is installed until the application calls
//! [`set_default_configuration`] or [`set_default_environment`]. Code that can
//! be handed a store explicitly should take it as a parameter instead.

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

use crate::binder::Shared;
use crate::configuration::Configuration;
use crate::configure::{Configurable, ConfigureReport, Configurator};
use crate::environment::Environment;

static DEFAULT_CONFIGURATION: RwLock<Option<Arc<Configuration>>> = const_rwlock(None);
static DEFAULT_ENVIRONMENT: RwLock<Option<Arc<Environment>>> = const_rwlock(None);

/// Install (or with `None`, remove) the default settings store
pub fn set_default_configuration(config: Option<Arc<Configuration>>) -> Option<Arc<Configuration>> {
    std::mem::replace(&mut *DEFAULT_CONFIGURATION.write(), config)
}

pub fn default_configuration() -> Option<Arc<Configuration>> {
    DEFAULT_CONFIGURATION.read().clone()
}

/// Install (or with `None`, remove) the default environment store
pub fn set_default_environment(env: Option<Arc<Environment>>) -> Option<Arc<Environment>> {
    std::mem::replace(&mut *DEFAULT_ENVIRONMENT.write(), env)
}

pub fn default_environment() -> Option<Arc<Environment>> {
    DEFAULT_ENVIRONMENT.read().clone()
}

/// Configure `target` from the default settings store
///
/// `None` when no default is installed; `target` is then left as it was.
pub fn configure_with_default_configuration<T: Configurable>(target: &Shared<T>) -> Option<ConfigureReport> {
    default_configuration().map(|config| config.configure(target))
}

/// Configure `target` from the default environment store
pub fn configure_with_default_environment<T: Configurable>(target: &Shared<T>) -> Option<ConfigureReport> {
    default_environment().map(|env| env.configure(target))
}
