//! Template functions.
//!
//! Every compiled artifact gets the same immutable [`FunctionRegistry`]: the
//! composition functions below merged with the caller's custom functions.
//!
//! | Function | Effect |
//! |----------|--------|
//! | `layout(name)` / `master(name)` | Chooses the layout wrapping the current view; outputs nothing |
//! | `content()` | Inside a layout, the rendered view; anywhere else, an error |
//! | `render(name)` / `include(name)` | Renders a partial inline; a missing partial renders as nothing |
//!
//! The composition functions keep no state of their own. Per-call state lives on
//! the [`RenderInvocation`] reachable from the template's context.

use std::collections::BTreeMap;

use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind, State};

use crate::error::ViewError;
use crate::invocation::RenderInvocation;

/// Names reserved for the composition functions.
pub const COMPOSITION_FUNCTIONS: &[&str] = &["content", "layout", "master", "render", "include"];

/// Immutable mapping from function name to callable.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Value>,
}

impl FunctionRegistry {
    /// The composition functions alone.
    pub fn base() -> Self {
        let mut functions = BTreeMap::new();
        functions.insert("content".to_string(), Value::from_function(content));
        functions.insert("layout".to_string(), Value::from_function(layout));
        functions.insert("master".to_string(), Value::from_function(layout));
        functions.insert("render".to_string(), Value::from_function(render));
        functions.insert("include".to_string(), Value::from_function(render));
        Self { functions }
    }

    /// The composition functions merged with `custom`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] if a custom function reuses a composition name.
    pub fn merged(custom: &BTreeMap<String, Value>) -> Result<Self, ViewError> {
        let mut registry = Self::base();
        for (name, function) in custom {
            if registry.functions.contains_key(name) {
                return Err(ViewError::Config(format!(
                    "function \"{}\" is reserved for view composition",
                    name
                )));
            }
            registry.functions.insert(name.clone(), function.clone());
        }
        Ok(registry)
    }

    /// Returns true if a function is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions, composition functions included.
    pub(crate) fn len(&self) -> usize {
        self.functions.len()
    }

    /// Installs every function as a global of `env`.
    pub(crate) fn install(&self, env: &mut Environment<'static>) {
        for (name, function) in &self.functions {
            env.add_global(name.clone(), function.clone());
        }
    }
}

fn content(state: &State) -> Result<Value, Error> {
    let invocation = RenderInvocation::from_state(state)?;
    match invocation.content() {
        Some(body) => Ok(Value::from_safe_string(body)),
        None => Err(Error::new(
            ErrorKind::InvalidOperation,
            "content() used outside layout",
        )),
    }
}

fn layout(state: &State, name: String) -> Result<Value, Error> {
    let invocation = RenderInvocation::from_state(state)?;
    invocation.declare_master(name);
    Ok(Value::from(""))
}

fn render(state: &State, name: String) -> Result<Value, Error> {
    let invocation = RenderInvocation::from_state(state)?;
    let composer = invocation.composer();
    match composer.include(state.env(), &name, &invocation) {
        Ok(output) => Ok(Value::from_safe_string(output)),
        Err(err) => Err(invocation.fail(err)),
    }
}
