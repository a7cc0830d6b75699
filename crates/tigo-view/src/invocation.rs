//! Per-call render state.
//!
//! A [`RenderInvocation`] is created for every `render`/`render_file` call and
//! dropped when it returns. It carries the data context, the partial counters
//! used for cycle detection, the layout chosen by the view, and the captured
//! view body while the layout executes. Nothing on it is shared between calls.
//!
//! Templates reach the invocation through a reserved context variable, which is
//! how the composition functions find it from inside MiniJinja.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use minijinja::value::{Object, Value};
use minijinja::{Error, ErrorKind, State};
use serde::Serialize;

use crate::composer::Composer;
use crate::error::ComposeError;

/// How many times one partial may be rendered within a single call.
pub const CYCLE_LIMIT: u32 = 20;

/// How deeply partials may nest within a single call, whatever their names.
pub const NESTING_LIMIT: usize = 64;

/// Context variable holding the invocation handle.
pub(crate) const INVOCATION_KEY: &str = "__tigo_invocation";

/// Variable exposing data that is not a map.
pub const DATA_KEY: &str = "data";

/// The layout decision made while rendering the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MasterChoice {
    /// The view made no `layout` call.
    Unset,
    /// The view asked for this layout.
    Declared(String),
    /// The view called `layout("")`.
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Content,
    Master,
}

#[derive(Debug)]
struct InvocationState {
    counters: HashMap<String, u32>,
    master: MasterChoice,
    content: Option<String>,
    pass: Pass,
    depth: usize,
    failure: Option<ComposeError>,
}

pub(crate) struct RenderInvocation {
    composer: Arc<Composer>,
    context: BTreeMap<String, Value>,
    state: Mutex<InvocationState>,
}

impl fmt::Debug for RenderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderInvocation")
            .field("context", &self.context)
            .field("state", &self.state)
            .finish()
    }
}

/// The object stored under [`INVOCATION_KEY`].
#[derive(Debug)]
struct InvocationHandle(Arc<RenderInvocation>);

impl Object for InvocationHandle {}

impl RenderInvocation {
    pub(crate) fn new(composer: Arc<Composer>, context: BTreeMap<String, Value>) -> Arc<Self> {
        Arc::new(Self {
            composer,
            context,
            state: Mutex::new(InvocationState {
                counters: HashMap::new(),
                master: MasterChoice::Unset,
                content: None,
                pass: Pass::Content,
                depth: 0,
                failure: None,
            }),
        })
    }

    /// Finds the invocation of the render currently executing `state`.
    pub(crate) fn from_state(state: &State) -> Result<Arc<Self>, Error> {
        state
            .lookup(INVOCATION_KEY)
            .and_then(|value| {
                value
                    .downcast_object_ref::<InvocationHandle>()
                    .map(|handle| Arc::clone(&handle.0))
            })
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    "composition functions are only available in view renders",
                )
            })
    }

    pub(crate) fn composer(&self) -> &Arc<Composer> {
        &self.composer
    }

    /// The template context: the call's data plus the invocation handle.
    pub(crate) fn render_context(self: &Arc<Self>) -> BTreeMap<String, Value> {
        let mut context = self.context.clone();
        context.insert(
            INVOCATION_KEY.to_string(),
            Value::from_object(InvocationHandle(Arc::clone(self))),
        );
        context
    }

    fn state(&self) -> MutexGuard<'_, InvocationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one render of `name`, failing past [`CYCLE_LIMIT`].
    pub(crate) fn enter_partial(&self, name: &str) -> Result<(), ComposeError> {
        let mut state = self.state();
        let count = state.counters.entry(name.to_string()).or_insert(0);
        *count += 1;
        tracing::trace!("partial \"{}\" invocation {}", name, count);
        if *count > CYCLE_LIMIT {
            return Err(ComposeError::CycleExceeded {
                name: name.to_string(),
                limit: CYCLE_LIMIT,
            });
        }
        Ok(())
    }

    /// Marks the start of a nested partial; the guard marks its end.
    ///
    /// Fails once `name` would sit more than [`NESTING_LIMIT`] partials deep.
    pub(crate) fn descend(&self, name: &str) -> Result<DepthGuard<'_>, ComposeError> {
        let depth = {
            let mut state = self.state();
            state.depth += 1;
            state.depth
        };
        let guard = DepthGuard { invocation: self };
        if depth > NESTING_LIMIT {
            return Err(ComposeError::NestingExceeded {
                name: name.to_string(),
                limit: NESTING_LIMIT,
            });
        }
        Ok(guard)
    }

    /// Records a layout choice. Only the top-level view of the first pass counts.
    pub(crate) fn declare_master(&self, name: String) {
        let mut state = self.state();
        if state.pass != Pass::Content || state.depth > 0 {
            tracing::trace!("ignoring layout \"{}\" outside the top-level view", name);
            return;
        }
        state.master = if name.is_empty() {
            MasterChoice::Cleared
        } else {
            MasterChoice::Declared(name)
        };
    }

    pub(crate) fn master_choice(&self) -> MasterChoice {
        self.state().master.clone()
    }

    /// The view body, once the layout pass has begun.
    pub(crate) fn content(&self) -> Option<String> {
        self.state().content.clone()
    }

    /// Switches to the layout pass: `body` becomes `content()` and the partial
    /// counters start over.
    pub(crate) fn begin_master_pass(&self, body: String) {
        let mut state = self.state();
        state.counters.clear();
        state.content = Some(body);
        state.pass = Pass::Master;
        state.depth = 0;
    }

    /// Keeps the first typed failure raised inside a template function and
    /// returns the error MiniJinja should propagate.
    pub(crate) fn fail(&self, err: ComposeError) -> Error {
        let message = err.to_string();
        let mut state = self.state();
        if state.failure.is_none() {
            state.failure = Some(err);
        }
        Error::new(ErrorKind::InvalidOperation, message)
    }

    pub(crate) fn take_failure(&self) -> Option<ComposeError> {
        self.state().failure.take()
    }
}

pub(crate) struct DepthGuard<'a> {
    invocation: &'a RenderInvocation,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.invocation.state();
        state.depth = state.depth.saturating_sub(1);
    }
}

/// Converts caller data into template variables.
///
/// Map-shaped data exposes its fields directly. `null` exposes nothing. Any
/// other value is available as `data`.
pub(crate) fn data_context<T: Serialize + ?Sized>(
    data: &T,
) -> Result<BTreeMap<String, Value>, ComposeError> {
    let mut context = BTreeMap::new();
    match serde_json::to_value(data)? {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                context.insert(key, Value::from_serialize(&value));
            }
        }
        serde_json::Value::Null => {}
        other => {
            context.insert(DATA_KEY.to_string(), Value::from_serialize(&other));
        }
    }
    Ok(context)
}
