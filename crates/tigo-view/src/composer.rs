//! View composition.
//!
//! Rendering a view with a layout is two ordered passes over one
//! [`RenderInvocation`]:
//!
//! **Pass 1 - view**: the target executes. `content()` fails here, `layout(name)`
//! records the layout to use, and `render(name)` renders partials inline.
//!
//! **Pass 2 - layout**: only if a layout was chosen. The partial counters start
//! over, `content()` now returns the pass 1 output verbatim, and the layout
//! executes.
//!
//! The layout used is the one the view declared, else the configured master.
//! A view that calls `layout("")` is never wrapped.
//!
//! ```text
//! views/master.html:  HEADER{{ content() }}FOOTER
//! views/page.html:    {{ layout("master") }}BODY
//!
//! pass 1:  "BODY"              (layout = "master")
//! pass 2:  "HEADERBODYFOOTER"
//! ```
//!
//! # Partials
//!
//! `render(name)` counts one invocation of `name`; the 21st within a pass fails
//! with [`ComposeError::CycleExceeded`]. Partials nested more than
//! [`NESTING_LIMIT`](crate::NESTING_LIMIT) deep fail with
//! [`ComposeError::NestingExceeded`], which bounds cycles spread over many names. The partial is taken from the current
//! artifact when it was compiled in, otherwise it is loaded through the cache as
//! its own unit. A partial with no file renders as an empty string.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::Value;
use minijinja::{Environment, ErrorKind};

use crate::cache::{ArtifactCache, CompileOptions};
use crate::config::ViewConfig;
use crate::error::ComposeError;
use crate::functions::FunctionRegistry;
use crate::invocation::{MasterChoice, RenderInvocation};
use crate::source::TemplateSource;

#[derive(Debug)]
pub(crate) struct Composer {
    source: TemplateSource,
    master: String,
    cache: ArtifactCache,
}

impl Composer {
    /// Builds a composer from an already validated configuration.
    pub(crate) fn new(config: ViewConfig, registry: FunctionRegistry) -> Self {
        let source = TemplateSource::new(config.root, config.extension);
        let options = CompileOptions {
            source: source.clone(),
            partials: config.partials,
            registry,
            strict_undefined: config.strict_undefined,
        };
        Self {
            source,
            master: config.master,
            cache: ArtifactCache::new(options, config.disable_cache),
        }
    }

    pub(crate) fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub(crate) fn master(&self) -> &str {
        &self.master
    }

    pub(crate) fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Renders `name`, wrapped in its layout if one applies.
    pub(crate) fn render_with_master(
        self: &Arc<Self>,
        name: &str,
        data: BTreeMap<String, Value>,
    ) -> Result<String, ComposeError> {
        let invocation = RenderInvocation::new(Arc::clone(self), data);
        let body = self.execute(name, &invocation)?;

        let master = match invocation.master_choice() {
            MasterChoice::Declared(master) => Some(master),
            MasterChoice::Cleared => None,
            MasterChoice::Unset if self.master.is_empty() => None,
            MasterChoice::Unset => Some(self.master.clone()),
        };

        let Some(master) = master else {
            return Ok(body);
        };

        tracing::debug!("wrapping \"{}\" in layout \"{}\"", name, master);
        invocation.begin_master_pass(body);
        self.execute(&master, &invocation)
    }

    /// Renders `name` alone; layout declarations have no effect.
    pub(crate) fn render_file(
        self: &Arc<Self>,
        name: &str,
        data: BTreeMap<String, Value>,
    ) -> Result<String, ComposeError> {
        let invocation = RenderInvocation::new(Arc::clone(self), data);
        self.execute(name, &invocation)
    }

    /// Executes a top-level template of either pass.
    fn execute(
        &self,
        name: &str,
        invocation: &Arc<RenderInvocation>,
    ) -> Result<String, ComposeError> {
        let artifact = self.cache.load(name)?;
        let template = artifact.environment().get_template(name)?;
        template
            .render(invocation.render_context())
            .map_err(|e| invocation.take_failure().unwrap_or(ComposeError::Execution(e)))
    }

    /// Renders a partial requested from a template executing in `env`.
    pub(crate) fn include(
        &self,
        env: &Environment<'_>,
        name: &str,
        invocation: &Arc<RenderInvocation>,
    ) -> Result<String, ComposeError> {
        invocation.enter_partial(name)?;
        let _depth = invocation.descend(name)?;

        match env.get_template(name) {
            Ok(template) => return Ok(template.render(invocation.render_context())?),
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => {}
            Err(e) => return Err(e.into()),
        }

        if !self.source.exists(name) {
            tracing::warn!("partial \"{}\" not found, rendering nothing", name);
            return Ok(String::new());
        }

        let artifact = self.cache.load(name)?;
        let template = artifact.environment().get_template(name)?;
        Ok(template.render(invocation.render_context())?)
    }
}
