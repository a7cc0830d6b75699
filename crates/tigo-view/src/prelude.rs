//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use tigo_view::prelude::*;
//!
//! let views = ViewRender::new(ViewConfig::new().with_master("master"))?;
//! views.render(&mut out, "page", &data)?;
//! ```

pub use crate::config::ViewConfig;
pub use crate::error::{ComposeError, ViewError};
pub use crate::view::ViewRender;
