//! Server-side rendering
//!
//! Renders components to HTML and captures what the client needs to
//! hydrate them.
//!
//! ## Pipeline
//!
//! ```text
//! run_with_context
//!   └─ push SsrScope          (registry)
//!        └─ component.render()   values and bindings register themselves
//!   └─ drain pending work
//!   └─ page → HTML            (markers)
//!   └─ SsrScope::capture_hydration_data
//!        ├─ build_graph / find_paths_to_roots   (graph)
//!        └─ HydrationData                       (data, state)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use seidr_pages::ssr::render_to_string;
//!
//! let output = render_to_string(&Counter { start: 5 }).await?;
//! let script = output.hydration_data.to_script_tag()?;
//! ```

pub mod data;
pub mod graph;
pub mod markers;
pub mod registry;
pub mod renderer;
pub mod scope;
pub mod state;

pub use data::{BindingRecord, DataError, HYDRATION_GLOBAL, HYDRATION_SCRIPT_ID, HydrationData};
pub use graph::{DependencyGraph, GraphError, GraphNode, Path};
pub use markers::{Marker, SEIDR_ID_ATTR};
pub use registry::{ScopeGuard, active_scope, push_scope};
pub use renderer::{RenderError, RenderOutput, SsrOptions, SsrRenderer, render_to_string};
pub use scope::{CaptureError, CaptureMode, SsrScope};
pub use state::{StateKey, provide_state, state_signal};
