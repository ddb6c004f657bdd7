pub mod renderer;
pub mod views;

pub use renderer::ThemeRenderer;
pub use views::{TemplateView, View, ViewMode, ViewRegistry, ViewRenderer};
