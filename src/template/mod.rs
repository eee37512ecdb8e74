mod engine;
mod types;

pub use engine::{StubError, StubGenerator, CUSTOM_TEMPLATE_FILE};
pub use types::{struct_name_for, StubContext, DEFAULT_STUB_TEMPLATE};
