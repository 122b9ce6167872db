//! Built-in properties: behavioral contracts of the source-text pipeline and
//! of the standard codecs, text, time and regex libraries.

pub mod codec;
pub mod json;
pub mod marshal;
pub mod regex;
pub mod source;
pub mod text;
pub mod time;

use crate::diagnostics::RegistryError;
use crate::registry::Registry;

pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    source::register(registry)?;
    codec::register(registry)?;
    json::register(registry)?;
    marshal::register(registry)?;
    text::register(registry)?;
    time::register(registry)?;
    regex::register(registry)?;
    Ok(())
}
