//! RON front end for [`PlatformParams`].
//!
//! ```ron
//! (
//!     user_top: 0x80000000,
//!     paddr_base: 0x80000000,
//!     kernel_log_buffer: true,
//! )
//! ```
//!
//! Missing fields take their [`PlatformParams::default`] value.

use crate::{AddressLayout, PlatformParams};
use ron::extensions::Extensions;
use ron::Options;
use std::fs::read_to_string;
use std::path::Path;
use tickpair_traits::{TickError, TickResult};

fn ron_options() -> Options {
    Options::default()
        .with_default_extension(Extensions::IMPLICIT_SOME)
        .with_default_extension(Extensions::UNWRAP_NEWTYPES)
}

impl PlatformParams {
    pub fn serialize_ron(&self) -> TickResult<String> {
        let pretty = ron::ser::PrettyConfig::default();
        ron_options()
            .to_string_pretty(self, pretty)
            .map_err(|e| TickError::new_with_cause("Failed to serialize platform parameters", e))
    }

    pub fn deserialize_ron(ron: &str) -> TickResult<Self> {
        ron_options()
            .from_str(ron)
            .map_err(|e| TickError::new_with_cause("Syntax error in platform parameters", e))
    }
}

/// Read platform parameters from a RON file.
pub fn read_params(path: impl AsRef<Path>) -> TickResult<PlatformParams> {
    let path = path.as_ref();
    let content = read_to_string(path).map_err(|e| {
        TickError::from(format!(
            "Failed to read platform parameters: {}",
            path.display()
        ))
        .add_cause(e.to_string().as_str())
    })?;
    read_params_str(&content)
}

pub fn read_params_str(content: &str) -> TickResult<PlatformParams> {
    PlatformParams::deserialize_ron(content)
}

/// Read platform parameters from a RON file and build the layout they describe.
pub fn read_layout(path: impl AsRef<Path>) -> TickResult<AddressLayout> {
    let params = read_params(path)?;
    Ok(AddressLayout::new(&params)?)
}
