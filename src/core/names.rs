//! Machine identifiers and the tags derived from them.
//!
//! A machine id is a decimal number, optionally followed by container
//! segments: `0`, `1/lxc/0`, `2/kvm/1/lxc/3`.

use crate::core::error::UpgradeError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const MACHINE_TAG_PREFIX: &str = "machine-";

fn machine_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(0|[1-9][0-9]*)(/[a-z]+/(0|[1-9][0-9]*))*$")
            .expect("machine id pattern is valid")
    })
}

/// Reports whether `id` is a valid machine id.
pub fn is_valid_machine(id: &str) -> bool {
    machine_id_regex().is_match(id)
}

/// Tag naming a machine, e.g. `machine-0` or `machine-1-lxc-0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineTag {
    id: String,
}

impl MachineTag {
    pub fn new(id: &str) -> Result<Self, UpgradeError> {
        if !is_valid_machine(id) {
            return Err(UpgradeError::InvalidArgument(format!(
                "{:?} is not a valid machine id",
                id
            )));
        }
        Ok(Self { id: id.to_string() })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for MachineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MACHINE_TAG_PREFIX, self.id.replace('/', "-"))
    }
}
