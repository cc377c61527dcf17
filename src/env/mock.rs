use std::{collections::HashMap, env::VarError, sync::Arc};

use crate::{ArcOsStr, ArcStr};

/// In-memory environment used by tests.
#[derive(Debug, Clone, Default)]
pub struct Mock {
    vars: Arc<HashMap<ArcOsStr, ArcStr>>,
}

impl Mock {
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| {
                (
                    ArcOsStr::from(std::ffi::OsStr::new(k.as_ref())),
                    ArcStr::from(v.as_ref()),
                )
            })
            .collect();
        Self {
            vars: Arc::new(vars),
        }
    }

    pub fn env(&self, key: &ArcOsStr) -> Result<ArcStr, VarError> {
        self.vars.get(key).cloned().ok_or(VarError::NotPresent)
    }
}
