pub const LOGID_KEY: &str = "LOGID";
pub const TYPE_KEY: &str = "TYPE";
pub const MESOS_TASK_ID_KEY: &str = "MESOS_TASK_ID";

/// Convention fields read from a container environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFields {
    pub logid: Option<String>,
    pub log_type: String,
    pub task_id: String,
}

impl EnvFields {
    /// Single pass over `KEY=VALUE` entries. The last entry for a key wins;
    /// entries without `=` are skipped.
    pub fn scan<S: AsRef<str>>(env: &[S]) -> Self {
        let mut fields = Self::default();

        for entry in env {
            let Some((key, value)) = entry.as_ref().split_once('=') else {
                continue;
            };

            match key {
                LOGID_KEY => fields.logid = Some(value.to_string()),
                TYPE_KEY => fields.log_type = value.to_string(),
                MESOS_TASK_ID_KEY => fields.task_id = value.to_string(),
                _ => {}
            }
        }

        fields
    }
}
